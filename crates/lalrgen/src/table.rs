//! ACTION/GOTO table assembly with conflict recording.
//!
//! Collisions never abort generation. When two different actions land on the
//! same `(state, terminal)` entry, an explicit policy picks the winner —
//! shift beats reduce, the smaller production index beats the larger, accept
//! beats everything — and a conflict record is appended so the operator sees
//! the complete shape of the ambiguity. Callers treating the grammar as
//! LALR(1) must check [`ParseTable::has_conflicts`] before using the table.

use crate::automaton::{LR0Automaton, StateId};
use crate::grammar::{Grammar, ProductionId};
use crate::lookahead::LalrState;
use crate::report::{Conflict, ConflictKind};
use crate::symbol::SymbolId;
use crate::types::Map;
use crate::util::DisplayWith;
use std::fmt;

/// A parse decision for one `(state, terminal)` entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    Shift(StateId),
    Reduce(ProductionId),
    Accept,
    Error,
}

impl Action {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }
}

#[derive(Debug)]
pub struct ParseTable {
    state_count: usize,
    actions: Map<(StateId, SymbolId), Action>,
    gotos: Map<(StateId, SymbolId), StateId>,
    conflicts: Vec<Conflict>,
}

impl ParseTable {
    /// Assemble the table from the LALR(1) states and the LR(0) transitions.
    pub fn generate(
        grammar: &Grammar,
        automaton: &LR0Automaton,
        states: &[LalrState],
    ) -> Self {
        assert!(
            grammar.is_augmented(),
            "the grammar must be augmented before table generation"
        );
        assert_eq!(automaton.states.len(), states.len());

        let mut table = Self {
            state_count: states.len(),
            actions: Map::default(),
            gotos: Map::default(),
            conflicts: Vec::new(),
        };

        for (lr0, lalr) in automaton.states.iter().zip(states) {
            for &item in &lr0.items {
                if item.is_complete(grammar) {
                    if item.production == ProductionId::ACCEPT {
                        table.set_action(grammar, lr0.id, SymbolId::EOI, Action::Accept);
                    } else {
                        for terminal in lalr.lookahead(&item).iter() {
                            table.set_action(
                                grammar,
                                lr0.id,
                                terminal,
                                Action::Reduce(item.production),
                            );
                        }
                    }
                } else {
                    let next = item.next_symbol(grammar).expect("incomplete item");
                    if grammar.symbols().get(next).is_terminal() {
                        let target = automaton
                            .transition(lr0.id, next)
                            .expect("missing shift transition");
                        table.set_action(grammar, lr0.id, next, Action::Shift(target));
                    }
                }
            }
        }

        for (&(from, symbol), &to) in &automaton.transitions {
            if grammar.symbols().get(symbol).is_nonterminal() {
                table.gotos.insert((from, symbol), to);
            }
        }

        tracing::debug!(
            states = table.state_count,
            conflicts = table.conflicts.len(),
            "parse table assembled"
        );
        table
    }

    fn set_action(
        &mut self,
        grammar: &Grammar,
        state: StateId,
        terminal: SymbolId,
        incoming: Action,
    ) {
        let key = (state, terminal);
        match self.actions.get(&key) {
            None => {
                self.actions.insert(key, incoming);
            }
            Some(&existing) if existing == incoming => {}
            Some(&existing) => {
                let kind = classify(existing, incoming);
                tracing::debug!(
                    ?state,
                    terminal = grammar.symbols().get(terminal).name(),
                    ?existing,
                    ?incoming,
                    "table conflict"
                );
                self.conflicts.push(Conflict {
                    state,
                    terminal,
                    existing,
                    incoming,
                    kind,
                });
                self.actions.insert(key, resolve(existing, incoming));
            }
        }
    }

    /// The action for `(state, terminal)`; entries never written are
    /// [`Action::Error`].
    pub fn action(&self, state: StateId, terminal: SymbolId) -> Action {
        self.actions
            .get(&(state, terminal))
            .copied()
            .unwrap_or(Action::Error)
    }

    /// The goto target for `(state, nonterminal)`, if any.
    pub fn goto(&self, state: StateId, nonterminal: SymbolId) -> Option<StateId> {
        self.gotos.get(&(state, nonterminal)).copied()
    }

    pub fn state_count(&self) -> usize {
        self.state_count
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts[..]
    }
}

/// Renders the table with one row per state, terminal columns in name order
/// with `$` last, then nonterminal columns.
impl DisplayWith for ParseTable {
    fn fmt_with(&self, grammar: &Grammar, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut terminals: Vec<_> = grammar.symbols().terminals().collect();
        terminals.sort_by_key(|(_, sym)| sym.name());
        let mut nonterminals: Vec<_> = grammar.symbols().nonterminals().collect();
        nonterminals.sort_by_key(|(_, sym)| sym.name());

        write!(f, "{:>6} |", "state")?;
        for (_, sym) in &terminals {
            write!(f, "{:>8}", sym.name())?;
        }
        write!(f, "{:>8} |", "$")?;
        for (_, sym) in &nonterminals {
            write!(f, "{:>8}", sym.name())?;
        }
        writeln!(f)?;

        for state in 0..self.state_count {
            let state = StateId::from_raw(state as u16);
            write!(f, "{:>6} |", state)?;
            for &(id, _) in &terminals {
                write!(f, "{:>8}", render_action(self.action(state, id)))?;
            }
            write!(f, "{:>8} |", render_action(self.action(state, SymbolId::EOI)))?;
            for &(id, _) in &nonterminals {
                match self.goto(state, id) {
                    Some(to) => write!(f, "{:>8}", to)?,
                    None => write!(f, "{:>8}", "")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Render an action as `s<state>`, `r<production>`, `acc` or `err`.
pub fn render_action(action: Action) -> String {
    match action {
        Action::Shift(state) => format!("s{}", state),
        Action::Reduce(production) => format!("r{}", production.index()),
        Action::Accept => "acc".to_owned(),
        Action::Error => "err".to_owned(),
    }
}

fn classify(existing: Action, incoming: Action) -> ConflictKind {
    match (existing, incoming) {
        (Action::Shift(..), _) | (_, Action::Shift(..)) => ConflictKind::ShiftReduce,
        _ => ConflictKind::ReduceReduce,
    }
}

// Shift beats reduce; between reduces the smaller production index wins;
// accept (the reduce of production 0) beats every reduce.
fn resolve(existing: Action, incoming: Action) -> Action {
    match (existing, incoming) {
        (shift @ Action::Shift(..), _) | (_, shift @ Action::Shift(..)) => shift,
        (accept @ Action::Accept, _) | (_, accept @ Action::Accept) => accept,
        (Action::Reduce(a), Action::Reduce(b)) => Action::Reduce(a.min(b)),
        (Action::Error, other) | (other, Action::Error) => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_prefers_shift_over_reduce() {
        let shift = Action::Shift(StateId::from_raw(4));
        let reduce = Action::Reduce(ProductionId::from_raw(2));
        assert_eq!(resolve(reduce, shift), shift);
        assert_eq!(resolve(shift, reduce), shift);
        assert_eq!(classify(reduce, shift), ConflictKind::ShiftReduce);
    }

    #[test]
    fn policy_prefers_smaller_production_index() {
        let a = Action::Reduce(ProductionId::from_raw(1));
        let b = Action::Reduce(ProductionId::from_raw(3));
        assert_eq!(resolve(b, a), a);
        assert_eq!(resolve(a, b), a);
        assert_eq!(classify(a, b), ConflictKind::ReduceReduce);
    }

    #[test]
    fn action_rendering() {
        assert_eq!(render_action(Action::Shift(StateId::from_raw(7))), "s7");
        assert_eq!(render_action(Action::Reduce(ProductionId::from_raw(2))), "r2");
        assert_eq!(render_action(Action::Accept), "acc");
        assert_eq!(render_action(Action::Error), "err");
    }
}
