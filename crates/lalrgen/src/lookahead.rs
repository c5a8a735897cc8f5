//! LALR(1) lookahead assignment.
//!
//! Two schemes are offered. [`LookaheadMode::Follow`] is the default: every
//! complete item reduces on the FOLLOW set of its left-hand side. That is
//! weaker than true LALR(1) propagation but well-defined, and it diagnoses
//! the conflicts the targeted teaching grammars present.
//! [`LookaheadMode::Propagate`] computes per-state reduce lookaheads with the
//! DeRemer-Pennello relations (direct reads, `reads`, `includes`,
//! `lookback`), each closed to a fixed point; for a grammar that is LALR(1)
//! the resulting ACTION entries are the same or a refinement.
//!
//! In both schemes the completed augmented item carries exactly `{$}`, and
//! incomplete items carry the approximate sets (the next terminal itself, or
//! `FIRST` of the next nonterminal without `ε`); the table assembler only
//! consults lookaheads for reduce decisions.

use crate::automaton::{LR0Automaton, StateId};
use crate::grammar::{Grammar, ProductionId};
use crate::item::LR0Item;
use crate::symbol::{SymbolId, SymbolSet};
use crate::types::Map;
use crate::util::DisplayWith;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum LookaheadMode {
    /// FOLLOW-set approximation.
    #[default]
    Follow,
    /// DeRemer-Pennello lookahead propagation.
    Propagate,
}

/// An LR(0) state enriched with a lookahead set per item.
#[derive(Debug)]
pub struct LalrState {
    pub id: StateId,
    pub lookaheads: Map<LR0Item, SymbolSet>,
}

impl LalrState {
    pub fn lookahead(&self, item: &LR0Item) -> &SymbolSet {
        &self.lookaheads[item]
    }
}

impl DisplayWith for LalrState {
    fn fmt_with(&self, grammar: &Grammar, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "state {}:", self.id)?;
        for (item, lookahead) in &self.lookaheads {
            writeln!(
                f,
                "  {} {}",
                item.display(grammar),
                lookahead.display(grammar.symbols())
            )?;
        }
        Ok(())
    }
}

/// Assign lookahead sets to every item of every LR(0) state.
pub fn assign(
    grammar: &Grammar,
    automaton: &LR0Automaton,
    mode: LookaheadMode,
) -> Vec<LalrState> {
    let reduce_sets = match mode {
        LookaheadMode::Follow => None,
        LookaheadMode::Propagate => Some(propagate_reduce_sets(grammar, automaton)),
    };

    let mut states = Vec::with_capacity(automaton.states.len());
    for state in &automaton.states {
        let mut lookaheads = Map::default();
        for &item in &state.items {
            let set = if item.is_complete(grammar) {
                if item.production == ProductionId::ACCEPT {
                    [SymbolId::EOI].into_iter().collect()
                } else {
                    match &reduce_sets {
                        Some(la) => la
                            .get(&(state.id, item.production))
                            .cloned()
                            .unwrap_or_default(),
                        None => grammar
                            .follow(grammar.production(item.production).left())
                            .clone(),
                    }
                }
            } else {
                let next = item.next_symbol(grammar).expect("incomplete item");
                if grammar.symbols().get(next).is_nonterminal() {
                    let mut set = grammar.first(next).clone();
                    set.remove(SymbolId::EPSILON);
                    set
                } else {
                    [next].into_iter().collect()
                }
            };
            lookaheads.insert(item, set);
        }
        states.push(LalrState {
            id: state.id,
            lookaheads,
        });
    }

    tracing::debug!(?mode, states = states.len(), "lookahead sets assigned");
    states
}

/// A nonterminal transition `p --A--> r` of the LR(0) automaton.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
struct Goto {
    from: StateId,
    symbol: SymbolId,
}

impl fmt::Debug for Goto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?},{:?})", self.from, self.symbol)
    }
}

/// Close each transition's terminal set under `relation`: whenever
/// `relation(a, b)` holds, the set of `a` absorbs the set of `b`.
///
/// Iterated to a fixed point the same way the FIRST/FOLLOW computations
/// converge. Cyclic relations, such as two nullable gotos that read each
/// other, simply stop contributing once the sets on the cycle agree.
fn close_over(sets: &mut Map<Goto, SymbolSet>, relation: impl Fn(&Goto, &Goto) -> bool) {
    let gotos: Vec<Goto> = sets.keys().copied().collect();
    let mut edges = Vec::new();
    for &a in &gotos {
        for &b in &gotos {
            if a != b && relation(&a, &b) {
                edges.push((a, b));
            }
        }
    }

    let mut changed = true;
    while changed {
        changed = false;
        for &(a, b) in &edges {
            let absorbed = sets[&b].clone();
            let target = sets.get_mut(&a).unwrap();
            let before = target.len();
            target.union_with(&absorbed);
            changed |= target.len() != before;
        }
    }
}

/// `LA(q, A → ω)` for every reduction, via DeRemer-Pennello:
///
/// ```text
/// Read(p,A)   = DR(p,A) ∪ ⋃ { Read(r,C)   | (p,A) reads (r,C) }
/// Follow(p,A) = Read(p,A) ∪ ⋃ { Follow(p',B) | (p,A) includes (p',B) }
/// LA(q,A→ω)   = ⋃ { Follow(p,A) | (q,A→ω) lookback (p,A) }
/// ```
fn propagate_reduce_sets(
    grammar: &Grammar,
    automaton: &LR0Automaton,
) -> Map<(StateId, ProductionId), SymbolSet> {
    // Nonterminal transitions and their direct-read sets. The grammar keeps
    // `$` out of every right-hand side, so a goto whose target contains the
    // completed augmented item reads `$` explicitly.
    let mut gotos: Map<Goto, StateId> = Map::default();
    let mut read_sets: Map<Goto, SymbolSet> = Map::default();
    for (&(from, symbol), &to) in &automaton.transitions {
        if !grammar.symbols().get(symbol).is_nonterminal() {
            continue;
        }
        let key = Goto { from, symbol };
        let mut direct: SymbolSet = automaton
            .transitions
            .keys()
            .filter(|&&(p, t)| p == to && grammar.symbols().get(t).is_terminal())
            .map(|&(_, t)| t)
            .collect();
        if automaton.state(to).is_accepting(grammar) {
            direct.insert(SymbolId::EOI);
        }
        gotos.insert(key, to);
        read_sets.insert(key, direct);
    }

    // (p,A) reads (r,C)  <=>  r = goto(p,A), r --C--> with C nullable
    close_over(&mut read_sets, |a, b| {
        gotos[a] == b.from && grammar.nullable(b.symbol)
    });

    // (p,A) includes (p',B)  <=>  B → βAγ, γ nullable, p' --β--> p
    let mut includes: Map<Goto, Vec<Goto>> = Map::default();
    for &b_key in gotos.keys() {
        for (_, production) in grammar.productions_for(b_key.symbol) {
            let right = production.right();
            let mut current = b_key.from;
            for (i, &sym) in right.iter().enumerate() {
                if grammar.symbols().get(sym).is_nonterminal()
                    && right[i + 1..].iter().all(|s| grammar.nullable(*s))
                {
                    let a_key = Goto {
                        from: current,
                        symbol: sym,
                    };
                    if gotos.contains_key(&a_key) {
                        includes.entry(a_key).or_default().push(b_key);
                    }
                }
                match automaton.transition(current, sym) {
                    Some(next) => current = next,
                    None => break,
                }
            }
        }
    }

    let mut follow_sets = read_sets;
    close_over(&mut follow_sets, |a, b| {
        includes.get(a).is_some_and(|rel| rel.contains(b))
    });

    // (q, A→ω) lookback (p,A)  <=>  p --ω--> q
    let mut lookaheads: Map<(StateId, ProductionId), SymbolSet> = Map::default();
    for state in &automaton.states {
        for (id, production) in grammar.productions() {
            if id == ProductionId::ACCEPT {
                continue;
            }
            let mut current = state.id;
            let mut walked = true;
            for &sym in production.right() {
                match automaton.transition(current, sym) {
                    Some(next) => current = next,
                    None => {
                        walked = false;
                        break;
                    }
                }
            }
            if !walked {
                continue;
            }
            let goto = Goto {
                from: state.id,
                symbol: production.left(),
            };
            if let Some(follow) = follow_sets.get(&goto) {
                lookaheads
                    .entry((current, id))
                    .or_default()
                    .union_with(follow);
            }
        }
    }

    lookaheads
}
