//! LR(0) automaton construction.
//!
//! States are canonical closed item sets; two states are the same state iff
//! their closures contain the same items. Discovery is breadth-first with
//! transition symbols visited in name order, so state numbering and every
//! derived table are reproducible byte-for-byte across runs.

use crate::grammar::{Grammar, ProductionId};
use crate::item::LR0Item;
use crate::symbol::SymbolId;
use crate::types::{Map, Set};
use crate::util::DisplayWith;
use std::{collections::VecDeque, fmt};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(u16);

impl StateId {
    pub const START: Self = Self(0);

    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug)]
pub struct LR0State {
    pub id: StateId,
    /// The closed item set, sorted by (production, dot).
    pub items: Vec<LR0Item>,
}

impl LR0State {
    /// A state accepts when it contains the completed augmented item
    /// `[S' → S·]`.
    pub fn is_accepting(&self, grammar: &Grammar) -> bool {
        self.items
            .iter()
            .any(|item| item.production == ProductionId::ACCEPT && item.is_complete(grammar))
    }
}

impl DisplayWith for LR0State {
    fn fmt_with(&self, grammar: &Grammar, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "state {}:", self.id)?;
        for item in &self.items {
            writeln!(f, "  {}", item.display(grammar))?;
        }
        Ok(())
    }
}

/// Discovery queue for state enumeration. An item set is interned at most
/// once: the first time a closed set is seen it receives the next state id
/// and joins the pending queue, so states are numbered in discovery order.
#[derive(Default)]
struct StateQueue {
    pending: VecDeque<(StateId, Vec<LR0Item>)>,
    ids_by_items: Map<Vec<LR0Item>, StateId>,
    next_id: u16,
}

impl StateQueue {
    fn intern(&mut self, items: Vec<LR0Item>) -> StateId {
        if let Some(&id) = self.ids_by_items.get(&items) {
            return id;
        }
        let id = StateId(self.next_id);
        self.next_id += 1;
        self.ids_by_items.insert(items.clone(), id);
        self.pending.push_back((id, items));
        id
    }

    fn pop(&mut self) -> Option<(StateId, Vec<LR0Item>)> {
        self.pending.pop_front()
    }
}

#[derive(Debug)]
pub struct LR0Automaton {
    pub states: Vec<LR0State>,
    pub transitions: Map<(StateId, SymbolId), StateId>,
}

impl LR0Automaton {
    /// Enumerate the canonical LR(0) states of an augmented grammar.
    pub fn build(grammar: &Grammar) -> Self {
        assert!(
            grammar.is_augmented(),
            "the grammar must be augmented before automaton construction"
        );

        let mut states = Vec::new();
        let mut transitions = Map::default();
        let mut queue = StateQueue::default();

        let start = queue.intern(closure(grammar, vec![LR0Item::new(ProductionId::ACCEPT, 0)]));
        debug_assert_eq!(start, StateId::START);

        while let Some((id, items)) = queue.pop() {
            for (symbol, kernel) in transition_kernels(grammar, &items) {
                let target = queue.intern(closure(grammar, kernel));
                transitions.insert((id, symbol), target);
            }
            states.push(LR0State { id, items });
        }

        // breadth-first discovery pushes states in id order
        debug_assert!(states.iter().enumerate().all(|(i, s)| s.id.index() == i));
        tracing::debug!(
            states = states.len(),
            transitions = transitions.len(),
            "LR(0) automaton constructed"
        );

        Self {
            states,
            transitions,
        }
    }

    pub fn state(&self, id: StateId) -> &LR0State {
        &self.states[id.index()]
    }

    pub fn transition(&self, from: StateId, symbol: SymbolId) -> Option<StateId> {
        self.transitions.get(&(from, symbol)).copied()
    }
}

impl DisplayWith for LR0Automaton {
    fn fmt_with(&self, grammar: &Grammar, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for state in &self.states {
            write!(f, "{}", state.display(grammar))?;
        }
        writeln!(f, "transitions:")?;
        for (&(from, symbol), &to) in &self.transitions {
            writeln!(
                f,
                "  {} --{}--> {}",
                from,
                grammar.symbols().get(symbol).name(),
                to
            )?;
        }
        Ok(())
    }
}

/// The smallest item set containing `seed` and closed under "if `[A → α·Bβ]`
/// is in and `B → γ` is a production, `[B → ·γ]` is in". The result is
/// sorted, which makes it the canonical identity of the state.
pub fn closure(grammar: &Grammar, seed: Vec<LR0Item>) -> Vec<LR0Item> {
    let mut items: Set<LR0Item> = seed.into_iter().collect();

    let mut changed = true;
    while changed {
        changed = false;
        let mut added = Vec::new();
        for item in &items {
            let Some(symbol) = item.next_symbol(grammar) else {
                continue;
            };
            if !grammar.symbols().get(symbol).is_nonterminal() {
                continue;
            }
            for (id, _) in grammar.productions_for(symbol) {
                let fresh = LR0Item::new(id, 0);
                if !items.contains(&fresh) {
                    added.push(fresh);
                }
            }
        }
        for item in added {
            changed |= items.insert(item);
        }
    }

    let mut items: Vec<LR0Item> = items.into_iter().collect();
    items.sort_unstable();
    items
}

/// `goto(I, X)` for every symbol `X` with an item `[A → α·Xβ]` in `I`,
/// before closure: the advanced kernel items, keyed by `X` in symbol-name
/// order.
fn transition_kernels(grammar: &Grammar, items: &[LR0Item]) -> Vec<(SymbolId, Vec<LR0Item>)> {
    let mut kernels: Map<SymbolId, Vec<LR0Item>> = Map::default();
    for item in items {
        if let Some(symbol) = item.next_symbol(grammar) {
            kernels.entry(symbol).or_default().push(item.advance(grammar));
        }
    }

    let mut kernels: Vec<(SymbolId, Vec<LR0Item>)> = kernels.into_iter().collect();
    kernels.sort_by(|(a, _), (b, _)| {
        grammar
            .symbols()
            .get(*a)
            .name()
            .cmp(grammar.symbols().get(*b).name())
    });
    kernels
}
