//! Dense table snapshot handed to the code emitter.
//!
//! The integer encoding is fixed and the emitter relies on it: shift is the
//! positive target state id, reduce is `-(production_index + 1)` so that
//! reduce-0 and shift-0 stay distinguishable, accept is `0`, error and a
//! missing goto are `-1`.

use crate::automaton::StateId;
use crate::grammar::Grammar;
use crate::symbol::SymbolId;
use crate::table::{Action, ParseTable};
use crate::util::DisplayWith;

pub const ACCEPT: i32 = 0;
pub const ERROR: i32 = -1;

#[derive(Debug, Clone)]
pub struct ProductionMeta {
    pub left: SymbolId,
    pub right: Vec<SymbolId>,
    /// Source-string rendering, e.g. `E -> E + T`.
    pub text: String,
}

#[derive(Debug)]
pub struct TableSnapshot {
    pub productions: Vec<ProductionMeta>,
    /// Index 0 is reserved for `$`; grammar terminals follow in name order.
    pub terminals: Vec<SymbolId>,
    /// Index 0 is reserved for the augmented start; the rest follow in name
    /// order.
    pub nonterminals: Vec<SymbolId>,
    pub state_count: usize,
    /// `action[state]` has one column per grammar terminal (in
    /// `terminals[1..]` order) plus the trailing `$` column.
    pub action: Vec<Vec<i32>>,
    /// `goto[state]` has one column per nonterminal in `nonterminals` order.
    pub goto: Vec<Vec<i32>>,
}

impl TableSnapshot {
    pub fn new(grammar: &Grammar, table: &ParseTable) -> Self {
        assert!(
            grammar.is_augmented(),
            "snapshots are taken from augmented grammars"
        );
        let start = grammar.start().expect("augmented grammar has a start");

        let mut terminals = vec![SymbolId::EOI];
        let mut rest: Vec<_> = grammar.symbols().terminals().collect();
        rest.sort_by_key(|(_, sym)| sym.name());
        terminals.extend(rest.iter().map(|(id, _)| *id));

        let mut nonterminals = vec![start];
        let mut rest: Vec<_> = grammar
            .symbols()
            .nonterminals()
            .filter(|(id, _)| *id != start)
            .collect();
        rest.sort_by_key(|(_, sym)| sym.name());
        nonterminals.extend(rest.iter().map(|(id, _)| *id));

        let productions = grammar
            .productions()
            .map(|(_, p)| ProductionMeta {
                left: p.left(),
                right: p.right().to_vec(),
                text: p.display(grammar).to_string(),
            })
            .collect();

        let mut action = Vec::with_capacity(table.state_count());
        let mut goto = Vec::with_capacity(table.state_count());
        for raw in 0..table.state_count() {
            let state = StateId::from_raw(raw as u16);

            let mut row = Vec::with_capacity(terminals.len());
            for &terminal in terminals[1..].iter().chain([&SymbolId::EOI]) {
                row.push(encode(table.action(state, terminal)));
            }
            action.push(row);

            let mut row = Vec::with_capacity(nonterminals.len());
            for &nonterminal in &nonterminals {
                row.push(
                    table
                        .goto(state, nonterminal)
                        .map_or(ERROR, |to| to.index() as i32),
                );
            }
            goto.push(row);
        }

        Self {
            productions,
            terminals,
            nonterminals,
            state_count: table.state_count(),
            action,
            goto,
        }
    }
}

fn encode(action: Action) -> i32 {
    match action {
        Action::Shift(state) => state.index() as i32,
        Action::Reduce(production) => -(production.index() as i32 + 1),
        Action::Accept => ACCEPT,
        Action::Error => ERROR,
    }
}
