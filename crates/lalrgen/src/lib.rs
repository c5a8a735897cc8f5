//! An LALR(1) parser generator for ANTLR4-flavored grammar files.
//!
//! The pipeline runs leaves-first: the symbol registry and grammar analysis
//! ([`grammar`]), the LR(0) item-set automaton ([`automaton`]), LALR(1)
//! lookahead assignment ([`lookahead`]), and ACTION/GOTO table synthesis with
//! non-fatal conflict records ([`table`], [`report`]). The [`syntax`] reader
//! feeds the pipeline from `.g4` files and [`codegen`] serializes the
//! resulting [`snapshot`] into a standalone Rust parser.

pub mod automaton;
pub mod codegen;
pub mod grammar;
pub mod item;
pub mod lookahead;
pub mod report;
pub mod snapshot;
pub mod symbol;
pub mod syntax;
pub mod table;
pub mod types;
pub mod util;

use self::automaton::LR0Automaton;
use self::grammar::Grammar;
use self::lookahead::{LalrState, LookaheadMode};
use self::table::ParseTable;

/// Run the table-construction pipeline over a validated, augmented grammar.
///
/// This is a pure function of the grammar: equal inputs produce identical
/// tables and identical conflict-record ordering.
pub fn compute(
    grammar: &Grammar,
    mode: LookaheadMode,
) -> (LR0Automaton, Vec<LalrState>, ParseTable) {
    let automaton = LR0Automaton::build(grammar);
    let states = lookahead::assign(grammar, &automaton, mode);
    let table = ParseTable::generate(grammar, &automaton, &states);
    (automaton, states, table)
}
