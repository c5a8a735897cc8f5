//! Conflict classification and reporting.

use crate::automaton::StateId;
use crate::grammar::Grammar;
use crate::symbol::SymbolId;
use crate::table::{render_action, Action, ParseTable};
use crate::util::DisplayWith;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShiftReduce => f.write_str("SR-conflict"),
            Self::ReduceReduce => f.write_str("RR-conflict"),
        }
    }
}

/// One collision on an ACTION entry, in the order the assembler met the two
/// actions.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub state: StateId,
    pub terminal: SymbolId,
    pub existing: Action,
    pub incoming: Action,
    pub kind: ConflictKind,
}

/// One line per conflict:
/// `state <id>, terminal <name>: <existing> vs <new>`.
impl DisplayWith for Conflict {
    fn fmt_with(&self, grammar: &Grammar, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "state {}, terminal {}: {} vs {}",
            self.state,
            grammar.symbols().get(self.terminal).name(),
            render_action(self.existing),
            render_action(self.incoming),
        )
    }
}

/// Render every conflict of a table, one line each, prefixed by its kind.
pub fn render(grammar: &Grammar, table: &ParseTable) -> String {
    let mut out = String::new();
    for conflict in table.conflicts() {
        out.push_str(&format!(
            "{}: {}\n",
            conflict.kind,
            conflict.display(grammar)
        ));
    }
    out
}
