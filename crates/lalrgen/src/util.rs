//! Rendering support.
//!
//! Items, productions, states, and conflicts carry only symbol and
//! production ids; turning them into text needs the grammar for the names.
//! [`DisplayWith`] is that contract, and [`DisplayWith::display`] pairs a
//! value with its grammar to satisfy plain [`fmt::Display`] call sites
//! (`format!`, `writeln!`, assertions in tests).

use crate::grammar::Grammar;
use std::fmt;

/// Grammar-aware rendering.
pub trait DisplayWith {
    fn fmt_with(&self, grammar: &Grammar, f: &mut fmt::Formatter<'_>) -> fmt::Result;

    /// Adapt to [`fmt::Display`] by pairing the value with its grammar.
    fn display<'a>(&'a self, grammar: &'a Grammar) -> GrammarDisplay<'a, Self>
    where
        Self: Sized,
    {
        GrammarDisplay {
            value: self,
            grammar,
        }
    }
}

/// The pairing returned by [`DisplayWith::display`].
pub struct GrammarDisplay<'a, T> {
    value: &'a T,
    grammar: &'a Grammar,
}

impl<T: DisplayWith> fmt::Display for GrammarDisplay<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt_with(self.grammar, f)
    }
}
