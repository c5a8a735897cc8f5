//! LR(0) items.

use crate::grammar::{Grammar, ProductionId};
use crate::symbol::SymbolId;
use crate::util::DisplayWith;
use std::fmt;

/// A production with a dot marking how much of the right-hand side has been
/// matched: `[A → α·β]`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LR0Item {
    pub production: ProductionId,
    pub dot: u16,
}

impl LR0Item {
    pub const fn new(production: ProductionId, dot: u16) -> Self {
        Self { production, dot }
    }

    pub fn is_complete(&self, grammar: &Grammar) -> bool {
        usize::from(self.dot) >= grammar.production(self.production).right().len()
    }

    /// The symbol immediately after the dot, or `None` when complete.
    pub fn next_symbol(&self, grammar: &Grammar) -> Option<SymbolId> {
        grammar
            .production(self.production)
            .right()
            .get(usize::from(self.dot))
            .copied()
    }

    /// The item with the dot shifted one symbol to the right. Advancing a
    /// complete item is a programmer error.
    pub fn advance(&self, grammar: &Grammar) -> Self {
        assert!(
            !self.is_complete(grammar),
            "cannot advance a complete item"
        );
        Self {
            production: self.production,
            dot: self.dot + 1,
        }
    }
}

impl DisplayWith for LR0Item {
    fn fmt_with(&self, grammar: &Grammar, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let production = grammar.production(self.production);
        write!(f, "[{} ->", grammar.symbols().get(production.left()).name())?;
        for (i, sym) in production.right().iter().enumerate() {
            if i == usize::from(self.dot) {
                f.write_str(" .")?;
            }
            write!(f, " {}", grammar.symbols().get(*sym).name())?;
        }
        if usize::from(self.dot) == production.right().len() {
            f.write_str(" .")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::TokenClass;

    fn grammar() -> Grammar {
        let mut g = Grammar::new();
        let plus = g.intern_terminal("+", TokenClass(0));
        let num = g.intern_terminal("num", TokenClass(1));
        let e = g.intern_nonterminal("E");
        let t = g.intern_nonterminal("T");
        g.add_production(e, vec![e, plus, t]);
        g.add_production(t, vec![num]);
        g.set_start(e);
        g
    }

    #[test]
    fn dot_movement() {
        let g = grammar();
        let item = LR0Item::new(ProductionId::from_raw(0), 0);
        assert!(!item.is_complete(&g));
        assert_eq!(item.next_symbol(&g), g.symbols().find("E"));

        let item = item.advance(&g).advance(&g).advance(&g);
        assert!(item.is_complete(&g));
        assert_eq!(item.next_symbol(&g), None);
    }

    #[test]
    #[should_panic(expected = "cannot advance a complete item")]
    fn advance_past_the_end_panics() {
        let g = grammar();
        let item = LR0Item::new(ProductionId::from_raw(1), 1);
        let _ = item.advance(&g);
    }

    #[test]
    fn rendering() {
        let g = grammar();
        let item = LR0Item::new(ProductionId::from_raw(0), 1);
        assert_eq!(item.display(&g).to_string(), "[E -> E . + T]");
        let complete = LR0Item::new(ProductionId::from_raw(1), 1);
        assert_eq!(complete.display(&g).to_string(), "[T -> num .]");
    }
}
