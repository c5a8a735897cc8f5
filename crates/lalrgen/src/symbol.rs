//! Symbol model and interning registry.

use crate::types::Map;
use std::fmt;

/// Identity of an interned symbol.
///
/// Ids `0` and `1` are the reserved singletons `ε` and `$`; user symbols are
/// assigned increasing ids in interning order, so id order is a stable
/// iteration key.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

impl SymbolId {
    /// Reserved symbol for the empty string.
    pub const EPSILON: Self = Self(0);
    /// Reserved terminal marking the end of input.
    pub const EOI: Self = Self(1);

    const OFFSET: u32 = 2;

    pub const fn into_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            &Self::EPSILON => write!(f, "Sym#ε"),
            &Self::EOI => write!(f, "Sym#$"),
            Self(raw) => write!(f, "Sym#{:03}", raw),
        }
    }
}

/// Opaque token-class identifier attached to terminals.
///
/// The grammar reader assigns one class per lexer rule and per distinct
/// quoted literal; the core only compares them for equality.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenClass(pub u16);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    Terminal(TokenClass),
    Nonterminal,
    Epsilon,
    EndOfInput,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    name: String,
    kind: SymbolKind,
}

impl Symbol {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, SymbolKind::Terminal(..))
    }

    pub fn is_nonterminal(&self) -> bool {
        matches!(self.kind, SymbolKind::Nonterminal)
    }

    pub fn is_epsilon(&self) -> bool {
        matches!(self.kind, SymbolKind::Epsilon)
    }

    pub fn is_end_of_input(&self) -> bool {
        matches!(self.kind, SymbolKind::EndOfInput)
    }

    pub fn token_class(&self) -> Option<TokenClass> {
        match self.kind {
            SymbolKind::Terminal(class) => Some(class),
            _ => None,
        }
    }
}

/// The interning registry for grammar symbols.
///
/// Repeated interning with identical arguments yields the same [`SymbolId`],
/// so downstream components compare symbols by id. Terminals and nonterminals
/// live in disjoint namespaces; the reserved `ε`/`$` singletons are
/// pre-populated.
#[derive(Debug)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    terminals: Map<(String, TokenClass), SymbolId>,
    nonterminals: Map<String, SymbolId>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self {
            symbols: vec![
                Symbol {
                    name: "ε".into(),
                    kind: SymbolKind::Epsilon,
                },
                Symbol {
                    name: "$".into(),
                    kind: SymbolKind::EndOfInput,
                },
            ],
            terminals: Map::default(),
            nonterminals: Map::default(),
        }
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, name: &str, kind: SymbolKind) -> SymbolId {
        assert!(!name.is_empty(), "symbol names must be non-empty");
        let id = SymbolId(u32::try_from(self.symbols.len()).expect("too many symbols"));
        debug_assert!(id.0 >= SymbolId::OFFSET);
        self.symbols.push(Symbol {
            name: name.to_owned(),
            kind,
        });
        id
    }

    /// Intern a terminal identified by `(name, class)`.
    pub fn intern_terminal(&mut self, name: &str, class: TokenClass) -> SymbolId {
        let key = (name.to_owned(), class);
        if let Some(&id) = self.terminals.get(&key) {
            return id;
        }
        if self.nonterminals.contains_key(name) {
            tracing::warn!("terminal and nonterminal share the name `{}`", name);
        }
        let id = self.push(name, SymbolKind::Terminal(class));
        self.terminals.insert(key, id);
        id
    }

    /// Intern a nonterminal identified by name.
    pub fn intern_nonterminal(&mut self, name: &str) -> SymbolId {
        if let Some(&id) = self.nonterminals.get(name) {
            return id;
        }
        if self.terminals.keys().any(|(n, _)| n == name) {
            tracing::warn!("terminal and nonterminal share the name `{}`", name);
        }
        let id = self.push(name, SymbolKind::Nonterminal);
        self.nonterminals.insert(name.to_owned(), id);
        id
    }

    pub const fn epsilon(&self) -> SymbolId {
        SymbolId::EPSILON
    }

    pub const fn end_of_input(&self) -> SymbolId {
        SymbolId::EOI
    }

    /// Look up any symbol by name. When a terminal and a nonterminal share
    /// the name, the one interned first wins.
    pub fn find(&self, name: &str) -> Option<SymbolId> {
        self.symbols
            .iter()
            .position(|sym| sym.name == name)
            .map(|i| SymbolId(i as u32))
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> + '_ {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, sym)| (SymbolId(i as u32), sym))
    }

    pub fn terminals(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> + '_ {
        self.symbols().filter(|(_, sym)| sym.is_terminal())
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> + '_ {
        self.symbols().filter(|(_, sym)| sym.is_nonterminal())
    }
}

/// A set of symbols backed by a bit set over raw ids.
///
/// Iteration is ascending id order, which is deterministic because ids are
/// assigned in interning order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SymbolSet {
    inner: bit_set::BitSet,
}

impl SymbolSet {
    pub fn contains(&self, id: SymbolId) -> bool {
        self.inner.contains(id.0 as usize)
    }

    pub fn insert(&mut self, id: SymbolId) -> bool {
        self.inner.insert(id.0 as usize)
    }

    pub fn remove(&mut self, id: SymbolId) -> bool {
        self.inner.remove(id.0 as usize)
    }

    pub fn union_with(&mut self, other: &Self) {
        self.inner.union_with(&other.inner)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.inner
            .iter()
            .map(|raw| SymbolId(u32::try_from(raw).unwrap()))
    }

    pub fn display<'a>(&'a self, symbols: &'a SymbolTable) -> SymbolSetDisplay<'a> {
        SymbolSetDisplay { set: self, symbols }
    }
}

/// Renders a [`SymbolSet`] as `{name, name, …}` in name order.
pub struct SymbolSetDisplay<'a> {
    set: &'a SymbolSet,
    symbols: &'a SymbolTable,
}

impl fmt::Display for SymbolSetDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        let mut names: Vec<&str> = self
            .set
            .iter()
            .map(|id| self.symbols.get(id).name())
            .collect();
        names.sort_unstable();
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(name)?;
        }
        f.write_str("}")
    }
}

impl FromIterator<SymbolId> for SymbolSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = SymbolId>,
    {
        let mut set = Self::default();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut table = SymbolTable::new();
        let num = table.intern_terminal("num", TokenClass(0));
        let expr = table.intern_nonterminal("expr");
        assert_eq!(table.intern_terminal("num", TokenClass(0)), num);
        assert_eq!(table.intern_nonterminal("expr"), expr);
        assert_ne!(num, expr);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn namespaces_are_disjoint() {
        let mut table = SymbolTable::new();
        let t = table.intern_terminal("id", TokenClass(0));
        let n = table.intern_nonterminal("id");
        assert_ne!(t, n);
        assert!(table.get(t).is_terminal());
        assert!(table.get(n).is_nonterminal());
        // lookup by name resolves to the first interned symbol
        assert_eq!(table.find("id"), Some(t));
    }

    #[test]
    fn distinct_token_classes_make_distinct_terminals() {
        let mut table = SymbolTable::new();
        let a = table.intern_terminal("lit", TokenClass(0));
        let b = table.intern_terminal("lit", TokenClass(1));
        assert_ne!(a, b);
    }

    #[test]
    fn reserved_singletons() {
        let table = SymbolTable::new();
        assert_eq!(table.get(table.epsilon()).name(), "ε");
        assert_eq!(table.get(table.end_of_input()).name(), "$");
        assert!(table.get(SymbolId::EPSILON).is_epsilon());
        assert!(table.get(SymbolId::EOI).is_end_of_input());
        assert_eq!(table.terminals().count(), 0);
        assert_eq!(table.nonterminals().count(), 0);
    }

    #[test]
    fn symbol_set_iterates_in_id_order() {
        let set: SymbolSet = [SymbolId(7), SymbolId(2), SymbolId(5)]
            .into_iter()
            .collect();
        let ids: Vec<u32> = set.iter().map(SymbolId::into_raw).collect();
        assert_eq!(ids, vec![2, 5, 7]);
    }
}
