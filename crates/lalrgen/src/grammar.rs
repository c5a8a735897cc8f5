//! Grammar representation and analysis.
//!
//! A [`Grammar`] owns its symbol registry and an ordered production list.
//! The NULLABLE/FIRST/FOLLOW sets are memoized on first use and invalidated
//! by every mutating operation, so a grammar handed to the generator behaves
//! as if frozen.

use crate::symbol::{SymbolId, SymbolSet, SymbolTable, TokenClass};
use crate::types::Map;
use crate::util::DisplayWith;
use std::{cell::OnceCell, fmt};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProductionId(u16);

impl ProductionId {
    /// The augmented production `S' → S`. Only meaningful once
    /// [`Grammar::augment`] has run; augmentation renumbers by inserting at
    /// the front.
    pub const ACCEPT: Self = Self(0);

    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ProductionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P#{:03}", self.0)
    }
}

/// A production rule `A → X₁ … Xₙ`. An empty right-hand side is the
/// epsilon production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    left: SymbolId,
    right: Vec<SymbolId>,
}

impl Production {
    pub fn left(&self) -> SymbolId {
        self.left
    }

    pub fn right(&self) -> &[SymbolId] {
        &self.right[..]
    }

    pub fn is_epsilon(&self) -> bool {
        self.right.is_empty()
    }
}

impl DisplayWith for Production {
    fn fmt_with(&self, grammar: &Grammar, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ->", grammar.symbols().get(self.left).name())?;
        if self.right.is_empty() {
            f.write_str(" ε")?;
        } else {
            for sym in &self.right {
                write!(f, " {}", grammar.symbols().get(*sym).name())?;
            }
        }
        Ok(())
    }
}

/// Findings of [`Grammar::validate`]. These are values, never panics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    #[error("No start symbol defined")]
    NoStartSymbol,
    #[error("No productions defined")]
    NoProductions,
    #[error("Undefined nonterminal: {0}")]
    UndefinedNonterminal(String),
    #[error("Start symbol has no productions: {0}")]
    UnproducedStart(String),
}

#[derive(Debug)]
pub struct Grammar {
    symbols: SymbolTable,
    productions: Vec<Production>,
    start: Option<SymbolId>,
    augmented: bool,
    analysis: OnceCell<Analysis>,
}

impl Default for Grammar {
    fn default() -> Self {
        Self {
            symbols: SymbolTable::new(),
            productions: Vec::new(),
            start: None,
            augmented: false,
            analysis: OnceCell::new(),
        }
    }
}

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn intern_terminal(&mut self, name: &str, class: TokenClass) -> SymbolId {
        self.analysis.take();
        self.symbols.intern_terminal(name, class)
    }

    pub fn intern_nonterminal(&mut self, name: &str) -> SymbolId {
        self.analysis.take();
        self.symbols.intern_nonterminal(name)
    }

    /// Append a production. A right-hand side of `[ε]` is normalized to the
    /// empty sequence.
    pub fn add_production(&mut self, left: SymbolId, right: Vec<SymbolId>) -> ProductionId {
        assert!(
            self.symbols.get(left).is_nonterminal(),
            "the left-hand side of a production must be a nonterminal"
        );
        let right: Vec<SymbolId> = right
            .into_iter()
            .filter(|sym| *sym != SymbolId::EPSILON)
            .collect();
        self.analysis.take();
        let id = ProductionId(u16::try_from(self.productions.len()).expect("too many productions"));
        self.productions.push(Production { left, right });
        id
    }

    pub fn set_start(&mut self, symbol: SymbolId) {
        assert!(
            self.symbols.get(symbol).is_nonterminal(),
            "the start symbol must be a nonterminal"
        );
        self.analysis.take();
        self.start.replace(symbol);
    }

    pub fn start(&self) -> Option<SymbolId> {
        self.start
    }

    pub fn is_augmented(&self) -> bool {
        self.augmented
    }

    /// Extend the grammar with a fresh start symbol `S'` and the production
    /// `S' → S` at index 0. Idempotent; a no-op until a start symbol is set.
    pub fn augment(&mut self) {
        if self.augmented {
            return;
        }
        let Some(start) = self.start else { return };
        let name = format!("{}'", self.symbols.get(start).name());
        let fresh = self.symbols.intern_nonterminal(&name);
        self.productions.insert(
            0,
            Production {
                left: fresh,
                right: vec![start],
            },
        );
        self.start = Some(fresh);
        self.augmented = true;
        self.analysis.take();
    }

    pub fn productions(&self) -> impl Iterator<Item = (ProductionId, &Production)> + '_ {
        self.productions
            .iter()
            .enumerate()
            .map(|(i, p)| (ProductionId(i as u16), p))
    }

    pub fn production(&self, id: ProductionId) -> &Production {
        &self.productions[id.index()]
    }

    pub fn productions_for(
        &self,
        left: SymbolId,
    ) -> impl Iterator<Item = (ProductionId, &Production)> + '_ {
        self.productions().filter(move |(_, p)| p.left == left)
    }

    fn analysis(&self) -> &Analysis {
        self.analysis.get_or_init(|| Analysis::compute(self))
    }

    pub fn nullable(&self, symbol: SymbolId) -> bool {
        self.analysis().nullable.contains(symbol)
    }

    /// `FIRST(symbol)`: terminals that can begin a derivation of `symbol`,
    /// plus `ε` when the symbol is nullable.
    pub fn first(&self, symbol: SymbolId) -> &SymbolSet {
        let analysis = self.analysis();
        analysis.first.get(&symbol).unwrap_or(&analysis.empty)
    }

    /// `FOLLOW(nonterminal)`: terminals that can appear immediately after the
    /// nonterminal in a sentential form, plus `$` at the end of input.
    pub fn follow(&self, symbol: SymbolId) -> &SymbolSet {
        let analysis = self.analysis();
        analysis.follow.get(&symbol).unwrap_or(&analysis.empty)
    }

    /// `FIRST(α)` for a symbol sequence.
    pub fn first_of(&self, sequence: &[SymbolId]) -> SymbolSet {
        let analysis = self.analysis();
        first_of_sequence(&analysis.first, &analysis.nullable, sequence)
    }

    /// Check the grammar structure. Findings are returned, not thrown; table
    /// generation should not be attempted unless the list is empty.
    pub fn validate(&self) -> Vec<GrammarError> {
        let mut errors = Vec::new();

        if self.start.is_none() {
            errors.push(GrammarError::NoStartSymbol);
        }
        if self.productions.is_empty() {
            errors.push(GrammarError::NoProductions);
        }

        let mut defined = SymbolSet::default();
        for p in &self.productions {
            defined.insert(p.left);
        }

        let mut reported = SymbolSet::default();
        for p in &self.productions {
            for &sym in &p.right {
                if self.symbols.get(sym).is_nonterminal()
                    && !defined.contains(sym)
                    && reported.insert(sym)
                {
                    errors.push(GrammarError::UndefinedNonterminal(
                        self.symbols.get(sym).name().to_owned(),
                    ));
                }
            }
        }

        if let Some(start) = self.start {
            if !self.productions.is_empty() && !defined.contains(start) {
                errors.push(GrammarError::UnproducedStart(
                    self.symbols.get(start).name().to_owned(),
                ));
            }
        }

        errors
    }

    /// Render the FIRST/FOLLOW/nullable analysis, one nonterminal per line.
    pub fn display_sets(&self) -> SetsDisplay<'_> {
        SetsDisplay { grammar: self }
    }
}

/// Rendering of a grammar's FIRST/FOLLOW/nullable analysis.
pub struct SetsDisplay<'g> {
    grammar: &'g Grammar,
}

impl fmt::Display for SetsDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let grammar = self.grammar;
        let mut nonterminals: Vec<_> = grammar.symbols.nonterminals().collect();
        nonterminals.sort_by_key(|(_, sym)| sym.name());
        for &(id, sym) in &nonterminals {
            writeln!(
                f,
                "FIRST({}) = {}",
                sym.name(),
                grammar.first(id).display(&grammar.symbols)
            )?;
        }
        for &(id, sym) in &nonterminals {
            writeln!(
                f,
                "FOLLOW({}) = {}",
                sym.name(),
                grammar.follow(id).display(&grammar.symbols)
            )?;
        }
        for &(id, sym) in &nonterminals {
            if grammar.nullable(id) {
                writeln!(f, "nullable: {}", sym.name())?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "terminals:")?;
        for (i, (_, sym)) in self.symbols.terminals().enumerate() {
            write!(f, "{}{}", if i > 0 { ", " } else { " " }, sym.name())?;
        }
        write!(f, "\nnonterminals:")?;
        for (i, (_, sym)) in self.symbols.nonterminals().enumerate() {
            write!(f, "{}{}", if i > 0 { ", " } else { " " }, sym.name())?;
        }
        writeln!(
            f,
            "\nstart symbol: {}",
            self.start
                .map(|s| self.symbols.get(s).name())
                .unwrap_or("<none>")
        )?;
        writeln!(f, "productions:")?;
        for (id, p) in self.productions() {
            writeln!(f, "  [{:02}] {}", id.index(), p.display(self))?;
        }
        Ok(())
    }
}

/// Memoized fixed-point analysis over a grammar snapshot.
#[derive(Debug)]
struct Analysis {
    nullable: SymbolSet,
    first: Map<SymbolId, SymbolSet>,
    follow: Map<SymbolId, SymbolSet>,
    empty: SymbolSet,
}

impl Analysis {
    fn compute(grammar: &Grammar) -> Self {
        let nullable = compute_nullable(grammar);
        let first = compute_first(grammar, &nullable);
        let follow = compute_follow(grammar, &nullable, &first);
        Self {
            nullable,
            first,
            follow,
            empty: SymbolSet::default(),
        }
    }
}

fn compute_nullable(grammar: &Grammar) -> SymbolSet {
    let mut nullable = SymbolSet::default();
    nullable.insert(SymbolId::EPSILON);

    let mut changed = true;
    while changed {
        changed = false;
        for (_, p) in grammar.productions() {
            if nullable.contains(p.left()) {
                continue;
            }
            if p.right().iter().all(|sym| nullable.contains(*sym)) {
                nullable.insert(p.left());
                changed = true;
            }
        }
    }

    nullable
}

fn compute_first(grammar: &Grammar, nullable: &SymbolSet) -> Map<SymbolId, SymbolSet> {
    let mut first: Map<SymbolId, SymbolSet> = Map::default();

    for (id, sym) in grammar.symbols().symbols() {
        let mut seed = SymbolSet::default();
        if sym.is_terminal() || sym.is_epsilon() || sym.is_end_of_input() {
            seed.insert(id);
        }
        first.insert(id, seed);
    }

    let mut changed = true;
    while changed {
        changed = false;
        for (_, p) in grammar.productions() {
            let mut added = SymbolSet::default();
            let mut all_nullable = true;
            for &sym in p.right() {
                let from = &first[&sym];
                for t in from.iter() {
                    if t != SymbolId::EPSILON {
                        added.insert(t);
                    }
                }
                if !nullable.contains(sym) {
                    all_nullable = false;
                    break;
                }
            }
            if all_nullable {
                added.insert(SymbolId::EPSILON);
            }

            let target = first.get_mut(&p.left()).unwrap();
            let before = target.len();
            target.union_with(&added);
            changed |= target.len() != before;
        }
    }

    first
}

fn compute_follow(
    grammar: &Grammar,
    nullable: &SymbolSet,
    first: &Map<SymbolId, SymbolSet>,
) -> Map<SymbolId, SymbolSet> {
    let mut follow: Map<SymbolId, SymbolSet> = grammar
        .symbols()
        .nonterminals()
        .map(|(id, _)| (id, SymbolSet::default()))
        .collect();

    if let Some(start) = grammar.start() {
        follow
            .get_mut(&start)
            .expect("the start symbol must be a registered nonterminal")
            .insert(SymbolId::EOI);
    }

    let mut changed = true;
    while changed {
        changed = false;
        for (_, p) in grammar.productions() {
            for (i, &b) in p.right().iter().enumerate() {
                if !grammar.symbols().get(b).is_nonterminal() {
                    continue;
                }
                let beta = &p.right()[i + 1..];

                let mut added = first_of_sequence(first, nullable, beta);
                added.remove(SymbolId::EPSILON);
                if beta.iter().all(|sym| nullable.contains(*sym)) {
                    added.union_with(&follow[&p.left()]);
                }

                let target = follow.get_mut(&b).unwrap();
                let before = target.len();
                target.union_with(&added);
                changed |= target.len() != before;
            }
        }
    }

    follow
}

fn first_of_sequence(
    first: &Map<SymbolId, SymbolSet>,
    nullable: &SymbolSet,
    sequence: &[SymbolId],
) -> SymbolSet {
    let mut result = SymbolSet::default();
    for &sym in sequence {
        if let Some(set) = first.get(&sym) {
            result.union_with(set);
            result.remove(SymbolId::EPSILON);
        }
        if !nullable.contains(sym) {
            return result;
        }
    }
    result.insert(SymbolId::EPSILON);
    result
}

/// Name-based construction stream, the contract offered to the grammar
/// reader: declare symbols, add productions by name, nominate the start
/// symbol, then [`GrammarBuilder::build`].
///
/// Names appearing only on a right-hand side are auto-interned by naming
/// convention: uppercase-initial names become terminals (with a fresh token
/// class), everything else becomes a nonterminal.
#[derive(Debug, Default)]
pub struct GrammarBuilder {
    grammar: Grammar,
    next_class: u16,
}

impl GrammarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_terminal(&mut self, name: &str, class: TokenClass) -> SymbolId {
        self.next_class = self.next_class.max(class.0 + 1);
        self.grammar.intern_terminal(name, class)
    }

    pub fn add_nonterminal(&mut self, name: &str) -> SymbolId {
        self.grammar.intern_nonterminal(name)
    }

    pub fn add_production(&mut self, left: &str, right: &[&str]) -> ProductionId {
        let left = self.grammar.intern_nonterminal(left);
        let right = right.iter().map(|name| self.resolve(name)).collect();
        self.grammar.add_production(left, right)
    }

    pub fn set_start(&mut self, name: &str) {
        let start = self.grammar.intern_nonterminal(name);
        self.grammar.set_start(start);
    }

    pub fn build(self) -> Grammar {
        self.grammar
    }

    fn resolve(&mut self, name: &str) -> SymbolId {
        if let Some(id) = self.grammar.symbols().find(name) {
            return id;
        }
        if name.chars().next().is_some_and(|ch| ch.is_uppercase()) {
            let class = TokenClass(self.next_class);
            self.next_class += 1;
            self.grammar.intern_terminal(name, class)
        } else {
            self.grammar.intern_nonterminal(name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // E → E + T n | T ; T → a | ( E n ) | n a ; n → ε | num
    fn nullable_grammar() -> Grammar {
        let mut g = Grammar::new();
        let lparen = g.intern_terminal("(", TokenClass(0));
        let rparen = g.intern_terminal(")", TokenClass(1));
        let plus = g.intern_terminal("+", TokenClass(2));
        let a = g.intern_terminal("a", TokenClass(3));
        let num = g.intern_terminal("num", TokenClass(4));
        let expr = g.intern_nonterminal("expr");
        let term = g.intern_nonterminal("term");
        let opt = g.intern_nonterminal("opt");

        g.add_production(expr, vec![expr, plus, term, opt]);
        g.add_production(expr, vec![term]);
        g.add_production(term, vec![a]);
        g.add_production(term, vec![lparen, expr, opt, rparen]);
        g.add_production(term, vec![opt, a]);
        g.add_production(opt, vec![]);
        g.add_production(opt, vec![num]);
        g.set_start(expr);
        g
    }

    #[test]
    fn nullable_fixed_point() {
        let g = nullable_grammar();
        let opt = g.symbols().find("opt").unwrap();
        let expr = g.symbols().find("expr").unwrap();
        assert!(g.nullable(opt));
        assert!(!g.nullable(expr));
        assert!(g.nullable(SymbolId::EPSILON));
    }

    #[test]
    fn first_contains_epsilon_iff_nullable() {
        let g = nullable_grammar();
        for (id, _) in g.symbols().nonterminals() {
            assert_eq!(
                g.first(id).contains(SymbolId::EPSILON),
                g.nullable(id),
                "ε ∈ FIRST must coincide with nullability"
            );
        }
    }

    #[test]
    fn first_of_production_is_subset_of_first_of_lhs() {
        let g = nullable_grammar();
        for (_, p) in g.productions() {
            let mut rhs_first = g.first_of(p.right());
            rhs_first.remove(SymbolId::EPSILON);
            for t in rhs_first.iter() {
                assert!(g.first(p.left()).contains(t));
            }
        }
    }

    #[test]
    fn follow_of_start_contains_eoi() {
        let mut g = nullable_grammar();
        g.augment();
        let start = g.start().unwrap();
        assert!(g.follow(start).contains(SymbolId::EOI));
        // and for the original start as well, via S' → S
        let expr = g.symbols().find("expr").unwrap();
        assert!(g.follow(expr).contains(SymbolId::EOI));
    }

    #[test]
    fn follow_accounts_for_nullable_suffix() {
        let g = nullable_grammar();
        let expr = g.symbols().find("expr").unwrap();
        let rparen = g.symbols().find(")").unwrap();
        // term → ( expr opt ) with opt nullable, so `)` follows expr
        assert!(g.follow(expr).contains(rparen));
    }

    #[test]
    fn augment_is_idempotent() {
        let mut g = nullable_grammar();
        g.augment();
        let count = g.productions().count();
        let start = g.start().unwrap();
        g.augment();
        assert_eq!(g.productions().count(), count);
        assert_eq!(g.start(), Some(start));
        assert_eq!(g.symbols().get(start).name(), "expr'");
        assert_eq!(g.production(ProductionId::ACCEPT).right().len(), 1);
    }

    #[test]
    fn analysis_is_invalidated_on_mutation() {
        let mut g = Grammar::new();
        let x = g.intern_terminal("x", TokenClass(0));
        let s = g.intern_nonterminal("s");
        g.add_production(s, vec![x]);
        g.set_start(s);
        assert!(!g.nullable(s));

        g.add_production(s, vec![]);
        assert!(g.nullable(s), "the memoized sets must be recomputed");
    }

    #[test]
    fn epsilon_rhs_is_normalized() {
        let mut g = Grammar::new();
        let s = g.intern_nonterminal("s");
        let eps = g.symbols().epsilon();
        let id = g.add_production(s, vec![eps]);
        assert!(g.production(id).is_epsilon());
    }

    #[test]
    fn validate_reports_structural_errors() {
        let g = Grammar::new();
        let errors = g.validate();
        assert!(errors.contains(&GrammarError::NoStartSymbol));
        assert!(errors.contains(&GrammarError::NoProductions));

        let mut g = Grammar::new();
        let b = g.intern_terminal("b", TokenClass(0));
        let s = g.intern_nonterminal("s");
        let a = g.intern_nonterminal("A");
        g.add_production(s, vec![a, b]);
        g.set_start(s);
        let errors = g.validate();
        assert_eq!(errors, vec![GrammarError::UndefinedNonterminal("A".into())]);
        assert_eq!(errors[0].to_string(), "Undefined nonterminal: A");
    }

    #[test]
    fn builder_follows_naming_convention() {
        let mut b = GrammarBuilder::new();
        b.add_terminal("NUM", TokenClass(0));
        b.add_production("expr", &["expr", "PLUS", "term"]);
        b.add_production("expr", &["term"]);
        b.add_production("term", &["NUM"]);
        b.set_start("expr");
        let g = b.build();

        let plus = g.symbols().find("PLUS").unwrap();
        let term = g.symbols().find("term").unwrap();
        assert!(g.symbols().get(plus).is_terminal());
        assert!(g.symbols().get(term).is_nonterminal());
        assert_eq!(g.start(), g.symbols().find("expr"));
        assert!(g.validate().is_empty());
    }
}
