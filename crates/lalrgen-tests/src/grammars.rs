//! Grammar definitions for integration tests.

use lalrgen::grammar::Grammar;
use lalrgen::symbol::TokenClass;

/// `S → id`
pub fn g_single() -> Grammar {
    let mut g = Grammar::new();
    let id = g.intern_terminal("id", TokenClass(0));
    let s = g.intern_nonterminal("S");
    g.add_production(s, vec![id]);
    g.set_start(s);
    g
}

/// `E → E + T | T ; T → num`
pub fn g_left_recursive() -> Grammar {
    let mut g = Grammar::new();
    let plus = g.intern_terminal("+", TokenClass(0));
    let num = g.intern_terminal("num", TokenClass(1));
    let e = g.intern_nonterminal("E");
    let t = g.intern_nonterminal("T");
    g.add_production(e, vec![e, plus, t]);
    g.add_production(e, vec![t]);
    g.add_production(t, vec![num]);
    g.set_start(e);
    g
}

/// `E → E + T | T ; T → T * F | F ; F → ( E ) | num`
pub fn g_arithmetic() -> Grammar {
    let mut g = Grammar::new();
    let plus = g.intern_terminal("+", TokenClass(0));
    let star = g.intern_terminal("*", TokenClass(1));
    let lparen = g.intern_terminal("(", TokenClass(2));
    let rparen = g.intern_terminal(")", TokenClass(3));
    let num = g.intern_terminal("num", TokenClass(4));
    let e = g.intern_nonterminal("E");
    let t = g.intern_nonterminal("T");
    let f = g.intern_nonterminal("F");
    g.add_production(e, vec![e, plus, t]);
    g.add_production(e, vec![t]);
    g.add_production(t, vec![t, star, f]);
    g.add_production(t, vec![f]);
    g.add_production(f, vec![lparen, e, rparen]);
    g.add_production(f, vec![num]);
    g.set_start(e);
    g
}

/// `S → if e S | if e S else S | x`
pub fn g_dangling_else() -> Grammar {
    let mut g = Grammar::new();
    let if_t = g.intern_terminal("if", TokenClass(0));
    let e = g.intern_terminal("e", TokenClass(1));
    let else_t = g.intern_terminal("else", TokenClass(2));
    let x = g.intern_terminal("x", TokenClass(3));
    let s = g.intern_nonterminal("S");
    g.add_production(s, vec![if_t, e, s]);
    g.add_production(s, vec![if_t, e, s, else_t, s]);
    g.add_production(s, vec![x]);
    g.set_start(s);
    g
}

/// `S → A | B ; A → x ; B → x`
pub fn g_reduce_reduce() -> Grammar {
    let mut g = Grammar::new();
    let x = g.intern_terminal("x", TokenClass(0));
    let s = g.intern_nonterminal("S");
    let a = g.intern_nonterminal("A");
    let b = g.intern_nonterminal("B");
    g.add_production(s, vec![a]);
    g.add_production(s, vec![b]);
    g.add_production(a, vec![x]);
    g.add_production(b, vec![x]);
    g.set_start(s);
    g
}

/// `S → ε`
pub fn g_empty() -> Grammar {
    let mut g = Grammar::new();
    let s = g.intern_nonterminal("S");
    g.add_production(s, vec![]);
    g.set_start(s);
    g
}
