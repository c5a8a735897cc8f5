//! End-to-end checks over the whole table-construction pipeline, driving the
//! emitted snapshot encoding the same way a generated parser would.

use lalrgen::automaton::StateId;
use lalrgen::grammar::{Grammar, GrammarError, ProductionId};
use lalrgen::lookahead::LookaheadMode;
use lalrgen::report::ConflictKind;
use lalrgen::snapshot::TableSnapshot;
use lalrgen::symbol::TokenClass;
use lalrgen::table::Action;
use lalrgen::util::DisplayWith as _;

/// Drive the dense snapshot tables over a token stream (terminal names,
/// without `$`). Returns the production indices in reduction order when the
/// input is accepted.
fn run(grammar: &Grammar, snapshot: &TableSnapshot, input: &[&str]) -> Option<Vec<usize>> {
    let columns: Vec<usize> = input
        .iter()
        .map(|name| {
            let id = grammar.symbols().find(name).expect("unknown terminal");
            snapshot.terminals[1..]
                .iter()
                .position(|t| *t == id)
                .expect("terminal column")
        })
        .chain([snapshot.terminals.len() - 1]) // trailing $
        .collect();

    let mut reductions = Vec::new();
    let mut states = vec![0usize];
    let mut cursor = 0;
    loop {
        let action = snapshot.action[*states.last().unwrap()][columns[cursor]];
        if action > 0 {
            states.push(action as usize);
            cursor += 1;
        } else if action == 0 {
            return Some(reductions);
        } else if action == -1 {
            return None;
        } else {
            let index = (-action - 1) as usize;
            let len = snapshot.productions[index].right.len();
            states.truncate(states.len() - len);
            let column = snapshot
                .nonterminals
                .iter()
                .position(|n| *n == snapshot.productions[index].left)
                .unwrap();
            let next = snapshot.goto[*states.last().unwrap()][column];
            assert!(next >= 0, "missing goto entry");
            states.push(next as usize);
            reductions.push(index);
        }
    }
}

fn single_terminal() -> Grammar {
    let mut g = Grammar::new();
    let id = g.intern_terminal("id", TokenClass(0));
    let s = g.intern_nonterminal("S");
    g.add_production(s, vec![id]);
    g.set_start(s);
    g.augment();
    g
}

#[test]
fn single_terminal_grammar() {
    let g = single_terminal();
    let (automaton, _, table) = lalrgen::compute(&g, LookaheadMode::Follow);

    assert_eq!(automaton.states.len(), 3);
    let s = g.symbols().find("S").unwrap();
    let id = g.symbols().find("id").unwrap();
    let s0 = StateId::from_raw(0);
    let s1 = StateId::from_raw(1);
    let s2 = StateId::from_raw(2);

    assert_eq!(table.action(s0, id), Action::Shift(s2));
    assert_eq!(
        table.action(s1, g.symbols().end_of_input()),
        Action::Accept
    );
    assert_eq!(
        table.action(s2, g.symbols().end_of_input()),
        Action::Reduce(ProductionId::from_raw(1))
    );
    assert_eq!(table.goto(s0, s), Some(s1));
    assert!(!table.has_conflicts());
}

#[test]
fn simple_expression_accepts_sums() {
    // E → E + T | T ; T → num
    let mut g = Grammar::new();
    let plus = g.intern_terminal("+", TokenClass(0));
    let num = g.intern_terminal("num", TokenClass(1));
    let e = g.intern_nonterminal("E");
    let t = g.intern_nonterminal("T");
    g.add_production(e, vec![e, plus, t]);
    g.add_production(e, vec![t]);
    g.add_production(t, vec![num]);
    g.set_start(e);
    g.augment();

    let (_, _, table) = lalrgen::compute(&g, LookaheadMode::Follow);
    assert!(!table.has_conflicts());

    let snapshot = TableSnapshot::new(&g, &table);
    assert!(run(&g, &snapshot, &["num", "+", "num", "+", "num"]).is_some());
    assert!(run(&g, &snapshot, &["num", "+", "num"]).is_some());
    assert!(run(&g, &snapshot, &["num", "+"]).is_none());
    assert!(run(&g, &snapshot, &["+", "num"]).is_none());
}

#[test]
fn precedence_falls_out_of_the_grammar_shape() {
    // E → E + T | T ; T → T * F | F ; F → ( E ) | num
    let mut g = Grammar::new();
    let plus = g.intern_terminal("+", TokenClass(0));
    let star = g.intern_terminal("*", TokenClass(1));
    let lparen = g.intern_terminal("(", TokenClass(2));
    let rparen = g.intern_terminal(")", TokenClass(3));
    let num = g.intern_terminal("num", TokenClass(4));
    let e = g.intern_nonterminal("E");
    let t = g.intern_nonterminal("T");
    let f = g.intern_nonterminal("F");
    let e_plus_t = g.add_production(e, vec![e, plus, t]);
    g.add_production(e, vec![t]);
    let t_star_f = g.add_production(t, vec![t, star, f]);
    g.add_production(t, vec![f]);
    g.add_production(f, vec![lparen, e, rparen]);
    g.add_production(f, vec![num]);
    g.set_start(e);
    g.augment();
    // augmentation shifts every production index by one
    let e_plus_t = e_plus_t.index() + 1;
    let t_star_f = t_star_f.index() + 1;

    let (_, _, table) = lalrgen::compute(&g, LookaheadMode::Follow);
    assert!(!table.has_conflicts());

    let snapshot = TableSnapshot::new(&g, &table);
    let reductions = run(&g, &snapshot, &["num", "+", "num", "*", "num"]).unwrap();

    // `*` binds tighter than `+`: T * F is reduced before the enclosing
    // E + T, which is the last reduction of the parse.
    let star_at = reductions.iter().position(|&r| r == t_star_f).unwrap();
    let plus_at = reductions.iter().position(|&r| r == e_plus_t).unwrap();
    assert!(star_at < plus_at);
    assert_eq!(*reductions.last().unwrap(), e_plus_t);

    assert!(run(&g, &snapshot, &["(", "num", "+", "num", ")", "*", "num"]).is_some());
    assert!(run(&g, &snapshot, &["(", "num", ")", ")"]).is_none());
}

#[test]
fn dangling_else_has_exactly_one_shift_reduce_conflict() {
    // S → if e S | if e S else S | x
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
    g.augment();

    let (automaton, _, table) = lalrgen::compute(&g, LookaheadMode::Follow);

    assert_eq!(table.conflicts().len(), 1);
    let conflict = &table.conflicts()[0];
    assert_eq!(conflict.kind, ConflictKind::ShiftReduce);
    assert_eq!(conflict.terminal, else_t);

    // the conflicted state holds [S → if e S ·]
    let state = automaton.state(conflict.state);
    assert!(state.items.iter().any(|item| {
        item.production == ProductionId::from_raw(1) && item.is_complete(&g)
    }));

    // the explicit policy resolves the ambiguity toward shifting `else`
    assert!(matches!(
        table.action(conflict.state, else_t),
        Action::Shift(..)
    ));
}

#[test]
fn undefined_nonterminal_blocks_generation() {
    // S → A b, with A never defined
    let mut g = Grammar::new();
    let b = g.intern_terminal("b", TokenClass(0));
    let s = g.intern_nonterminal("S");
    let a = g.intern_nonterminal("A");
    g.add_production(s, vec![a, b]);
    g.set_start(s);

    let errors = g.validate();
    assert_eq!(errors, vec![GrammarError::UndefinedNonterminal("A".into())]);
    assert!(errors
        .iter()
        .any(|e| e.to_string() == "Undefined nonterminal: A"));
}

#[test]
fn reduce_reduce_conflict_is_recorded() {
    // S → A | B ; A → x ; B → x
    let mut g = Grammar::new();
    let x = g.intern_terminal("x", TokenClass(0));
    let s = g.intern_nonterminal("S");
    let a = g.intern_nonterminal("A");
    let b = g.intern_nonterminal("B");
    g.add_production(s, vec![a]);
    g.add_production(s, vec![b]);
    let a_x = g.add_production(a, vec![x]);
    g.add_production(b, vec![x]);
    g.set_start(s);
    g.augment();

    let (automaton, _, table) = lalrgen::compute(&g, LookaheadMode::Follow);

    let rr: Vec<_> = table
        .conflicts()
        .iter()
        .filter(|c| c.kind == ConflictKind::ReduceReduce)
        .collect();
    assert_eq!(rr.len(), 1);
    let conflict = rr[0];

    // the state reached from the start state by `x`, on lookahead `$`
    let from_start = automaton.transition(StateId::from_raw(0), x).unwrap();
    assert_eq!(conflict.state, from_start);
    assert_eq!(conflict.terminal, g.symbols().end_of_input());

    // the policy keeps the reduce with the smaller production index (A → x)
    assert_eq!(
        table.action(conflict.state, g.symbols().end_of_input()),
        Action::Reduce(ProductionId::from_raw(a_x.index() as u16 + 1))
    );
}

#[test]
fn empty_grammar_accepts_only_the_empty_input() {
    let mut g = Grammar::new();
    let s = g.intern_nonterminal("S");
    g.add_production(s, vec![]);
    g.set_start(s);
    g.augment();

    let (automaton, _, table) = lalrgen::compute(&g, LookaheadMode::Follow);
    assert_eq!(automaton.states.len(), 2);
    assert!(!table.has_conflicts());

    let snapshot = TableSnapshot::new(&g, &table);
    assert!(run(&g, &snapshot, &[]).is_some());
}

#[test]
fn generation_is_reproducible() {
    let build = || {
        let mut g = Grammar::new();
        let plus = g.intern_terminal("+", TokenClass(0));
        let num = g.intern_terminal("num", TokenClass(1));
        let e = g.intern_nonterminal("E");
        let t = g.intern_nonterminal("T");
        g.add_production(e, vec![e, plus, t]);
        g.add_production(e, vec![t]);
        g.add_production(t, vec![num]);
        g.set_start(e);
        g.augment();
        g
    };

    let g1 = build();
    let g2 = build();
    let (a1, s1, t1) = lalrgen::compute(&g1, LookaheadMode::Follow);
    let (a2, s2, t2) = lalrgen::compute(&g2, LookaheadMode::Follow);

    assert_eq!(
        a1.display(&g1).to_string(),
        a2.display(&g2).to_string()
    );
    assert_eq!(
        s1.iter().map(|s| s.display(&g1).to_string()).collect::<Vec<_>>(),
        s2.iter().map(|s| s.display(&g2).to_string()).collect::<Vec<_>>(),
    );
    assert_eq!(
        t1.display(&g1).to_string(),
        t2.display(&g2).to_string()
    );
    assert_eq!(t1.conflicts(), t2.conflicts());
}

#[test]
fn accept_entries_live_in_accepting_states() {
    let g = single_terminal();
    let (automaton, _, table) = lalrgen::compute(&g, LookaheadMode::Follow);
    for state in &automaton.states {
        if table.action(state.id, g.symbols().end_of_input()) == Action::Accept {
            assert!(state.is_accepting(&g));
        }
    }
}

#[test]
fn conflict_free_table_means_single_writes() {
    // With no conflicts, re-generating and replaying every action must give
    // back exactly the same entries (each written at most once).
    let mut g = Grammar::new();
    let plus = g.intern_terminal("+", TokenClass(0));
    let num = g.intern_terminal("num", TokenClass(1));
    let e = g.intern_nonterminal("E");
    let t = g.intern_nonterminal("T");
    g.add_production(e, vec![e, plus, t]);
    g.add_production(e, vec![t]);
    g.add_production(t, vec![num]);
    g.set_start(e);
    g.augment();

    let (_, _, table) = lalrgen::compute(&g, LookaheadMode::Follow);
    assert!(table.conflicts().is_empty());
}
