//! Rust source emission.
//!
//! [`Codegen`] serializes the table snapshot plus production metadata into a
//! single standalone parser file (token kinds, lexer, parse-tree nodes, const
//! tables, LR driver) and a small harness file. The emitted code depends only
//! on `std`.

use crate::grammar::Grammar;
use crate::snapshot::TableSnapshot;
use crate::symbol::TokenClass;
use crate::table::ParseTable;
use crate::types::Map;
use std::fmt;

/// Lexical description of one token class, supplied by the grammar reader.
#[derive(Debug, Clone)]
pub struct TokenSpec {
    pub name: String,
    pub class: TokenClass,
    /// Raw pattern text from the lexer rule, or a quoted literal.
    pub pattern: String,
    pub skip: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("unsupported lexer pattern for `{rule}`: {pattern}")]
    UnsupportedPattern { rule: String, pattern: String },
    #[error("terminal `{terminal}` has no lexer rule")]
    MissingLexerRule { terminal: String },
}

/// The pattern shapes the emitted lexer knows how to match. Anything else
/// fails generation with [`EmitError::UnsupportedPattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
enum Matcher {
    Literal(String),
    Digits,
    Ident,
    Whitespace,
}

fn classify(pattern: &str) -> Option<Matcher> {
    let pattern = pattern.trim();
    if let Some(text) = as_quoted_literal(pattern) {
        return Some(Matcher::Literal(text));
    }
    if pattern.starts_with("[0-9") {
        return Some(Matcher::Digits);
    }
    for prefix in ["[a-zA-Z", "[A-Za-z", "[_a-zA-Z", "[a-z", "[A-Z"] {
        if pattern.starts_with(prefix) {
            return Some(Matcher::Ident);
        }
    }
    if !pattern.is_empty()
        && pattern
            .chars()
            .all(|ch| matches!(ch, '[' | ']' | ' ' | '\\' | 't' | 'r' | 'n' | '+' | '*'))
    {
        return Some(Matcher::Whitespace);
    }
    None
}

fn as_quoted_literal(pattern: &str) -> Option<String> {
    let inner = pattern.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut text = String::new();
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\'' {
            // an unescaped quote means this was not a single literal
            return None;
        }
        if ch == '\\' {
            match chars.next()? {
                'n' => text.push('\n'),
                't' => text.push('\t'),
                'r' => text.push('\r'),
                other => text.push(other),
            }
        } else {
            text.push(ch);
        }
    }
    (!text.is_empty()).then_some(text)
}

/// A terminal column of the emitted ACTION table.
#[derive(Debug)]
struct Column {
    variant: String,
    display: String,
    matcher: Matcher,
}

#[derive(Debug)]
pub struct Codegen {
    snapshot: TableSnapshot,
    grammar_name: String,
    columns: Vec<Column>,
}

impl Codegen {
    pub fn new(
        grammar: &Grammar,
        table: &ParseTable,
        lexicon: &[TokenSpec],
        grammar_name: &str,
    ) -> Result<Self, EmitError> {
        let snapshot = TableSnapshot::new(grammar, table);

        let specs: Map<TokenClass, &TokenSpec> =
            lexicon.iter().map(|spec| (spec.class, spec)).collect();

        // Skip rules are honored for whitespace-shaped patterns only; the
        // built-in whitespace skip covers them. Anything richer is out of
        // reach for the emitted matcher.
        for spec in lexicon.iter().filter(|spec| spec.skip) {
            if classify(&spec.pattern) != Some(Matcher::Whitespace) {
                return Err(EmitError::UnsupportedPattern {
                    rule: spec.name.clone(),
                    pattern: spec.pattern.clone(),
                });
            }
        }

        let mut columns = Vec::new();
        let mut used = Vec::new();
        for &id in &snapshot.terminals[1..] {
            let symbol = grammar.symbols().get(id);
            let class = symbol.token_class().expect("terminal column");
            let spec = specs
                .get(&class)
                .ok_or_else(|| EmitError::MissingLexerRule {
                    terminal: symbol.name().to_owned(),
                })?;
            let matcher = classify(&spec.pattern).ok_or_else(|| EmitError::UnsupportedPattern {
                rule: spec.name.clone(),
                pattern: spec.pattern.clone(),
            })?;
            let mut variant = variant_name(&spec.name, spec.pattern.starts_with('\''));
            if variant.is_empty() || used.contains(&variant) {
                variant = format!("Tok{}", class.0);
            }
            debug_assert!(variant
                .chars()
                .next()
                .is_some_and(unicode_ident::is_xid_start));
            debug_assert!(variant.chars().skip(1).all(unicode_ident::is_xid_continue));
            // the emitted lexer has a single identifier branch and a single
            // digit branch; a second rule of either shape would be shadowed
            if matches!(matcher, Matcher::Ident | Matcher::Digits)
                && columns.iter().any(|col: &Column| col.matcher == matcher)
            {
                return Err(EmitError::UnsupportedPattern {
                    rule: spec.name.clone(),
                    pattern: spec.pattern.clone(),
                });
            }
            used.push(variant.clone());
            columns.push(Column {
                variant,
                display: symbol.name().to_owned(),
                matcher,
            });
        }

        Ok(Self {
            snapshot,
            grammar_name: grammar_name.to_owned(),
            columns,
        })
    }

    pub fn module_name(&self) -> String {
        format!("{}_parser", snake_case(&self.grammar_name))
    }

    fn literals(&self) -> Vec<(&str, &str)> {
        let mut literals: Vec<(&str, &str)> = self
            .columns
            .iter()
            .filter_map(|col| match &col.matcher {
                Matcher::Literal(text) => Some((text.as_str(), col.variant.as_str())),
                _ => None,
            })
            .collect();
        // longest first, so `<=` wins over `<`
        literals.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then(a.cmp(b)));
        literals
    }

    fn ident_column(&self) -> Option<&Column> {
        self.columns
            .iter()
            .find(|col| col.matcher == Matcher::Ident)
    }

    fn digits_column(&self) -> Option<&Column> {
        self.columns
            .iter()
            .find(|col| col.matcher == Matcher::Digits)
    }

    /// The companion file: a `main` that parses standard input and prints the
    /// tree.
    pub fn harness(&self) -> String {
        let module = self.module_name();
        format!(
            r#"//! Demo harness for the generated `{name}` parser.
//!
//! Reads source text from standard input and prints the parse tree.

mod {module};

use std::io::Read as _;

fn main() {{
    let mut input = String::new();
    if let Err(err) = std::io::stdin().read_to_string(&mut input) {{
        eprintln!("error: {{err}}");
        std::process::exit(1);
    }}
    match {module}::parse(input.trim_end()) {{
        Ok(tree) => print_node(&tree, 0),
        Err(err) => {{
            eprintln!("parse error: {{err}}");
            std::process::exit(1);
        }}
    }}
}}

fn print_node(node: &{module}::Node, depth: usize) {{
    let indent = "  ".repeat(depth);
    match node {{
        {module}::Node::Leaf(token) => println!("{{indent}}{{:?}} `{{}}`", token.kind, token.text),
        {module}::Node::Rule {{ name, children }} => {{
            println!("{{indent}}{{name}}");
            for child in children {{
                print_node(child, depth + 1);
            }}
        }}
    }}
}}
"#,
            name = self.grammar_name,
            module = module,
        )
    }
}

impl fmt::Display for Codegen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = &self.snapshot;
        let t_cols = self.columns.len() + 1;
        let n_cols = snapshot.nonterminals.len();

        writeln!(
            f,
            "//! LALR(1) parser for the `{}` grammar.\n//!\n//! Generated by lalrgen; do not edit.\n",
            self.grammar_name
        )?;
        writeln!(f, "#![allow(dead_code)]\n")?;

        // token kinds
        writeln!(
            f,
            "/// Token classes recognized by the lexer.\n#[derive(Debug, Clone, Copy, PartialEq, Eq)]\npub enum TokenKind {{"
        )?;
        for col in &self.columns {
            writeln!(f, "    {},", col.variant)?;
        }
        writeln!(f, "    Eof,\n}}\n")?;

        writeln!(
            f,
            r#"#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {{
    pub kind: TokenKind,
    pub text: String,
    pub offset: usize,
}}

#[derive(Debug)]
pub enum ParseError {{
    UnexpectedChar {{ offset: usize, found: char }},
    UnexpectedToken {{ offset: usize, found: String, expected: Vec<&'static str> }},
    UnexpectedEnd {{ expected: Vec<&'static str> }},
}}

impl std::fmt::Display for ParseError {{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {{
        match self {{
            Self::UnexpectedChar {{ offset, found }} => {{
                write!(f, "unexpected character `{{found}}` at offset {{offset}}")
            }}
            Self::UnexpectedToken {{ offset, found, expected }} => {{
                write!(f, "unexpected `{{found}}` at offset {{offset}}, expected one of {{expected:?}}")
            }}
            Self::UnexpectedEnd {{ expected }} => {{
                write!(f, "unexpected end of input, expected one of {{expected:?}}")
            }}
        }}
    }}
}}

impl std::error::Error for ParseError {{}}
"#
        )?;

        // literal table
        let literals = self.literals();
        writeln!(
            f,
            "const LITERALS: [(&str, TokenKind); {}] = [",
            literals.len()
        )?;
        for (text, variant) in &literals {
            writeln!(f, "    ({:?}, TokenKind::{}),", text, variant)?;
        }
        writeln!(f, "];\n")?;

        // lexer
        writeln!(
            f,
            r#"pub struct Lexer<'a> {{
    src: &'a str,
    pos: usize,
}}

impl<'a> Lexer<'a> {{
    pub fn new(src: &'a str) -> Self {{
        Self {{ src, pos: 0 }}
    }}

    pub fn next_token(&mut self) -> Result<Token, ParseError> {{
        while self
            .src[self.pos..]
            .chars()
            .next()
            .is_some_and(|ch| ch.is_ascii_whitespace())
        {{
            self.pos += 1;
        }}
        let offset = self.pos;
        let rest = &self.src[self.pos..];
        let Some(first) = rest.chars().next() else {{
            return Ok(Token {{
                kind: TokenKind::Eof,
                text: String::new(),
                offset,
            }});
        }};

        'literals: for (text, kind) in LITERALS.iter() {{
            if !rest.starts_with(text) {{
                continue;
            }}
            if text.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
                && rest[text.len()..]
                    .chars()
                    .next()
                    .is_some_and(|ch| ch.is_ascii_alphanumeric() || ch == '_')
            {{
                // keyword prefix of a longer identifier
                continue 'literals;
            }}
            self.pos += text.len();
            return Ok(Token {{
                kind: *kind,
                text: (*text).to_owned(),
                offset,
            }});
        }}
"#
        )?;
        if let Some(col) = self.ident_column() {
            writeln!(
                f,
                r#"        if first.is_ascii_alphabetic() || first == '_' {{
            let len = rest
                .chars()
                .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
                .count();
            let text = rest[..len].to_owned();
            self.pos += len;
            return Ok(Token {{
                kind: TokenKind::{},
                text,
                offset,
            }});
        }}
"#,
                col.variant
            )?;
        }
        if let Some(col) = self.digits_column() {
            writeln!(
                f,
                r#"        if first.is_ascii_digit() {{
            let len = rest.chars().take_while(char::is_ascii_digit).count();
            let text = rest[..len].to_owned();
            self.pos += len;
            return Ok(Token {{
                kind: TokenKind::{},
                text,
                offset,
            }});
        }}
"#,
                col.variant
            )?;
        }
        writeln!(
            f,
            "        Err(ParseError::UnexpectedChar {{ offset, found: first }})\n    }}\n}}\n"
        )?;

        // parse tree
        writeln!(
            f,
            r#"/// Parse-tree node: interior nodes carry the rule name, leaves the token.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {{
    Leaf(Token),
    Rule {{
        name: &'static str,
        children: Vec<Node>,
    }},
}}
"#
        )?;

        // tables
        writeln!(f, "pub const STATE_COUNT: usize = {};\n", snapshot.state_count)?;
        write!(f, "const TERMINAL_NAMES: [&str; {}] = [", t_cols)?;
        for col in &self.columns {
            write!(f, "{:?}, ", col.display)?;
        }
        writeln!(f, "\"$\"];\n")?;

        writeln!(
            f,
            "// shift: positive state, reduce: -(production + 1), accept: 0, error: -1"
        )?;
        writeln!(
            f,
            "const ACTION: [[i32; {}]; {}] = [",
            t_cols, snapshot.state_count
        )?;
        for row in &snapshot.action {
            write!(f, "    [")?;
            for (i, cell) in row.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{:3}", cell)?;
            }
            writeln!(f, "],")?;
        }
        writeln!(f, "];\n")?;

        writeln!(
            f,
            "const GOTO: [[i32; {}]; {}] = [",
            n_cols, snapshot.state_count
        )?;
        for row in &snapshot.goto {
            write!(f, "    [")?;
            for (i, cell) in row.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{:3}", cell)?;
            }
            writeln!(f, "],")?;
        }
        writeln!(f, "];\n")?;

        writeln!(
            f,
            "/// (goto column of the left-hand side, right-hand length, rule)"
        )?;
        writeln!(
            f,
            "const PRODUCTIONS: [(usize, usize, &str); {}] = [",
            snapshot.productions.len()
        )?;
        for meta in &snapshot.productions {
            let lhs_col = snapshot
                .nonterminals
                .iter()
                .position(|id| *id == meta.left)
                .expect("left-hand side is a known nonterminal");
            writeln!(
                f,
                "    ({}, {}, {:?}),",
                lhs_col,
                meta.right.len(),
                meta.text
            )?;
        }
        writeln!(f, "];\n")?;

        // token -> ACTION column
        writeln!(f, "fn token_column(kind: TokenKind) -> usize {{\n    match kind {{")?;
        for (i, col) in self.columns.iter().enumerate() {
            writeln!(f, "        TokenKind::{} => {},", col.variant, i)?;
        }
        writeln!(f, "        TokenKind::Eof => {},", t_cols - 1)?;
        writeln!(f, "    }}\n}}\n")?;

        // driver
        writeln!(
            f,
            r#"/// Parse `input` into a tree, or diagnose the offending token.
pub fn parse(input: &str) -> Result<Node, ParseError> {{
    let mut lexer = Lexer::new(input);
    let mut states: Vec<usize> = vec![0];
    let mut nodes: Vec<Node> = Vec::new();
    let mut token = lexer.next_token()?;

    loop {{
        let state = *states.last().expect("state stack is never empty");
        let action = ACTION[state][token_column(token.kind)];

        if action > 0 {{
            // shift
            states.push(action as usize);
            nodes.push(Node::Leaf(token));
            token = lexer.next_token()?;
        }} else if action == 0 {{
            // accept
            return Ok(nodes.pop().expect("accepting with an empty node stack"));
        }} else if action == -1 {{
            return Err(unexpected(state, token));
        }} else {{
            // reduce
            let (lhs_col, len, name) = PRODUCTIONS[(-action - 1) as usize];
            let children = nodes.split_off(nodes.len() - len);
            states.truncate(states.len() - len);
            let top = *states.last().expect("state stack is never empty");
            let next = GOTO[top][lhs_col];
            if next < 0 {{
                unreachable!("missing goto entry after reduce");
            }}
            states.push(next as usize);
            nodes.push(Node::Rule {{ name, children }});
        }}
    }}
}}

fn unexpected(state: usize, token: Token) -> ParseError {{
    let mut expected = Vec::new();
    for (column, name) in TERMINAL_NAMES.iter().enumerate() {{
        if ACTION[state][column] != -1 {{
            expected.push(*name);
        }}
    }}
    if token.kind == TokenKind::Eof {{
        ParseError::UnexpectedEnd {{ expected }}
    }} else {{
        ParseError::UnexpectedToken {{
            offset: token.offset,
            found: token.text,
            expected,
        }}
    }}
}}

#[cfg(test)]
mod tests {{
    use super::*;

    #[test]
    fn eof_on_empty_input() {{
        let mut lexer = Lexer::new("");
        let token = lexer.next_token().unwrap();
        assert_eq!(token.kind, TokenKind::Eof);
    }}

    #[test]
    fn table_dimensions() {{
        assert_eq!(ACTION.len(), STATE_COUNT);
        assert_eq!(GOTO.len(), STATE_COUNT);
    }}
}}"#
        )?;

        Ok(())
    }
}

fn variant_name(raw: &str, is_literal: bool) -> String {
    let ident_like = raw
        .chars()
        .enumerate()
        .all(|(i, ch)| if i == 0 { is_ident_start(ch) } else { is_ident_continue(ch) });
    if ident_like {
        let camel = camel_case(raw);
        return if is_literal {
            format!("Kw{}", camel)
        } else {
            camel
        };
    }

    let mut name = String::new();
    for ch in raw.chars() {
        match symbol_char_name(ch) {
            Some(part) => name.push_str(part),
            None => return String::new(),
        }
    }
    name
}

fn camel_case(raw: &str) -> String {
    let mut out = String::new();
    for segment in raw.split('_').filter(|seg| !seg.is_empty()) {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(&chars.as_str().to_lowercase());
        }
    }
    out
}

fn is_ident_start(ch: char) -> bool {
    ch == '_' || unicode_ident::is_xid_start(ch)
}

fn is_ident_continue(ch: char) -> bool {
    unicode_ident::is_xid_continue(ch)
}

fn symbol_char_name(ch: char) -> Option<&'static str> {
    Some(match ch {
        '+' => "Plus",
        '-' => "Minus",
        '*' => "Star",
        '/' => "Slash",
        '%' => "Percent",
        '(' => "LParen",
        ')' => "RParen",
        '[' => "LBracket",
        ']' => "RBracket",
        '{' => "LBrace",
        '}' => "RBrace",
        '<' => "Lt",
        '>' => "Gt",
        '=' => "Eq",
        '!' => "Bang",
        '&' => "Amp",
        '|' => "Pipe",
        '^' => "Caret",
        '~' => "Tilde",
        ',' => "Comma",
        ';' => "Semi",
        ':' => "Colon",
        '.' => "Dot",
        '?' => "Question",
        '@' => "At",
        '#' => "Hash",
        _ => return None,
    })
}

fn snake_case(raw: &str) -> String {
    let mut out = String::new();
    for (i, ch) in raw.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else if is_ident_continue(ch) {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        out.push_str("grammar");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::LR0Automaton;
    use crate::lookahead::{assign, LookaheadMode};
    use crate::symbol::TokenClass;

    fn expr_setup() -> (Grammar, Vec<TokenSpec>) {
        let mut g = Grammar::new();
        let plus = g.intern_terminal("+", TokenClass(1));
        let num = g.intern_terminal("NUM", TokenClass(0));
        let e = g.intern_nonterminal("expr");
        let t = g.intern_nonterminal("term");
        g.add_production(e, vec![e, plus, t]);
        g.add_production(e, vec![t]);
        g.add_production(t, vec![num]);
        g.set_start(e);
        g.augment();

        let lexicon = vec![
            TokenSpec {
                name: "NUM".into(),
                class: TokenClass(0),
                pattern: "[0-9]+".into(),
                skip: false,
            },
            TokenSpec {
                name: "+".into(),
                class: TokenClass(1),
                pattern: "'+'".into(),
                skip: false,
            },
        ];
        (g, lexicon)
    }

    fn generate(g: &Grammar, lexicon: &[TokenSpec]) -> String {
        let automaton = LR0Automaton::build(g);
        let states = assign(g, &automaton, LookaheadMode::Follow);
        let table = ParseTable::generate(g, &automaton, &states);
        Codegen::new(g, &table, lexicon, "Expr")
            .unwrap()
            .to_string()
    }

    #[test]
    fn emits_tables_and_driver() {
        let (g, lexicon) = expr_setup();
        let source = generate(&g, &lexicon);
        assert!(source.contains("pub enum TokenKind"));
        assert!(source.contains("Num,"));
        assert!(source.contains("Plus,"));
        assert!(source.contains("const ACTION: [[i32; 3];"));
        assert!(source.contains("pub fn parse(input: &str)"));
        assert!(source.contains("(\"+\", TokenKind::Plus)"));
    }

    #[test]
    fn harness_references_the_parser_module() {
        let (g, lexicon) = expr_setup();
        let automaton = LR0Automaton::build(&g);
        let states = assign(&g, &automaton, LookaheadMode::Follow);
        let table = ParseTable::generate(&g, &automaton, &states);
        let codegen = Codegen::new(&g, &table, &lexicon, "Expr").unwrap();
        assert_eq!(codegen.module_name(), "expr_parser");
        assert!(codegen.harness().contains("mod expr_parser;"));
    }

    #[test]
    fn unsupported_pattern_is_an_error() {
        let (g, mut lexicon) = expr_setup();
        lexicon[0].pattern = "~[\\n]*".into();
        let automaton = LR0Automaton::build(&g);
        let states = assign(&g, &automaton, LookaheadMode::Follow);
        let table = ParseTable::generate(&g, &automaton, &states);
        let err = Codegen::new(&g, &table, &lexicon, "Expr").unwrap_err();
        assert!(matches!(err, EmitError::UnsupportedPattern { .. }));
    }

    #[test]
    fn variant_names() {
        assert_eq!(variant_name("NUM", false), "Num");
        assert_eq!(variant_name("WHILE_KW", false), "WhileKw");
        assert_eq!(variant_name("if", true), "KwIf");
        assert_eq!(variant_name("<=", true), "LtEq");
        assert_eq!(variant_name("(", true), "LParen");
        assert_eq!(variant_name("€", true), "");
    }

    #[test]
    fn pattern_classification() {
        assert_eq!(classify("'+'"), Some(Matcher::Literal("+".into())));
        assert_eq!(classify("[0-9]+"), Some(Matcher::Digits));
        assert_eq!(
            classify("[a-zA-Z_][a-zA-Z0-9_]*"),
            Some(Matcher::Ident)
        );
        assert_eq!(classify("[ \\t\\r\\n]+"), Some(Matcher::Whitespace));
        assert_eq!(classify("'a' | 'b'"), None);
        assert_eq!(classify("~[\\n]*"), None);
    }
}
