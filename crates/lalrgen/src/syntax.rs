//! Reader for ANTLR4-flavored `.g4` grammar files.
//!
//! The reader accepts grammar declarations, parser rules (lowercase-initial)
//! as bare alternations of symbol sequences, and lexer rules
//! (uppercase-initial) whose pattern text is carried through verbatim for the
//! code emitter. EBNF operators (`*`, `+`, `?`, groupings) are not desugared;
//! a rule using them is rejected with an error naming the rule.

pub mod ast;
pub mod lexer;

use self::ast::{Element, G4Grammar, LexerRule, ParserRule};
use self::lexer::Tok;
use crate::codegen::TokenSpec;
use crate::grammar::{Grammar, GrammarBuilder};
use crate::symbol::TokenClass;
use crate::types::Map;
use logos::Logos;
use std::fmt::Write as _;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReaderError {
    #[error("unrecognized input at offset {offset}")]
    Lex { offset: usize },
    #[error("missing `grammar <Name>;` declaration")]
    MissingGrammarDecl,
    #[error("unexpected `{found}` at offset {offset}, expected {expected}")]
    Unexpected {
        found: String,
        expected: &'static str,
        offset: usize,
    },
    #[error("unexpected end of file in rule `{rule}`")]
    UnterminatedRule { rule: String },
    #[error(
        "rule `{rule}` uses the EBNF operator `{operator}`; \
         only alternation of symbol sequences is supported"
    )]
    UnsupportedEbnf { rule: String, operator: String },
    #[error("lexer rule `{rule}` has an empty pattern")]
    EmptyPattern { rule: String },
}

/// Parse `.g4` source text into its surface representation.
pub fn parse(source: &str) -> Result<G4Grammar, ReaderError> {
    let mut tokens = Vec::new();
    let mut lex = Tok::lexer(source);
    while let Some(result) = lex.next() {
        let token = result.map_err(|_| ReaderError::Lex {
            offset: lex.span().start,
        })?;
        tokens.push((token, lex.span()));
    }

    Reader {
        source,
        tokens,
        pos: 0,
    }
    .grammar()
}

struct Reader<'src> {
    source: &'src str,
    tokens: Vec<(Tok<'src>, Range<usize>)>,
    pos: usize,
}

impl<'src> Reader<'src> {
    fn peek(&self) -> Option<&Tok<'src>> {
        self.tokens.get(self.pos).map(|(tok, _)| tok)
    }

    fn bump(&mut self) -> Option<(Tok<'src>, Range<usize>)> {
        let entry = self.tokens.get(self.pos).cloned();
        if entry.is_some() {
            self.pos += 1;
        }
        entry
    }

    fn eat(&mut self, expected: &Tok<'src>) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &'static str) -> ReaderError {
        match self.tokens.get(self.pos) {
            Some((tok, span)) => ReaderError::Unexpected {
                found: self.source[span.clone()].to_owned(),
                expected,
                offset: span.start,
            },
            None => ReaderError::Unexpected {
                found: "<eof>".to_owned(),
                expected,
                offset: self.source.len(),
            },
        }
    }

    fn expect_ident(&mut self, expected: &'static str) -> Result<String, ReaderError> {
        match self.peek() {
            Some(Tok::Ident(name)) => {
                let name = (*name).to_owned();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn grammar(mut self) -> Result<G4Grammar, ReaderError> {
        if !self.eat(&Tok::Grammar) {
            return Err(ReaderError::MissingGrammarDecl);
        }
        let name = self.expect_ident("the grammar name")?;
        if !self.eat(&Tok::Semi) {
            return Err(self.unexpected("`;` after the grammar name"));
        }

        let mut parser_rules = Vec::new();
        let mut lexer_rules = Vec::new();
        while self.peek().is_some() {
            let fragment = self.eat(&Tok::Fragment);
            let rule_name = self.expect_ident("a rule name")?;
            if !self.eat(&Tok::Colon) {
                return Err(self.unexpected("`:` after the rule name"));
            }
            if fragment || is_token_name(&rule_name) {
                lexer_rules.push(self.lexer_rule(rule_name, fragment)?);
            } else {
                parser_rules.push(self.parser_rule(rule_name)?);
            }
        }

        tracing::debug!(
            grammar = name,
            parser_rules = parser_rules.len(),
            lexer_rules = lexer_rules.len(),
            "grammar file read"
        );
        Ok(G4Grammar {
            name,
            parser_rules,
            lexer_rules,
        })
    }

    /// The pattern is kept as raw source text between `:` and `;`, minus a
    /// trailing `-> skip` channel directive.
    fn lexer_rule(&mut self, name: String, fragment: bool) -> Result<LexerRule, ReaderError> {
        let mut pattern_span: Option<Range<usize>> = None;
        let mut skip = false;
        let mut directive_seen = false;
        loop {
            let Some((token, span)) = self.bump() else {
                return Err(ReaderError::UnterminatedRule { rule: name });
            };
            match token {
                Tok::Semi => break,
                Tok::Arrow => {
                    let directive = self.expect_ident("a channel directive after `->`")?;
                    skip = directive == "skip";
                    directive_seen = true;
                }
                _ if directive_seen => {}
                _ => {
                    pattern_span = Some(match pattern_span {
                        Some(range) => range.start..span.end,
                        None => span,
                    });
                }
            }
        }

        let pattern = pattern_span
            .map(|range| self.source[range].trim().to_owned())
            .filter(|pattern| !pattern.is_empty())
            .ok_or(ReaderError::EmptyPattern { rule: name.clone() })?;

        Ok(LexerRule {
            name,
            pattern,
            skip,
            fragment,
        })
    }

    fn parser_rule(&mut self, name: String) -> Result<ParserRule, ReaderError> {
        let mut alternatives = Vec::new();
        let mut current: Vec<Element> = Vec::new();
        loop {
            let Some((token, _span)) = self.bump() else {
                return Err(ReaderError::UnterminatedRule { rule: name });
            };
            match token {
                Tok::Semi => {
                    alternatives.push(current);
                    break;
                }
                Tok::Pipe => {
                    alternatives.push(std::mem::take(&mut current));
                }
                Tok::Ident("EOF") => {} // implicit end-of-input marker
                Tok::Ident(ident) => current.push(Element::Ident(ident.to_owned())),
                Tok::Literal(raw) => current.push(Element::Literal(unquote(raw))),
                Tok::Star | Tok::Plus | Tok::Question | Tok::LParen | Tok::RParen => {
                    return Err(ReaderError::UnsupportedEbnf {
                        rule: name,
                        operator: render_operator(&token),
                    });
                }
                other => {
                    return Err(ReaderError::UnsupportedEbnf {
                        rule: name,
                        operator: render_operator(&other),
                    });
                }
            }
        }

        Ok(ParserRule { name, alternatives })
    }
}

/// Uppercase-initial names are token (lexer) rules by ANTLR convention.
fn is_token_name(name: &str) -> bool {
    name.chars().next().is_some_and(|ch| ch.is_uppercase())
}

fn render_operator(token: &Tok<'_>) -> String {
    match token {
        Tok::Star => "*".into(),
        Tok::Plus => "+".into(),
        Tok::Question => "?".into(),
        Tok::LParen => "(".into(),
        Tok::RParen => ")".into(),
        Tok::Tilde => "~".into(),
        Tok::Range => "..".into(),
        Tok::Dot => ".".into(),
        Tok::CharClass(text) => (*text).into(),
        other => format!("{:?}", other),
    }
}

fn unquote(raw: &str) -> String {
    let inner = raw
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
        .unwrap_or(raw);
    let mut text = String::new();
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => text.push('\n'),
                Some('t') => text.push('\t'),
                Some('r') => text.push('\r'),
                Some(other) => text.push(other),
                None => break,
            }
        } else {
            text.push(ch);
        }
    }
    text
}

fn quote(text: &str) -> String {
    let mut out = String::new();
    for ch in text.chars() {
        match ch {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

/// Lower the surface grammar into the core representation plus the lexical
/// description consumed by the code emitter.
///
/// Token classes are assigned in appearance order: named lexer rules first,
/// then inline literals. Fragment rules define no token class; skip rules
/// get a class (the emitter needs their pattern) but no terminal symbol.
pub fn to_grammar(g4: &G4Grammar) -> (Grammar, Vec<TokenSpec>) {
    let mut builder = GrammarBuilder::new();
    let mut lexicon = Vec::new();
    let mut next_class = 0u16;

    for rule in &g4.lexer_rules {
        if rule.fragment {
            continue;
        }
        let class = TokenClass(next_class);
        next_class += 1;
        lexicon.push(TokenSpec {
            name: rule.name.clone(),
            class,
            pattern: rule.pattern.clone(),
            skip: rule.skip,
        });
        if !rule.skip {
            builder.add_terminal(&rule.name, class);
        }
    }

    let mut literal_classes: Map<&str, TokenClass> = Map::default();
    for rule in &g4.parser_rules {
        for alternative in &rule.alternatives {
            for element in alternative {
                let Element::Literal(text) = element else {
                    continue;
                };
                if literal_classes.contains_key(text.as_str()) {
                    continue;
                }
                let class = TokenClass(next_class);
                next_class += 1;
                literal_classes.insert(text, class);
                lexicon.push(TokenSpec {
                    name: text.clone(),
                    class,
                    pattern: format!("'{}'", quote(text)),
                    skip: false,
                });
                builder.add_terminal(text, class);
            }
        }
    }

    for rule in &g4.parser_rules {
        for alternative in &rule.alternatives {
            let right: Vec<&str> = alternative
                .iter()
                .map(|element| match element {
                    Element::Ident(name) => name.as_str(),
                    Element::Literal(text) => text.as_str(),
                })
                .collect();
            builder.add_production(&rule.name, &right);
        }
    }

    if let Some(start) = g4.start_rule() {
        builder.set_start(&start.name);
    }

    (builder.build(), lexicon)
}

/// Render the parser rules in plain BNF.
pub fn to_bnf(g4: &G4Grammar) -> String {
    let mut out = String::new();
    for rule in &g4.parser_rules {
        let _ = write!(out, "{} ::=", rule.name);
        for (i, alternative) in rule.alternatives.iter().enumerate() {
            if i > 0 {
                let _ = write!(out, "\n{:width$}|", "", width = rule.name.len() + 4);
            }
            if alternative.is_empty() {
                let _ = write!(out, " ε");
            }
            for element in alternative {
                match element {
                    Element::Ident(name) => {
                        let _ = write!(out, " {}", name);
                    }
                    Element::Literal(text) => {
                        let _ = write!(out, " '{}'", quote(text));
                    }
                }
            }
        }
        out.push_str(" ;\n");
    }
    out
}
