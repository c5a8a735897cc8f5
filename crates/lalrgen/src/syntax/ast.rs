//! Surface representation of a parsed `.g4` file.

/// One element of a production alternative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// A rule reference: uppercase-initial names are token references,
    /// everything else refers to a parser rule.
    Ident(String),
    /// An inline quoted literal, unescaped.
    Literal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserRule {
    pub name: String,
    /// The `|`-separated alternatives; an empty alternative is the epsilon
    /// production.
    pub alternatives: Vec<Vec<Element>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerRule {
    pub name: String,
    /// Raw pattern text between `:` and `;`, with any `-> skip` suffix
    /// stripped.
    pub pattern: String,
    pub skip: bool,
    pub fragment: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct G4Grammar {
    pub name: String,
    pub parser_rules: Vec<ParserRule>,
    pub lexer_rules: Vec<LexerRule>,
}

impl G4Grammar {
    /// The nominated start symbol: the first parser rule.
    pub fn start_rule(&self) -> Option<&ParserRule> {
        self.parser_rules.first()
    }
}
