//! The token definition for the filter language.

/// A token is a single unit of the language, with a specific kind and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

/// The kind of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    // Keywords
    And,  // "and"
    Or,   // "or"
    Not,  // "not"
    Null, // "null"

    // Literals
    /// A field path such as `owner.name`.
    Identifier(&'a str),
    /// String content with escapes resolved, quotes stripped.
    String(String),
    Number(f64),

    // Punctuation
    LParen, // (
    RParen, // )

    // Operators
    Eq,       // == or eq
    NotEq,    // != or ne
    Match,    // ~ or match
    NotMatch, // !~ or nomatch
    Gt,       // > or gt
    Gte,      // >= or ge
    Lt,       // < or lt
    Lte,      // <= or le

    // Special
    Illegal, // An illegal/unknown character or an unterminated string
}

/// Represents a span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// The starting byte offset.
    pub start: usize,
    /// The ending byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}
