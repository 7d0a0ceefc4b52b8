use std::fmt;

use logos::Logos;

use crate::ast::{SourceMap, Span};

/// Token kinds produced by `logos`. `End` and `Illegal` are never matched by
/// the derived lexer itself; [`Lexer`] produces them when input runs out or
/// a character matches nothing.
///
/// Only space, tab, CR and LF separate tokens. Any other control character,
/// form feed included, is `Illegal`.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n]+")]
pub enum TokenKind {
    End,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("/")]
    Slash,
    #[token("*")]
    Star,
    #[token("%")]
    Percent,
    #[token("^")]
    Caret,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,

    // A '-' directly followed by a digit belongs to the literal, so `3-5`
    // lexes as `3` `-5` while `3 - 5` lexes as `3` `-` `5`.
    #[regex(r"-?[0-9]+(\.[0-9]*)?")]
    Number,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,

    Illegal,
}

impl TokenKind {
    /// Short name used in "was expecting" messages.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::End => "EOF",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Slash => "/",
            TokenKind::Star => "*",
            TokenKind::Percent => "%",
            TokenKind::Caret => "^",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::Comma => ",",
            TokenKind::Number => "Number",
            TokenKind::Identifier => "Identifier",
            TokenKind::Illegal => "Illegal",
        }
    }

    fn carries_literal(self) -> bool {
        matches!(self, TokenKind::Number | TokenKind::Identifier | TokenKind::Illegal)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// 1-based position of a token's first character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub line: usize,
    pub col: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
    pub location: Location,
    pub span: Span,
}

impl Token {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.carries_literal() {
            write!(f, "{}({})", self.kind, self.literal)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

/// On-demand tokenizer with a single step of pushback.
///
/// Only the most recently returned token is retained. [`Lexer::prev`] rewinds
/// by that token's literal length, so it may be called at most once between
/// two calls to [`Lexer::next`].
pub struct Lexer<'src> {
    source: &'src str,
    offset: usize,
    current: Token,
    map: SourceMap<'src>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Lexer {
            source,
            offset: 0,
            current: Token {
                kind: TokenKind::End,
                literal: String::new(),
                location: Location { line: 1, col: 1 },
                span: Span::UNKNOWN,
            },
            map: SourceMap::new(source),
        }
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    /// Return the next token and advance past it. Past the end of input this
    /// keeps returning `End`.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Token {
        let rest = self.source.get(self.offset..).unwrap_or("");
        let mut inner = TokenKind::lexer(rest);

        let (kind, span) = match inner.next() {
            None => {
                self.offset = self.source.len();
                (TokenKind::End, Span::new(self.offset, self.offset))
            }
            Some(result) => {
                let local = inner.span();
                let span = Span::new(self.offset + local.start, self.offset + local.end);
                self.offset = span.end;
                (result.unwrap_or(TokenKind::Illegal), span)
            }
        };

        let literal = self.source.get(span.start..span.end).unwrap_or("").to_string();
        let (line, col) = self.map.lookup(span.start);
        self.current = Token { kind, literal, location: Location { line, col }, span };
        self.current.clone()
    }

    /// The token most recently returned by [`Lexer::next`].
    pub fn current(&self) -> &Token {
        &self.current
    }

    /// Step back over the token most recently returned by [`Lexer::next`].
    pub fn prev(&mut self) {
        self.offset = self.offset.saturating_sub(self.current.literal.len());
    }
}

/// Lex the whole input, including the trailing `End` token.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next();
        let done = token.is(TokenKind::End);
        tokens.push(token);
        if done {
            break;
        }
    }
    tokens
}
