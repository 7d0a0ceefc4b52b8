use tracing::debug;

use crate::ast::*;
use crate::lexer::{Lexer, Location, Token, TokenKind};

/// Operators that may follow a complete top-level binary pair.
const CONTINUATION_OR_END: &[TokenKind] = &[
    TokenKind::Plus,
    TokenKind::Minus,
    TokenKind::Star,
    TokenKind::Slash,
    TokenKind::Percent,
    TokenKind::Caret,
    TokenKind::End,
];

/// Operators that may follow a top-level term that did not combine with `+`/`-`.
const CONTINUATION: &[TokenKind] = &[
    TokenKind::Plus,
    TokenKind::Minus,
    TokenKind::Star,
    TokenKind::Slash,
    TokenKind::Percent,
    TokenKind::Caret,
];

const FACTOR_START: &[TokenKind] = &[TokenKind::Number, TokenKind::Identifier, TokenKind::LParen];

/// Nesting budget shared by `(` groups and call argument lists.
pub const MAX_NESTING: usize = 256;

/// Budget spent by one group level.
pub const GROUP_COST: usize = 1;

/// Budget spent by one call level. A call recurses through more parser and
/// compiler frames than a group, so it weighs twice as much; either way the
/// deepest accepted input fits a 2 MiB thread stack.
pub const CALL_COST: usize = 2;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("{}", render_message(.found, .expected))]
    Unexpected { found: Token, expected: Vec<TokenKind> },
    #[error("expression nests deeper than {limit} levels at {}", .found.location)]
    TooDeep { found: Token, limit: usize },
}

impl ParseError {
    pub fn code(&self) -> &'static str {
        match self {
            ParseError::Unexpected { .. } => "CALC-P001",
            ParseError::TooDeep { .. } => "CALC-P002",
        }
    }

    /// The token the parser stopped at.
    pub fn found(&self) -> &Token {
        match self {
            ParseError::Unexpected { found, .. } | ParseError::TooDeep { found, .. } => found,
        }
    }

    pub fn expected(&self) -> &[TokenKind] {
        match self {
            ParseError::Unexpected { expected, .. } => expected.as_slice(),
            ParseError::TooDeep { .. } => &[],
        }
    }

    pub fn location(&self) -> Location {
        self.found().location
    }

    pub fn span(&self) -> Span {
        self.found().span
    }
}

fn render_message(found: &Token, expected: &[TokenKind]) -> String {
    let names: Vec<&str> = expected.iter().map(|k| k.describe()).collect();
    match names.as_slice() {
        [single] => format!(
            "invalid '{found}' token, was expecting a '{single}' token at {}",
            found.location
        ),
        _ => format!(
            "invalid '{found}' token, was expecting any of [{}] at {}",
            names.join(", "),
            found.location
        ),
    }
}

type Result<T> = std::result::Result<T, ParseError>;

/// Two-tier recursive-descent parser:
///
/// ```text
/// expression := term (("+" | "-") term)?
/// term       := factor (("*" | "/" | "%" | "^") factor)?
/// factor     := number | identifier | identifier "(" args ")" | "(" expression ")"
/// ```
///
/// Each tier combines at most one operator per call. Longer chains at the
/// same tier need parentheses: `1+2+3` parses as `1+2` and leaves `3`
/// unread.
///
/// Groups and argument lists together may spend at most [`MAX_NESTING`]:
/// [`GROUP_COST`] per group, [`CALL_COST`] per call.
pub struct Parser<'src> {
    lexer: Lexer<'src>,
    depth: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        Parser { lexer: Lexer::new(source), depth: 0 }
    }

    pub fn parse(mut self) -> Result<Expr> {
        let expr = self.parse_expr(false)?;
        debug!(source = self.lexer.source(), "parsed expression");
        Ok(expr)
    }

    /// Pull the next token and check it against `expected`.
    fn expect(&mut self, expected: &[TokenKind]) -> Result<Token> {
        let token = self.lexer.next();
        if expected.contains(&token.kind) {
            Ok(token)
        } else {
            Err(ParseError::Unexpected { found: token, expected: expected.to_vec() })
        }
    }

    /// Enter one more level of `(` nesting, opened by `open`.
    fn descend(&mut self, open: &Token, cost: usize) -> Result<()> {
        if self.depth + cost > MAX_NESTING {
            return Err(ParseError::TooDeep { found: open.clone(), limit: MAX_NESTING });
        }
        self.depth += cost;
        Ok(())
    }

    /// `inline` is set inside parentheses and argument lists, where the
    /// expression may be closed directly by `)` or `,`.
    fn parse_expr(&mut self, inline: bool) -> Result<Expr> {
        let left = self.parse_term()?;

        let op = match self.lexer.next().kind {
            TokenKind::End => return Ok(left),
            TokenKind::Plus => BinOp::Add,
            TokenKind::Minus => BinOp::Sub,
            _ => {
                self.lexer.prev();
                if !inline {
                    // The continuation token is consumed but not folded in.
                    self.expect(CONTINUATION)?;
                }
                return Ok(left);
            }
        };

        let right = self.parse_term()?;
        if !inline {
            self.expect(CONTINUATION_OR_END)?;
        }
        Ok(Expr::binary(op, left, right))
    }

    fn parse_term(&mut self) -> Result<Expr> {
        let left = self.parse_factor()?;

        let op = match self.lexer.next().kind {
            TokenKind::End => return Ok(left),
            TokenKind::Star => BinOp::Mul,
            TokenKind::Slash => BinOp::Div,
            TokenKind::Percent => BinOp::Mod,
            TokenKind::Caret => BinOp::Pow,
            _ => {
                self.lexer.prev();
                return Ok(left);
            }
        };

        let right = self.parse_factor()?;
        Ok(Expr::binary(op, left, right))
    }

    fn parse_factor(&mut self) -> Result<Expr> {
        let token = self.expect(FACTOR_START)?;

        match token.kind {
            TokenKind::Number => {
                let value = token
                    .literal
                    .parse::<f64>()
                    .map_err(|_| ParseError::Unexpected { found: token.clone(), expected: FACTOR_START.to_vec() })?;
                Ok(Expr::FloatLiteral(value))
            }
            TokenKind::Identifier => {
                if self.lexer.next().is(TokenKind::LParen) {
                    self.parse_call(token.literal)
                } else {
                    self.lexer.prev();
                    Ok(Expr::NamedConstant(token.literal))
                }
            }
            _ => {
                self.descend(&token, GROUP_COST)?;
                let inner = self.parse_expr(true)?;
                self.expect(&[TokenKind::RParen])?;
                self.depth -= GROUP_COST;
                Ok(Expr::group(inner))
            }
        }
    }

    /// Called with the opening `(` already consumed.
    fn parse_call(&mut self, name: String) -> Result<Expr> {
        let open = self.lexer.current().clone();
        self.descend(&open, CALL_COST)?;

        let args = if self.lexer.next().is(TokenKind::RParen) {
            Vec::new()
        } else {
            self.lexer.prev();
            let args = self.parse_args()?;
            self.expect(&[TokenKind::RParen])?;
            args
        };
        self.depth -= CALL_COST;
        Ok(Expr::call(name, args))
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        loop {
            args.push(self.parse_expr(true)?);
            if !self.lexer.next().is(TokenKind::Comma) {
                self.lexer.prev();
                return Ok(args);
            }
        }
    }
}

pub fn parse(source: &str) -> Result<Expr> {
    Parser::new(source).parse()
}
