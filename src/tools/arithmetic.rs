//! Restricted arithmetic: tokenizer plus recursive-descent evaluator.
//!
//! Grammar:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/') unary)*
//! unary  := '-' unary | '+' unary | atom
//! atom   := NUMBER | '(' expr ')'
//! ```
//!
//! Input is rejected before tokenizing if it holds any character outside
//! `0-9 + - * / ( ) .` and space, so nothing but this grammar can run.

use thiserror::Error;

/// Characters accepted by [`evaluate`].
pub const ALLOWED_CHARS: &str = "0123456789+-*/(). ";

/// Nesting bound for parentheses and unary chains.
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArithmeticError {
    #[error("expression is empty")]
    Empty,

    #[error("invalid character '{ch}' at position {pos}")]
    ForbiddenCharacter { ch: char, pos: usize },

    #[error("malformed number '{0}'")]
    InvalidNumber(String),

    #[error("unexpected {found} at position {pos}")]
    UnexpectedToken { found: TokenKind, pos: usize },

    #[error("expression nests too deeply")]
    TooDeep,

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    NonFinite,
}

/// A token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Zero-based character offset into the expression.
    pub pos: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    OpenParen,
    CloseParen,
    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "number {n}"),
            Self::Plus => write!(f, "'+'"),
            Self::Minus => write!(f, "'-'"),
            Self::Star => write!(f, "'*'"),
            Self::Slash => write!(f, "'/'"),
            Self::OpenParen => write!(f, "'('"),
            Self::CloseParen => write!(f, "')'"),
            Self::Eof => write!(f, "end of input"),
        }
    }
}

/// Reject any character outside [`ALLOWED_CHARS`].
pub fn check_charset(expression: &str) -> Result<(), ArithmeticError> {
    match expression
        .chars()
        .enumerate()
        .find(|(_, ch)| !ALLOWED_CHARS.contains(*ch))
    {
        Some((pos, ch)) => Err(ArithmeticError::ForbiddenCharacter { ch, pos }),
        None => Ok(()),
    }
}

pub fn tokenize(expression: &str) -> Result<Vec<Token>, ArithmeticError> {
    check_charset(expression)?;

    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let ch = chars[pos];
        let kind = match ch {
            ' ' => {
                pos += 1;
                continue;
            }
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '(' => TokenKind::OpenParen,
            ')' => TokenKind::CloseParen,
            _ => {
                let start = pos;
                while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == '.') {
                    pos += 1;
                }
                let text: String = chars[start..pos].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| ArithmeticError::InvalidNumber(text.clone()))?;
                tokens.push(Token {
                    kind: TokenKind::Number(value),
                    pos: start,
                });
                continue;
            }
        };
        tokens.push(Token { kind, pos });
        pos += 1;
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        pos: chars.len(),
    });
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // tokenize always terminates the stream with Eof
        &self.tokens[self.cursor.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.cursor < self.tokens.len() - 1 {
            self.cursor += 1;
        }
        token
    }

    fn unexpected(token: &Token) -> ArithmeticError {
        ArithmeticError::UnexpectedToken {
            found: token.kind,
            pos: token.pos,
        }
    }

    fn enter(&mut self) -> Result<(), ArithmeticError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ArithmeticError::TooDeep);
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<f64, ArithmeticError> {
        let mut value = self.term()?;
        loop {
            match self.peek().kind {
                TokenKind::Plus => {
                    self.advance();
                    value += self.term()?;
                }
                TokenKind::Minus => {
                    self.advance();
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<f64, ArithmeticError> {
        let mut value = self.unary()?;
        loop {
            match self.peek().kind {
                TokenKind::Star => {
                    self.advance();
                    value *= self.unary()?;
                }
                TokenKind::Slash => {
                    self.advance();
                    let divisor = self.unary()?;
                    if divisor == 0.0 {
                        return Err(ArithmeticError::DivisionByZero);
                    }
                    value /= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    fn unary(&mut self) -> Result<f64, ArithmeticError> {
        match self.peek().kind {
            TokenKind::Minus => {
                self.advance();
                self.enter()?;
                let value = -self.unary()?;
                self.depth -= 1;
                Ok(value)
            }
            TokenKind::Plus => {
                self.advance();
                self.enter()?;
                let value = self.unary()?;
                self.depth -= 1;
                Ok(value)
            }
            _ => self.atom(),
        }
    }

    fn atom(&mut self) -> Result<f64, ArithmeticError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number(value) => Ok(value),
            TokenKind::OpenParen => {
                self.enter()?;
                let value = self.expr()?;
                self.depth -= 1;
                let close = self.advance();
                if close.kind == TokenKind::CloseParen {
                    Ok(value)
                } else {
                    Err(Self::unexpected(&close))
                }
            }
            _ => Err(Self::unexpected(&token)),
        }
    }
}

/// Evaluate a restricted arithmetic expression.
pub fn evaluate(expression: &str) -> Result<f64, ArithmeticError> {
    if expression.trim().is_empty() {
        return Err(ArithmeticError::Empty);
    }

    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens,
        cursor: 0,
        depth: 0,
    };
    let value = parser.expr()?;

    let trailing = parser.peek();
    if trailing.kind != TokenKind::Eof {
        return Err(Parser::unexpected(trailing));
    }
    if !value.is_finite() {
        return Err(ArithmeticError::NonFinite);
    }
    // Normalise -0 so "-0" never leaks into replies.
    Ok(if value == 0.0 { 0.0 } else { value })
}
