//! Restricted arithmetic evaluator for the calculator app
//!
//! Only numeric literals, `+ - * /` and parentheses are accepted. Input is
//! tokenized, parsed by recursive descent into an [`Expr`] tree, then
//! evaluated. Nothing else is ever interpreted.
//!
//! Grammar:
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := ('+' | '-') factor | number | '(' expr ')'
//! ```

use thiserror::Error;

/// Longest accepted expression, in bytes
pub const MAX_EXPRESSION_LEN: usize = 256;

/// Deepest accepted nesting of parentheses and unary signs
pub const MAX_DEPTH: usize = 64;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalcError {
    #[error("empty expression")]
    Empty,
    #[error("expression longer than {} bytes", MAX_EXPRESSION_LEN)]
    TooLong,
    #[error("unexpected character '{ch}' at {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("unexpected {found} at {pos}")]
    UnexpectedToken { found: String, pos: usize },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("missing ')' for '(' at {0}")]
    UnclosedParen(usize),
    #[error("nesting deeper than {}", MAX_DEPTH)]
    TooDeep,
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is not a finite number")]
    NonFinite,
}

/// Parsed expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Paren(Box<Expr>),
}

impl Expr {
    pub fn eval(&self) -> Result<f64, CalcError> {
        let value = match self {
            Expr::Number(n) => *n,
            Expr::Neg(inner) => -inner.eval()?,
            Expr::Add(lhs, rhs) => lhs.eval()? + rhs.eval()?,
            Expr::Sub(lhs, rhs) => lhs.eval()? - rhs.eval()?,
            Expr::Mul(lhs, rhs) => lhs.eval()? * rhs.eval()?,
            Expr::Div(lhs, rhs) => {
                let divisor = rhs.eval()?;
                if divisor == 0.0 {
                    return Err(CalcError::DivisionByZero);
                }
                lhs.eval()? / divisor
            }
            Expr::Paren(inner) => inner.eval()?,
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(CalcError::NonFinite)
        }
    }
}

/// Parse and evaluate `input`
pub fn evaluate(input: &str) -> Result<f64, CalcError> {
    parse(input)?.eval()
}

pub fn parse(input: &str) -> Result<Expr, CalcError> {
    if input.len() > MAX_EXPRESSION_LEN {
        return Err(CalcError::TooLong);
    }
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(CalcError::Empty);
    }
    let mut parser = Parser { tokens, pos: 0, depth: 0 };
    let expr = parser.expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(token.unexpected()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TokenKind {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: TokenKind,
    pos: usize,
}

impl Token {
    fn unexpected(&self) -> CalcError {
        let found = match self.kind {
            TokenKind::Number(n) => format!("number {n}"),
            TokenKind::Plus => "'+'".to_string(),
            TokenKind::Minus => "'-'".to_string(),
            TokenKind::Star => "'*'".to_string(),
            TokenKind::Slash => "'/'".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
        };
        CalcError::UnexpectedToken { found, pos: self.pos }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, CalcError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        let kind = match ch {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '0'..='9' | '.' => {
                let mut end = pos;
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        end = i + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let literal = &input[pos..end];
                if literal.chars().filter(|&c| c == '.').count() > 1 || literal == "." {
                    return Err(CalcError::InvalidNumber(literal.to_string()));
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| CalcError::InvalidNumber(literal.to_string()))?;
                tokens.push(Token { kind: TokenKind::Number(value), pos });
                continue;
            }
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            other => return Err(CalcError::UnexpectedChar { ch: other, pos }),
        };
        chars.next();
        tokens.push(Token { kind, pos });
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn descend(&mut self) -> Result<(), CalcError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CalcError::TooDeep);
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<Expr, CalcError> {
        let mut lhs = self.term()?;
        while let Some(token) = self.peek() {
            let op: fn(Box<Expr>, Box<Expr>) -> Expr = match token.kind {
                TokenKind::Plus => Expr::Add,
                TokenKind::Minus => Expr::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = op(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, CalcError> {
        let mut lhs = self.factor()?;
        while let Some(token) = self.peek() {
            let op: fn(Box<Expr>, Box<Expr>) -> Expr = match token.kind {
                TokenKind::Star => Expr::Mul,
                TokenKind::Slash => Expr::Div,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.factor()?;
            lhs = op(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn factor(&mut self) -> Result<Expr, CalcError> {
        let token = self.next().ok_or(CalcError::UnexpectedEnd)?;
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Number(n)),
            TokenKind::Plus | TokenKind::Minus => {
                self.descend()?;
                let inner = self.factor()?;
                self.depth -= 1;
                if token.kind == TokenKind::Minus {
                    Ok(Expr::Neg(Box::new(inner)))
                } else {
                    Ok(inner)
                }
            }
            TokenKind::LParen => {
                self.descend()?;
                let inner = self.expr()?;
                self.depth -= 1;
                match self.next() {
                    Some(Token { kind: TokenKind::RParen, .. }) => Ok(Expr::Paren(Box::new(inner))),
                    Some(other) => Err(other.unexpected()),
                    None => Err(CalcError::UnclosedParen(token.pos)),
                }
            }
            _ => Err(token.unexpected()),
        }
    }
}
