use std::{mem, str::FromStr};

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    ast::{BinOp, Expr, Token},
    lexer::{LexError, Lexer, Position},
};

/// Errors raised while turning script text into an [`Expr`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The lexer rejected the input
    #[error(transparent)]
    Lex(#[from] LexError),

    /// A token appeared where the grammar does not allow it
    #[error("PARSE_ERROR: expected {expected} but got {found} at position {position}")]
    Unexpected {
        expected: String,
        found: String,
        position: Position,
    },

    /// A numeric literal that does not fit the decimal range
    #[error("PARSE_ERROR: invalid number '{0}'")]
    InvalidNumber(String),
}

pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    /// Second token of lookahead, filled on demand.
    peeked: Option<Token>,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Result<Self, ParseError> {
        let current_token = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current_token,
            peeked: None,
        })
    }

    fn advance(&mut self) -> Result<Token, ParseError> {
        let next = match self.peeked.take() {
            Some(token) => token,
            None => self.lexer.next_token()?,
        };
        Ok(mem::replace(&mut self.current_token, next))
    }

    fn peek(&mut self) -> Result<&Token, ParseError> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.lexer.next_token()?,
        };
        Ok(self.peeked.insert(token))
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::Unexpected {
            expected: expected.to_string(),
            found: self.current_token.describe(),
            position: self.lexer.position(),
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        if mem::discriminant(&self.current_token) != mem::discriminant(&expected) {
            return Err(self.unexpected(&expected.describe()));
        }
        self.advance()?;
        Ok(())
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(&self.current_token) == mem::discriminant(token)
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        let Token::Identifier(name) = &mut self.current_token else {
            return Err(self.unexpected("identifier"));
        };
        let name = mem::take(name);
        self.advance()?;
        Ok(name)
    }

    /// Parse primary expressions: literals, parenthesized expressions, paths and calls
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match &mut self.current_token {
            Token::Boolean(b) => {
                let b = *b;
                self.advance()?;
                Ok(Expr::Boolean(b))
            }
            Token::Number(raw) => {
                let raw = mem::take(raw);
                self.advance()?;
                Decimal::from_str(&raw)
                    .map(Expr::Number)
                    .map_err(|_| ParseError::InvalidNumber(raw))
            }
            Token::String(s) => {
                let s = mem::take(s);
                self.advance()?;
                Ok(Expr::String(s))
            }
            Token::LParen => {
                self.advance()?;
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::Identifier(_) => {
                let name = self.expect_identifier()?;
                if self.check(&Token::LParen) {
                    self.advance()?;
                    let args = self.parse_arguments()?;
                    Ok(Expr::Call { name, args })
                } else {
                    self.parse_path(name)
                }
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = vec![];
        if !self.check(&Token::RParen) {
            args.push(self.parse_expression()?);
            while self.check(&Token::Comma) {
                self.advance()?;
                args.push(self.parse_expression()?);
            }
        }
        self.expect(Token::RParen)?;
        Ok(args)
    }

    /// Parse the rest of a path after its first segment.
    ///
    /// A `/` only continues the path when an identifier or `@` follows it;
    /// otherwise it is left for the multiplicative level as division.
    fn parse_path(&mut self, first: String) -> Result<Expr, ParseError> {
        let mut path = first;

        while self.check(&Token::Slash) {
            let (segment, attribute) = match self.peek()? {
                Token::Identifier(_) => (true, false),
                Token::At => (true, true),
                _ => (false, false),
            };
            if !segment {
                break;
            }

            self.advance()?; // '/'
            path.push('/');
            if attribute {
                self.advance()?; // '@'
                path.push('@');
            }
            path.push_str(&self.expect_identifier()?);

            // An attribute always ends the path
            if attribute {
                break;
            }
        }

        Ok(Expr::Variable(path))
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.check(&Token::Minus) {
            self.advance()?;
            let operand = self.parse_unary()?;
            return Ok(Expr::Negate(Box::new(operand)));
        }
        self.parse_primary()
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match &self.current_token {
                Token::Star => BinOp::Multiply,
                Token::Slash => BinOp::Divide,
                Token::Percent => BinOp::Modulo,
                _ => break,
            };

            self.advance()?;
            let right = self.parse_unary()?;

            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match &self.current_token {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Subtract,
                _ => break,
            };

            self.advance()?;
            let right = self.parse_multiplicative()?;

            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;

        loop {
            let op = match &self.current_token {
                Token::EqEq => BinOp::Equal,
                Token::NotEq => BinOp::NotEqual,
                Token::Lt => BinOp::LessThan,
                Token::Gt => BinOp::GreaterThan,
                Token::LtEq => BinOp::LessEqual,
                Token::GtEq => BinOp::GreaterEqual,
                _ => break,
            };

            self.advance()?;
            let right = self.parse_additive()?;

            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_comparison()?;

        while self.check(&Token::AndAnd) {
            self.advance()?;
            let right = self.parse_comparison()?;

            left = Expr::BinaryOp {
                op: BinOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;

        while self.check(&Token::OrOr) {
            self.advance()?;
            let right = self.parse_and()?;

            left = Expr::BinaryOp {
                op: BinOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    /// Parse a complete script; trailing tokens are an error.
    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expression()?;
        self.expect(Token::Eof)?;
        Ok(expr)
    }
}

/// Lex and parse `script` in one step.
pub fn parse_script(script: &str) -> Result<Expr, ParseError> {
    Parser::new(Lexer::new(script))?.parse()
}
