use thiserror::Error;

use crate::ast::Token;

/// Character offset into the script being lexed.
pub type Position = usize;

/// A lexing failure: unknown character, bad escape, unterminated string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("PARSE_ERROR: {message} at position {position}")]
pub struct LexError {
    pub message: String,
    pub position: Position,
}

impl LexError {
    fn new(message: impl Into<String>, position: Position) -> Self {
        LexError {
            message: message.into(),
            position,
        }
    }
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Offset of the next unread character.
    pub fn position(&self) -> Position {
        self.position
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(' ' | '\t' | '\r' | '\n') = self.current_char() {
            self.advance();
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let start = self.position;
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    let escape_at = self.position;
                    self.advance();
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some('"') => result.push('"'),
                        Some('\'') => result.push('\''),
                        Some('\\') => result.push('\\'),
                        Some('u') => {
                            result.push(self.read_unicode_escape(escape_at)?);
                            continue;
                        }
                        Some(other) => {
                            return Err(LexError::new(
                                format!("invalid escape sequence '\\{}'", other),
                                escape_at,
                            ));
                        }
                        None => return Err(LexError::new("unfinished escape", escape_at)),
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError::new("unterminated string literal", start))
    }

    /// Reads the `XXXX` of a `\uXXXX` escape; the cursor sits on the `u`.
    fn read_unicode_escape(&mut self, escape_at: Position) -> Result<char, LexError> {
        self.advance(); // 'u'
        let mut hex = String::with_capacity(4);
        for _ in 0..4 {
            match self.current_char() {
                Some(c) if c.is_ascii_hexdigit() => {
                    hex.push(c);
                    self.advance();
                }
                _ => return Err(LexError::new("bad \\u escape", escape_at)),
            }
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| LexError::new("bad \\u escape", escape_at))
    }

    fn read_number(&mut self) -> Token {
        let mut number = String::new();
        let mut seen_dot = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.'
                && !seen_dot
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                seen_dot = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        Token::Number(number)
    }

    /// Consumes `len` characters and yields `token`.
    fn emit(&mut self, len: usize, token: Token) -> Result<Token, LexError> {
        self.position += len;
        Ok(token)
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();

        let Some(ch) = self.current_char() else {
            return Ok(Token::Eof);
        };
        let next = self.peek_char(1);

        match (ch, next) {
            ('&', Some('&')) => self.emit(2, Token::AndAnd),
            ('|', Some('|')) => self.emit(2, Token::OrOr),
            ('=', Some('=')) => self.emit(2, Token::EqEq),
            ('!', Some('=')) => self.emit(2, Token::NotEq),
            ('<', Some('=')) => self.emit(2, Token::LtEq),
            ('>', Some('=')) => self.emit(2, Token::GtEq),
            ('&' | '|', _) => Err(LexError::new(
                format!("single '{}' is not an operator (did you mean '{}{}'?)", ch, ch, ch),
                self.position,
            )),
            ('(', _) => self.emit(1, Token::LParen),
            (')', _) => self.emit(1, Token::RParen),
            (',', _) => self.emit(1, Token::Comma),
            ('+', _) => self.emit(1, Token::Plus),
            ('-', _) => self.emit(1, Token::Minus),
            ('*', _) => self.emit(1, Token::Star),
            ('/', _) => self.emit(1, Token::Slash),
            ('%', _) => self.emit(1, Token::Percent),
            ('<', _) => self.emit(1, Token::Lt),
            ('>', _) => self.emit(1, Token::Gt),
            ('@', _) => self.emit(1, Token::At),
            ('"' | '\'', _) => self.read_string(ch).map(Token::String),
            (c, _) if c.is_alphabetic() || c == '_' => {
                let ident = self.read_identifier();
                Ok(match ident.as_str() {
                    "true" => Token::Boolean(true),
                    "false" => Token::Boolean(false),
                    _ => Token::Identifier(ident),
                })
            }
            (c, _) if c.is_ascii_digit() => Ok(self.read_number()),
            (c, _) => Err(LexError::new(
                format!("unexpected character '{}'", c),
                self.position,
            )),
        }
    }

    /// Lexes the whole input, including the trailing [`Token::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }
}

#[test]
fn test_keywords() {
    let mut lexer = Lexer::new("true false True");
    assert_eq!(lexer.next_token().unwrap(), Token::Boolean(true));
    assert_eq!(lexer.next_token().unwrap(), Token::Boolean(false));
    assert_eq!(
        lexer.next_token().unwrap(),
        Token::Identifier("True".to_string())
    );
}

#[test]
fn test_path_tokens() {
    let mut lexer = Lexer::new("LetterData/M_Amount > 5");
    assert_eq!(
        lexer.next_token().unwrap(),
        Token::Identifier("LetterData".to_string())
    );
    assert_eq!(lexer.next_token().unwrap(), Token::Slash);
    assert_eq!(
        lexer.next_token().unwrap(),
        Token::Identifier("M_Amount".to_string())
    );
    assert_eq!(lexer.next_token().unwrap(), Token::Gt);
    assert_eq!(lexer.next_token().unwrap(), Token::Number("5".to_string()));
    assert_eq!(lexer.next_token().unwrap(), Token::Eof);
}
