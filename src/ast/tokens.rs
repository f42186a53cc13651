/// Lexical unit produced by the [`Lexer`](crate::lexer::Lexer).
///
/// Literal tokens carry their raw text so that numbers keep their exact
/// decimal spelling until the parser converts them.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Integer or decimal number, raw text
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 3.14
    /// ```
    ///
    /// A trailing dot with no digit after it is not part of the number.
    Number(String),

    /// String literal in single or double quotes, escapes already decoded
    ///
    /// # Examples
    /// ```text
    /// 'hello'
    /// "it\'s"
    /// 'é'
    /// ```
    String(String),

    /// Boolean values
    ///
    /// # Examples
    /// ```text
    /// true
    /// false
    /// ```
    Boolean(bool),

    // Identifiers
    /// Function name or path segment
    ///
    /// Must start with a letter or underscore, followed by letters, digits, or underscores.
    ///
    /// # Examples
    /// ```text
    /// LetterData
    /// M_Amount
    /// Concat
    /// ```
    Identifier(String),

    /// Attribute marker in the final path segment
    ///
    /// # Examples
    /// ```text
    /// Policy/@number
    /// ```
    At,

    // Arithmetic
    /// Addition or string concatenation
    Plus,

    /// Subtraction or unary negation
    Minus,

    /// Multiplication
    Star,

    /// Division, or the separator between path segments
    Slash,

    /// Modulo
    Percent,

    // Comparison
    /// Equality operator
    EqEq,

    /// Inequality operator
    NotEq,

    /// Less than
    Lt,

    /// Greater than
    Gt,

    /// Less than or equal
    LtEq,

    /// Greater than or equal
    GtEq,

    // Logical
    /// Logical AND (`&&`)
    AndAnd,

    /// Logical OR (`||`)
    OrOr,

    // Delimiters
    /// Left parenthesis for grouping or function calls
    LParen,

    /// Right parenthesis
    RParen,

    /// Comma for separating arguments
    Comma,

    /// End of input
    Eof,
}

impl Token {
    /// Short human-readable description used in parse errors.
    pub fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::String(s) => format!("string '{}'", s),
            Token::Boolean(b) => format!("boolean {}", b),
            Token::Identifier(name) => format!("identifier '{}'", name),
            Token::At => "'@'".to_string(),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::Percent => "'%'".to_string(),
            Token::EqEq => "'=='".to_string(),
            Token::NotEq => "'!='".to_string(),
            Token::Lt => "'<'".to_string(),
            Token::Gt => "'>'".to_string(),
            Token::LtEq => "'<='".to_string(),
            Token::GtEq => "'>='".to_string(),
            Token::AndAnd => "'&&'".to_string(),
            Token::OrOr => "'||'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}
