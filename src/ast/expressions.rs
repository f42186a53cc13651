use rust_decimal::Decimal;

use crate::ast::BinOp;

/// Abstract Syntax Tree node representing a parsed expression.
///
/// The tree is built once by the parser and only read afterwards, so a
/// single parsed script can be evaluated against any number of documents.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // Literals
    /// Boolean literal
    Boolean(bool),

    /// Numeric literal
    ///
    /// # Example
    /// ```text
    /// 42
    /// 0.125
    /// ```
    Number(Decimal),

    /// String literal
    ///
    /// # Example
    /// ```text
    /// 'hello'
    /// ```
    String(String),

    // References
    /// Variable reference holding a slash-separated path.
    ///
    /// # Examples
    /// ```text
    /// LetterData/M_Amount        // Variable("LetterData/M_Amount")
    /// Policy/@number             // Variable("Policy/@number")
    /// ```
    Variable(String),

    // Operations
    /// Unary negation (`-x`)
    Negate(Box<Expr>),

    /// Binary operation (arithmetic, comparison, logical)
    BinaryOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Function call. The name keeps the spelling used in the script;
    /// resolution is case-insensitive.
    ///
    /// # Examples
    /// ```text
    /// Concat(First, ' ', Last)
    /// if(Amount > 0, 'yes', 'no')
    /// ```
    Call { name: String, args: Vec<Expr> },
}

impl Expr {
    /// True for a call to the conditional `If`, in any letter case.
    pub fn is_conditional(&self) -> bool {
        matches!(self, Expr::Call { name, .. } if name.eq_ignore_ascii_case("if"))
    }
}
