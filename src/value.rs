use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use rust_decimal::Decimal;

/// Text that may be read as a number: optional sign, digits with an
/// optional fraction, optional exponent. Surrounding whitespace is trimmed
/// before matching.
static NUMERIC_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").expect("numeric pattern is valid")
});

/// A value produced by evaluating a Quill expression.
///
/// There are exactly three variants. Document fields always read as
/// [`Value::String`]; whether they then behave as numbers or booleans is
/// decided by the coercion rules of the active type discipline.
///
/// # Examples
///
/// ```
/// use quill_lang::Value;
/// use rust_decimal::Decimal;
///
/// let flag = Value::Boolean(true);
/// let amount = Value::Numeric(Decimal::new(1250, 2));
/// let name = Value::String("Alice".to_string());
///
/// assert_eq!(amount.to_string(), "12.5");
/// assert_eq!(flag.to_string(), "true");
/// assert_eq!(name.to_string(), "Alice");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `true` / `false`
    Boolean(bool),

    /// Base-10 decimal number
    Numeric(Decimal),

    /// UTF-8 string
    String(String),
}

impl Value {
    /// Human-readable variant name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "boolean",
            Value::Numeric(_) => "numeric",
            Value::String(_) => "string",
        }
    }

    /// Numeric view of the value, if it has one.
    ///
    /// Numbers are themselves; strings are numeric when their trimmed text
    /// is a decimal literal, and the empty (or blank) string reads as zero.
    /// Booleans never widen to numbers.
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Value::Numeric(n) => Some(*n),
            Value::String(s) => parse_decimal(s),
            Value::Boolean(_) => None,
        }
    }

    /// Truthiness for conditions.
    ///
    /// `"true"`/`"false"` (any case) are themselves, numeric text is true
    /// when nonzero, and any other string is true when non-empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Numeric(n) => !n.is_zero(),
            Value::String(s) => {
                let t = s.trim();
                if t.eq_ignore_ascii_case("true") {
                    true
                } else if t.eq_ignore_ascii_case("false") {
                    false
                } else if let Some(n) = parse_decimal(t) {
                    !n.is_zero()
                } else {
                    !t.is_empty()
                }
            }
        }
    }

    /// Blank means a String that is empty or all whitespace.
    pub fn is_blank(&self) -> bool {
        matches!(self, Value::String(s) if s.trim().is_empty())
    }
}

/// Canonical printing: numbers lose trailing zeros and never use exponents.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Numeric(n) => write!(f, "{}", n.normalize()),
            Value::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Decimal> for Value {
    fn from(n: Decimal) -> Self {
        Value::Numeric(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Numeric(Decimal::from(n))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

/// Parses trimmed decimal text; blank text is zero.
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let t = text.trim();
    if t.is_empty() {
        return Some(Decimal::ZERO);
    }
    if !NUMERIC_TEXT.is_match(t) {
        return None;
    }
    let t = t.strip_prefix('+').unwrap_or(t);
    if t.contains(['e', 'E']) {
        Decimal::from_scientific(t).ok()
    } else {
        Decimal::from_str(t).ok()
    }
}
