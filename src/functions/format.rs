//! Number and phone masks, and English number words.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};

use super::{Arity, Category, FunctionRegistry};
use crate::{error::EvalError, value::Value};

static NON_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\D+").expect("non-digit pattern is valid"));

static ALL_ZEROS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0+$").expect("zero mask pattern is valid"));

pub(super) fn register(registry: &mut FunctionRegistry) {
    let f = Category::Formatting;

    // Input mask, language and country are accepted for compatibility;
    // formatting always uses US symbols.
    registry.add("MaskNumber", Arity::Range(3, 5), f, |_, args| {
        let input = args.number(0)?;
        let mask = args.string(2)?;
        Ok(Value::String(mask_number(input, &mask)?))
    });
    registry.add("MaskPhoneNumber", Arity::Exact(2), f, |_, args| {
        let input = args.string(0)?;
        let mask = args.string(1)?;
        Ok(Value::String(mask_phone(&input, &mask)?))
    });
    registry.add("NumberToWords", Arity::Range(1, 3), f, |_, args| {
        let n = args.number(0)?;
        if !n.fract().is_zero() {
            return Err(EvalError::Type(format!(
                "'NumberToWords' expects an integer, got {}",
                n.normalize()
            )));
        }
        let n = n.to_i128().ok_or_else(|| {
            EvalError::Range("'NumberToWords' input is out of range".to_string())
        })?;
        Ok(Value::String(number_to_words(n)?))
    });
}

/// Formats `input` with a decimal-format style mask.
///
/// - `0`/`#` digits, `,` grouping, `.` decimal point, anything else literal
/// - `%` in the prefix or suffix multiplies by 100
/// - a `-` anywhere keeps the sign of negative inputs (otherwise the
///   absolute value is formatted)
/// - an all-`0` mask rounds the absolute value to that many digits and pads
pub fn mask_number(input: Decimal, mask: &str) -> Result<String, EvalError> {
    if mask.is_empty() {
        return Err(EvalError::Domain("empty number mask".to_string()));
    }
    if ALL_ZEROS.is_match(mask) {
        let digits = round_to_width(input.abs(), mask.len())?;
        return Ok(format!("{:0>width$}", digits, width = mask.len()));
    }

    let keep_sign = mask.contains('-');
    let pattern = NumberPattern::parse(&mask.replace('-', ""))?;
    let body = pattern.format(input.abs())?;
    if keep_sign && input.is_sign_negative() && !input.is_zero() {
        Ok(format!("-{}", body))
    } else {
        Ok(body)
    }
}

/// Rounds half-up so that the integer part has at most `width` digits,
/// dropping low-order digits when it is wider.
fn round_to_width(abs: Decimal, width: usize) -> Result<String, EvalError> {
    let int_digits = match abs.trunc() {
        n if n.is_zero() => 1,
        n => n.to_string().len(),
    };
    if int_digits >= width {
        let mut divisor = Decimal::ONE;
        for _ in 0..int_digits - width {
            divisor = divisor
                .checked_mul(Decimal::TEN)
                .ok_or_else(|| EvalError::Range("number mask is too wide".to_string()))?;
        }
        let scaled = (abs / divisor).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        Ok(scaled.normalize().to_string())
    } else {
        let rounded = abs.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        Ok(rounded.normalize().to_string())
    }
}

#[derive(Debug, Default, PartialEq)]
struct NumberPattern {
    prefix: String,
    suffix: String,
    min_int: usize,
    /// Digits per group, if the integer part has a `,`
    grouping: Option<usize>,
    min_frac: usize,
    max_frac: usize,
    percent: bool,
}

impl NumberPattern {
    fn parse(mask: &str) -> Result<Self, EvalError> {
        // Only the positive subpattern matters
        let mask = mask.split(';').next().unwrap_or_default();
        let is_digit_part = |c: char| matches!(c, '#' | '0' | ',' | '.');

        let start = mask.find(is_digit_part).ok_or_else(|| {
            EvalError::Domain(format!("number mask '{}' has no digit placeholders", mask))
        })?;
        let end = mask.rfind(is_digit_part).map_or(mask.len(), |at| at + 1);
        let (prefix, body, suffix) = (&mask[..start], &mask[start..end], &mask[end..]);

        let (int_part, frac_part) = match body.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (body, ""),
        };
        if frac_part.contains(['.', ',']) {
            return Err(EvalError::Domain(format!("malformed number mask '{}'", mask)));
        }

        let grouping = int_part
            .rfind(',')
            .map(|at| int_part[at + 1..].len())
            .filter(|&size| size > 0);

        Ok(NumberPattern {
            prefix: unquote(prefix),
            suffix: unquote(suffix),
            min_int: int_part.chars().filter(|&c| c == '0').count(),
            grouping,
            min_frac: frac_part.chars().filter(|&c| c == '0').count(),
            max_frac: frac_part.len(),
            percent: prefix.contains('%') || suffix.contains('%'),
        })
    }

    fn format(&self, abs: Decimal) -> Result<String, EvalError> {
        let value = if self.percent {
            abs.checked_mul(Decimal::ONE_HUNDRED)
                .ok_or_else(|| EvalError::Range("percentage overflows".to_string()))?
        } else {
            abs
        };
        let rounded =
            value.round_dp_with_strategy(self.max_frac as u32, RoundingStrategy::MidpointAwayFromZero);

        let text = rounded.to_string();
        let (int_digits, frac_digits) = match text.split_once('.') {
            Some((i, f)) => (i.to_string(), f.to_string()),
            None => (text, String::new()),
        };

        let mut int_digits = int_digits.trim_start_matches('0').to_string();
        while int_digits.len() < self.min_int {
            int_digits.insert(0, '0');
        }

        let mut frac_digits = format!("{:0<width$}", frac_digits, width = self.max_frac);
        while frac_digits.len() > self.min_frac && frac_digits.ends_with('0') {
            frac_digits.pop();
        }
        if int_digits.is_empty() && frac_digits.is_empty() {
            int_digits.push('0');
        }

        let mut out = self.prefix.clone();
        out.push_str(&group(&int_digits, self.grouping));
        if !frac_digits.is_empty() {
            out.push('.');
            out.push_str(&frac_digits);
        }
        out.push_str(&self.suffix);
        Ok(out)
    }
}

fn group(digits: &str, size: Option<usize>) -> String {
    let Some(size) = size else {
        return digits.to_string();
    };
    let mut out = String::with_capacity(digits.len() + digits.len() / size);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % size == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Drops single quotes used to escape literal text; `''` is a quote.
fn unquote(literal: &str) -> String {
    literal.replace("''", "\u{0}").replace('\'', "").replace('\u{0}', "'")
}

/// Substitutes the digits of `input`, left to right, for each `#` in `mask`.
pub fn mask_phone(input: &str, mask: &str) -> Result<String, EvalError> {
    let digits = NON_DIGITS.replace_all(input, "");
    let needed = mask.chars().filter(|&c| c == '#').count();
    if digits.chars().count() != needed {
        return Err(EvalError::Domain(format!(
            "phone digits ({}) != placeholders ({})",
            digits.chars().count(),
            needed
        )));
    }

    let mut digits = digits.chars();
    Ok(mask
        .chars()
        .map(|c| match c {
            '#' => digits.next().unwrap_or('#'),
            other => other,
        })
        .collect())
}

const SMALL: [&str; 20] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
    "nineteen",
];
const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];
const SCALES: [&str; 5] = ["", "thousand", "million", "billion", "trillion"];

/// Largest magnitude that the short-scale names above can spell.
const WORDS_LIMIT: i128 = 1_000_000_000_000_000;

/// English words for `n`, e.g. `1001` → `"one thousand one"`.
pub fn number_to_words(n: i128) -> Result<String, EvalError> {
    if n == 0 {
        return Ok("zero".to_string());
    }
    if n.abs() >= WORDS_LIMIT {
        return Err(EvalError::Range(format!(
            "NumberToWords supports magnitudes below {}, got {}",
            WORDS_LIMIT, n
        )));
    }

    let mut rest = n.unsigned_abs();
    let mut parts = Vec::new();
    for scale in SCALES {
        let chunk = (rest % 1000) as usize;
        if chunk != 0 {
            let words = three_digits(chunk);
            parts.push(if scale.is_empty() {
                words
            } else {
                format!("{} {}", words, scale)
            });
        }
        rest /= 1000;
        if rest == 0 {
            break;
        }
    }
    parts.reverse();

    let words = parts.join(" ");
    Ok(if n < 0 { format!("minus {}", words) } else { words })
}

fn three_digits(n: usize) -> String {
    let mut words = Vec::new();
    if n >= 100 {
        words.push(format!("{} hundred", SMALL[n / 100]));
    }
    match n % 100 {
        0 => {}
        rem if rem < 20 => words.push(SMALL[rem].to_string()),
        rem if rem % 10 == 0 => words.push(TENS[rem / 10].to_string()),
        rem => words.push(format!("{}-{}", TENS[rem / 10], SMALL[rem % 10])),
    }
    words.join(" ")
}

#[test]
fn test_number_patterns() {
    let d = |s: &str| s.parse::<Decimal>().unwrap();
    assert_eq!(mask_number(d("1234567.891"), "#,##0.00").unwrap(), "1,234,567.89");
    assert_eq!(mask_number(d("-42.5"), "-#,##0.00").unwrap(), "-42.50");
    assert_eq!(mask_number(d("-42.5"), "#,##0.00").unwrap(), "42.50");
    assert_eq!(mask_number(d("0.5"), "#.##").unwrap(), ".5");
    assert_eq!(mask_number(d("0.256"), "0.0%").unwrap(), "25.6%");
    assert_eq!(mask_number(d("19.99"), "$#,##0.00").unwrap(), "$19.99");
}

#[test]
fn test_zero_mask() {
    let d = |s: &str| s.parse::<Decimal>().unwrap();
    assert_eq!(mask_number(d("42.6"), "00000").unwrap(), "00043");
    assert_eq!(mask_number(d("123456"), "0000").unwrap(), "1235");
    assert_eq!(mask_number(d("-7"), "000").unwrap(), "007");
}

#[test]
fn test_words() {
    assert_eq!(number_to_words(1001).unwrap(), "one thousand one");
    assert_eq!(number_to_words(-21).unwrap(), "minus twenty-one");
    assert_eq!(
        number_to_words(2_000_340_015).unwrap(),
        "two billion three hundred forty thousand fifteen"
    );
    assert!(number_to_words(WORDS_LIMIT).is_err());
}
