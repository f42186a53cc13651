//! Date/time functions.
//!
//! Masks use the familiar `yyyy-MM-dd HH:mm:ss` letters and are compiled to
//! chrono format strings by [`DateMask::compile`]. Autodetection tries
//! [`SUPPORTED_INPUT_MASKS`] in order and keeps the first that parses.

use std::fmt::Write;

use chrono::{Datelike, Days, Local, Months, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use super::{Arity, Category, FunctionRegistry};
use crate::{error::EvalError, value::Value};

/// Input masks tried by autodetection, in priority order.
pub const SUPPORTED_INPUT_MASKS: [&str; 7] = [
    "yyyy-MM-dd'T'HH:mm:ss",
    "MM-dd-yyyy",
    "MMMM dd, yyyy",
    "MM/dd/yyyy",
    "yyyy-MM-dd",
    "HH:mm:ss",
    "hh:mm:ss a",
];

/// Rendering used by `AddInterval` and `SubtractInterval`.
pub const INTERVAL_OUTPUT_MASK: &str = "dd-MM-yyyy hh:mm:ss.SSS";

/// Masks that only make sense for output.
const OUTPUT_ONLY_MASKS: [&str; 1] = ["yyyy"];

/// A date/time mask compiled to a chrono format string.
///
/// `shape` anchors the field widths the mask demands; chrono alone accepts
/// `24` for `yyyy` and `3` for `MM`.
#[derive(Debug, Clone)]
pub struct DateMask {
    source: String,
    format: String,
    shape: Regex,
    has_date: bool,
}

impl DateMask {
    /// Compiles a mask such as `MMMM dd, yyyy` or `hh:mm:ss a`.
    ///
    /// Supported letters: `y M d E H h m s S a`. Text in single quotes is
    /// literal and `''` is a quote.
    pub fn compile(mask: &str) -> Result<Self, EvalError> {
        let chars: Vec<char> = mask.chars().collect();
        let mut format = String::with_capacity(mask.len() * 2);
        let mut shape = String::from("^");
        let mut has_date = false;
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            if c == '\'' {
                let (literal, next) = quoted_literal(&chars, i, mask)?;
                push_literal(&literal, &mut format, &mut shape);
                i = next;
                continue;
            }
            if !c.is_ascii_alphabetic() {
                push_literal(&c.to_string(), &mut format, &mut shape);
                i += 1;
                continue;
            }

            let run = chars[i..].iter().take_while(|&&x| x == c).count();
            let (spec, width) = match (c, run) {
                ('y', 1) => ("%Y", r"\d{1,4}"),
                ('y', 2) => ("%y", r"\d{2}"),
                ('y', _) => ("%Y", r"\d{4}"),
                ('M', 1) => ("%-m", r"\d{1,2}"),
                ('M', 2) => ("%m", r"\d{2}"),
                ('M', 3) => ("%b", r"\p{L}{3}"),
                ('M', _) => ("%B", r"\p{L}+"),
                ('d', 1) => ("%-d", r"\d{1,2}"),
                ('d', 2) => ("%d", r"\d{2}"),
                ('E', 1..=3) => ("%a", r"\p{L}{3}"),
                ('E', _) => ("%A", r"\p{L}+"),
                ('H', 1) => ("%-H", r"\d{1,2}"),
                ('H', 2) => ("%H", r"\d{2}"),
                ('h', 1) => ("%-I", r"\d{1,2}"),
                ('h', 2) => ("%I", r"\d{2}"),
                ('m', 1) => ("%-M", r"\d{1,2}"),
                ('m', 2) => ("%M", r"\d{2}"),
                ('s', 1) => ("%-S", r"\d{1,2}"),
                ('s', 2) => ("%S", r"\d{2}"),
                ('S', 3) => ("%3f", r"\d{3}"),
                ('S', 6) => ("%6f", r"\d{6}"),
                ('S', 9) => ("%9f", r"\d{9}"),
                ('a', 1) => ("%p", r"(?i:am|pm)"),
                _ => {
                    return Err(EvalError::Domain(format!(
                        "invalid date/time mask '{}': unsupported field '{}'",
                        mask,
                        c.to_string().repeat(run)
                    )));
                }
            };
            has_date |= matches!(c, 'y' | 'M' | 'd' | 'E');
            format.push_str(spec);
            shape.push_str(width);
            i += run;
        }
        shape.push('$');

        let shape = Regex::new(&shape).map_err(|e| {
            EvalError::Domain(format!("invalid date/time mask '{}': {}", mask, e))
        })?;
        Ok(DateMask {
            source: mask.to_string(),
            format,
            shape,
            has_date,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The chrono format string this mask compiles to.
    pub fn strftime(&self) -> &str {
        &self.format
    }

    /// A mask with no year, month, day or weekday field.
    pub fn is_time_only(&self) -> bool {
        !self.has_date
    }

    /// Parses `input` with exactly this mask.
    ///
    /// Time-only masks land on 1970-01-01; date-only masks at midnight.
    pub fn parse(&self, input: &str) -> Result<NaiveDateTime, EvalError> {
        if OUTPUT_ONLY_MASKS.contains(&self.source.as_str()) {
            return Err(EvalError::Domain(format!(
                "'{}' cannot be used as an input mask",
                self.source
            )));
        }
        let invalid = || {
            EvalError::Domain(format!(
                "invalid date/time '{}' for mask '{}'",
                input, self.source
            ))
        };
        if !self.shape.is_match(input) {
            return Err(invalid());
        }

        if self.is_time_only() {
            let time = NaiveTime::parse_from_str(input, &self.format).map_err(|_| invalid())?;
            return Ok(epoch_date().and_time(time));
        }
        NaiveDateTime::parse_from_str(input, &self.format)
            .or_else(|_| {
                NaiveDate::parse_from_str(input, &self.format).map(|d| d.and_time(NaiveTime::default()))
            })
            .map_err(|_| invalid())
    }

    pub fn format(&self, value: &NaiveDateTime) -> Result<String, EvalError> {
        let mut out = String::new();
        write!(out, "{}", value.format(&self.format)).map_err(|_| {
            EvalError::Domain(format!("cannot format date/time with mask '{}'", self.source))
        })?;
        Ok(out)
    }
}

/// Reads a `'...'` literal; returns its text and the index after it.
fn quoted_literal(chars: &[char], open: usize, mask: &str) -> Result<(String, usize), EvalError> {
    if chars.get(open + 1) == Some(&'\'') {
        return Ok(("'".to_string(), open + 2));
    }
    let mut literal = String::new();
    let mut i = open + 1;
    while i < chars.len() {
        match chars[i] {
            '\'' if chars.get(i + 1) == Some(&'\'') => {
                literal.push('\'');
                i += 2;
            }
            '\'' => return Ok((literal, i + 1)),
            c => {
                literal.push(c);
                i += 1;
            }
        }
    }
    Err(EvalError::Domain(format!(
        "invalid date/time mask '{}': unterminated quote",
        mask
    )))
}

fn push_literal(literal: &str, format: &mut String, shape: &mut String) {
    format.push_str(&literal.replace('%', "%%"));
    shape.push_str(&regex::escape(literal));
}

/// 1970-01-01, the date time-only values are placed on.
fn epoch_date() -> NaiveDate {
    NaiveDate::default()
}

/// Parses `input` with the first supported mask that accepts it.
pub fn autodetect(input: &str) -> Result<NaiveDateTime, EvalError> {
    SUPPORTED_INPUT_MASKS
        .iter()
        .filter_map(|mask| DateMask::compile(mask).ok())
        .find_map(|mask| mask.parse(input).ok())
        .ok_or_else(|| {
            EvalError::Domain(format!("cannot detect input date/time mask for '{}'", input))
        })
}

/// First supported mask that parses both inputs.
fn common_mask(a: &str, b: &str) -> Option<DateMask> {
    SUPPORTED_INPUT_MASKS
        .iter()
        .filter_map(|mask| DateMask::compile(mask).ok())
        .find(|mask| mask.parse(a).is_ok() && mask.parse(b).is_ok())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateField {
    Year,
    Month,
    Day,
}

impl DateField {
    fn parse(unit: &str) -> Result<Self, EvalError> {
        match unit.trim().to_lowercase().as_str() {
            "year" | "years" => Ok(DateField::Year),
            "month" | "months" => Ok(DateField::Month),
            "day" | "days" => Ok(DateField::Day),
            _ => Err(EvalError::Domain(format!(
                "DateField must be year|month|day, got '{}'",
                unit
            ))),
        }
    }
}

/// Adds a signed amount; month arithmetic clamps to the last valid day.
fn add_interval(
    value: NaiveDateTime,
    amount: i64,
    field: DateField,
) -> Result<NaiveDateTime, EvalError> {
    let out_of_range = || EvalError::Range(format!("interval {} {:?} is out of range", amount, field));
    let magnitude = amount.unsigned_abs();

    let shifted = match field {
        DateField::Year | DateField::Month => {
            let months = if field == DateField::Year {
                magnitude.checked_mul(12).ok_or_else(out_of_range)?
            } else {
                magnitude
            };
            let months = Months::new(u32::try_from(months).map_err(|_| out_of_range())?);
            if amount < 0 {
                value.checked_sub_months(months)
            } else {
                value.checked_add_months(months)
            }
        }
        DateField::Day => {
            let days = Days::new(magnitude);
            if amount < 0 {
                value.checked_sub_days(days)
            } else {
                value.checked_add_days(days)
            }
        }
    };
    shifted.ok_or_else(out_of_range)
}

/// Whole months from `start` to `end`, counting a month only once the day
/// of month has been reached.
fn months_between(start: NaiveDate, end: NaiveDate) -> i64 {
    let month_index = |d: NaiveDate| d.year() as i64 * 12 + d.month0() as i64;
    let mut total = month_index(end) - month_index(start);
    let days = end.day() as i64 - start.day() as i64;
    if total > 0 && days < 0 {
        total -= 1;
    } else if total < 0 && days > 0 {
        total += 1;
    }
    total
}

fn duration(a: &str, b: &str, unit: &str) -> Result<i64, EvalError> {
    let field = DateField::parse(unit)?;
    let mask = common_mask(a, b).ok_or_else(|| {
        EvalError::Domain("Duration requires both inputs in the same supported mask".to_string())
    })?;
    if mask.is_time_only() {
        return Err(EvalError::Domain(format!(
            "Duration in {:?}s requires a date mask, not '{}'",
            field,
            mask.source()
        )));
    }

    let start = mask.parse(a)?.date();
    let end = mask.parse(b)?.date();
    Ok(match field {
        DateField::Year => months_between(start, end) / 12,
        DateField::Month => months_between(start, end),
        DateField::Day => end.signed_duration_since(start).num_days(),
    })
}

pub(super) fn register(registry: &mut FunctionRegistry) {
    let t = Category::DateTime;

    registry.add("MaskDateTime", Arity::Range(3, 5), t, |_, args| {
        let input = args.string(0)?;
        if input.trim().is_empty() {
            return Ok(Value::String(String::new()));
        }
        let input_mask = args.string(1)?;
        let output_mask = args.string(2)?;
        if output_mask.is_empty() {
            return Err(EvalError::Domain("empty date/time output mask".to_string()));
        }

        let value = if input_mask.is_empty() {
            autodetect(&input)?
        } else {
            DateMask::compile(&input_mask)?.parse(&input)?
        };
        Ok(Value::String(DateMask::compile(&output_mask)?.format(&value)?))
    });
    registry.add("Now", Arity::Exact(1), t, |ctx, args| {
        let mask = DateMask::compile(&args.string(0)?)?;
        let now = ctx
            .options()
            .now
            .unwrap_or_else(|| Local::now().naive_local());
        Ok(Value::String(mask.format(&now)?))
    });
    registry.add("ToDateTime", Arity::Exact(2), t, |_, args| {
        let value = autodetect(&args.string(0)?)?;
        let mask = DateMask::compile(&args.string(1)?)?;
        Ok(Value::String(mask.format(&value)?))
    });
    registry.add("AddInterval", Arity::Exact(3), t, |_, args| {
        let value = autodetect(&args.string(0)?)?;
        let field = DateField::parse(&args.string(2)?)?;
        let shifted = add_interval(value, args.index(1)?, field)?;
        Ok(Value::String(DateMask::compile(INTERVAL_OUTPUT_MASK)?.format(&shifted)?))
    });
    registry.add("SubtractInterval", Arity::Exact(3), t, |_, args| {
        let value = autodetect(&args.string(0)?)?;
        let field = DateField::parse(&args.string(2)?)?;
        let amount = args.index(1)?.checked_neg().ok_or_else(|| {
            EvalError::Range("'SubtractInterval' amount is out of range".to_string())
        })?;
        let shifted = add_interval(value, amount, field)?;
        Ok(Value::String(DateMask::compile(INTERVAL_OUTPUT_MASK)?.format(&shifted)?))
    });
    registry.add("Duration", Arity::Exact(3), t, |_, args| {
        let amount = duration(&args.string(0)?, &args.string(1)?, &args.string(2)?)?;
        Ok(Value::from(amount))
    });
}

#[test]
fn test_compile_masks() {
    let compiled = |m: &str| DateMask::compile(m).unwrap().strftime().to_string();
    assert_eq!(compiled("yyyy-MM-dd'T'HH:mm:ss"), "%Y-%m-%dT%H:%M:%S");
    assert_eq!(compiled("MMMM dd, yyyy"), "%B %d, %Y");
    assert_eq!(compiled("hh:mm:ss a"), "%I:%M:%S %p");
    assert_eq!(compiled("dd-MM-yyyy hh:mm:ss.SSS"), "%d-%m-%Y %I:%M:%S.%3f");
    assert_eq!(compiled("'Day' d, ''yy"), "Day %-d, '%y");
    assert!(DateMask::compile("yyyy-DDD").is_err());
}

#[test]
fn test_parse_enforces_field_widths() {
    let mask = DateMask::compile("yyyy-MM-dd").unwrap();
    assert!(mask.parse("2024-03-05").is_ok());
    assert!(mask.parse("03/05/24").is_err());
    assert!(mask.parse("24-03-05").is_err());
    assert!(mask.parse("2024-3-5").is_err());

    let loose = DateMask::compile("M/d/yyyy").unwrap();
    assert!(loose.parse("3/5/2024").is_ok());
    assert!(loose.parse("03/05/2024").is_ok());

    let clock = DateMask::compile("hh:mm a").unwrap();
    assert!(clock.parse("07:30 pm").is_ok());
    assert!(clock.parse("7:30 PM").is_err());
}

#[test]
fn test_months_between_follows_day_of_month() {
    let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
    assert_eq!(months_between(d(2024, 1, 31), d(2024, 2, 29)), 0);
    assert_eq!(months_between(d(2024, 1, 15), d(2024, 2, 15)), 1);
    assert_eq!(months_between(d(2024, 3, 15), d(2024, 1, 20)), -1);
    assert_eq!(months_between(d(2020, 2, 29), d(2024, 2, 28)), 47);
}
