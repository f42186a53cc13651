//! String functions.
//!
//! Positions are 1-based and count characters, not bytes. Out-of-range
//! positions and lengths never fail: they clamp, or yield `""` / `-1`.

use rust_decimal::Decimal;

use super::{Args, Arity, Category, FunctionRegistry};
use crate::value::Value;

pub(super) fn register(registry: &mut FunctionRegistry) {
    let s = Category::String;

    registry.add("Concat", Arity::AtLeast(1), s, |_, args| {
        Ok(Value::String(
            args.values().iter().map(Value::to_string).collect(),
        ))
    });
    registry.add("UpperCase", Arity::Exact(1), s, |_, args| {
        Ok(Value::String(args.string(0)?.to_uppercase()))
    });
    registry.add("LowerCase", Arity::Exact(1), s, |_, args| {
        Ok(Value::String(args.string(0)?.to_lowercase()))
    });
    registry.add("TitleCase", Arity::Exact(1), s, |_, args| {
        Ok(Value::String(title_case(&args.string(0)?)))
    });
    registry.add("Replace", Arity::Range(3, 4), s, |_, args| replace(args));
    registry.add("Trim", Arity::Range(1, 2), s, |_, args| {
        let input = args.string(0)?;
        let trimmed = match args.optional_string(1) {
            None => input.trim().to_string(),
            Some(set) if set.is_empty() => input,
            Some(set) => input.trim_matches(|c: char| set.contains(c)).to_string(),
        };
        Ok(Value::String(trimmed))
    });
    registry.add("Length", Arity::Exact(1), s, |_, args| {
        Ok(Value::from(args.string(0)?.chars().count() as i64))
    });
    registry.add("Insert", Arity::Exact(3), s, |_, args| {
        let input = args.string(0)?;
        let at = args.integer(1)? - 1;
        let insert = args.string(2)?;
        let len = char_len(&input);
        let result = if at < 0 {
            insert + &input
        } else if at as usize > len {
            input + &insert
        } else {
            let (head, tail) = input.split_at(byte_offset(&input, at as usize));
            format!("{}{}{}", head, insert, tail)
        };
        Ok(Value::String(result))
    });
    registry.add("IndexOf", Arity::Range(2, 3), s, |_, args| {
        let input = args.string(0)?;
        let search = args.string(1)?;
        let from = match args.get(2) {
            Some(_) => args.index(2)?.max(0) as usize,
            None => 0,
        };
        Ok(position(index_of(&input, &search, from)))
    });
    registry.add("LastIndexOf", Arity::Range(2, 3), s, |_, args| {
        let input = args.string(0)?;
        let search = args.string(1)?;
        let last = char_len(&input) as i64 - 1;
        let from = match args.get(2) {
            Some(_) => match args.index(2)? {
                start if start < 1 => -1,
                start => last.min(start - 1),
            },
            None => last,
        };
        Ok(position(last_index_of(&input, &search, from)))
    });
    registry.add("SubString", Arity::Range(2, 3), s, |_, args| {
        let input = args.string(0)?;
        let start = args.index(1)?;
        let len = char_len(&input) as i64;
        if start < 1 || start > len {
            return Ok(Value::String(String::new()));
        }
        let skip = (start - 1) as usize;
        let result: String = match args.get(2) {
            None => input.chars().skip(skip).collect(),
            Some(_) => match args.index(2)? {
                count if count < 0 => String::new(),
                count => input.chars().skip(skip).take(count as usize).collect(),
            },
        };
        Ok(Value::String(result))
    });
    registry.add("SubStringBefore", Arity::Exact(2), s, |_, args| {
        let input = args.string(0)?;
        let separator = args.string(1)?;
        let result = match input.find(&separator) {
            Some(at) => input[..at].to_string(),
            None => input,
        };
        Ok(Value::String(result))
    });
    registry.add("SubStringAfter", Arity::Exact(2), s, |_, args| {
        let input = args.string(0)?;
        let separator = args.string(1)?;
        let result = match input.find(&separator) {
            Some(at) => input[at + separator.len()..].to_string(),
            None => input,
        };
        Ok(Value::String(result))
    });
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte offset of character `index`, or the end of the string.
fn byte_offset(s: &str, index: usize) -> usize {
    s.char_indices().nth(index).map_or(s.len(), |(at, _)| at)
}

/// 1-based result for a 0-based character position; `-1` when absent.
fn position(found: Option<usize>) -> Value {
    match found {
        Some(at) => Value::Numeric(Decimal::from(at as i64 + 1)),
        None => Value::Numeric(Decimal::NEGATIVE_ONE),
    }
}

/// First occurrence of `search` at or after character `from`.
fn index_of(input: &str, search: &str, from: usize) -> Option<usize> {
    if from > char_len(input) {
        return None;
    }
    let start = byte_offset(input, from);
    input[start..]
        .find(search)
        .map(|at| from + char_len(&input[start..start + at]))
}

/// Last occurrence of `search` starting at or before character `from`.
fn last_index_of(input: &str, search: &str, from: i64) -> Option<usize> {
    if from < 0 {
        return None;
    }
    let starts: Vec<usize> = input
        .char_indices()
        .map(|(at, _)| at)
        .chain(std::iter::once(input.len()))
        .collect();
    let from = (from as usize).min(starts.len() - 1);
    (0..=from)
        .rev()
        .find(|&i| input[starts[i]..].starts_with(search))
}

fn replace(args: &Args<'_>) -> Result<Value, crate::error::EvalError> {
    let input = args.string(0)?;
    if args.len() == 3 {
        let search = args.string(1)?;
        let replacement = args.string(2)?;
        return Ok(Value::String(input.replace(&search, &replacement)));
    }

    let len = char_len(&input);
    let start = (args.index(1)?.max(1) - 1).min(len as i64) as usize;
    let count = args.index(2)?.max(0) as usize;
    let end = start.saturating_add(count).min(len);
    let replacement = args.string(3)?;

    let (head, _) = input.split_at(byte_offset(&input, start));
    let tail = &input[byte_offset(&input, end)..];
    Ok(Value::String(format!("{}{}{}", head, replacement, tail)))
}

/// Uppercases the first alphanumeric of every run, lowercases the rest.
pub(crate) fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut new_word = true;
    for c in input.chars() {
        if c.is_alphanumeric() {
            if new_word {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            new_word = false;
        } else {
            out.push(c);
            new_word = true;
        }
    }
    out
}

#[test]
fn test_title_case() {
    assert_eq!(title_case("hELLO wORLD-foo_bar 9lives"), "Hello World-Foo_Bar 9lives");
}

#[test]
fn test_last_index_of_bounds() {
    assert_eq!(last_index_of("abcabc", "abc", 5), Some(3));
    assert_eq!(last_index_of("abcabc", "abc", 2), Some(0));
    assert_eq!(last_index_of("abcabc", "abc", -1), None);
}
