use serde_json::{Map, Value as JsonValue};

use crate::{error::EvalError, path::PathSegment};

pub(crate) fn resolve(root: &JsonValue, segments: &[PathSegment], lenient: bool) -> String {
    let mut current = root;

    for segment in segments {
        let next = match (segment, current) {
            (PathSegment::Element(name), JsonValue::Object(map)) => map.get(name),
            (PathSegment::Element(name), JsonValue::Array(items)) => {
                name.parse::<usize>().ok().and_then(|i| items.get(i))
            }
            // No attributes in JSON; lenient mode reads the same-named key
            (PathSegment::Attribute(name), JsonValue::Object(map)) if lenient => map.get(name),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return String::new(),
        }
    }

    text_of(current)
}

/// Text form of a JSON value as seen by scripts.
pub(crate) fn text_of(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(_) | JsonValue::Object(_) => value.to_string(),
    }
}

pub(crate) fn set(root: &mut JsonValue, segments: &[PathSegment], value: &str) -> Result<(), EvalError> {
    let Some((last, parents)) = segments.split_last() else {
        return Err(EvalError::InvalidPath("empty target path".to_string()));
    };

    let mut current = root;
    for segment in parents {
        let JsonValue::Object(map) = current else {
            return Err(EvalError::Path(format!(
                "cannot descend into '{}': parent is not an object",
                segment
            )));
        };
        let child = map
            .entry(segment.name().to_string())
            .or_insert_with(|| JsonValue::Object(Map::new()));
        // a null placeholder counts as absent
        if child.is_null() {
            *child = JsonValue::Object(Map::new());
        }
        current = child;
    }

    match (last, current) {
        (PathSegment::Element(name), JsonValue::Object(map)) => {
            map.insert(name.clone(), JsonValue::String(value.to_string()));
            Ok(())
        }
        (PathSegment::Attribute(name), _) => Err(EvalError::Path(format!(
            "cannot write attribute '@{}' into a JSON document",
            name
        ))),
        (PathSegment::Element(name), _) => Err(EvalError::Path(format!(
            "cannot write '{}': parent is not an object",
            name
        ))),
    }
}
