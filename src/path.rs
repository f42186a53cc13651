use std::fmt;

use crate::error::EvalError;

/// One step of a document path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Child element (XML) or object key / array index (JSON)
    ///
    /// # Examples
    /// - `Policy/Owner` → `[Element("Policy"), Element("Owner")]`
    /// - `items/0/name` → `[Element("items"), Element("0"), Element("name")]`
    Element(String),

    /// Attribute of the current element, written `@name`
    ///
    /// # Examples
    /// - `Policy/@number` → `[Element("Policy"), Attribute("number")]`
    ///
    /// # Note
    /// Only meaningful as the last segment.
    Attribute(String),
}

impl PathSegment {
    pub fn name(&self) -> &str {
        match self {
            PathSegment::Element(name) | PathSegment::Attribute(name) => name,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Element(name) => f.write_str(name),
            PathSegment::Attribute(name) => write!(f, "@{}", name),
        }
    }
}

/// A slash-separated path through a tree document.
///
/// Empty segments are ignored, so `/a//b/` and `a/b` are the same path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path {
    segments: Vec<PathSegment>,
}

impl Path {
    /// Splits `text` into segments. Never fails; malformed paths simply
    /// resolve to nothing.
    pub fn parse(text: &str) -> Self {
        let segments = text
            .split('/')
            .filter(|part| !part.is_empty())
            .map(|part| match part.strip_prefix('@') {
                Some(name) => PathSegment::Attribute(name.to_string()),
                None => PathSegment::Element(part.to_string()),
            })
            .collect();
        Path { segments }
    }

    /// Parses a path that is about to be written to.
    ///
    /// Writing needs at least one segment, and an attribute can only be the
    /// final step.
    pub fn parse_target(text: &str) -> Result<Self, EvalError> {
        let path = Path::parse(text);
        let Some((last, parents)) = path.segments.split_last() else {
            return Err(EvalError::InvalidPath(format!(
                "target path '{}' has no segments",
                text
            )));
        };
        if let PathSegment::Attribute(name) = last
            && name.is_empty()
        {
            return Err(EvalError::InvalidPath(format!(
                "empty attribute name in '{}'",
                text
            )));
        }
        if let Some(attr) = parents
            .iter()
            .find(|segment| matches!(segment, PathSegment::Attribute(_)))
        {
            return Err(EvalError::InvalidPath(format!(
                "attribute segment '{}' must be last in '{}'",
                attr, text
            )));
        }
        Ok(path)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}
