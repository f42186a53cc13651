//! Tree documents addressed by slash paths.
//!
//! A [`Document`] is either a JSON object tree or an XML element tree. Both
//! support the same two operations the evaluator needs: reading the text at
//! a path (missing fields read as `""`) and writing a string at a path,
//! creating containers on the way.

pub mod json;
pub mod xml;

use std::{fmt, fs, path::Path as FsPath, str::FromStr};

use serde::{Deserialize, Serialize};

pub use xml::{XmlElement, XmlNode};

use crate::{
    error::{DocumentError, Error, EvalError},
    path::Path,
};

/// Source/rendering format of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Xml,
}

impl Format {
    /// `.xml` files are XML; everything else is treated as JSON.
    pub fn from_path(path: &FsPath) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("xml") => Format::Xml,
            _ => Format::Json,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Xml => "xml",
        }
    }
}

impl FromStr for Format {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "xml" => Ok(Format::Xml),
            other => Err(DocumentError::Shape(format!(
                "unknown document format '{}' (expected json or xml)",
                other
            ))),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A hierarchical document the evaluator reads from and writes to.
///
/// Cloning is a deep copy; the pipeline relies on this to give every node
/// its own intermediate document.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    /// JSON object tree
    Json(serde_json::Value),

    /// XML element tree rooted at the document element
    Xml(XmlElement),
}

impl Document {
    /// Parses JSON text. The root must be an object.
    pub fn from_json_str(text: &str) -> Result<Self, DocumentError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(DocumentError::Shape(
                "JSON document root must be an object".to_string(),
            ));
        }
        Ok(Document::Json(value))
    }

    /// Parses XML text into an owned element tree.
    pub fn from_xml_str(text: &str) -> Result<Self, DocumentError> {
        xml::parse(text).map(Document::Xml)
    }

    pub fn parse(text: &str, format: Format) -> Result<Self, DocumentError> {
        match format {
            Format::Json => Document::from_json_str(text),
            Format::Xml => Document::from_xml_str(text),
        }
    }

    /// Reads a document from disk. Without an explicit format the file
    /// extension decides.
    pub fn load(path: &FsPath, format: Option<Format>) -> Result<Self, Error> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let format = format.unwrap_or_else(|| Format::from_path(path));
        Ok(Document::parse(&text, format)?)
    }

    /// An empty JSON object.
    pub fn empty() -> Self {
        Document::Json(serde_json::Value::Object(serde_json::Map::new()))
    }

    pub fn format(&self) -> Format {
        match self {
            Document::Json(_) => Format::Json,
            Document::Xml(_) => Format::Xml,
        }
    }

    /// Text at `path`, or `""` when any step is missing.
    ///
    /// With `lenient_attributes`, an `@name` step that finds no attribute
    /// reads the same-named child element instead.
    pub fn resolve(&self, path: &Path, lenient_attributes: bool) -> String {
        match self {
            Document::Json(root) => json::resolve(root, path.segments(), lenient_attributes),
            Document::Xml(root) => xml::resolve(root, path.segments(), lenient_attributes),
        }
    }

    /// Convenience lookup by path text, lenient about attributes.
    pub fn get(&self, path: &str) -> String {
        self.resolve(&Path::parse(path), true)
    }

    /// Writes `value` as text at `path`, creating missing containers.
    pub fn set(&mut self, path: &str, value: &str) -> Result<(), EvalError> {
        let target = Path::parse_target(path)?;
        match self {
            Document::Json(root) => json::set(root, target.segments(), value),
            Document::Xml(root) => xml::set(root, target.segments(), value),
        }
    }

    /// Pretty JSON (insertion order kept) or indented XML with declaration.
    pub fn render(&self) -> Result<String, DocumentError> {
        match self {
            Document::Json(root) => Ok(serde_json::to_string_pretty(root)?),
            Document::Xml(root) => xml::render(root),
        }
    }
}

impl From<serde_json::Value> for Document {
    fn from(value: serde_json::Value) -> Self {
        Document::Json(value)
    }
}

impl From<XmlElement> for Document {
    fn from(root: XmlElement) -> Self {
        Document::Xml(root)
    }
}
