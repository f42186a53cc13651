//! Evaluation options and run configuration.
//!
//! Everything here deserializes from JSON with every field optional, so a
//! config file only has to mention what it changes:
//!
//! ```json
//! {
//!   "options": { "discipline": "strict", "now": "2024-03-01T09:30:00" },
//!   "tables_dir": "reference-data"
//! }
//! ```

use std::{fs, path::Path as FsPath, path::PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// How operators treat operands of differing variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeDiscipline {
    /// Strings coerce to numbers and booleans where their text allows
    #[default]
    Coercive,

    /// Operands must already have the variant the operator needs
    Strict,
}

/// Knobs that change evaluation results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalOptions {
    pub discipline: TypeDiscipline,

    /// Read a same-named child element when an `@attribute` is absent
    pub lenient_attributes: bool,

    /// Turn a failed call with a blank string argument into `""`
    pub recover_blank_arguments: bool,

    /// Fixed clock for `Now`; the local system clock when absent
    pub now: Option<NaiveDateTime>,
}

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions {
            discipline: TypeDiscipline::Coercive,
            lenient_attributes: true,
            recover_blank_arguments: true,
            now: None,
        }
    }
}

impl EvalOptions {
    pub fn strict() -> Self {
        EvalOptions {
            discipline: TypeDiscipline::Strict,
            ..Default::default()
        }
    }
}

/// Configuration for a `quill run`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub options: EvalOptions,

    /// Directory holding `Lookups/` and `LookupConfigs/`
    pub tables_dir: Option<PathBuf>,

    /// Directory that receives per-instruction snapshots
    pub intermediate_dir: Option<PathBuf>,
}

impl RunConfig {
    pub fn from_json_str(text: &str) -> Result<Self, Error> {
        serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn load(path: &FsPath) -> Result<Self, Error> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        RunConfig::from_json_str(&text)
    }
}

#[test]
fn test_partial_config() {
    let config = RunConfig::from_json_str(r#"{"options": {"discipline": "strict"}}"#).unwrap();
    assert_eq!(config.options.discipline, TypeDiscipline::Strict);
    assert!(config.options.lenient_attributes);
    assert!(config.options.recover_blank_arguments);
    assert_eq!(config.tables_dir, None);
}
