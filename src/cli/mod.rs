//! CLI support for quill-lang
//!
//! Provides programmatic access to the quill commands so other tools can
//! run scripts and pipelines without spawning the binary.

mod check;
mod docs;
mod run;

pub use check::{CheckOptions, CheckResult, execute_check};
pub use docs::{DocCategory, function_reference, get_doc_category, get_docs_overview};
pub use run::{DirectorySink, RunOptions, execute_run};

use std::io;

/// Errors that can occur during CLI operations
#[derive(Debug)]
pub enum CliError {
    /// Parse, evaluation, document, config or file error from the library
    Quill(crate::Error),
    /// IO error on stdin/stdout
    Io(io::Error),
    /// No input provided
    NoInput,
    /// Unknown documentation category
    UnknownCategory(String),
}

impl CliError {
    /// Every recognized failure exits with the same status.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Quill(e) => e.exit_code(),
            _ => 2,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Quill(e) => write!(f, "{}", e),
            CliError::Io(e) => write!(f, "IO_ERROR: {}", e),
            CliError::NoInput => write!(
                f,
                "No input document. Use --input or pipe a JSON or XML document to stdin."
            ),
            CliError::UnknownCategory(c) => {
                write!(f, "Unknown category: '{}'\nRun 'quill docs' to see available categories.", c)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Quill(e) => Some(e),
            CliError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<crate::Error> for CliError {
    fn from(e: crate::Error) -> Self {
        CliError::Quill(e)
    }
}

impl From<crate::ParseError> for CliError {
    fn from(e: crate::ParseError) -> Self {
        CliError::Quill(e.into())
    }
}

impl From<crate::EvalError> for CliError {
    fn from(e: crate::EvalError) -> Self {
        CliError::Quill(e.into())
    }
}

impl From<crate::DocumentError> for CliError {
    fn from(e: crate::DocumentError) -> Self {
        CliError::Quill(e.into())
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}
