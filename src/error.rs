use std::{fmt, io, path::PathBuf};

use thiserror::Error;

use crate::parser::ParseError;

/// Error kind, independent of which enum carried it.
///
/// The string form is the prefix every error message starts with, so both
/// programs (`kind()`) and people (`grep TYPE_ERROR`) can classify failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Parse,
    Type,
    Arity,
    DivideByZero,
    Range,
    Domain,
    UnknownFunction,
    Path,
    InvalidPath,
    Io,
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Parse => "PARSE_ERROR",
            ErrorKind::Type => "TYPE_ERROR",
            ErrorKind::Arity => "ARITY_MISMATCH",
            ErrorKind::DivideByZero => "DIVIDE_BY_ZERO",
            ErrorKind::Range => "RANGE_ERROR",
            ErrorKind::Domain => "DOMAIN_ERROR",
            ErrorKind::UnknownFunction => "UNKNOWN_FUNCTION",
            ErrorKind::Path => "PATH_ERROR",
            ErrorKind::InvalidPath => "INVALID_PATH",
            ErrorKind::Io => "IO_ERROR",
            ErrorKind::Config => "CONFIG_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while evaluating an expression or writing its result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// Operand or argument of the wrong variant
    #[error("TYPE_ERROR: {0}")]
    Type(String),

    /// Wrong number of arguments for a function
    #[error("ARITY_MISMATCH: '{function}' expects {expected} argument(s), got {found}")]
    Arity {
        function: String,
        expected: String,
        found: usize,
    },

    /// Division or modulus by exactly zero
    #[error("DIVIDE_BY_ZERO: division by zero")]
    DivideByZero,

    /// Index, scale or magnitude out of bounds
    #[error("RANGE_ERROR: {0}")]
    Range(String),

    /// Value that is well-typed but meaningless for the function
    #[error("DOMAIN_ERROR: {0}")]
    Domain(String),

    /// No function registered under this name
    #[error("UNKNOWN_FUNCTION: '{0}'")]
    UnknownFunction(String),

    /// A target path cannot be written into the document
    #[error("PATH_ERROR: {0}")]
    Path(String),

    /// A target path is empty or malformed
    #[error("INVALID_PATH: {0}")]
    InvalidPath(String),

    /// An external resource (lookup table) could not be read
    #[error("IO_ERROR: {0}")]
    Io(String),
}

impl EvalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvalError::Type(_) => ErrorKind::Type,
            EvalError::Arity { .. } => ErrorKind::Arity,
            EvalError::DivideByZero => ErrorKind::DivideByZero,
            EvalError::Range(_) => ErrorKind::Range,
            EvalError::Domain(_) => ErrorKind::Domain,
            EvalError::UnknownFunction(_) => ErrorKind::UnknownFunction,
            EvalError::Path(_) => ErrorKind::Path,
            EvalError::InvalidPath(_) => ErrorKind::InvalidPath,
            EvalError::Io(_) => ErrorKind::Io,
        }
    }

    /// Argument `position` (1-based) of `function` has the wrong type.
    pub fn argument(function: &str, position: usize, expected: &str, found: &str) -> Self {
        EvalError::Type(format!(
            "'{}' argument {} must be {}, got {}",
            function, position, expected, found
        ))
    }
}

/// Errors raised while loading or rendering a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("DOCUMENT_ERROR: invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("DOCUMENT_ERROR: invalid XML: {0}")]
    Xml(String),

    #[error("DOCUMENT_ERROR: {0}")]
    Shape(String),
}

/// Any failure the library can report.
///
/// Every variant is a recognized error; [`Error::exit_code`] maps them all
/// to the same process status.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("CONFIG_ERROR: {0}")]
    Config(String),

    #[error("IO_ERROR: {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A failure inside one pipeline instruction
    #[error("node {node}, instruction {instruction} (path '{path}'): {source}")]
    Instruction {
        node: usize,
        instruction: usize,
        path: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Parse(_) => ErrorKind::Parse,
            Error::Eval(e) => e.kind(),
            Error::Document(_) => ErrorKind::Parse,
            Error::Config(_) => ErrorKind::Config,
            Error::Io { .. } => ErrorKind::Io,
            Error::Instruction { source, .. } => source.kind(),
        }
    }

    /// Process exit status for a recognized error.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
