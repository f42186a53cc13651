pub mod ast;
pub mod config;
pub mod document;
pub mod entities;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod lookup;
pub mod parser;
pub mod path;
pub mod pipeline;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{BinOp, Expr, Token};
pub use config::{EvalOptions, RunConfig, TypeDiscipline};
pub use document::{Document, Format};
pub use error::{DocumentError, Error, ErrorKind, EvalError, Result};
pub use evaluator::{EvalContext, Evaluator};
pub use functions::{Args, Arity, Category, FunctionRegistry};
pub use lexer::{LexError, Lexer, Position};
pub use lookup::{DirectorySource, MemorySource, TableSource};
pub use parser::{ParseError, Parser, parse_script};
pub use pipeline::{Instruction, Node, Pipeline, PipelineReport};
pub use value::Value;
