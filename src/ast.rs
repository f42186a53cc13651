//! # Quill Expression Language - Abstract Syntax Tree
//!
//! This module defines the Abstract Syntax Tree (AST) for Quill scripts:
//! small, side-effect-free expressions that compute one derived field of a
//! document from other fields.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Expression nodes (literals, paths, operations, calls)
//! - **[operators]** - Binary operators (comparison, arithmetic, logical)
//!
//! ## Quick Start
//!
//! ```text
//! Concat(LetterData/Owner_FirstName, ' ', LetterData/Owner_LastName)
//! ```
//!
//! ## Core Concepts
//!
//! ### Paths
//!
//! A bare identifier, optionally followed by `/segment` parts, reads a field
//! of the document. The last segment may be an attribute (`/@name`) when the
//! document is XML. Missing fields read as the empty string.
//!
//! ### Precedence (lowest to highest)
//!
//! `||`, `&&`, `== != < <= > >=`, `+ -`, `* / %`, unary `-`, primary.
//!
//! ### Functions
//!
//! An identifier directly followed by `(` is a call. Names are resolved
//! case-insensitively, so `if`, `If` and `IF` are the same function.
//!
//! ## Examples
//!
//! ```text
//! if(Length(Zip) <= 5, Zip, Insert(Zip, 6, '-'))
//! Add(2, 3) * 4
//! MaskDateTime(CurrentDate, 'yyyy-MM-dd', 'MMMM dd, yyyy')
//! ```
pub mod expressions;
pub mod operators;
pub mod tokens;

pub use expressions::Expr;
pub use operators::BinOp;
pub use tokens::Token;
