//! Declaration text handling.
//!
//! # Responsibility
//! - Isolate the optional-import routine body attached to a class.
//! - Tokenize and parse that body one physical line at a time.
//!
//! # See also
//! - `eval` for how parsed lines run against a namespace.

pub mod extractor;
pub mod lexer;
pub mod parser;

pub use extractor::{
    extract, Declaration, ExtractError, ExtractedBody, SourceLocation, IMPORTS_ROUTINE,
};
pub use parser::{parse_line, Statement, SyntaxError};
