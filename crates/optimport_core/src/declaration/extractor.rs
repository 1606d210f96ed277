//! Declaration source isolation and normalization.
//!
//! # Responsibility
//! - Hold the raw routine text attached to a class, with its origin.
//! - Strip the signature line and one uniform level of indentation.
//!
//! # Invariants
//! - Body line `n` (zero-based) reports `signature_line + 1 + n`.
//! - Failing to locate the routine is internal, never a format error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Recognized name of the declaration routine.
pub const IMPORTS_ROUTINE: &str = "__imports__";

static SIGNATURE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*def\s+__imports__\s*\(\s*[A-Za-z_][A-Za-z0-9_]*\s*\)\s*(->\s*[^:#]+)?:\s*(#.*)?$",
    )
    .expect("valid signature regex")
});

/// Originating source identity and line of a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl Display for SourceLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Raw optional-import routine attached to a class.
///
/// The text starts with the routine signature (`def __imports__(self):`)
/// followed by its indented body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    origin: SourceLocation,
    text: String,
}

impl Declaration {
    pub fn new(file: impl Into<String>, line: u32, text: impl Into<String>) -> Self {
        Self {
            origin: SourceLocation::new(file, line),
            text: text.into(),
        }
    }

    pub fn origin(&self) -> &SourceLocation {
        &self.origin
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Builds a [`Declaration`] whose origin is the invocation line.
///
/// The first line of the text is taken to sit on the line of `declaration!(`,
/// so the literal must open on that same line for reported line numbers to
/// match the file. A literal that opens with a newline, as in
/// `declaration!(r#"` followed by the signature, is accounted for by skipping
/// leading blank lines during extraction.
#[macro_export]
macro_rules! declaration {
    ($text:expr) => {
        $crate::declaration::Declaration::new(file!(), line!(), $text)
    };
}

/// Normalized declaration body ready for line evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedBody {
    signature: SourceLocation,
    lines: Vec<String>,
}

impl ExtractedBody {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Location of the signature line.
    pub fn signature(&self) -> &SourceLocation {
        &self.signature
    }

    /// Location of one zero-based body line.
    pub fn location_of(&self, index: usize) -> SourceLocation {
        let offset = u32::try_from(index).unwrap_or(u32::MAX - 1);
        SourceLocation::new(
            self.signature.file.clone(),
            self.signature.line.saturating_add(1).saturating_add(offset),
        )
    }
}

/// Internal failure to locate the declaration routine text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    EmptySource(SourceLocation),
    MissingSignature(SourceLocation),
}

impl Display for ExtractError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySource(origin) => {
                write!(f, "declaration routine source is empty at {origin}")
            }
            Self::MissingSignature(origin) => write!(
                f,
                "could not locate `{IMPORTS_ROUTINE}` routine signature at {origin}"
            ),
        }
    }
}

impl Error for ExtractError {}

/// Isolates and dedents the body of one declaration routine.
pub fn extract(declaration: &Declaration) -> Result<ExtractedBody, ExtractError> {
    let origin = declaration.origin();
    let mut raw_lines = declaration.text().lines().peekable();

    let mut signature_line = origin.line;
    while raw_lines.peek().is_some_and(|line| line.trim().is_empty()) {
        raw_lines.next();
        signature_line = signature_line.saturating_add(1);
    }

    let Some(signature) = raw_lines.next() else {
        return Err(ExtractError::EmptySource(origin.clone()));
    };
    let signature_origin = SourceLocation::new(origin.file.clone(), signature_line);
    if !SIGNATURE_RE.is_match(signature) {
        return Err(ExtractError::MissingSignature(signature_origin));
    }

    let body: Vec<&str> = raw_lines.collect();
    Ok(ExtractedBody {
        signature: signature_origin,
        lines: dedent(&body),
    })
}

/// Removes the whitespace prefix shared by every non-blank line.
fn dedent(lines: &[&str]) -> Vec<String> {
    let mut margin: Option<&str> = None;
    for line in lines.iter().copied().filter(|line| !line.trim().is_empty()) {
        let indent = &line[..line.len() - line.trim_start().len()];
        margin = Some(match margin {
            None => indent,
            Some(current) => common_prefix(current, indent),
        });
    }
    let margin = margin.unwrap_or("");

    lines
        .iter()
        .copied()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                line.strip_prefix(margin).unwrap_or(line).to_string()
            }
        })
        .collect()
}

fn common_prefix<'a>(left: &'a str, right: &str) -> &'a str {
    let shared = left
        .char_indices()
        .zip(right.chars())
        .take_while(|((_, a), b)| a == b)
        .last()
        .map(|((index, c), _)| index + c.len_utf8())
        .unwrap_or(0);
    &left[..shared]
}
