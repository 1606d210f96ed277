//! Evaluation failure taxonomy and three-way classification.
//!
//! # Responsibility
//! - Describe every way a declaration line can fail.
//! - Map an evaluation result onto complete / deferred / structural.
//!
//! # Invariants
//! - Incomplete lines are always structural and never deferred; complete
//!   lines outside the statement set arrive here as runtime failures.
//! - A deferred failure is shared, so every instantiation attempt observes
//!   the identical error value.
//! - Only non-resolution deferred failures request a warning.

use crate::declaration::{SourceLocation, SyntaxError};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Fixed message of the declaration-format error.
pub const DECLARATION_FORMAT_MESSAGE: &str =
    "optional-import declarations must consist of complete single-line statements";

/// What went wrong while executing one declaration line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// A named optional dependency cannot be located.
    ModuleNotFound { module: String },
    /// `from module import name` found neither attribute nor submodule.
    ImportName { module: String, name: String },
    /// The module exists but loading it failed.
    LoadFailed { module: String, reason: String },
    NameNotDefined { name: String },
    AttributeMissing { owner: String, attr: String },
    AssertionFailed { message: Option<String> },
    /// A complete line the statement language cannot execute.
    UnsupportedStatement { detail: String },
}

impl FailureKind {
    pub fn is_resolution_failure(&self) -> bool {
        matches!(self, Self::ModuleNotFound { .. })
    }
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ModuleNotFound { module } => write!(f, "no module named `{module}`"),
            Self::ImportName { module, name } => {
                write!(f, "cannot import name `{name}` from `{module}`")
            }
            Self::LoadFailed { module, reason } => {
                write!(f, "failed to load module `{module}`: {reason}")
            }
            Self::NameNotDefined { name } => write!(f, "name `{name}` is not defined"),
            Self::AttributeMissing { owner, attr } => {
                write!(f, "`{owner}` has no attribute `{attr}`")
            }
            Self::AssertionFailed { message: Some(message) } => {
                write!(f, "assertion failed: {message}")
            }
            Self::AssertionFailed { message: None } => write!(f, "assertion failed"),
            Self::UnsupportedStatement { detail } => write!(f, "{detail}"),
        }
    }
}

/// Runtime failure of one declaration line, with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationError {
    pub kind: FailureKind,
    pub location: SourceLocation,
    pub line: String,
}

impl Display for EvaluationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl Error for EvaluationError {}

/// Malformed declaration; raised at class-definition time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationFormatError {
    pub location: SourceLocation,
    pub line: String,
    pub syntax: SyntaxError,
}

impl Display for DeclarationFormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(DECLARATION_FORMAT_MESSAGE)
    }
}

impl Error for DeclarationFormatError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.syntax)
    }
}

/// Failure reported by the line evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineFailure {
    Syntax(DeclarationFormatError),
    Runtime(EvaluationError),
}

/// Captured failure replayed on every instantiation attempt.
#[derive(Debug, Clone)]
pub struct DeferredFailure(Arc<EvaluationError>);

impl DeferredFailure {
    pub fn new(error: EvaluationError) -> Self {
        Self(Arc::new(error))
    }

    pub fn error(&self) -> &EvaluationError {
        &self.0
    }

    pub fn is_resolution_failure(&self) -> bool {
        self.0.kind.is_resolution_failure()
    }

    /// True when both handles carry the very same captured failure.
    pub fn is_same(&self, other: &DeferredFailure) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for DeferredFailure {
    fn eq(&self, other: &Self) -> bool {
        self.is_same(other) || self.0 == other.0
    }
}

impl Display for DeferredFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error for DeferredFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.0.as_ref())
    }
}

/// Outcome channel for one declaration evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Every line ran; the namespace keeps its bindings.
    Complete,
    /// The class becomes a placeholder carrying `failure`.
    Deferred { failure: DeferredFailure, warn: bool },
    /// The declaration itself is malformed.
    Structural(DeclarationFormatError),
}

pub fn classify(result: Result<(), LineFailure>) -> Classification {
    match result {
        Ok(()) => Classification::Complete,
        Err(LineFailure::Syntax(err)) => Classification::Structural(err),
        Err(LineFailure::Runtime(err)) => {
            let warn = !err.kind.is_resolution_failure();
            Classification::Deferred {
                failure: DeferredFailure::new(err),
                warn,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        classify, Classification, DeclarationFormatError, DeferredFailure, EvaluationError,
        FailureKind, LineFailure, DECLARATION_FORMAT_MESSAGE,
    };
    use crate::declaration::{SourceLocation, SyntaxError};

    fn runtime(kind: FailureKind) -> EvaluationError {
        EvaluationError {
            kind,
            location: SourceLocation::new("decl.rs", 4),
            line: "import x".to_string(),
        }
    }

    #[test]
    fn success_is_complete() {
        assert_eq!(classify(Ok(())), Classification::Complete);
    }

    #[test]
    fn resolution_failure_defers_without_warning() {
        let outcome = classify(Err(LineFailure::Runtime(runtime(
            FailureKind::ModuleNotFound {
                module: "x".to_string(),
            },
        ))));
        let Classification::Deferred { failure, warn } = outcome else {
            panic!("expected deferred outcome");
        };
        assert!(!warn);
        assert!(failure.is_resolution_failure());
    }

    #[test]
    fn other_runtime_failure_defers_with_warning() {
        let outcome = classify(Err(LineFailure::Runtime(runtime(
            FailureKind::NameNotDefined {
                name: "y".to_string(),
            },
        ))));
        assert!(matches!(
            outcome,
            Classification::Deferred { warn: true, .. }
        ));
    }

    #[test]
    fn unsupported_statement_defers_with_warning() {
        let outcome = classify(Err(LineFailure::Runtime(runtime(
            FailureKind::UnsupportedStatement {
                detail: "invalid token `+` at column 7".to_string(),
            },
        ))));
        assert!(matches!(
            outcome,
            Classification::Deferred { warn: true, .. }
        ));
    }

    #[test]
    fn syntax_failure_is_structural_with_fixed_message() {
        let err = DeclarationFormatError {
            location: SourceLocation::new("decl.rs", 2),
            line: "x = [1,".to_string(),
            syntax: SyntaxError::UnbalancedBrackets,
        };
        let outcome = classify(Err(LineFailure::Syntax(err)));
        let Classification::Structural(err) = outcome else {
            panic!("expected structural outcome");
        };
        assert_eq!(err.to_string(), DECLARATION_FORMAT_MESSAGE);
    }

    #[test]
    fn deferred_failure_clones_share_identity() {
        let failure = DeferredFailure::new(runtime(FailureKind::AssertionFailed { message: None }));
        let copy = failure.clone();
        assert!(failure.is_same(&copy));

        let other = DeferredFailure::new(runtime(FailureKind::AssertionFailed { message: None }));
        assert!(!failure.is_same(&other));
        assert_eq!(failure, other);
    }

    #[test]
    fn failure_kind_serializes_with_tag() {
        let value = serde_json::to_value(FailureKind::ModuleNotFound {
            module: "nonexistent_pkg".to_string(),
        })
        .expect("serialize kind");
        assert_eq!(value["kind"], "module_not_found");
        assert_eq!(value["module"], "nonexistent_pkg");
    }
}
