//! Declaration evaluation and outcome classification.

pub mod evaluator;
pub mod failure;

pub use evaluator::LineEvaluator;
pub use failure::{
    classify, Classification, DeclarationFormatError, DeferredFailure, EvaluationError,
    FailureKind, LineFailure, DECLARATION_FORMAT_MESSAGE,
};
