//! Definition-time optional imports for runtime classes.
//!
//! A class built through [`ClassAugmentor`] may carry one declaration
//! routine. Its body runs once, line by line, and its bindings become class
//! attributes. A malformed declaration fails the definition; a missing or
//! broken optional dependency turns the class into a placeholder whose
//! construction returns the captured failure.

pub mod class;
pub mod declaration;
pub mod eval;
pub mod logging;
pub mod resolver;
pub mod value;

pub use class::{
    AugmentError, AugmentWarning, Class, ClassAugmentor, ClassBuilder, ClassId,
    CollectingWarningSink, DefinedClass, Instance, LogWarningSink, Namespace, UnavailableClass,
    WarningSink,
};
pub use declaration::{Declaration, SourceLocation, IMPORTS_ROUTINE};
pub use eval::{
    DeclarationFormatError, DeferredFailure, EvaluationError, FailureKind,
    DECLARATION_FORMAT_MESSAGE,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use resolver::{LoadError, ModuleRegistry, ModuleResolver, RegistryError};
pub use value::{Module, Value};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
