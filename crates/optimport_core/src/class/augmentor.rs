//! Definition-time augmentation of opted-in classes.
//!
//! # Responsibility
//! - Intercept class creation before the class value exists.
//! - Run the attached declaration and finalize, fail, or substitute a
//!   placeholder according to the failure channel.
//!
//! # Invariants
//! - The declaration routine name never survives as a class attribute.
//! - No partially-augmented class is ever returned: either every binding
//!   lands in the finished class, or the whole class is a placeholder.
//! - Exactly one warning is emitted per non-resolution deferred failure.

use crate::class::model::{Class, ClassBuilder, ClassId, Instance};
use crate::class::placeholder::UnavailableClass;
use crate::class::warning::{AugmentWarning, LogWarningSink, WarningSink};
use crate::declaration::{extract, ExtractError, IMPORTS_ROUTINE};
use crate::eval::{
    classify, Classification, DeclarationFormatError, DeferredFailure, LineEvaluator,
};
use crate::resolver::ModuleResolver;
use log::{debug, error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Result of defining a class through the augmentor.
#[derive(Debug, Clone)]
pub enum DefinedClass {
    Ready(Arc<Class>),
    Unavailable(Arc<UnavailableClass>),
}

impl DefinedClass {
    pub fn name(&self) -> &str {
        match self {
            Self::Ready(class) => class.name(),
            Self::Unavailable(placeholder) => placeholder.name(),
        }
    }

    pub fn id(&self) -> ClassId {
        match self {
            Self::Ready(class) => class.id(),
            Self::Unavailable(placeholder) => placeholder.id(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Constructs an instance, or returns the deferred failure.
    pub fn instantiate(&self) -> Result<Instance, DeferredFailure> {
        match self {
            Self::Ready(class) => Ok(class.instantiate()),
            Self::Unavailable(placeholder) => placeholder.instantiate(),
        }
    }

    /// Usable class handle, e.g. to derive a subclass from.
    pub fn class(&self) -> Result<&Arc<Class>, DeferredFailure> {
        match self {
            Self::Ready(class) => Ok(class),
            Self::Unavailable(placeholder) => Err(placeholder.failure().clone()),
        }
    }
}

/// Errors raised immediately at class-definition time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AugmentError {
    /// The declaration contains a line that is not a complete statement.
    DeclarationFormat(DeclarationFormatError),
    /// The declaration routine text could not be located.
    SourceUnavailable(ExtractError),
}

impl Display for AugmentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeclarationFormat(err) => write!(f, "{err}"),
            Self::SourceUnavailable(err) => write!(f, "internal augmentation error: {err}"),
        }
    }
}

impl Error for AugmentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::DeclarationFormat(err) => Some(err),
            Self::SourceUnavailable(err) => Some(err),
        }
    }
}

impl From<DeclarationFormatError> for AugmentError {
    fn from(value: DeclarationFormatError) -> Self {
        Self::DeclarationFormat(value)
    }
}

/// Defines opted-in classes, applying their optional-import declarations.
pub struct ClassAugmentor<'r> {
    resolver: &'r dyn ModuleResolver,
    sink: Arc<dyn WarningSink>,
}

impl<'r> ClassAugmentor<'r> {
    /// Creates an augmentor that reports warnings through the `log` facade.
    ///
    /// Warnings are dropped when the host has no `log` backend installed.
    /// Call [`crate::init_logging`] first, or pass a sink through
    /// [`ClassAugmentor::with_warning_sink`].
    ///
    /// ```
    /// use optimport_core::{
    ///     declaration, ClassAugmentor, ClassBuilder, CollectingWarningSink, ModuleRegistry,
    /// };
    /// use std::sync::Arc;
    ///
    /// let registry = ModuleRegistry::new();
    /// let sink = Arc::new(CollectingWarningSink::new());
    /// let augmentor = ClassAugmentor::new(&registry).with_warning_sink(sink.clone());
    /// let defined = augmentor
    ///     .define(ClassBuilder::new("Quiet").imports(declaration!(
    ///         "def __imports__(self):\n    b = missing\n"
    ///     )))
    ///     .expect("definition succeeds");
    /// assert!(!defined.is_available());
    /// assert_eq!(sink.warnings().len(), 1);
    /// ```
    pub fn new(resolver: &'r dyn ModuleResolver) -> Self {
        Self {
            resolver,
            sink: Arc::new(LogWarningSink),
        }
    }

    /// Replaces the default `log`-backed warning channel.
    pub fn with_warning_sink(mut self, sink: Arc<dyn WarningSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Creates the class described by `builder`.
    ///
    /// # Errors
    /// - `DeclarationFormat` when a declaration line is not a complete
    ///   single-line statement.
    /// - `SourceUnavailable` when the declaration routine cannot be located.
    pub fn define(&self, builder: ClassBuilder) -> Result<DefinedClass, AugmentError> {
        let (name, bases, mut namespace, declaration) = builder.into_parts();
        let Some(declaration) = declaration else {
            return Ok(DefinedClass::Ready(Class::finalize(name, bases, namespace)));
        };
        namespace.remove(IMPORTS_ROUTINE);
        debug!(
            "event=augment_start module=augment class={} origin={}",
            name,
            declaration.origin()
        );

        let body = extract(&declaration).map_err(|err| {
            error!("event=augment_extract module=augment status=error class={name} error={err}");
            AugmentError::SourceUnavailable(err)
        })?;

        let result = LineEvaluator::new(self.resolver).evaluate(&body, &mut namespace);
        namespace.remove(IMPORTS_ROUTINE);

        match classify(result) {
            Classification::Complete => {
                info!(
                    "event=augment_done module=augment status=ok class={} bindings={}",
                    name,
                    namespace.len()
                );
                Ok(DefinedClass::Ready(Class::finalize(name, bases, namespace)))
            }
            Classification::Structural(err) => {
                info!(
                    "event=augment_done module=augment status=error class={} location={}",
                    name, err.location
                );
                Err(err.into())
            }
            Classification::Deferred { failure, warn } => {
                if warn {
                    self.sink.emit(&AugmentWarning::from_failure(&name, &failure));
                }
                info!(
                    "event=augment_done module=augment status=deferred class={} location={}",
                    name,
                    failure.error().location
                );
                Ok(DefinedClass::Unavailable(Arc::new(UnavailableClass::new(
                    name, failure,
                ))))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AugmentError, ClassAugmentor, DefinedClass};
    use crate::class::model::ClassBuilder;
    use crate::class::warning::CollectingWarningSink;
    use crate::declaration::{Declaration, IMPORTS_ROUTINE};
    use crate::resolver::ModuleRegistry;
    use crate::value::Value;
    use std::sync::Arc;

    fn declaration(body: &str) -> Declaration {
        Declaration::new("augmentor.rs", 20, format!("def __imports__(self):\n{body}"))
    }

    #[test]
    fn class_without_declaration_is_unmodified() {
        let registry = ModuleRegistry::new();
        let defined = ClassAugmentor::new(&registry)
            .define(ClassBuilder::new("Plain").attr("x", 1_i64))
            .expect("define plain class");
        let DefinedClass::Ready(class) = defined else {
            panic!("plain class must be ready");
        };
        assert_eq!(class.own_attrs().names().collect::<Vec<_>>(), vec!["x"]);
    }

    #[test]
    fn preset_routine_attribute_is_stripped() {
        let registry = ModuleRegistry::new();
        let defined = ClassAugmentor::new(&registry)
            .define(
                ClassBuilder::new("Shadow")
                    .attr(IMPORTS_ROUTINE, "stale")
                    .imports(declaration("    __imports__ = 1\n    y = 2\n")),
            )
            .expect("define class");
        let class = defined.class().expect("ready class");
        assert!(!class.has_attr(IMPORTS_ROUTINE));
        assert_eq!(class.get_attr("y"), Some(&Value::Int(2)));
    }

    #[test]
    fn missing_signature_is_internal_error() {
        let registry = ModuleRegistry::new();
        let err = ClassAugmentor::new(&registry)
            .define(
                ClassBuilder::new("Broken")
                    .imports(Declaration::new("augmentor.rs", 1, "a = 1\n")),
            )
            .expect_err("missing signature must fail");
        assert!(matches!(err, AugmentError::SourceUnavailable(_)));
    }

    #[test]
    fn resolution_failure_emits_no_warning() {
        let registry = ModuleRegistry::new();
        let sink = Arc::new(CollectingWarningSink::new());
        let defined = ClassAugmentor::new(&registry)
            .with_warning_sink(sink.clone())
            .define(ClassBuilder::new("Lazy").imports(declaration("    import absent\n")))
            .expect("definition succeeds");
        assert!(!defined.is_available());
        assert!(sink.warnings().is_empty());
        let err = defined.class().expect_err("placeholder has no usable class");
        assert!(err.is_resolution_failure());
    }

    #[test]
    fn other_failure_emits_one_warning_with_line() {
        let registry = ModuleRegistry::new();
        let sink = Arc::new(CollectingWarningSink::new());
        let defined = ClassAugmentor::new(&registry)
            .with_warning_sink(sink.clone())
            .define(
                ClassBuilder::new("Noisy").imports(declaration("    a = 1\n    b = missing\n")),
            )
            .expect("definition succeeds");
        assert_eq!(defined.name(), "Noisy");

        let warnings = sink.warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].location.file, "augmentor.rs");
        assert_eq!(warnings[0].location.line, 22);
    }
}
