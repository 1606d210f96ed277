//! Class model and definition-time augmentation.
//!
//! # Responsibility
//! - Model classes as builder-produced runtime values.
//! - Apply optional-import declarations when opted-in classes are defined.
//!
//! # See also
//! - `eval` for the line evaluator and failure channels.

pub mod augmentor;
pub mod model;
pub mod placeholder;
pub mod warning;

pub use augmentor::{AugmentError, ClassAugmentor, DefinedClass};
pub use model::{Class, ClassBuilder, ClassId, Instance, Namespace};
pub use placeholder::UnavailableClass;
pub use warning::{AugmentWarning, CollectingWarningSink, LogWarningSink, WarningSink};
