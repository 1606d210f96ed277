//! Warning channel for deferred, non-resolution failures.
//!
//! # Responsibility
//! - Carry one structured warning per deferred evaluation failure.
//! - Route warnings to the `log` facade by default.
//!
//! # Invariants
//! - Every warning names the originating source file and line.

use crate::declaration::SourceLocation;
use crate::eval::DeferredFailure;
use crate::logging::sanitize_message;
use log::warn;
use serde::Serialize;
use std::sync::Mutex;

const MAX_WARNING_MESSAGE_CHARS: usize = 240;

/// Diagnostic emitted when a class is poisoned by a non-resolution failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AugmentWarning {
    pub class_name: String,
    pub location: SourceLocation,
    pub message: String,
}

impl AugmentWarning {
    pub fn from_failure(class_name: &str, failure: &DeferredFailure) -> Self {
        let error = failure.error();
        Self {
            class_name: class_name.to_string(),
            location: error.location.clone(),
            message: error.to_string(),
        }
    }
}

/// Receives definition-time warnings.
pub trait WarningSink: Send + Sync {
    fn emit(&self, warning: &AugmentWarning);
}

/// Default sink writing through `log::warn!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWarningSink;

impl WarningSink for LogWarningSink {
    fn emit(&self, warning: &AugmentWarning) {
        warn!(
            "event=optional_import_failed module=augment status=deferred class={} file={} line={} error={}",
            warning.class_name,
            warning.location.file,
            warning.location.line,
            sanitize_message(&warning.message, MAX_WARNING_MESSAGE_CHARS)
        );
    }
}

/// Sink that keeps every warning in memory.
#[derive(Debug, Default)]
pub struct CollectingWarningSink {
    warnings: Mutex<Vec<AugmentWarning>>,
}

impl CollectingWarningSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of warnings received so far.
    pub fn warnings(&self) -> Vec<AugmentWarning> {
        self.warnings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl WarningSink for CollectingWarningSink {
    fn emit(&self, warning: &AugmentWarning) {
        self.warnings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(warning.clone());
    }
}
