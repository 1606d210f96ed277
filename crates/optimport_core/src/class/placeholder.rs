//! Stand-in for a class whose declaration deferred a failure.

use crate::class::model::{ClassId, Instance};
use crate::eval::DeferredFailure;
use uuid::Uuid;

/// Inert placeholder type.
///
/// Referencing it is harmless; constructing it always returns the captured
/// failure, unmodified.
#[derive(Debug)]
pub struct UnavailableClass {
    id: ClassId,
    name: String,
    failure: DeferredFailure,
}

impl UnavailableClass {
    pub(crate) fn new(name: String, failure: DeferredFailure) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            failure,
        }
    }

    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn failure(&self) -> &DeferredFailure {
        &self.failure
    }

    pub fn instantiate(&self) -> Result<Instance, DeferredFailure> {
        Err(self.failure.clone())
    }
}
