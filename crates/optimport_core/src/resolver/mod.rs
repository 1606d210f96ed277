//! Optional dependency resolution.

pub mod registry;

pub use registry::{LoadError, ModuleRegistry, ModuleResolver, RegistryError};
