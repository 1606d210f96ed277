//! Optional dependency resolution contracts and in-process registry.
//!
//! # Responsibility
//! - Define the seam through which declaration imports locate modules.
//! - Provide a registry of static modules and fallible loaders.
//!
//! # Invariants
//! - Module names are dotted identifiers and unique within one registry.
//! - Loaders run on every `resolve` call; nothing is cached here.

use crate::value::Module;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

static MODULE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("valid module name regex")
});

/// Why a module could not be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// No module is known under the requested name.
    NotFound,
    /// The module exists but its loader failed.
    Failed(String),
}

/// Locates optional dependencies by fully-qualified dotted name.
pub trait ModuleResolver {
    fn resolve(&self, name: &str) -> Result<Module, LoadError>;
}

type Loader = Arc<dyn Fn() -> Result<Module, String> + Send + Sync>;

#[derive(Clone)]
enum ModuleEntry {
    Static(Module),
    Loader(Loader),
}

/// In-process module registry.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    entries: BTreeMap<String, ModuleEntry>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one ready module under its own name.
    ///
    /// The stored module carries the trimmed name it is registered under.
    pub fn register_module(&mut self, mut module: Module) -> Result<(), RegistryError> {
        let name = self.check_new_name(&module.name)?;
        module.name = name.clone();
        self.entries.insert(name, ModuleEntry::Static(module));
        Ok(())
    }

    /// Registers a loader invoked each time the module is resolved.
    ///
    /// The loaded module is always renamed to `name`.
    pub fn register_loader<F>(&mut self, name: &str, loader: F) -> Result<(), RegistryError>
    where
        F: Fn() -> Result<Module, String> + Send + Sync + 'static,
    {
        let name = self.check_new_name(name)?;
        self.entries.insert(name, ModuleEntry::Loader(Arc::new(loader)));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Returns sorted module names.
    pub fn module_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn check_new_name(&self, name: &str) -> Result<String, RegistryError> {
        let normalized = name.trim();
        if !MODULE_NAME_RE.is_match(normalized) {
            return Err(RegistryError::InvalidModuleName(name.to_string()));
        }
        if self.entries.contains_key(normalized) {
            return Err(RegistryError::DuplicateModuleName(normalized.to_string()));
        }
        Ok(normalized.to_string())
    }
}

impl ModuleResolver for ModuleRegistry {
    fn resolve(&self, name: &str) -> Result<Module, LoadError> {
        let Some(entry) = self.entries.get(name) else {
            debug!("event=module_resolve module=resolver status=not_found name={name}");
            return Err(LoadError::NotFound);
        };
        match entry {
            ModuleEntry::Static(module) => Ok(module.clone()),
            ModuleEntry::Loader(loader) => {
                let mut module = loader().map_err(LoadError::Failed)?;
                module.name = name.to_string();
                Ok(module)
            }
        }
    }
}

impl Debug for ModuleRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Module registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidModuleName(String),
    DuplicateModuleName(String),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidModuleName(value) => write!(f, "module name is invalid: {value}"),
            Self::DuplicateModuleName(value) => {
                write!(f, "module name already registered: {value}")
            }
        }
    }
}

impl Error for RegistryError {}
