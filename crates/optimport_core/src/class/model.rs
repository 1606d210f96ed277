//! Runtime class model.
//!
//! # Responsibility
//! - Represent classes as values produced by an explicit builder.
//! - Resolve attributes through instance, own namespace, then bases.
//!
//! # Invariants
//! - A finalized `Class` is immutable and shared through `Arc`.
//! - Bases are searched depth-first, left to right.
//!
//! # See also
//! - `class::augmentor` for the opted-in definition path.

use crate::declaration::Declaration;
use crate::value::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Identity of one class definition.
///
/// Two definitions with the same name are still distinct types.
pub type ClassId = Uuid;

/// Mutable name-to-value mapping that becomes a class's attribute set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Namespace {
    bindings: BTreeMap<String, Value>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    /// Binds `name`, returning the previous value if any.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.bindings.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.bindings.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Sorted bound names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }
}

/// A finalized, usable class.
#[derive(Debug)]
pub struct Class {
    id: ClassId,
    name: String,
    bases: Vec<Arc<Class>>,
    namespace: Namespace,
}

impl Class {
    pub(crate) fn finalize(name: String, bases: Vec<Arc<Class>>, namespace: Namespace) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            name,
            bases,
            namespace,
        })
    }

    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bases(&self) -> &[Arc<Class>] {
        &self.bases
    }

    /// Attributes defined directly on this class.
    pub fn own_attrs(&self) -> &Namespace {
        &self.namespace
    }

    /// Looks up an attribute on this class or its ancestors.
    pub fn get_attr(&self, name: &str) -> Option<&Value> {
        if let Some(value) = self.namespace.get(name) {
            return Some(value);
        }
        self.bases.iter().find_map(|base| base.get_attr(name))
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.get_attr(name).is_some()
    }

    /// True when `other` is this class or one of its ancestors.
    pub fn is_subclass_of(&self, other: &Class) -> bool {
        self.id == other.id || self.bases.iter().any(|base| base.is_subclass_of(other))
    }

    pub fn instantiate(self: &Arc<Self>) -> Instance {
        Instance {
            class: Arc::clone(self),
            attrs: Namespace::new(),
        }
    }
}

/// One instance of a usable class.
#[derive(Debug, Clone)]
pub struct Instance {
    class: Arc<Class>,
    attrs: Namespace,
}

impl Instance {
    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    /// Instance attribute first, then the class chain.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name).or_else(|| self.class.get_attr(name))
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attrs.set(name, value);
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// Collects the parts of a class before it exists.
#[derive(Debug, Clone)]
pub struct ClassBuilder {
    name: String,
    bases: Vec<Arc<Class>>,
    namespace: Namespace,
    declaration: Option<Declaration>,
}

impl ClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bases: Vec::new(),
            namespace: Namespace::new(),
            declaration: None,
        }
    }

    pub fn base(mut self, base: &Arc<Class>) -> Self {
        self.bases.push(Arc::clone(base));
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.namespace.set(name, value);
        self
    }

    /// Attaches the optional-import declaration routine.
    ///
    /// A second call replaces the first: a class declares exactly one.
    pub fn imports(mut self, declaration: Declaration) -> Self {
        self.declaration = Some(declaration);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_declaration(&self) -> bool {
        self.declaration.is_some()
    }

    /// Builds the class without the optional-import mechanism.
    ///
    /// An attached declaration is dropped unevaluated.
    pub fn finish(self) -> Arc<Class> {
        Class::finalize(self.name, self.bases, self.namespace)
    }

    pub(crate) fn into_parts(self) -> (String, Vec<Arc<Class>>, Namespace, Option<Declaration>) {
        (self.name, self.bases, self.namespace, self.declaration)
    }
}
