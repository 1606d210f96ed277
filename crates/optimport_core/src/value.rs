//! Runtime values bound into class namespaces.
//!
//! # Responsibility
//! - Define the closed set of values a declaration line can produce.
//! - Model resolved modules as named, immutable attribute maps.
//!
//! # Invariants
//! - A `Module` is never mutated after the resolver hands it out.
//! - Truthiness follows the declaration language rules (`None`, `False`,
//!   zero and empty containers are falsy).

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// One value stored in a namespace or module.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Module(Arc<Module>),
}

impl Value {
    /// Short type label used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Module(_) => "module",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(value) => *value,
            Self::Int(value) => *value != 0,
            Self::Float(value) => *value != 0.0,
            Self::Str(value) => !value.is_empty(),
            Self::List(items) | Self::Tuple(items) => !items.is_empty(),
            Self::Module(_) => true,
        }
    }

    pub fn as_module(&self) -> Option<&Arc<Module>> {
        match self {
            Self::Module(module) => Some(module),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Module> for Value {
    fn from(value: Module) -> Self {
        Self::Module(Arc::new(value))
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Bool(true) => write!(f, "True"),
            Self::Bool(false) => write!(f, "False"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value:?}"),
            Self::Str(value) => write!(f, "{value:?}"),
            Self::List(items) => {
                write!(f, "[")?;
                write_items(f, items)?;
                write!(f, "]")
            }
            Self::Tuple(items) => {
                write!(f, "(")?;
                write_items(f, items)?;
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Self::Module(module) => write!(f, "<module '{}'>", module.name),
        }
    }
}

fn write_items(f: &mut Formatter<'_>, items: &[Value]) -> std::fmt::Result {
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// A loaded optional dependency.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// Fully-qualified dotted name, e.g. `numpy.linalg`.
    pub name: String,
    attrs: BTreeMap<String, Value>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: BTreeMap::new(),
        }
    }

    /// Builder-style attribute insertion.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn attr_names(&self) -> impl Iterator<Item = &str> {
        self.attrs.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::{Module, Value};

    #[test]
    fn truthiness_matches_declaration_rules() {
        assert!(!Value::None.is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(Value::Tuple(vec![Value::None]).is_truthy());
        assert!(Value::from(Module::new("random")).is_truthy());
    }

    #[test]
    fn display_renders_literal_forms() {
        let value = Value::List(vec![Value::Int(1), Value::from("a"), Value::Bool(true)]);
        assert_eq!(value.to_string(), "[1, \"a\", True]");
        assert_eq!(Value::Tuple(vec![Value::Int(1)]).to_string(), "(1,)");
        assert_eq!(
            Value::from(Module::new("json")).to_string(),
            "<module 'json'>"
        );
    }

    #[test]
    fn module_exposes_registered_attributes() {
        let module = Module::new("random").with_attr("seed", 7_i64);
        assert_eq!(module.attr("seed"), Some(&Value::Int(7)));
        assert_eq!(module.attr("missing"), None);
        assert_eq!(module.attr_names().collect::<Vec<_>>(), vec!["seed"]);
    }
}
