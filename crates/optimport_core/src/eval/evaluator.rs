//! Line-by-line declaration evaluation.
//!
//! # Responsibility
//! - Parse and execute each normalized body line in order.
//! - Resolve imported modules through the injected `ModuleResolver`.
//!
//! # Invariants
//! - Each physical line is parsed in isolation; a line is parsed only after
//!   every earlier line executed successfully.
//! - Only incomplete lines are syntax failures. A complete line outside the
//!   supported statement set fails at runtime like any other line.
//! - The global scope is empty; the namespace is the only scope names are
//!   read from or written to.
//! - Modules are memoized per evaluator, never across evaluators.

use crate::class::Namespace;
use crate::declaration::parser::{CompareOp, Expr, ImportItem, ImportName};
use crate::declaration::{parse_line, ExtractedBody, Statement};
use crate::eval::failure::{DeclarationFormatError, EvaluationError, FailureKind, LineFailure};
use crate::resolver::{LoadError, ModuleResolver};
use crate::value::{Module, Value};
use log::trace;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Executes one declaration body against one namespace.
pub struct LineEvaluator<'r> {
    resolver: &'r dyn ModuleResolver,
    loaded: BTreeMap<String, Arc<Module>>,
}

impl<'r> LineEvaluator<'r> {
    pub fn new(resolver: &'r dyn ModuleResolver) -> Self {
        Self {
            resolver,
            loaded: BTreeMap::new(),
        }
    }

    /// Runs every line in order, halting at the first failure.
    pub fn evaluate(
        &mut self,
        body: &ExtractedBody,
        namespace: &mut Namespace,
    ) -> Result<(), LineFailure> {
        for (index, line) in body.lines().iter().enumerate() {
            let location = body.location_of(index);
            let runtime = |kind| {
                LineFailure::Runtime(EvaluationError {
                    kind,
                    location: location.clone(),
                    line: line.clone(),
                })
            };
            let statements = match parse_line(line) {
                Ok(statements) => statements,
                Err(syntax) if syntax.is_incomplete() => {
                    return Err(LineFailure::Syntax(DeclarationFormatError {
                        location: location.clone(),
                        line: line.clone(),
                        syntax,
                    }))
                }
                Err(syntax) => {
                    return Err(runtime(FailureKind::UnsupportedStatement {
                        detail: syntax.to_string(),
                    }))
                }
            };
            trace!(
                "event=line_eval module=eval location={location} statements={}",
                statements.len()
            );
            for statement in statements {
                self.execute(statement, namespace).map_err(runtime)?;
            }
        }
        Ok(())
    }

    fn execute(
        &mut self,
        statement: Statement,
        namespace: &mut Namespace,
    ) -> Result<(), FailureKind> {
        match statement {
            Statement::Pass => Ok(()),
            Statement::Import(items) => {
                for item in items {
                    self.import(item, namespace)?;
                }
                Ok(())
            }
            Statement::FromImport { module, names } => self.from_import(&module, names, namespace),
            Statement::Assign { targets, value } => {
                let value = self.eval(&value, namespace)?;
                for target in targets {
                    namespace.set(target, value.clone());
                }
                Ok(())
            }
            Statement::Assert { test, message } => {
                if self.eval(&test, namespace)?.is_truthy() {
                    return Ok(());
                }
                let message = match message {
                    Some(expr) => Some(match self.eval(&expr, namespace)? {
                        Value::Str(text) => text,
                        other => other.to_string(),
                    }),
                    None => None,
                };
                Err(FailureKind::AssertionFailed { message })
            }
            Statement::Del(names) => {
                for name in names {
                    if namespace.remove(&name).is_none() {
                        return Err(FailureKind::NameNotDefined { name });
                    }
                }
                Ok(())
            }
            Statement::Expr(expr) => self.eval(&expr, namespace).map(|_| ()),
        }
    }

    fn import(&mut self, item: ImportItem, namespace: &mut Namespace) -> Result<(), FailureKind> {
        let leaf = self.load_path(&item.path)?;
        match item.alias {
            Some(alias) => {
                namespace.set(alias, Value::Module(leaf));
            }
            None => {
                let top = item.path[0].clone();
                let module = self.loaded_module(&top)?;
                namespace.set(top, Value::Module(module));
            }
        }
        Ok(())
    }

    fn from_import(
        &mut self,
        path: &[String],
        names: Vec<ImportName>,
        namespace: &mut Namespace,
    ) -> Result<(), FailureKind> {
        let module = self.load_path(path)?;
        for name in names {
            let value = match module.attr(&name.name) {
                Some(value) => value.clone(),
                None => {
                    let mut subpath = path.to_vec();
                    subpath.push(name.name.clone());
                    match self.load(&subpath.join(".")) {
                        Ok(_) => Value::Module(self.link_path(&subpath)?),
                        Err(FailureKind::ModuleNotFound { .. }) => {
                            return Err(FailureKind::ImportName {
                                module: path.join("."),
                                name: name.name.clone(),
                            })
                        }
                        Err(other) => return Err(other),
                    }
                }
            };
            namespace.set(name.binding().to_string(), value);
        }
        Ok(())
    }

    /// Loads every prefix of `path` and returns the linked leaf module.
    fn load_path(&mut self, path: &[String]) -> Result<Arc<Module>, FailureKind> {
        for end in 1..=path.len() {
            self.load(&path[..end].join("."))?;
        }
        self.link_path(path)
    }

    /// Links each already-loaded module of `path` into its parent, bottom-up,
    /// so later imports of any prefix observe the submodule attributes.
    fn link_path(&mut self, path: &[String]) -> Result<Arc<Module>, FailureKind> {
        let names: Vec<String> = (1..=path.len()).map(|end| path[..end].join(".")).collect();
        for index in (1..names.len()).rev() {
            let child = self.loaded_module(&names[index])?;
            let parent = self.loaded_module(&names[index - 1])?;
            let linked = (*parent)
                .clone()
                .with_attr(path[index].clone(), Value::Module(child));
            self.loaded.insert(names[index - 1].clone(), Arc::new(linked));
        }
        match names.last() {
            Some(leaf) => self.loaded_module(leaf),
            None => Err(FailureKind::ModuleNotFound {
                module: String::new(),
            }),
        }
    }

    fn load(&mut self, name: &str) -> Result<Arc<Module>, FailureKind> {
        if let Some(module) = self.loaded.get(name) {
            return Ok(Arc::clone(module));
        }
        let module = self.resolver.resolve(name).map_err(|err| match err {
            LoadError::NotFound => FailureKind::ModuleNotFound {
                module: name.to_string(),
            },
            LoadError::Failed(reason) => FailureKind::LoadFailed {
                module: name.to_string(),
                reason,
            },
        })?;
        let module = Arc::new(module);
        self.loaded.insert(name.to_string(), Arc::clone(&module));
        Ok(module)
    }

    fn loaded_module(&self, name: &str) -> Result<Arc<Module>, FailureKind> {
        self.loaded
            .get(name)
            .cloned()
            .ok_or_else(|| FailureKind::ModuleNotFound {
                module: name.to_string(),
            })
    }

    fn eval(&self, expr: &Expr, namespace: &Namespace) -> Result<Value, FailureKind> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Name(name) => {
                namespace
                    .get(name)
                    .cloned()
                    .ok_or_else(|| FailureKind::NameNotDefined { name: name.clone() })
            }
            Expr::Attribute(target, attr) => {
                let target = self.eval(target, namespace)?;
                let found = target.as_module().and_then(|module| module.attr(attr));
                match found {
                    Some(value) => Ok(value.clone()),
                    None => Err(FailureKind::AttributeMissing {
                        owner: owner_label(&target),
                        attr: attr.clone(),
                    }),
                }
            }
            Expr::List(items) => Ok(Value::List(self.eval_all(items, namespace)?)),
            Expr::Tuple(items) => Ok(Value::Tuple(self.eval_all(items, namespace)?)),
            Expr::Compare { left, op, right } => {
                let left = self.eval(left, namespace)?;
                let right = self.eval(right, namespace)?;
                Ok(Value::Bool(match op {
                    CompareOp::Eq => left == right,
                    CompareOp::NotEq => left != right,
                }))
            }
        }
    }

    fn eval_all(&self, items: &[Expr], namespace: &Namespace) -> Result<Vec<Value>, FailureKind> {
        items.iter().map(|item| self.eval(item, namespace)).collect()
    }
}

fn owner_label(value: &Value) -> String {
    match value {
        Value::Module(module) => module.name.clone(),
        other => other.type_name().to_string(),
    }
}
