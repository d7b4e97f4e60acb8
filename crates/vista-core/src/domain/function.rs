//! Callables exposed to templates.
//!
//! A [`ViewFunction`] is engine-neutral: it receives [`Arguments`] holding
//! positional values (script calls, the piped value of a filter) and named
//! values (engine keyword arguments), and returns a JSON value.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::error::ViewError;

/// Error returned by a [`ViewFunction`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct FunctionError {
    message: String,
}

impl FunctionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub type FunctionResult = Result<Value, FunctionError>;

/// Arguments passed to a [`ViewFunction`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    positional: Vec<Value>,
    named: BTreeMap<String, Value>,
}

impl Arguments {
    pub fn new(positional: Vec<Value>, named: BTreeMap<String, Value>) -> Self {
        Self { positional, named }
    }

    pub fn positional(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            positional: values.into_iter().collect(),
            named: BTreeMap::new(),
        }
    }

    /// Positional argument `index`, falling back to the named argument `name`.
    pub fn get(&self, index: usize, name: &str) -> Option<&Value> {
        self.positional.get(index).or_else(|| self.named.get(name))
    }

    /// Like [`get`](Self::get) but fails when the argument is missing.
    pub fn require(&self, index: usize, name: &str) -> Result<&Value, FunctionError> {
        self.get(index, name)
            .ok_or_else(|| FunctionError::new(format!("missing argument '{name}'")))
    }

    /// String argument; fails when missing or not a string.
    pub fn str(&self, index: usize, name: &str) -> Result<&str, FunctionError> {
        self.require(index, name)?
            .as_str()
            .ok_or_else(|| FunctionError::new(format!("argument '{name}' must be a string")))
    }

    pub fn named(&self, name: &str) -> Option<&Value> {
        self.named.get(name)
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

type Callable = dyn Fn(&Arguments) -> FunctionResult + Send + Sync;

/// A shareable callable that templates can invoke.
///
/// A function marked [`safe`](Self::safe) returns markup: engines with
/// autoescaping insert its output as is.
#[derive(Clone)]
pub struct ViewFunction {
    inner: Arc<Callable>,
    safe: bool,
}

impl ViewFunction {
    pub fn new<F>(function: F) -> Self
    where
        F: Fn(&Arguments) -> FunctionResult + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(function),
            safe: false,
        }
    }

    /// Mark the output as markup that must not be escaped again.
    pub fn safe(mut self) -> Self {
        self.safe = true;
        self
    }

    pub fn is_safe(&self) -> bool {
        self.safe
    }

    pub fn call(&self, args: &Arguments) -> FunctionResult {
        (self.inner)(args)
    }

    /// Whether both handles point at the same callable.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ViewFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewFunction")
            .field("safe", &self.safe)
            .finish_non_exhaustive()
    }
}

/// What to expose under a template name.
#[derive(Debug, Clone)]
pub enum FunctionRef {
    /// A function from the ambient [`FunctionRegistry`](super::FunctionRegistry).
    Ambient(String),
    Callable(ViewFunction),
}

impl From<&str> for FunctionRef {
    fn from(name: &str) -> Self {
        Self::Ambient(name.to_string())
    }
}

impl From<ViewFunction> for FunctionRef {
    fn from(function: ViewFunction) -> Self {
        Self::Callable(function)
    }
}

/// How an engine registers an exposed callable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    /// Called as `name(args)`.
    #[default]
    Function,
    /// Applied as `value | name`.
    Filter,
}

impl FunctionKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Filter => "filter",
        }
    }
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FunctionKind {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "function" => Ok(Self::Function),
            "filter" => Ok(Self::Filter),
            other => Err(ViewError::InvalidArgument(format!(
                "You can create either a 'function' or 'filter', not a '{other}'"
            ))),
        }
    }
}
