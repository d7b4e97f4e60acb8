//! Render context: the variables a template can see.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ViewError, ViewResult};

/// Ordered mapping from variable name to value.
///
/// Insertion order is preserved. A context is handed to `render` by value,
/// so a view never shares it with the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    vars: Map<String, Value>,
}

impl Context {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from any value serializing to a map.
    pub fn from_serialize(value: impl Serialize) -> ViewResult<Self> {
        match serde_json::to_value(value) {
            Ok(Value::Object(vars)) => Ok(Self { vars }),
            Ok(other) => Err(ViewError::InvalidArgument(format!(
                "context must serialize to a map, got {}",
                type_name(&other)
            ))),
            Err(e) => Err(ViewError::InvalidArgument(format!(
                "context could not be serialized: {e}"
            ))),
        }
    }

    /// Add a variable (builder style).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or replace a variable. Replacing keeps the original position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.vars.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.vars.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.vars)
    }
}

impl From<Map<String, Value>> for Context {
    fn from(vars: Map<String, Value>) -> Self {
        Self { vars }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut context = Self::new();
        for (name, value) in iter {
            context.insert(name, value);
        }
        context
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a map",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn preserves_insertion_order() {
        let ctx = Context::new()
            .with("zebra", 1)
            .with("apple", 2)
            .with("mango", 3);

        assert_eq!(ctx.names().collect::<Vec<_>>(), ["zebra", "apple", "mango"]);
    }

    #[test]
    fn from_serialize_accepts_structs() {
        #[derive(Serialize)]
        struct Page {
            title: &'static str,
            answer: u32,
        }

        let ctx = Context::from_serialize(Page {
            title: "Home",
            answer: 42,
        })
        .unwrap();

        assert_eq!(ctx.get("title"), Some(&json!("Home")));
        assert_eq!(ctx.get("answer"), Some(&json!(42)));
    }

    #[test]
    fn from_serialize_rejects_scalars() {
        let err = Context::from_serialize(42).unwrap_err();
        assert!(err.to_string().contains("a number"), "err = {err}");
    }

    #[test]
    fn collects_from_pairs() {
        let ctx: Context = [("color", "blue"), ("size", "xl")].into_iter().collect();
        assert_eq!(ctx.len(), 2);
        assert!(ctx.contains("size"));
    }
}
