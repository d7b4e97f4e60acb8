//! Process-wide registry of ambient functions.
//!
//! Ambient functions are the callables every view may expose by name alone
//! (`view.expose("strlen", None)`). The registry replaces an implicit global
//! function table with an explicit lifecycle:
//!
//! 1. **Init**: the first call to [`FunctionRegistry::global`] creates the
//!    registry seeded with the built-ins below.
//! 2. **Register**: hosts add their own functions with
//!    [`FunctionRegistry::register`], typically at startup.
//! 3. **Lookup**: views resolve names with [`FunctionRegistry::get`].
//!
//! Built-ins: `strlen`, `upper`, `lower`, `trim`, `escape`, `json`, `print`.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use serde_json::Value;
use tracing::debug;

use super::function::{Arguments, FunctionError, FunctionResult, ViewFunction};

/// Name-keyed set of ambient functions.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: RwLock<HashMap<String, ViewFunction>>,
}

impl FunctionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in functions.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for (name, function) in builtins() {
            registry.register(name, function);
        }
        registry
    }

    /// The process-wide registry.
    pub fn global() -> &'static FunctionRegistry {
        static GLOBAL: OnceLock<FunctionRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::with_builtins)
    }

    /// Add or replace a function.
    pub fn register(&self, name: impl Into<String>, function: ViewFunction) {
        let name = name.into();
        debug!(function = %name, "Registering ambient function");
        self.functions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(name, function);
    }

    pub fn get(&self, name: &str) -> Option<ViewFunction> {
        self.functions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .functions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

// ── Built-ins ─────────────────────────────────────────────────────────────────

fn builtins() -> Vec<(&'static str, ViewFunction)> {
    vec![
        ("strlen", ViewFunction::new(strlen)),
        ("upper", ViewFunction::new(|args| map_str(args, str::to_uppercase))),
        ("lower", ViewFunction::new(|args| map_str(args, str::to_lowercase))),
        ("trim", ViewFunction::new(|args| map_str(args, |s| s.trim().to_string()))),
        ("escape", ViewFunction::new(|args| map_str(args, escape_html))),
        ("json", ViewFunction::new(json)),
        ("print", ViewFunction::new(print)),
    ]
}

/// Length in characters of a string, or number of items of an array/map.
fn strlen(args: &Arguments) -> FunctionResult {
    let len = match args.require(0, "value")? {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        Value::Null => 0,
        other => other.to_string().chars().count(),
    };
    Ok(Value::from(len))
}

fn map_str(args: &Arguments, f: impl Fn(&str) -> String) -> FunctionResult {
    Ok(Value::String(f(args.str(0, "value")?)))
}

fn json(args: &Arguments) -> FunctionResult {
    let value = args.require(0, "value")?;
    serde_json::to_string(value)
        .map(Value::String)
        .map_err(|e| FunctionError::new(format!("json: {e}")))
}

/// Returns its argument as display text. Script views echo the result.
fn print(args: &Arguments) -> FunctionResult {
    Ok(Value::String(display(args.require(0, "value")?)))
}

/// Display form of a value: strings verbatim, null as empty text.
pub fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Escape the five HTML-significant characters.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(name: &str, value: Value) -> FunctionResult {
        FunctionRegistry::global()
            .get(name)
            .unwrap_or_else(|| panic!("missing builtin {name}"))
            .call(&Arguments::positional([value]))
    }

    #[test]
    fn global_has_builtins() {
        let registry = FunctionRegistry::global();
        for name in ["strlen", "upper", "lower", "trim", "escape", "json", "print"] {
            assert!(registry.contains(name), "missing {name}");
        }
        assert!(!registry.contains("no_such_function"));
    }

    #[test]
    fn strlen_counts_chars() {
        assert_eq!(call("strlen", json!("héllo")), Ok(json!(5)));
        assert_eq!(call("strlen", json!([1, 2, 3])), Ok(json!(3)));
    }

    #[test]
    fn escape_encodes_markup() {
        assert_eq!(
            call("escape", json!("<a href=\"x\">Tom & 'Jerry'</a>")),
            Ok(json!("&lt;a href=&quot;x&quot;&gt;Tom &amp; &#x27;Jerry&#x27;&lt;/a&gt;"))
        );
    }

    #[test]
    fn upper_requires_string() {
        assert!(call("upper", json!(1)).is_err());
    }

    #[test]
    fn private_registry_is_isolated() {
        let registry = FunctionRegistry::new();
        registry.register("shout", ViewFunction::new(|_| Ok(json!("HEY"))));

        assert_eq!(registry.names(), ["shout"]);
        assert!(!FunctionRegistry::global().contains("shout"));
    }
}
