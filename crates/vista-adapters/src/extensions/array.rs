//! Array filters.

use serde_json::{Number, Value};
use vista_core::domain::registry::{display, escape_html};
use vista_core::prelude::*;

#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayExtension;

impl Extension for ArrayExtension {
    fn name(&self) -> &'static str {
        "array"
    }

    fn exports(&self) -> Vec<Export> {
        vec![
            Export::filter(
                "sum",
                ViewFunction::new(|args| fold(args, "sum", 0, i64::checked_add, |a, b| a + b)),
            ),
            Export::filter(
                "product",
                ViewFunction::new(|args| fold(args, "product", 1, i64::checked_mul, |a, b| a * b)),
            ),
            Export::filter("values", ViewFunction::new(values)),
            Export::filter("html_attr", ViewFunction::new(html_attr).safe()),
        ]
    }
}

/// Items of an array, or values of a map.
fn items<'a>(value: &'a Value, filter: &str) -> Result<Vec<&'a Value>, FunctionError> {
    match value {
        Value::Array(items) => Ok(items.iter().collect()),
        Value::Object(map) => Ok(map.values().collect()),
        Value::Null => Ok(Vec::new()),
        _ => Err(FunctionError::new(format!("{filter}: expected an array"))),
    }
}

/// Fold numeric items. Integers stay integers until a float or an overflow.
fn fold(
    args: &Arguments,
    filter: &str,
    init: i64,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, FunctionError> {
    let mut int = Some(init);
    let mut float = init as f64;

    for item in items(args.require(0, "value")?, filter)? {
        let Some(n) = item.as_f64() else {
            return Err(FunctionError::new(format!("{filter}: '{item}' isn't a number")));
        };

        int = match (int, item.as_i64()) {
            (Some(acc), Some(i)) => int_op(acc, i),
            _ => None,
        };
        float = float_op(float, n);
    }

    Ok(match int {
        Some(i) => Value::from(i),
        None => Number::from_f64(float).map_or(Value::Null, Value::Number),
    })
}

/// Values of a map as an array, in insertion order.
fn values(args: &Arguments) -> Result<Value, FunctionError> {
    let items = items(args.require(0, "value")?, "values")?;
    Ok(Value::Array(items.into_iter().cloned().collect()))
}

/// Render a map as HTML attributes: ` key="value"`.
///
/// `true` renders the key as value; `false` and `null` are skipped.
fn html_attr(args: &Arguments) -> Result<Value, FunctionError> {
    let map = match args.require(0, "value")? {
        Value::Object(map) => map,
        Value::Null => return Ok(Value::String(String::new())),
        _ => return Err(FunctionError::new("html_attr: expected a map")),
    };

    let mut html = String::new();
    for (key, value) in map {
        let value = match value {
            Value::Null | Value::Bool(false) => continue,
            Value::Bool(true) => key.clone(),
            other => display(other),
        };
        html.push_str(&format!(" {}=\"{}\"", escape_html(key), escape_html(&value)));
    }

    Ok(Value::String(html))
}
