//! Regular expression filters, backed by `regex`.
//!
//! Patterns use `regex` syntax; flags go inline (`(?i)foo`).

use regex::Regex;
use serde_json::Value;
use vista_core::prelude::*;

#[derive(Debug, Clone, Copy, Default)]
pub struct PcreExtension;

impl Extension for PcreExtension {
    fn name(&self) -> &'static str {
        "pcre"
    }

    fn exports(&self) -> Vec<Export> {
        vec![
            Export::filter("regex_match", ViewFunction::new(regex_match)),
            Export::filter("regex_replace", ViewFunction::new(regex_replace)),
            Export::filter("regex_quote", ViewFunction::new(regex_quote)),
        ]
    }
}

fn compile(args: &Arguments, filter: &str) -> Result<Regex, FunctionError> {
    let pattern = args.str(1, "pattern")?;
    Regex::new(pattern).map_err(|e| FunctionError::new(format!("{filter}: {e}")))
}

fn regex_match(args: &Arguments) -> Result<Value, FunctionError> {
    let value = args.str(0, "value")?;
    let regex = compile(args, "regex_match")?;
    Ok(Value::Bool(regex.is_match(value)))
}

/// Replace every match; `$1` / `${name}` refer to capture groups.
fn regex_replace(args: &Arguments) -> Result<Value, FunctionError> {
    let value = args.str(0, "value")?;
    let regex = compile(args, "regex_replace")?;
    let replacement = args.str(2, "replacement")?;
    Ok(Value::String(regex.replace_all(value, replacement).into_owned()))
}

/// Escape regex metacharacters.
fn regex_quote(args: &Arguments) -> Result<Value, FunctionError> {
    Ok(Value::String(regex::escape(args.str(0, "value")?)))
}
