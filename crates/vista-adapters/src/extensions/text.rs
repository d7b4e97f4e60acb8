//! Text filters.
//!
//! `paragraph` and `less` produce markup: they escape the text they are
//! given and their output is not escaped again.

use serde_json::Value;
use vista_core::domain::registry::escape_html;
use vista_core::prelude::*;

use super::{str_arg, usize_arg};

const PAGE_BREAK: &str = "<!-- pagebreak -->";

#[derive(Debug, Clone, Copy, Default)]
pub struct TextExtension;

impl Extension for TextExtension {
    fn name(&self) -> &'static str {
        "text"
    }

    fn exports(&self) -> Vec<Export> {
        vec![
            Export::filter("paragraph", ViewFunction::new(paragraph).safe()),
            Export::filter("line", ViewFunction::new(line)),
            Export::filter("less", ViewFunction::new(less).safe()),
            Export::filter("truncate_words", ViewFunction::new(truncate_words)),
        ]
    }
}

/// Wrap every block separated by a blank line in `<p>`.
fn paragraph(args: &Arguments) -> Result<Value, FunctionError> {
    let text = args.str(0, "value")?.replace("\r\n", "\n");

    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        blocks.push(current.join("\n"));
    }

    let html = blocks
        .iter()
        .map(|block| format!("<p>{}</p>", escape_html(block.trim_start())))
        .collect::<Vec<_>>()
        .join("\n");

    Ok(Value::String(html))
}

/// The n-th line (1-based, default 1), or an empty string.
fn line(args: &Arguments) -> Result<Value, FunctionError> {
    let text = args.str(0, "value")?;
    let number = usize_arg(args, 1, "line", 1)?;

    let line = number
        .checked_sub(1)
        .and_then(|index| text.lines().nth(index))
        .unwrap_or_default();

    Ok(Value::String(line.to_string()))
}

/// Cut the text at the page break marker and append `replace`, which is
/// markup and kept as is.
fn less(args: &Arguments) -> Result<Value, FunctionError> {
    let text = args.str(0, "value")?;
    let replace = str_arg(args, 1, "replace", "...")?;
    let marker = str_arg(args, 2, "break", PAGE_BREAK)?;

    let result = match text.find(marker) {
        Some(pos) if !marker.is_empty() => format!("{}{replace}", escape_html(&text[..pos])),
        _ => escape_html(text),
    };

    Ok(Value::String(result))
}

/// Shorten to at most `length` characters (default 30) without splitting a
/// word, then append `separator`.
fn truncate_words(args: &Arguments) -> Result<Value, FunctionError> {
    let text = args.str(0, "value")?;
    let length = usize_arg(args, 1, "length", 30)?;
    let separator = str_arg(args, 2, "separator", "...")?;

    if text.chars().count() <= length {
        return Ok(Value::String(text.to_string()));
    }

    let cut = text
        .char_indices()
        .nth(length)
        .map_or(text.len(), |(pos, _)| pos);
    let head = &text[..cut];

    // Back up to a word boundary unless the cut already is one.
    let at_boundary = text[cut..].starts_with(char::is_whitespace);
    let head = match head.rfind(char::is_whitespace) {
        Some(pos) if !at_boundary && pos > 0 => &head[..pos],
        _ => head,
    };

    Ok(Value::String(format!("{}{separator}", head.trim_end())))
}
