//! Script parsing and evaluation.
//!
//! A script is literal text with echo tags:
//!
//! ```text
//! Hello <%= user.name %>, you have <%= strlen(messages) %> messages.
//! ```
//!
//! Inside a tag:
//!
//! ```text
//! expr := literal | path | call
//! path := ident ("." ident)*          variables from the context
//! call := ident "(" [expr ("," expr)*] ")"   ambient functions
//! literal := "str" | 'str' | number | true | false | null
//! ```
//!
//! A `%>` inside a string literal does not close the tag.
//!
//! Evaluation only sees a [`Scope`]: the context bindings and the function
//! registry. Nothing else of the caller is reachable.

use serde_json::{Number, Value};
use thiserror::Error;

use vista_core::domain::registry::display;
use vista_core::domain::{Arguments, Context, FunctionError, FunctionRegistry};

use super::capture;

const OPEN_TAG: &str = "<%=";
const CLOSE_TAG: &str = "%>";

/// Errors raised while parsing or running a script.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScriptError {
    #[error("unclosed echo tag opened at byte {0}")]
    UnclosedTag(usize),

    #[error("syntax error at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("undefined function '{0}'")]
    UndefinedFunction(String),

    #[error("'{path}' has no field '{field}'")]
    MissingField { path: String, field: String },

    #[error("function '{name}' failed: {source}")]
    Function {
        name: String,
        #[source]
        source: FunctionError,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Echo(Expr),
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Path(Vec<String>),
    Call { name: String, args: Vec<Expr> },
}

/// Bindings visible to a running script.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    vars: &'a Context,
    functions: &'a FunctionRegistry,
}

impl<'a> Scope<'a> {
    pub fn new(vars: &'a Context, functions: &'a FunctionRegistry) -> Self {
        Self { vars, functions }
    }
}

/// A parsed script.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    segments: Vec<Segment>,
}

impl Script {
    pub fn parse(source: &str) -> Result<Self, ScriptError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(open) = rest.find(OPEN_TAG) {
            if open > 0 {
                segments.push(Segment::Text(rest[..open].to_string()));
            }

            let body_start = open + OPEN_TAG.len();
            let close = find_close(&rest[body_start..])
                .ok_or(ScriptError::UnclosedTag(offset + open))?;
            let body = &rest[body_start..body_start + close];

            let mut parser = Parser::new(body, offset + body_start);
            segments.push(Segment::Echo(parser.parse_tag()?));

            let consumed = body_start + close + CLOSE_TAG.len();
            rest = &rest[consumed..];
            offset += consumed;
        }

        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self { segments })
    }

    /// Run the script, emitting its output into the active capture.
    pub fn execute(&self, scope: Scope<'_>) -> Result<(), ScriptError> {
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => {
                    capture::echo(text);
                }
                Segment::Echo(expr) => {
                    let value = eval(expr, scope)?;
                    capture::echo(&display(&value));
                }
            }
        }
        Ok(())
    }
}

/// Byte offset of the tag end in `body`, skipping quoted strings.
///
/// An unterminated string falls back to the first `%>` so the parser can
/// report the string itself.
fn find_close(body: &str) -> Option<usize> {
    let mut quote = None;
    let mut escaped = false;

    for (pos, c) in body.char_indices() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if body[pos..].starts_with(CLOSE_TAG) => return Some(pos),
            None => {}
        }
    }

    if quote.is_some() {
        body.find(CLOSE_TAG)
    } else {
        None
    }
}

fn eval(expr: &Expr, scope: Scope<'_>) -> Result<Value, ScriptError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Path(segments) => lookup(segments, scope.vars),
        Expr::Call { name, args } => {
            let function = scope
                .functions
                .get(name)
                .ok_or_else(|| ScriptError::UndefinedFunction(name.clone()))?;
            let values = args
                .iter()
                .map(|arg| eval(arg, scope))
                .collect::<Result<Vec<_>, _>>()?;
            function
                .call(&Arguments::positional(values))
                .map_err(|source| ScriptError::Function {
                    name: name.clone(),
                    source,
                })
        }
    }
}

fn lookup(segments: &[String], vars: &Context) -> Result<Value, ScriptError> {
    let (first, fields) = segments
        .split_first()
        .ok_or_else(|| ScriptError::UndefinedVariable(String::new()))?;
    let mut current = vars
        .get(first)
        .ok_or_else(|| ScriptError::UndefinedVariable(first.clone()))?;

    for (i, field) in fields.iter().enumerate() {
        let next = match current {
            Value::Object(map) => map.get(field),
            Value::Array(items) => field.parse::<usize>().ok().and_then(|idx| items.get(idx)),
            _ => None,
        };
        current = next.ok_or_else(|| ScriptError::MissingField {
            path: segments[..=i].join("."),
            field: field.clone(),
        })?;
    }

    Ok(current.clone())
}

// ── Tag parser ────────────────────────────────────────────────────────────────

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    base: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, base: usize) -> Self {
        Self { src, pos: 0, base }
    }

    fn parse_tag(&mut self) -> Result<Expr, ScriptError> {
        let expr = self.parse_expr()?;
        self.skip_ws();
        if self.pos < self.src.len() {
            return Err(self.error("unexpected trailing input"));
        }
        Ok(expr)
    }

    fn parse_expr(&mut self) -> Result<Expr, ScriptError> {
        self.skip_ws();
        match self.peek() {
            Some('"') | Some('\'') => self.parse_string(),
            Some(c) if c.is_ascii_digit() || c == '-' => self.parse_number(),
            Some(c) if is_ident_start(c) => self.parse_ident_expr(),
            Some(c) => Err(self.error(format!("unexpected '{c}'"))),
            None => Err(self.error("expected an expression")),
        }
    }

    fn parse_ident_expr(&mut self) -> Result<Expr, ScriptError> {
        let name = self.ident();
        match name.as_str() {
            "true" => return Ok(Expr::Literal(Value::Bool(true))),
            "false" => return Ok(Expr::Literal(Value::Bool(false))),
            "null" => return Ok(Expr::Literal(Value::Null)),
            _ => {}
        }

        self.skip_ws();
        if self.peek() == Some('(') {
            self.bump();
            return Ok(Expr::Call {
                name,
                args: self.parse_args()?,
            });
        }

        let mut path = vec![name];
        while self.peek() == Some('.') {
            self.bump();
            match self.peek() {
                Some(c) if is_ident_start(c) || c.is_ascii_digit() => path.push(self.ident()),
                _ => return Err(self.error("expected a field name after '.'")),
            }
        }
        Ok(Expr::Path(path))
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ScriptError> {
        let mut args = Vec::new();
        self.skip_ws();
        if self.peek() == Some(')') {
            self.bump();
            return Ok(args);
        }

        loop {
            args.push(self.parse_expr()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(')') => return Ok(args),
                _ => return Err(self.error("expected ',' or ')'")),
            }
        }
    }

    fn parse_string(&mut self) -> Result<Expr, ScriptError> {
        let quote = self.bump().unwrap_or('"');
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(Expr::Literal(Value::String(out))),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(c) => out.push(c),
                    None => break,
                },
                Some(c) => out.push(c),
                None => break,
            }
        }
        Err(self.error("unterminated string"))
    }

    fn parse_number(&mut self) -> Result<Expr, ScriptError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.bump();
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
            self.bump();
        }
        let text = &self.src[start..self.pos];

        if let Ok(n) = text.parse::<i64>() {
            return Ok(Expr::Literal(Value::from(n)));
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(|n| Expr::Literal(Value::Number(n)))
            .ok_or_else(|| self.error(format!("invalid number '{text}'")))
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.bump();
        }
        self.src[start..self.pos].to_string()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::Syntax {
            offset: self.base + self.pos,
            message: message.into(),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}
