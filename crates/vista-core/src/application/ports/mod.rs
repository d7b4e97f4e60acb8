//! Application ports (traits) for external dependencies.
//!
//! In hexagonal architecture, ports define interfaces that the application
//! needs from the outside world. Adapters in `vista-adapters` implement these.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: Called by views, implemented by infrastructure
//!   - `TemplateEngine`: load, compile and execute templates
//!   - `Extension`: a bundle of functions/filters added to an engine at once

use std::fmt;

use crate::domain::{Context, FunctionKind, ViewFunction};
use crate::error::ViewResult;

/// Port for template engines.
///
/// Implemented by:
/// - `vista_adapters::engine::TeraEngine` (production)
///
/// ## Design Notes
///
/// - Templates are addressed by loader key (`"users/show.html.tera"`)
/// - A missing template is the engine's own error, surfaced as
///   [`ViewError::Engine`](crate::error::ViewError::Engine)
pub trait TemplateEngine: Send + Sync {
    /// Charset of the produced text, used for the `Content-Type` header.
    fn charset(&self) -> String;

    /// Load, compile and execute a template.
    fn render(&self, name: &str, context: &Context) -> ViewResult<String>;

    /// Loader key of the template `name` extends, if any.
    fn parent(&self, name: &str, context: &Context) -> ViewResult<Option<String>>;

    /// Register a function callable as `name(...)`.
    fn register_function(&mut self, name: &str, function: ViewFunction);

    /// Register a filter applied as `value | name`.
    fn register_filter(&mut self, name: &str, function: ViewFunction);

    /// Whether an extension with this name was added.
    fn has_extension(&self, name: &str) -> bool;

    /// Register every export of an extension.
    ///
    /// Fails without registering anything when the extension is already added.
    fn add_extension(&mut self, extension: Box<dyn Extension>) -> ViewResult<()>;
}

/// A named bundle of template functions and filters.
pub trait Extension: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn exports(&self) -> Vec<Export>;
}

/// One callable provided by an [`Extension`].
#[derive(Debug, Clone)]
pub struct Export {
    pub name: String,
    pub kind: FunctionKind,
    pub function: ViewFunction,
}

impl Export {
    pub fn function(name: impl Into<String>, function: ViewFunction) -> Self {
        Self {
            name: name.into(),
            kind: FunctionKind::Function,
            function,
        }
    }

    pub fn filter(name: impl Into<String>, function: ViewFunction) -> Self {
        Self {
            name: name.into(),
            kind: FunctionKind::Filter,
            function,
        }
    }
}

/// Register `export` on `engine` according to its kind.
pub fn register_export(engine: &mut dyn TemplateEngine, export: Export) {
    match export.kind {
        FunctionKind::Function => engine.register_function(&export.name, export.function),
        FunctionKind::Filter => engine.register_filter(&export.name, export.function),
    }
}
