//! Script view: renders script files with echo tags.
//!
//! Scripts live below the configured directory and are addressed by
//! logical name (`"users/show"` -> `<path>/users/show.tpl`). See
//! [`interpreter`] for the syntax and [`capture`] for output handling.

pub mod capture;
pub mod interpreter;

use std::any::Any;
use std::fs;
use std::path::{Path, PathBuf};

use http::header::CONTENT_TYPE;
use tracing::{debug, instrument};

use vista_core::config::{ScriptConfig, ViewOptions};
use vista_core::domain::response::with_header;
use vista_core::prelude::*;

use capture::OutputCapture;
use interpreter::{Scope, Script};

/// Content type set when the response has none.
pub const DEFAULT_CONTENT_TYPE: &str = "text/html";

/// View rendering script files.
#[derive(Debug)]
pub struct ScriptView {
    config: ScriptConfig,
    resolver: FileResolver,
    functions: &'static FunctionRegistry,
}

impl ScriptView {
    /// Create a view over `config.path`, with the process-wide function registry.
    pub fn new(config: ScriptConfig) -> Self {
        let resolver = FileResolver::new(config.ext.as_str());
        Self {
            config,
            resolver,
            functions: FunctionRegistry::global(),
        }
    }

    /// Create a view from raw options; `path` is required.
    pub fn from_options(options: &ViewOptions) -> ViewResult<Self> {
        Ok(Self::new(options.script_config()?))
    }

    /// Use `functions` instead of the process-wide registry.
    pub fn with_registry(mut self, functions: &'static FunctionRegistry) -> Self {
        self.functions = functions;
        self
    }

    /// Directory scripts are resolved against.
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Default file extension.
    pub fn ext(&self) -> &str {
        self.resolver.extension()
    }

    /// Validate the name and check that the script exists.
    fn assert_file(&self, name: &str) -> ViewResult<PathBuf> {
        let file = self.resolver.resolve(&self.config.path, name)?;

        if !file.is_file() {
            return Err(ViewError::FileNotFound { path: file });
        }

        Ok(file)
    }

    /// Run the script in its own scope and return the captured output.
    fn run_script(&self, file: &Path, context: &Context) -> ViewResult<String> {
        let source = fs::read_to_string(file).map_err(|source| ViewError::Io {
            path: file.to_path_buf(),
            source,
        })?;

        let script_error = |e: interpreter::ScriptError| ViewError::Script {
            path: file.to_path_buf(),
            reason: e.to_string(),
        };

        let script = Script::parse(&source).map_err(script_error)?;

        let capture = OutputCapture::start();
        script
            .execute(Scope::new(context, self.functions))
            .map_err(script_error)?;

        Ok(capture.finish())
    }
}

impl View for ScriptView {
    /// Scripts already see every ambient function, so exposing is only a
    /// check that the function exists. Aliases cannot be expressed.
    fn expose(&mut self, name: &str, function: Option<FunctionRef>) -> ViewResult<()> {
        let same_name = match &function {
            None => true,
            Some(FunctionRef::Ambient(target)) => target == name,
            Some(FunctionRef::Callable(_)) => false,
        };

        if same_name && self.functions.contains(name) {
            return Ok(());
        }

        Err(ViewError::UnsupportedOperation(
            "Exposing functions under an alias isn't supported with script views".into(),
        ))
    }

    #[instrument(skip_all, fields(view = "script", template = %name))]
    fn render(&self, response: Response, name: &str, context: Context) -> ViewResult<Response> {
        let file = self.assert_file(name)?;
        debug!(file = %file.display(), "Running script");

        let mut response = if response.headers().contains_key(CONTENT_TYPE) {
            response
        } else {
            with_header(response, CONTENT_TYPE, DEFAULT_CONTENT_TYPE)?
        };

        let output = self.run_script(&file, &context)?;
        response.body_mut().write(output);

        Ok(response)
    }

    fn kind(&self) -> &'static str {
        "script"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construct_with_defaults() {
        let view = ScriptView::new(ScriptConfig::new("/srv/views"));
        assert_eq!(view.path(), Path::new("/srv/views"));
        assert_eq!(view.ext(), "tpl");
        assert_eq!(view.kind(), "script");
    }

    #[test]
    fn construct_with_ext() {
        let view = ScriptView::new(ScriptConfig::new("/srv/views").with_ext("phtml"));
        assert_eq!(view.ext(), "phtml");
    }

    #[test]
    fn construct_without_path_fails() {
        let err = ScriptView::from_options(&ViewOptions::default()).unwrap_err();
        assert!(matches!(err, ViewError::Configuration { .. }));
    }

    #[test]
    fn expose_ambient_function_under_own_name() {
        let mut view = ScriptView::new(ScriptConfig::new("views"));
        assert!(view.expose("strlen", None).is_ok());
        assert!(view.expose("strlen", Some("strlen".into())).is_ok());
    }

    #[test]
    fn expose_alias_is_unsupported() {
        let mut view = ScriptView::new(ScriptConfig::new("views"));

        let alias = view.expose("len", Some("strlen".into())).unwrap_err();
        assert!(matches!(alias, ViewError::UnsupportedOperation(_)));

        let closure = ViewFunction::new(|_| Ok(serde_json::Value::Null));
        let err = view.expose("len", Some(closure.into())).unwrap_err();
        assert!(matches!(err, ViewError::UnsupportedOperation(_)));
    }

    #[test]
    fn expose_unknown_function_fails() {
        let mut view = ScriptView::new(ScriptConfig::new("views"));
        assert!(view.expose("no_such_function", None).is_err());
    }
}
