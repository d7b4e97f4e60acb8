//! Engine view: renders templates through a [`TemplateEngine`] and runs the
//! attached plugins before every render.

pub mod tera;

use std::any::Any;
use std::fmt;

use http::header::CONTENT_TYPE;
use tracing::{debug, instrument};

use vista_core::config::{DEFAULT_ENGINE_EXT, EngineConfig, ViewOptions};
use vista_core::domain::response::with_header;
use vista_core::prelude::*;

use crate::plugins::DefaultExtensions;

pub use self::tera::TeraEngine;

/// View rendering templates through a template engine.
pub struct EngineView {
    engine: Box<dyn TemplateEngine>,
    resolver: FileResolver,
    plugins: PluginPipeline,
    functions: &'static FunctionRegistry,
}

impl EngineView {
    /// Wrap a ready-made engine. Names resolve with the default extension.
    pub fn with_engine(engine: impl TemplateEngine + 'static) -> Self {
        Self {
            engine: Box::new(engine),
            resolver: FileResolver::new(DEFAULT_ENGINE_EXT),
            plugins: PluginPipeline::new(),
            functions: FunctionRegistry::global(),
        }
    }

    /// Build a [`TeraEngine`] from configuration.
    pub fn from_config(config: EngineConfig) -> ViewResult<Self> {
        let engine = TeraEngine::from_config(&config)?;
        Ok(Self::with_engine(engine).with_ext(config.ext))
    }

    /// Build from raw options; `path` is required.
    pub fn from_options(options: &ViewOptions) -> ViewResult<Self> {
        Self::from_config(options.engine_config()?)
    }

    /// Resolve names with `ext` instead of the default extension.
    pub fn with_ext(mut self, ext: impl Into<String>) -> Self {
        self.resolver = FileResolver::new(ext);
        self
    }

    /// Look up ambient functions in `functions` instead of the process-wide registry.
    pub fn with_registry(mut self, functions: &'static FunctionRegistry) -> Self {
        self.functions = functions;
        self
    }

    pub fn engine(&self) -> &dyn TemplateEngine {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> &mut dyn TemplateEngine {
        self.engine.as_mut()
    }

    pub fn resolver(&self) -> &FileResolver {
        &self.resolver
    }

    /// Expose a function or filter to templates under `name`.
    ///
    /// Without `function`, the ambient function called `name` is exposed.
    pub fn expose_as(
        &mut self,
        name: &str,
        function: Option<FunctionRef>,
        kind: FunctionKind,
    ) -> ViewResult<&mut Self> {
        assert_identifier(name)?;

        let function = match function {
            None => self.ambient(name)?,
            Some(FunctionRef::Ambient(target)) => self.ambient(&target)?,
            Some(FunctionRef::Callable(function)) => function,
        };

        debug!(name, %kind, "Exposing to templates");
        match kind {
            FunctionKind::Function => self.engine.register_function(name, function),
            FunctionKind::Filter => self.engine.register_filter(name, function),
        }

        Ok(self)
    }

    /// Attach a plugin. A plugin failing `on_attach` is not kept.
    pub fn add_plugin(&mut self, plugin: impl Plugin + 'static) -> ViewResult<&mut Self> {
        plugin.on_attach(self)?;
        self.plugins.push(Box::new(plugin));
        Ok(self)
    }

    pub fn plugins(&self) -> &PluginPipeline {
        &self.plugins
    }

    /// Attach the [`DefaultExtensions`] plugin.
    pub fn add_default_extensions(&mut self) -> ViewResult<&mut Self> {
        self.add_plugin(DefaultExtensions::new())
    }

    /// Downcast for plugins that only work with engine views.
    pub fn from_view<'a>(view: &'a dyn View, plugin: &'static str) -> ViewResult<&'a Self> {
        view.as_any()
            .downcast_ref::<Self>()
            .ok_or(ViewError::PluginRejected {
                plugin,
                required: "engine",
            })
    }

    pub fn from_view_mut<'a>(
        view: &'a mut dyn View,
        plugin: &'static str,
    ) -> ViewResult<&'a mut Self> {
        view.as_any_mut()
            .downcast_mut::<Self>()
            .ok_or(ViewError::PluginRejected {
                plugin,
                required: "engine",
            })
    }

    fn ambient(&self, name: &str) -> ViewResult<ViewFunction> {
        self.functions.get(name).ok_or_else(|| {
            ViewError::InvalidArgument(format!("No function named '{name}' is registered"))
        })
    }
}

impl View for EngineView {
    fn expose(&mut self, name: &str, function: Option<FunctionRef>) -> ViewResult<()> {
        self.expose_as(name, function, FunctionKind::Function)
            .map(|_| ())
    }

    #[instrument(skip_all, fields(view = "engine", template = %name))]
    fn render(&self, response: Response, name: &str, context: Context) -> ViewResult<Response> {
        let template = self.resolver.file_name(name)?;
        debug!(%template, "Resolved template");

        self.plugins.on_render(self, &template, &context)?;

        let output = self.engine.render(&template, &context)?;

        let content_type = format!("text/html; charset={}", self.engine.charset());
        let mut response = with_header(response, CONTENT_TYPE, &content_type)?;
        response.body_mut().write(output);

        Ok(response)
    }

    fn kind(&self) -> &'static str {
        "engine"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl fmt::Debug for EngineView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineView")
            .field("resolver", &self.resolver)
            .field("plugins", &self.plugins)
            .finish_non_exhaustive()
    }
}

/// Template identifiers: a letter followed by letters, digits or `_`.
fn assert_identifier(name: &str) -> ViewResult<()> {
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(ViewError::invalid_name(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use serde_json::json;

    mock! {
        pub Engine {}

        impl TemplateEngine for Engine {
            fn charset(&self) -> String;
            fn render(&self, name: &str, context: &Context) -> ViewResult<String>;
            fn parent(&self, name: &str, context: &Context) -> ViewResult<Option<String>>;
            fn register_function(&mut self, name: &str, function: ViewFunction);
            fn register_filter(&mut self, name: &str, function: ViewFunction);
            fn has_extension(&self, name: &str) -> bool;
            fn add_extension(&mut self, extension: Box<dyn Extension>) -> ViewResult<()>;
        }
    }

    #[test]
    fn identifiers() {
        for name in ["foo", "Foo1", "a_b_c", "x"] {
            assert!(assert_identifier(name).is_ok(), "{name}");
        }
        for name in ["", "1foo", "_foo", "foo-bar", "foo bar", "fóo"] {
            assert!(assert_identifier(name).is_err(), "{name}");
        }
    }

    #[test]
    fn invalid_name_never_touches_engine() {
        let mut engine = MockEngine::new();
        engine.expect_register_function().never();
        engine.expect_register_filter().never();

        let mut view = EngineView::with_engine(engine);
        let closure = ViewFunction::new(|_| Ok(json!(null)));

        let err = view
            .expose_as("foo-bar", Some(closure.into()), FunctionKind::Function)
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid name 'foo-bar'");
    }

    #[test]
    fn expose_registers_function_by_kind() {
        let mut engine = MockEngine::new();
        engine
            .expect_register_function()
            .withf(|name, _| name == "strlen")
            .times(1)
            .return_const(());
        engine
            .expect_register_filter()
            .withf(|name, _| name == "len")
            .times(1)
            .return_const(());

        let mut view = EngineView::with_engine(engine);
        view.expose("strlen", None).unwrap();
        view.expose_as("len", Some("strlen".into()), FunctionKind::Filter)
            .unwrap();
    }

    #[test]
    fn expose_unknown_ambient_function_fails() {
        let mut engine = MockEngine::new();
        engine.expect_register_function().never();

        let mut view = EngineView::with_engine(engine);
        let err = view.expose("no_such_function", None).unwrap_err();
        assert!(matches!(err, ViewError::InvalidArgument(_)));
    }

    #[test]
    fn render_resolves_name_and_overwrites_content_type() {
        let mut engine = MockEngine::new();
        engine
            .expect_render()
            .withf(|name, ctx| name == "foo.html.tera" && ctx.get("a") == Some(&json!(1)))
            .times(1)
            .returning(|_, _| Ok("rendered".to_string()));
        engine.expect_charset().return_const("UTF-8".to_string());

        let view = EngineView::with_engine(engine);
        let response = http::Response::builder()
            .header(CONTENT_TYPE, "application/json")
            .body(Body::new())
            .unwrap();

        let response = view
            .render(response, "foo", Context::new().with("a", 1))
            .unwrap();

        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "text/html; charset=UTF-8"
        );
        assert_eq!(response.body().to_string_lossy(), "rendered");
        assert_eq!(response.body().chunks().len(), 1);
    }

    #[test]
    fn render_rejects_traversal_before_engine() {
        let mut engine = MockEngine::new();
        engine.expect_render().never();

        let view = EngineView::with_engine(engine);
        let err = view
            .render(Response::new(Body::new()), "../secret", Context::new())
            .unwrap_err();
        assert!(matches!(err, ViewError::InvalidName { .. }));
    }

    struct Refusing;

    impl Plugin for Refusing {
        fn name(&self) -> &'static str {
            "refusing"
        }

        fn on_attach(&self, _view: &mut dyn View) -> ViewResult<()> {
            Ok(())
        }

        fn on_render(&self, _view: &dyn View, _template: &str, _context: &Context) -> ViewResult<()> {
            Err(ViewError::Plugin {
                plugin: "refusing",
                reason: "no".into(),
            })
        }
    }

    #[test]
    fn failing_plugin_prevents_template_execution() {
        let mut engine = MockEngine::new();
        engine.expect_render().never();
        engine.expect_charset().never();

        let mut view = EngineView::with_engine(engine);
        view.add_plugin(Refusing).unwrap();

        let response = http::Response::builder()
            .header(CONTENT_TYPE, "application/json")
            .body(Body::new())
            .unwrap();
        let err = view.render(response, "foo", Context::new()).unwrap_err();
        assert!(matches!(err, ViewError::Plugin { plugin: "refusing", .. }));
    }

    #[test]
    fn engine_errors_propagate() {
        let mut engine = MockEngine::new();
        engine
            .expect_render()
            .returning(|_, _| Err(ViewError::engine("template 'foo.html.tera' not found")));
        engine.expect_charset().never();

        let view = EngineView::with_engine(engine);
        let err = view
            .render(Response::new(Body::new()), "foo", Context::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "template 'foo.html.tera' not found");
    }

    #[test]
    fn custom_extension_is_used_for_resolution() {
        let view = EngineView::with_engine(MockEngine::new()).with_ext("twig");
        assert_eq!(view.resolver().file_name("foo/").unwrap(), "foo/index.twig");
        assert_eq!(view.kind(), "engine");
    }
}
