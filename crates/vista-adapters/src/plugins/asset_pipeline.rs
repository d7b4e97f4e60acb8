use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use vista_core::prelude::*;

use crate::engine::EngineView;

/// Error type returned by asset writers.
pub type WriteError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Turns asset paths into public URLs.
pub trait AssetFactory: Send + Sync + fmt::Debug {
    fn asset_url(&self, path: &str) -> Result<String, FunctionError>;
}

/// Receives the templates involved in a render, to build their assets.
pub trait AssetWriter: Send + Sync {
    fn write_assets(&self, batch: &AssetBatch) -> Result<(), WriteError>;
}

/// One template taking part in a render, by loader key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TemplateResource {
    pub name: String,
}

impl TemplateResource {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// The rendered template followed by each of its ancestors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssetBatch {
    pub resources: Vec<TemplateResource>,
}

impl AssetBatch {
    pub fn names(&self) -> Vec<&str> {
        self.resources.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Serves assets from a fixed base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticAssetFactory {
    pub base_url: String,
}

impl StaticAssetFactory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl AssetFactory for StaticAssetFactory {
    fn asset_url(&self, path: &str) -> Result<String, FunctionError> {
        if path.contains("..") {
            return Err(FunctionError::new(format!("Invalid asset path '{path}'")));
        }

        Ok(format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        ))
    }
}

/// Template extension exporting `asset(path)`.
#[derive(Debug, Clone)]
pub struct AssetExtension {
    factory: Arc<dyn AssetFactory>,
}

impl AssetExtension {
    pub fn new(factory: Arc<dyn AssetFactory>) -> Self {
        Self { factory }
    }
}

impl Extension for AssetExtension {
    fn name(&self) -> &'static str {
        "assets"
    }

    fn exports(&self) -> Vec<Export> {
        let factory = Arc::clone(&self.factory);
        vec![Export::function(
            "asset",
            ViewFunction::new(move |args| {
                factory
                    .asset_url(args.str(0, "path")?)
                    .map(Value::String)
            }),
        )]
    }
}

/// Hands every rendered template chain to an [`AssetWriter`].
///
/// On attach the `asset()` function is added to the engine. Before each
/// render the rendered template and all templates it extends are collected
/// and written in one batch.
pub struct AssetPipeline {
    factory: Arc<dyn AssetFactory>,
    writer: Box<dyn AssetWriter>,
}

impl AssetPipeline {
    pub const NAME: &'static str = "asset_pipeline";

    pub fn new(factory: impl AssetFactory + 'static, writer: impl AssetWriter + 'static) -> Self {
        Self {
            factory: Arc::new(factory),
            writer: Box::new(writer),
        }
    }

    fn failure(reason: impl Into<String>) -> ViewError {
        ViewError::Plugin {
            plugin: Self::NAME,
            reason: reason.into(),
        }
    }

    /// `template` followed by its ancestors, nearest first.
    fn template_chain(
        engine: &dyn TemplateEngine,
        template: &str,
        context: &Context,
    ) -> ViewResult<AssetBatch> {
        let mut resources = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(template.to_string());

        while let Some(name) = current {
            if !seen.insert(name.clone()) {
                return Err(Self::failure(format!(
                    "Template '{name}' appears twice in its own inheritance chain"
                )));
            }

            current = engine.parent(&name, context)?;
            resources.push(TemplateResource { name });
        }

        Ok(AssetBatch { resources })
    }
}

impl Plugin for AssetPipeline {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn on_attach(&self, view: &mut dyn View) -> ViewResult<()> {
        let view = EngineView::from_view_mut(view, Self::NAME)?;
        view.engine_mut()
            .add_extension(Box::new(AssetExtension::new(Arc::clone(&self.factory))))
    }

    #[instrument(skip_all, fields(plugin = Self::NAME, template = %template))]
    fn on_render(&self, view: &dyn View, template: &str, context: &Context) -> ViewResult<()> {
        let view = EngineView::from_view(view, Self::NAME)?;

        let batch = Self::template_chain(view.engine(), template, context)?;
        debug!(templates = ?batch.names(), "Writing assets");

        self.writer
            .write_assets(&batch)
            .map_err(|e| Self::failure(e.to_string()))
    }
}

impl fmt::Debug for AssetPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetPipeline")
            .field("factory", &self.factory)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TeraEngine;
    use crate::script::ScriptView;
    use serde_json::json;
    use std::sync::Mutex;
    use vista_core::config::ScriptConfig;

    #[derive(Clone, Default)]
    struct RecordingWriter {
        batches: Arc<Mutex<Vec<AssetBatch>>>,
    }

    impl AssetWriter for RecordingWriter {
        fn write_assets(&self, batch: &AssetBatch) -> Result<(), WriteError> {
            self.batches.lock().unwrap().push(batch.clone());
            Ok(())
        }
    }

    struct FailingWriter;

    impl AssetWriter for FailingWriter {
        fn write_assets(&self, _batch: &AssetBatch) -> Result<(), WriteError> {
            Err("disk full".into())
        }
    }

    fn factory() -> StaticAssetFactory {
        StaticAssetFactory::new("/static/")
    }

    fn engine_with(templates: &[(&str, &str)]) -> TeraEngine {
        let mut engine = TeraEngine::new();
        for (name, content) in templates {
            engine.add_raw_template(name, content).unwrap();
        }
        engine
    }

    #[test]
    fn static_factory_joins_base_url() {
        assert_eq!(factory().asset_url("css/site.css").unwrap(), "/static/css/site.css");
        assert_eq!(factory().asset_url("/app.js").unwrap(), "/static/app.js");
        assert!(factory().asset_url("../secret").is_err());
    }

    #[test]
    fn derived_template_writes_chain_in_one_batch() {
        let writer = RecordingWriter::default();
        let engine = engine_with(&[
            ("base.html.tera", "<main>{% block body %}{% endblock %}</main>"),
            (
                "foo.html.tera",
                r#"{% extends "base.html.tera" %}{% block body %}foo{% endblock %}"#,
            ),
        ]);

        let mut view = EngineView::with_engine(engine);
        view.add_plugin(AssetPipeline::new(factory(), writer.clone()))
            .unwrap();

        let response = view
            .render(Response::new(Body::new()), "foo", Context::new())
            .unwrap();
        assert_eq!(response.body().to_string_lossy(), "<main>foo</main>");

        let batches = writer.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].names(), ["foo.html.tera", "base.html.tera"]);
    }

    #[test]
    fn asset_function_is_exposed() {
        let engine = engine_with(&[("page.html.tera", "{{ asset(path='css/site.css') }}")]);

        let mut view = EngineView::with_engine(engine);
        view.add_plugin(AssetPipeline::new(factory(), RecordingWriter::default()))
            .unwrap();

        let response = view
            .render(Response::new(Body::new()), "page", Context::new())
            .unwrap();
        assert_eq!(response.body().to_string_lossy(), "&#x2F;static&#x2F;css&#x2F;site.css");
    }

    #[test]
    fn writer_failure_aborts_render() {
        let engine = engine_with(&[("page.html.tera", "never")]);

        let mut view = EngineView::with_engine(engine);
        view.add_plugin(AssetPipeline::new(factory(), FailingWriter))
            .unwrap();

        let err = view
            .render(Response::new(Body::new()), "page", Context::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "Plugin 'asset_pipeline' failed: disk full");
    }

    struct LoopingEngine;

    impl TemplateEngine for LoopingEngine {
        fn charset(&self) -> String {
            "UTF-8".into()
        }

        fn render(&self, _name: &str, _context: &Context) -> ViewResult<String> {
            Ok(String::new())
        }

        fn parent(&self, name: &str, _context: &Context) -> ViewResult<Option<String>> {
            Ok(Some(if name == "a" { "b" } else { "a" }.to_string()))
        }

        fn register_function(&mut self, _name: &str, _function: ViewFunction) {}

        fn register_filter(&mut self, _name: &str, _function: ViewFunction) {}

        fn has_extension(&self, _name: &str) -> bool {
            false
        }

        fn add_extension(&mut self, _extension: Box<dyn Extension>) -> ViewResult<()> {
            Ok(())
        }
    }

    #[test]
    fn inheritance_cycle_is_a_plugin_error() {
        let err = AssetPipeline::template_chain(&LoopingEngine, "a", &Context::new()).unwrap_err();
        assert!(matches!(err, ViewError::Plugin { plugin: "asset_pipeline", .. }));
    }

    #[test]
    fn rejects_script_views() {
        let plugin = AssetPipeline::new(factory(), RecordingWriter::default());
        let mut view = ScriptView::new(ScriptConfig::new("views"));

        let attach = plugin.on_attach(&mut view).unwrap_err();
        assert!(matches!(attach, ViewError::PluginRejected { required: "engine", .. }));

        let render = plugin.on_render(&view, "x.tpl", &Context::new()).unwrap_err();
        assert!(matches!(render, ViewError::PluginRejected { .. }));
    }

    #[test]
    fn batch_serializes_as_manifest() {
        let batch = AssetBatch {
            resources: vec![TemplateResource::new("foo.html.tera")],
        };
        assert_eq!(
            serde_json::to_value(&batch).unwrap(),
            json!({"resources": [{"name": "foo.html.tera"}]})
        );
    }
}
