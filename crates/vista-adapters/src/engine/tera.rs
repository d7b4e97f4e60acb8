//! Tera implementation of the [`TemplateEngine`] port.
//!
//! Every file below the configured directories is loaded eagerly when the
//! engine is built. Loader keys are paths relative to their directory,
//! with `/` separators; directories of a non-main namespace are prefixed
//! with `@namespace/`. When several directories provide the same key, the
//! one configured first wins.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tera::Tera;
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use vista_core::application::ports::register_export;
use vista_core::config::{DEFAULT_CHARSET, EngineConfig, EngineOptions, LoaderPath};
use vista_core::prelude::*;

/// Tera-backed template engine.
#[derive(Debug)]
pub struct TeraEngine {
    tera: Tera,
    charset: String,
    extensions: Vec<&'static str>,
}

impl TeraEngine {
    /// An engine without templates, using the default autoescape suffixes.
    pub fn new() -> Self {
        let mut tera = Tera::default();
        tera.autoescape_on(EngineOptions::default().autoescape_suffixes());

        Self {
            tera,
            charset: DEFAULT_CHARSET.to_string(),
            extensions: Vec::new(),
        }
    }

    /// Build an engine loading every template of `config.paths`.
    #[instrument(skip_all, fields(paths = config.paths.len()))]
    pub fn from_config(config: &EngineConfig) -> ViewResult<Self> {
        if !config.options.extra.is_empty() {
            warn!(
                options = ?config.options.extra.keys().collect::<Vec<_>>(),
                "Ignoring engine options Tera doesn't support"
            );
        }

        // Tera replaces templates on insertion, so load lowest precedence first.
        let mut files = Vec::new();
        for loader_path in config.paths.iter().rev() {
            files.extend(template_files(loader_path)?);
        }
        debug!(templates = files.len(), "Loading templates");

        let mut tera = Tera::default();
        tera.autoescape_on(config.options.autoescape_suffixes());
        tera.add_template_files(files).map_err(ViewError::engine)?;

        Ok(Self {
            tera,
            charset: config.options.charset().to_string(),
            extensions: Vec::new(),
        })
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Add a template from a string, replacing any template with that key.
    pub fn add_raw_template(&mut self, name: &str, content: &str) -> ViewResult<()> {
        self.tera
            .add_raw_template(name, content)
            .map_err(ViewError::engine)
    }

    pub fn tera(&self) -> &Tera {
        &self.tera
    }

    pub fn tera_mut(&mut self) -> &mut Tera {
        &mut self.tera
    }

    /// Names of added extensions, in order.
    pub fn extensions(&self) -> &[&'static str] {
        &self.extensions
    }

    /// Loaded template keys, sorted.
    pub fn template_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tera.get_template_names().collect();
        names.sort_unstable();
        names
    }
}

impl Default for TeraEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine for TeraEngine {
    fn charset(&self) -> String {
        self.charset.clone()
    }

    fn render(&self, name: &str, context: &Context) -> ViewResult<String> {
        self.tera
            .render(name, &tera_context(context))
            .map_err(ViewError::engine)
    }

    // Tera resolves `extends` statically, so the context is not consulted.
    fn parent(&self, name: &str, _context: &Context) -> ViewResult<Option<String>> {
        let template = self.tera.get_template(name).map_err(ViewError::engine)?;
        Ok(template.parent.clone())
    }

    fn register_function(&mut self, name: &str, function: ViewFunction) {
        self.tera.register_function(name, Bridge::new(name, function));
    }

    fn register_filter(&mut self, name: &str, function: ViewFunction) {
        self.tera.register_filter(name, Bridge::new(name, function));
    }

    fn has_extension(&self, name: &str) -> bool {
        self.extensions.contains(&name)
    }

    fn add_extension(&mut self, extension: Box<dyn Extension>) -> ViewResult<()> {
        let name = extension.name();
        if self.has_extension(name) {
            return Err(ViewError::InvalidArgument(format!(
                "Extension '{name}' is already added"
            )));
        }

        let exports = extension.exports();
        debug!(extension = name, exports = exports.len(), "Adding extension");
        for export in exports {
            register_export(self, export);
        }

        self.extensions.push(name);
        Ok(())
    }
}

/// Template files below one loader path, with their loader keys.
fn template_files(loader_path: &LoaderPath) -> ViewResult<Vec<(PathBuf, Option<String>)>> {
    let root = &loader_path.path;
    if !root.is_dir() {
        return Err(ViewError::configuration(format!(
            "Template directory '{}' doesn't exist",
            root.display()
        )));
    }

    let prefix = if loader_path.is_main() {
        String::new()
    } else {
        format!("@{}/", loader_path.namespace)
    };

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| ViewError::configuration(e.to_string()))?;
        if !entry.file_type().is_file() || is_hidden(entry.path()) {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        files.push((entry.path().to_path_buf(), Some(format!("{prefix}{key}"))));
    }

    Ok(files)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

fn tera_context(context: &Context) -> tera::Context {
    let mut ctx = tera::Context::new();
    for (name, value) in context.iter() {
        ctx.insert(name.as_str(), value);
    }
    ctx
}

/// A [`ViewFunction`] registered with Tera, keeping its safe marking.
struct Bridge {
    name: String,
    function: ViewFunction,
}

impl Bridge {
    fn new(name: &str, function: ViewFunction) -> Self {
        Self {
            name: name.to_string(),
            function,
        }
    }

    fn invoke(&self, args: Arguments) -> tera::Result<Value> {
        self.function
            .call(&args)
            .map_err(|e| tera::Error::msg(format!("Function '{}' failed: {e}", self.name)))
    }
}

impl tera::Function for Bridge {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        self.invoke(Arguments::new(Vec::new(), named(args)))
    }

    fn is_safe(&self) -> bool {
        self.function.is_safe()
    }
}

impl tera::Filter for Bridge {
    fn filter(&self, value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
        self.invoke(Arguments::new(vec![value.clone()], named(args)))
    }

    fn is_safe(&self) -> bool {
        self.function.is_safe()
    }
}

fn named(args: &HashMap<String, Value>) -> BTreeMap<String, Value> {
    args.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}
