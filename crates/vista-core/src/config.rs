//! View configuration.
//!
//! [`ViewOptions`] is the raw option bag a host hands over (`path`, `ext`,
//! engine passthrough options). It is turned into the immutable
//! [`ScriptConfig`] or [`EngineConfig`] once, at view construction.
//!
//! # Resolution order (highest priority first)
//!
//! 1. Environment variables prefixed with `VISTA_` (`VISTA_PATH`, `VISTA_EXT`,
//!    `VISTA_CHARSET`; nested keys use `__`)
//! 2. Config file (TOML, JSON or YAML, detected from the extension)
//! 3. Built-in defaults
//!
//! # Example (`views.toml`)
//!
//! ```toml
//! ext = "html.tera"
//! charset = "UTF-8"
//!
//! [path]
//! __main__ = "templates"
//! admin = "admin/templates"
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{ViewError, ViewResult};

/// Namespace used for unkeyed loader paths.
pub const MAIN_NAMESPACE: &str = "__main__";

/// Default extension of script views.
pub const DEFAULT_SCRIPT_EXT: &str = "tpl";

/// Default extension of engine views.
pub const DEFAULT_ENGINE_EXT: &str = "html.tera";

pub const DEFAULT_CHARSET: &str = "UTF-8";

const ENV_PREFIX: &str = "VISTA";

// ── Raw options ───────────────────────────────────────────────────────────────

/// `path` option: one directory, a list, or a namespace -> directory map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathOption {
    Single(PathBuf),
    List(Vec<PathBuf>),
    Namespaced(BTreeMap<String, PathBuf>),
}

/// Options as supplied by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewOptions {
    /// Template directory or directories. Required.
    pub path: Option<PathOption>,
    /// Default file extension, without leading dot.
    pub ext: Option<String>,
    /// Everything else is forwarded to the engine.
    #[serde(flatten)]
    pub engine: EngineOptions,
}

impl ViewOptions {
    /// Options with a single template directory.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(PathOption::Single(path.into())),
            ..Self::default()
        }
    }

    /// Load options from an optional config file, overridden by `VISTA_*`
    /// environment variables.
    pub fn load(config_file: Option<&Path>) -> ViewResult<Self> {
        Self::load_with_env(config_file, None)
    }

    /// Like [`load`](Self::load), reading variables from `env` instead of the
    /// process environment when given.
    pub fn load_with_env(
        config_file: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> ViewResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(file) = config_file {
            debug!(file = %file.display(), "Loading view configuration");
            builder = builder.add_source(config::File::from(file));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .source(env),
        );

        builder
            .build()
            .and_then(|cfg| cfg.try_deserialize::<Self>())
            .map_err(|e| ViewError::configuration(e.to_string()))
    }

    /// Configuration for a script view.
    ///
    /// Only a single directory is meaningful for scripts.
    pub fn script_config(&self) -> ViewResult<ScriptConfig> {
        let path = match &self.path {
            Some(PathOption::Single(path)) => path.clone(),
            Some(_) => {
                return Err(ViewError::configuration(
                    "script views take a single 'path' directory",
                ));
            }
            None => return Err(missing_path()),
        };

        Ok(ScriptConfig {
            path,
            ext: self.ext.clone().unwrap_or_else(|| DEFAULT_SCRIPT_EXT.into()),
        })
    }

    /// Configuration for an engine view.
    pub fn engine_config(&self) -> ViewResult<EngineConfig> {
        let paths = match &self.path {
            Some(PathOption::Single(path)) => vec![LoaderPath::main(path)],
            Some(PathOption::List(paths)) => paths.iter().map(LoaderPath::main).collect(),
            Some(PathOption::Namespaced(map)) => map
                .iter()
                .map(|(namespace, path)| LoaderPath::new(namespace, path))
                .collect(),
            None => return Err(missing_path()),
        };

        if paths.is_empty() {
            return Err(missing_path());
        }

        Ok(EngineConfig {
            paths,
            ext: self.ext.clone().unwrap_or_else(|| DEFAULT_ENGINE_EXT.into()),
            options: self.engine.clone(),
        })
    }
}

fn missing_path() -> ViewError {
    ViewError::configuration("'path' option is required")
}

/// Engine options, forwarded verbatim to engine construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Output charset (default `UTF-8`).
    pub charset: Option<String>,
    /// File suffixes rendered with HTML auto-escaping.
    pub autoescape: Option<Vec<String>>,
    /// Options this crate does not interpret.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl EngineOptions {
    pub fn charset(&self) -> &str {
        self.charset.as_deref().unwrap_or(DEFAULT_CHARSET)
    }

    /// Suffixes to auto-escape, as `'static` strings.
    ///
    /// Engines such as Tera keep suffixes for the process lifetime, so
    /// configured values are interned.
    pub fn autoescape_suffixes(&self) -> Vec<&'static str> {
        match &self.autoescape {
            Some(suffixes) => suffixes.iter().map(|s| intern(s)).collect(),
            None => vec![".html", ".htm", ".xml", ".html.tera"],
        }
    }
}

// ── Validated configs ─────────────────────────────────────────────────────────

/// Immutable script view configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptConfig {
    pub path: PathBuf,
    pub ext: String,
}

impl ScriptConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ext: DEFAULT_SCRIPT_EXT.into(),
        }
    }

    pub fn with_ext(mut self, ext: impl Into<String>) -> Self {
        self.ext = ext.into();
        self
    }
}

/// One loader search path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderPath {
    pub namespace: String,
    pub path: PathBuf,
}

impl LoaderPath {
    pub fn new(namespace: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            namespace: namespace.into(),
            path: path.into(),
        }
    }

    pub fn main(path: impl Into<PathBuf>) -> Self {
        Self::new(MAIN_NAMESPACE, path)
    }

    pub fn is_main(&self) -> bool {
        self.namespace == MAIN_NAMESPACE
    }
}

/// Immutable engine view configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Search paths in precedence order.
    pub paths: Vec<LoaderPath>,
    pub ext: String,
    pub options: EngineOptions,
}

impl EngineConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            paths: vec![LoaderPath::main(path)],
            ext: DEFAULT_ENGINE_EXT.into(),
            options: EngineOptions::default(),
        }
    }

    pub fn with_path(mut self, namespace: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.paths.push(LoaderPath::new(namespace, path));
        self
    }

    pub fn with_ext(mut self, ext: impl Into<String>) -> Self {
        self.ext = ext.into();
        self
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.options.charset = Some(charset.into());
        self
    }
}

// ── String interning ──────────────────────────────────────────────────────────

// Each distinct suffix is leaked at most once, so rebuilding engines (tests,
// reloads) reuses the same allocation.
fn intern(s: &str) -> &'static str {
    static TABLE: OnceLock<Mutex<HashSet<&'static str>>> = OnceLock::new();
    let table = TABLE.get_or_init(|| Mutex::new(HashSet::new()));
    let mut guard = table.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(&existing) = guard.get(s) {
        return existing;
    }

    let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
    guard.insert(leaked);
    leaked
}
