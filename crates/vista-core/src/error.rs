//! Unified error handling for Vista.
//!
//! Every operation of a view (`expose`, `render`, `add_plugin`) returns a
//! [`ViewError`]. Errors are never logged or swallowed by the library; they
//! surface to the immediate caller, with a category and user-actionable
//! suggestions attached.

use std::path::PathBuf;
use thiserror::Error;

/// Root error type for view operations.
#[derive(Debug, Error)]
pub enum ViewError {
    // ========================================================================
    // Construction
    // ========================================================================
    /// A required option is missing or an option has an invalid value.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    // ========================================================================
    // Validation (no filesystem or engine access attempted)
    // ========================================================================
    /// Template name with a traversal segment, or an invalid exposed identifier.
    #[error("Invalid name '{name}'")]
    InvalidName { name: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The view cannot perform the requested operation.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    // ========================================================================
    // Not found
    // ========================================================================
    #[error("View file '{}' doesn't exist", path.display())]
    FileNotFound { path: PathBuf },

    // ========================================================================
    // Plugins
    // ========================================================================
    /// A plugin was attached to (or invoked with) a view family it does not support.
    #[error("Plugin '{plugin}' only works with {required} views")]
    PluginRejected {
        plugin: &'static str,
        required: &'static str,
    },

    #[error("Plugin '{plugin}' failed: {reason}")]
    Plugin { plugin: &'static str, reason: String },

    // ========================================================================
    // Rendering
    // ========================================================================
    #[error("Script error in '{}': {reason}", path.display())]
    Script { path: PathBuf, reason: String },

    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid header value: {0}")]
    Header(#[from] http::header::InvalidHeaderValue),

    /// Error raised by the wrapped template engine, passed through untouched.
    #[error(transparent)]
    Engine(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl ViewError {
    /// Wrap an engine error without reinterpreting it.
    pub fn engine(error: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        Self::Engine(error.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName { name: name.into() }
    }

    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Configuration { message } => vec![
                format!("Configuration issue: {}", message),
                "Check the 'path' option points at your template directory".into(),
            ],
            Self::InvalidName { name } if name.contains("..") => vec![
                "Template names may not contain '..'".into(),
                "Use a name relative to the configured template directory".into(),
            ],
            Self::InvalidName { .. } => vec![
                "Names must start with a letter and contain only letters, digits and '_'".into(),
            ],
            Self::FileNotFound { path } => vec![
                format!("Create the file: {}", path.display()),
                "Or check the configured path and default extension".into(),
            ],
            Self::UnsupportedOperation(_) => vec![
                "Script views can only expose ambient functions under their own name".into(),
                "Use an engine view to register aliases or closures".into(),
            ],
            Self::PluginRejected { required, .. } => {
                vec![format!("Attach this plugin to a {} view instead", required)]
            }
            _ => vec!["Check the error details above".into()],
        }
    }

    /// Get error category for display/styling purposes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::InvalidName { .. } | Self::InvalidArgument(_) => ErrorCategory::Validation,
            Self::UnsupportedOperation(_) | Self::PluginRejected { .. } => {
                ErrorCategory::Unsupported
            }
            Self::FileNotFound { .. } => ErrorCategory::NotFound,
            Self::Script { .. } | Self::Engine(_) => ErrorCategory::Rendering,
            Self::Plugin { .. } | Self::Io { .. } | Self::Header(_) => ErrorCategory::Internal,
        }
    }
}

/// Error categories for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Configuration,
    Unsupported,
    Rendering,
    Internal,
}

/// Convenient result type alias.
pub type ViewResult<T> = Result<T, ViewError>;
