//! View adapters for Vista.
//!
//! This crate implements the `View` contract and the `TemplateEngine` port
//! defined in `vista-core`. It contains every filesystem and engine access.
//!
//! - [`ScriptView`]: script files with `<%= expr %>` echo tags
//! - [`EngineView`] + [`TeraEngine`]: Tera templates with a plugin pipeline
//! - [`extensions`]: optional template filters (cargo features)
//! - [`plugins`]: [`DefaultExtensions`] and [`AssetPipeline`]

pub mod engine;
pub mod extensions;
pub mod plugins;
pub mod script;

// Re-export commonly used adapters
pub use engine::{EngineView, TeraEngine};
pub use plugins::{AssetPipeline, DefaultExtensions, StaticAssetFactory};
pub use script::ScriptView;
