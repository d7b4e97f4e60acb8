//! Application layer for Vista.
//!
//! This layer contains:
//! - **View**: the contract every view implementation satisfies
//! - **Plugin**: hook objects and the ordered pipeline that runs them
//! - **Ports**: interface definitions (traits) for template engines
//!
//! Adapters in `vista-adapters` implement the views and the engine port.

pub mod plugin;
pub mod ports;
pub mod view;

pub use plugin::{Plugin, PluginPipeline};
pub use ports::{Export, Extension, TemplateEngine};
pub use view::View;
