//! Vista Core - contracts for rendering templates into HTTP responses.
//!
//! This crate provides the domain and application layers of Vista, following
//! hexagonal (ports and adapters) architecture. It knows nothing about any
//! particular template engine.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Host application (HTTP)          │
//! │    calls View::render per request       │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │      Application (View, Plugin)         │
//! │  contracts + ordered plugin pipeline    │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │        Ports (TemplateEngine)           │
//! │  implemented by vista-adapters (Tera)   │
//! └──────────────────┬──────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │          Domain (pure logic)            │
//! │ FileResolver, Context, Body, functions  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vista_core::prelude::*;
//!
//! fn handle(view: &dyn View) -> ViewResult<Response> {
//!     let context = Context::new().with("color", "blue").with("answer", 42);
//!     view.render(Response::new(Body::new()), "home", context)
//! }
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod error;

// Public API - what adapters and hosts should use
pub mod prelude {
    pub use crate::application::{
        Plugin, PluginPipeline, View,
        ports::{Export, Extension, TemplateEngine},
    };
    pub use crate::config::{EngineConfig, EngineOptions, LoaderPath, ScriptConfig, ViewOptions};
    pub use crate::domain::{
        Arguments, Body, Context, FileResolver, FunctionError, FunctionKind, FunctionRef,
        FunctionRegistry, Response, ViewFunction,
    };
    pub use crate::error::{ErrorCategory, ViewError, ViewResult};
}

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
