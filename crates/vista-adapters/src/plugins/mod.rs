//! Plugins for engine views.
//!
//! - [`DefaultExtensions`]: adds every compiled-in template extension
//! - [`AssetPipeline`]: exposes `asset()` and hands the rendered template
//!   chain to an [`AssetWriter`] before each render

mod asset_pipeline;
mod default_extensions;

pub use asset_pipeline::{
    AssetBatch, AssetExtension, AssetFactory, AssetPipeline, AssetWriter, StaticAssetFactory,
    TemplateResource, WriteError,
};
pub use default_extensions::DefaultExtensions;
