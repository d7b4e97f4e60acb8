//! View plugins and the ordered pipeline that runs them.
//!
//! A plugin observes two lifecycle points of the view it is attached to:
//!
//! 1. [`Plugin::on_attach`]: once, synchronously, before the plugin is
//!    stored. Failing here keeps the plugin out of the pipeline.
//! 2. [`Plugin::on_render`]: before every render, in attach order. Failing
//!    here aborts the render before the template runs.

use tracing::{debug, instrument};

use super::View;
use crate::domain::Context;
use crate::error::ViewResult;

/// Hook object attached to a view.
pub trait Plugin: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Called when the plugin is added to `view`.
    ///
    /// Fails with [`ViewError::PluginRejected`](crate::error::ViewError::PluginRejected)
    /// if the plugin does not support the view family.
    fn on_attach(&self, view: &mut dyn View) -> ViewResult<()>;

    /// Called before `view` renders `template` (the resolved loader key).
    fn on_render(&self, view: &dyn View, template: &str, context: &Context) -> ViewResult<()>;
}

/// Ordered, append-only sequence of plugins.
#[derive(Default)]
pub struct PluginPipeline {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a plugin whose `on_attach` already succeeded.
    pub fn push(&mut self, plugin: Box<dyn Plugin>) {
        debug!(plugin = plugin.name(), position = self.plugins.len(), "Plugin attached");
        self.plugins.push(plugin);
    }

    /// Run every `on_render` hook in attach order, stopping at the first failure.
    #[instrument(skip_all, fields(template = %template, plugins = self.plugins.len()))]
    pub fn on_render(&self, view: &dyn View, template: &str, context: &Context) -> ViewResult<()> {
        for plugin in &self.plugins {
            debug!(plugin = plugin.name(), "Invoking render hook");
            plugin.on_render(view, template, context)?;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Plugin> {
        self.plugins.iter().map(|p| p.as_ref())
    }

    /// Plugin names in attach order.
    pub fn names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl std::fmt::Debug for PluginPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
