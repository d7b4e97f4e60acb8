use tracing::debug;

use vista_core::prelude::*;

use crate::engine::EngineView;
use crate::extensions;

/// Adds the template extensions compiled into this build.
///
/// Extensions are selected with the `text`, `array`, `date` and `pcre`
/// cargo features; see [`extensions`](crate::extensions). Extensions the
/// engine already has are left as they are.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExtensions;

impl DefaultExtensions {
    pub const NAME: &'static str = "default_extensions";

    pub fn new() -> Self {
        Self
    }
}

impl Plugin for DefaultExtensions {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn on_attach(&self, view: &mut dyn View) -> ViewResult<()> {
        let view = EngineView::from_view_mut(view, Self::NAME)?;

        let engine = view.engine_mut();

        // Select everything up front so a rejected attach leaves the engine untouched.
        let (present, missing): (Vec<_>, Vec<_>) = extensions::compiled()
            .into_iter()
            .partition(|extension| engine.has_extension(extension.name()));
        for extension in &present {
            debug!(extension = extension.name(), "Default extension already added");
        }

        for extension in missing {
            debug!(extension = extension.name(), "Adding default extension");
            engine.add_extension(extension)?;
        }

        Ok(())
    }

    fn on_render(&self, view: &dyn View, _template: &str, _context: &Context) -> ViewResult<()> {
        EngineView::from_view(view, Self::NAME).map(|_| ())
    }
}
