//! The view contract.

use std::any::Any;

use crate::domain::{Context, FunctionRef, Response};
use crate::error::ViewResult;

/// Something that renders a named template into an HTTP response.
///
/// Implemented by:
/// - `vista_adapters::ScriptView` (script files with echo tags)
/// - `vista_adapters::EngineView` (Tera, or any [`TemplateEngine`](super::TemplateEngine))
pub trait View: Any + Send + Sync {
    /// Expose a function to templates under `name`.
    ///
    /// With `function` unset, the ambient function of the same name is
    /// exposed. Views that cannot honour the request fail without changing
    /// any state.
    fn expose(&mut self, name: &str, function: Option<FunctionRef>) -> ViewResult<()>;

    /// Render template `name` with `context` into `response`.
    ///
    /// Either the complete output is written to the returned response or an
    /// error is returned and nothing is written.
    fn render(&self, response: Response, name: &str, context: Context) -> ViewResult<Response>;

    /// Short name of the view family, used in logs and error messages.
    fn kind(&self) -> &'static str;

    /// Downcast support, so plugins can check the concrete view family.
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
