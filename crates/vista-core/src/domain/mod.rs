//! Core domain layer for Vista.
//!
//! Pure values and functions with no engine or filesystem access:
//!
//! - **Resolver**: logical template name -> file path or loader key
//! - **Context**: the ordered variable bindings handed to a template
//! - **Functions**: callables exposed to templates, and the ambient registry
//! - **Response**: the chunked body stream written by views

pub mod context;
pub mod function;
pub mod registry;
pub mod resolver;
pub mod response;

pub use context::Context;
pub use function::{Arguments, FunctionError, FunctionKind, FunctionRef, ViewFunction};
pub use registry::FunctionRegistry;
pub use resolver::{FileResolver, INDEX_NAME};
pub use response::{Body, Response};
