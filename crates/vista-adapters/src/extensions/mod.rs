//! Optional template extensions.
//!
//! Each extension is compiled in through a cargo feature of the same name:
//!
//! | Feature | Extension          | Exports                                          |
//! |---------|--------------------|--------------------------------------------------|
//! | `text`  | [`TextExtension`]  | `paragraph`, `line`, `less`, `truncate_words`    |
//! | `array` | [`ArrayExtension`] | `sum`, `product`, `values`, `html_attr`          |
//! | `date`  | [`DateExtension`]  | `localdate`, `duration`, `age`                   |
//! | `pcre`  | [`PcreExtension`]  | `regex_match`, `regex_replace`, `regex_quote`    |
//!
//! All exports are filters: the piped value is the first positional
//! argument, further arguments are passed by name.

#[cfg(feature = "array")]
mod array;
#[cfg(feature = "date")]
mod date;
#[cfg(feature = "pcre")]
mod pcre;
#[cfg(feature = "text")]
mod text;

#[cfg(feature = "array")]
pub use array::ArrayExtension;
#[cfg(feature = "date")]
pub use date::DateExtension;
#[cfg(feature = "pcre")]
pub use pcre::PcreExtension;
#[cfg(feature = "text")]
pub use text::TextExtension;

use vista_core::prelude::*;

/// Every extension compiled into this build, in registration order.
pub fn compiled() -> Vec<Box<dyn Extension>> {
    #[allow(unused_mut)]
    let mut extensions: Vec<Box<dyn Extension>> = Vec::new();

    #[cfg(feature = "text")]
    extensions.push(Box::new(TextExtension));
    #[cfg(feature = "array")]
    extensions.push(Box::new(ArrayExtension));
    #[cfg(feature = "date")]
    extensions.push(Box::new(DateExtension));
    #[cfg(feature = "pcre")]
    extensions.push(Box::new(PcreExtension));

    extensions
}

/// Optional unsigned integer argument.
#[cfg(feature = "text")]
fn usize_arg(
    args: &Arguments,
    index: usize,
    name: &str,
    default: usize,
) -> Result<usize, FunctionError> {
    match args.get(index, name) {
        None | Some(serde_json::Value::Null) => Ok(default),
        Some(value) => value
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| {
                FunctionError::new(format!("argument '{name}' must be a positive integer"))
            }),
    }
}

/// Optional string argument.
#[cfg(any(feature = "text", feature = "date"))]
fn str_arg<'a>(
    args: &'a Arguments,
    index: usize,
    name: &str,
    default: &'a str,
) -> Result<&'a str, FunctionError> {
    match args.get(index, name) {
        None | Some(serde_json::Value::Null) => Ok(default),
        Some(_) => args.str(index, name),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use serde_json::Value;
    use vista_core::domain::function::FunctionResult;
    use vista_core::prelude::*;

    /// Call export `name` of `extension` with positional arguments.
    pub fn call(extension: &dyn Extension, name: &str, args: Vec<Value>) -> FunctionResult {
        call_with(extension, name, Arguments::positional(args))
    }

    pub fn call_with(extension: &dyn Extension, name: &str, args: Arguments) -> FunctionResult {
        extension
            .exports()
            .into_iter()
            .find(|export| export.name == name)
            .unwrap_or_else(|| panic!("{} exports no '{name}'", extension.name()))
            .function
            .call(&args)
    }
}
