//! Template name resolution.
//!
//! Maps a caller-supplied logical name (`"users/show"`, `"users/"`,
//! `"feed.xml"`) to the file a view loads:
//!
//! | Name            | Extension `tpl`       |
//! |-----------------|-----------------------|
//! | `foo`           | `foo.tpl`             |
//! | `foo.html`      | `foo.html`            |
//! | `foo/bar/`      | `foo/bar/index.tpl`   |
//! | `""`            | `index.tpl`           |
//! | `../secret.yml` | `InvalidName`         |
//!
//! Rejecting `..` is the only guard keeping lookups inside the configured
//! root. Symlinks are not canonicalised.

use std::path::{Path, PathBuf};

use tracing::trace;

use crate::error::{ViewError, ViewResult};

/// Basename used when a name refers to a directory.
pub const INDEX_NAME: &str = "index";

/// Resolves logical template names against a default extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResolver {
    extension: String,
}

impl FileResolver {
    /// Create a resolver. A leading dot on `extension` is ignored.
    pub fn new(extension: impl Into<String>) -> Self {
        let extension = extension.into();
        Self {
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    /// The default extension, without leading dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Resolve `name` to a loader key (no root, no existence check).
    pub fn file_name(&self, name: &str) -> ViewResult<String> {
        assert_safe(name)?;

        if !name.ends_with('/') && has_extension(name) {
            return Ok(name.to_string());
        }

        let mut file = String::with_capacity(name.len() + INDEX_NAME.len() + self.extension.len() + 1);
        file.push_str(name);
        if name.is_empty() || name.ends_with('/') {
            file.push_str(INDEX_NAME);
        }
        file.push('.');
        file.push_str(&self.extension);

        Ok(file)
    }

    /// Resolve `name` to a path under `root`.
    ///
    /// Leading and duplicate separators in the name are collapsed, so the
    /// result always lies below `root` (modulo symlinks).
    pub fn resolve(&self, root: &Path, name: &str) -> ViewResult<PathBuf> {
        let file = self.file_name(name)?;

        let mut path = root.to_path_buf();
        for segment in file.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }

        trace!(name, path = %path.display(), "Resolved template name");
        Ok(path)
    }
}

/// Fail on any parent-directory traversal.
fn assert_safe(name: &str) -> ViewResult<()> {
    if name.contains("..") {
        return Err(ViewError::invalid_name(name));
    }
    Ok(())
}

/// Whether the last path segment carries a non-empty extension.
fn has_extension(name: &str) -> bool {
    let base = name.rsplit('/').next().unwrap_or(name);
    match base.rfind('.') {
        Some(dot) => dot + 1 < base.len(),
        None => false,
    }
}
