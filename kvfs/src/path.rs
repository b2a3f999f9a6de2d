//! Path resolution: turn a slash-delimited path into the record key it names.
//!
//! Pure and synchronous, never touches storage. Accepts both `a/b` and `/a/b`
//! (the leading `/` of the immediate parent is dropped), and a trailing `/`
//! marks the path as one that must name a directory. Repeated slashes are kept
//! as-is: `a//b` and `a/b` are different records.

use crate::error::{Result, VfsError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPath {
    pub name: String,
    pub parent_path: Option<String>,
    /// Canonical key in the metadata and content stores.
    pub full_path: String,
    /// The input ended with `/`.
    pub directory_required: bool,
}

impl ResolvedPath {
    /// Metadata key of the containing directory; the root when there is no
    /// parent segment.
    pub fn parent_key(&self) -> &str {
        self.parent_path.as_deref().unwrap_or("")
    }

    pub fn is_root(&self) -> bool {
        self.full_path.is_empty()
    }
}

pub fn resolve(path: &str) -> Result<ResolvedPath> {
    let mut delimiter = path.rfind('/');
    let mut name = &path[delimiter.map_or(0, |i| i + 1)..];
    let mut directory_required = false;

    // Trailing `/`: the name is the segment before it.
    if let Some(last) = delimiter.filter(|_| name.is_empty()) {
        let head = &path[..last];
        delimiter = head.rfind('/');
        name = &head[delimiter.map_or(0, |i| i + 1)..];
        directory_required = true;
        if name.is_empty() {
            return Err(VfsError::InvalidPath(path.to_string()));
        }
    }

    let parent_path = delimiter.map(|i| {
        let parent = &path[..i];
        match parent.strip_prefix('/') {
            Some(stripped) if parent.len() > 1 => stripped,
            _ => parent,
        }
    });

    let full_path = match parent_path {
        Some(parent) if !parent.is_empty() => format!("{parent}/{name}"),
        _ => name.to_string(),
    };

    let resolved = ResolvedPath {
        name: name.to_string(),
        parent_path: parent_path.map(str::to_string),
        full_path,
        directory_required,
    };
    tracing::trace!(path, ?resolved, "resolved path");
    Ok(resolved)
}
