use std::path::{Component, Path, PathBuf};

use crate::error::SandboxError;

/// Confines every note path to a single scratch directory.
///
/// Both reads and writes go through [`ScratchRoot::resolve`] and then
/// [`ScratchRoot::confine`]; neither trusts the caller's directory
/// components.
#[derive(Debug, Clone)]
pub struct ScratchRoot {
    /// The root as written in configuration.
    configured_root: PathBuf,
    /// Canonical (absolute, symlinks resolved) root.
    canonical_root: PathBuf,
}

impl ScratchRoot {
    /// Create a scratch root at the given path.
    /// Creates the directory if it doesn't exist and resolves to canonical path.
    pub fn new(root: &Path) -> Result<Self, SandboxError> {
        let unavailable = |source| SandboxError::RootUnavailable {
            root: root.to_path_buf(),
            source,
        };
        std::fs::create_dir_all(root).map_err(unavailable)?;
        let canonical_root = std::fs::canonicalize(root).map_err(unavailable)?;
        Ok(Self {
            configured_root: root.to_path_buf(),
            canonical_root,
        })
    }

    /// Get the canonical scratch root path.
    pub fn root(&self) -> &Path {
        &self.canonical_root
    }

    /// Map a caller-supplied path onto a location inside the root.
    ///
    /// A path that already starts with the root and descends through normal
    /// components only is kept as is. Anything else loses its directory
    /// components and its bare filename is placed directly under the root.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf, SandboxError> {
        let requested = Path::new(raw);

        for prefix in [&self.canonical_root, &self.configured_root] {
            if let Ok(rest) = requested.strip_prefix(prefix) {
                let descends = rest.components().next().is_some()
                    && rest.components().all(|c| matches!(c, Component::Normal(_)));
                if descends {
                    return Ok(self.canonical_root.join(rest));
                }
            }
        }

        requested
            .file_name()
            .map(|name| self.canonical_root.join(name))
            .ok_or_else(|| SandboxError::NoFileName {
                raw: raw.to_string(),
            })
    }

    /// Verify that a resolved path still lands inside the root once
    /// symlinks are followed.
    ///
    /// Walks up to the nearest existing ancestor, canonicalizes it and
    /// re-attaches the missing tail. A dangling symlink anywhere on the way
    /// is rejected as [`SandboxError::DanglingLink`].
    pub async fn confine(&self, target: &Path) -> Result<(), SandboxError> {
        let outside = || SandboxError::OutsideRoot {
            path: target.to_path_buf(),
            root: self.canonical_root.clone(),
        };

        let mut probe = target.to_path_buf();
        let mut missing = Vec::new();
        let canonical = loop {
            match tokio::fs::canonicalize(&probe).await {
                Ok(c) => break c,
                Err(_) => {
                    if tokio::fs::symlink_metadata(&probe).await.is_ok() {
                        return Err(SandboxError::DanglingLink { path: probe });
                    }
                    let name = probe.file_name().map(|n| n.to_os_string()).ok_or_else(|| {
                        SandboxError::NoFileName {
                            raw: target.display().to_string(),
                        }
                    })?;
                    missing.push(name);
                    probe.pop();
                }
            }
        };

        let full = missing
            .iter()
            .rev()
            .fold(canonical, |acc, name| acc.join(name));

        if full.starts_with(&self.canonical_root) {
            Ok(())
        } else {
            Err(outside())
        }
    }
}
