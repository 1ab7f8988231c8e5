//! Writing extracted artifacts to the project directory.

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, instrument, warn};

use crate::core::extract::ArtifactMap;
use crate::core::types::Artifact;

/// Resolve `relative` under `root`, refusing absolute paths and any path that
/// climbs out of `root`.
pub fn resolve_under(root: &Path, relative: &str) -> Option<PathBuf> {
    let candidate = Path::new(relative);
    if relative.trim().is_empty() || candidate.is_absolute() {
        return None;
    }
    let mut resolved = root.to_path_buf();
    for component in candidate.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(resolved)
}

/// Write every artifact in `artifacts` under `project_dir`, creating parent
/// directories as needed. Existing files are overwritten.
///
/// Unsafe paths are logged and skipped. The returned list holds the written
/// artifacts in mapping order.
#[instrument(skip_all, fields(project_dir = %project_dir.display(), count = artifacts.len()))]
pub fn write_artifacts(project_dir: &Path, artifacts: &ArtifactMap) -> Result<Vec<Artifact>> {
    let mut written = Vec::with_capacity(artifacts.len());
    for (path, content) in artifacts {
        let Some(target) = resolve_under(project_dir, path) else {
            warn!(path = %path, "refusing artifact path outside the project");
            continue;
        };
        write_file(&target, content)?;
        debug!(path = %path, bytes = content.len(), "wrote artifact");
        written.push(Artifact::new(path.clone(), content.clone()));
    }
    Ok(written)
}

/// Write `contents` to `path`, creating parent directories.
pub fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}
