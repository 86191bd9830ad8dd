//! Per-call temporary workspaces.
//!
//! A [`Workspace`] owns a uniquely named directory for exactly one call.
//! [`Workspace::release`] removes it and only logs failures. If a workspace
//! is dropped without being released (panic, abandoned future) the directory
//! is still removed by the underlying [`tempfile::TempDir`].

use std::path::{Component, Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::ToolError;

#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl Workspace {
    /// Create a fresh directory named `sysop-<operation>-<random>`.
    ///
    /// `root` defaults to the system temp directory.
    pub async fn create(operation: &str, root: Option<&Path>) -> Result<Self, ToolError> {
        let prefix = format!("sysop-{}-", sanitize(operation));
        let root = root.map(Path::to_path_buf);

        let dir = tokio::task::spawn_blocking(move || {
            let mut builder = tempfile::Builder::new();
            builder.prefix(&prefix);
            match root {
                Some(root) => builder.tempdir_in(root),
                None => builder.tempdir(),
            }
        })
        .await
        .map_err(|e| ToolError::internal(format!("workspace task failed: {}", e)))?
        .map_err(|e| ToolError::resource("Failed to create workspace", e))?;

        let path = dir.path().to_path_buf();
        debug!(path = %path.display(), "Created workspace");
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a file into the workspace and return its absolute path.
    ///
    /// The name must be a single plain path component.
    pub async fn materialize(&self, name: &str, content: &str) -> Result<PathBuf, ToolError> {
        let mut components = Path::new(name).components();
        let plain = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !plain {
            return Err(ToolError::InvalidFileName(PathBuf::from(name)));
        }

        let target = self.path.join(name);
        tokio::fs::write(&target, content)
            .await
            .map_err(|e| ToolError::resource(format!("Failed to write {}", name), e))?;
        debug!(file = %target.display(), bytes = content.len(), "Materialized file");
        Ok(target)
    }

    /// Remove the workspace. Failures are logged, never returned.
    pub async fn release(mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        let path = self.path.clone();

        match tokio::task::spawn_blocking(move || dir.close()).await {
            Ok(Ok(())) => debug!(path = %path.display(), "Removed workspace"),
            Ok(Err(e)) => warn!(path = %path.display(), error = %e, "Failed to remove workspace"),
            Err(e) => warn!(path = %path.display(), error = %e, "Workspace removal task failed"),
        }
    }
}

fn sanitize(operation: &str) -> String {
    operation
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
