//! Vhost data file watcher for hot reload.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::vhosts::registry::Vhosts;

/// Reloads a registry whenever its data file changes.
pub struct VhostFileWatcher {
    path: PathBuf,
    vhosts: Arc<Vhosts>,
}

impl VhostFileWatcher {
    /// Create a new VhostFileWatcher for `path`.
    pub fn new(path: &Path, vhosts: Arc<Vhosts>) -> Self {
        Self {
            path: path.to_path_buf(),
            vhosts,
        }
    }

    /// Start watching in a background thread.
    ///
    /// The parent directory is watched so the file may be created later.
    /// Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = self.path.file_name().map(|n| n.to_os_string());
        let path = self.path.clone();
        let vhosts = self.vhosts;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let touches_file = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if touches_file && (event.kind.is_modify() || event.kind.is_create()) {
                        reload(&vhosts, &path);
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Vhost data file watcher started");
        Ok(watcher)
    }
}

/// Load `path` into `vhosts`. Failures keep the current set.
pub fn reload(vhosts: &Vhosts, path: &Path) {
    tracing::info!(path = %path.display(), "Vhost data file change detected, reloading...");
    match vhosts.load(path) {
        Ok(()) => {}
        Err(e) if e.is_integrity_failure() => {
            tracing::error!(error = %e, "Vhost data file failed verification. Keeping current vhosts.");
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to reload vhosts. Keeping current vhosts.");
        }
    }
}
