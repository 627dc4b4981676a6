//! Configuration file watcher for hot reload.
//!
//! Editors emit several modify events per save, so each reload is compared
//! with the last gate that was forwarded and only real changes go out.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::{EdgeConfig, GateConfig};

/// Outcome of re-reading the file once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Gate rules changed and were forwarded.
    Applied,
    /// File parsed but the gate is the same as before.
    Unchanged,
    /// File could not be loaded; the running rules stay.
    Failed,
}

/// Watches the configuration file and forwards gate changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<EdgeConfig>,
    last_gate: Mutex<Option<GateConfig>>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end of the update stream.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<EdgeConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
                last_gate: Mutex::new(None),
            },
            update_rx,
        )
    }

    /// Seed the gate currently in force, so the first identical save is
    /// not forwarded.
    pub fn with_current(self, config: &EdgeConfig) -> Self {
        if let Ok(mut last) = self.last_gate.lock() {
            *last = Some(config.gate.clone());
        }
        self
    }

    /// Re-read the file and forward it if the gate changed.
    pub fn reload(&self) -> ReloadOutcome {
        let config = match load_config(&self.path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(path = ?self.path, error = %e, "Failed to reload config, keeping current rules");
                return ReloadOutcome::Failed;
            }
        };

        let Ok(mut last) = self.last_gate.lock() else {
            return ReloadOutcome::Failed;
        };
        if last.as_ref() == Some(&config.gate) {
            tracing::debug!(path = ?self.path, "Config saved without gate changes");
            return ReloadOutcome::Unchanged;
        }

        *last = Some(config.gate.clone());
        tracing::info!(
            path = ?self.path,
            protected_prefixes = ?config.gate.protected_prefixes,
            "Gate configuration changed; other sections apply on restart"
        );
        if self.update_tx.send(config).is_err() {
            tracing::warn!("Config update receiver dropped");
        }
        ReloadOutcome::Applied
    }

    /// Start watching the file on notify's background thread.
    ///
    /// The returned watcher must be kept alive for as long as updates are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    self.reload();
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}
