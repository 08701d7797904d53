use anyhow::Result;
use notify::{
    event::ModifyKind, Config as NotifyConfig, Event, EventKind, RecommendedWatcher,
    RecursiveMode, Watcher,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::firewall::CompiledFirewall;

use super::Config;

/// Configuration change event
#[derive(Debug, Clone)]
pub enum ConfigEvent {
    /// Rules file was modified, reloaded and recompiled
    Reloaded(Arc<CompiledFirewall>),

    /// Rules file was modified but reload failed
    ReloadFailed(String),
}

/// Hot reload watcher for the rules file.
///
/// Publishes whole compiled snapshots through a watch channel. A reload
/// either replaces the current snapshot atomically or leaves it untouched,
/// so every in-flight evaluation observes one consistent rule spec.
pub struct ConfigWatcher {
    /// Path to rules file
    path: PathBuf,

    /// File watcher
    watcher: RecommendedWatcher,

    /// Event receiver
    event_rx: mpsc::Receiver<notify::Result<Event>>,

    /// Current compiled snapshot
    current: watch::Sender<Arc<CompiledFirewall>>,

    /// Debounce duration (avoid rapid reloads)
    debounce: Duration,
}

impl ConfigWatcher {
    /// Create a new config watcher
    pub fn new(path: impl AsRef<Path>, initial: &Config) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (event_tx, event_rx) = mpsc::channel(16);

        let compiled = Arc::new(CompiledFirewall::from_config(&initial.firewall)?);

        // Create file watcher
        let watcher = RecommendedWatcher::new(
            move |res| {
                let _ = event_tx.blocking_send(res);
            },
            NotifyConfig::default().with_poll_interval(Duration::from_secs(1)),
        )?;

        let (current, _) = watch::channel(compiled);

        Ok(Self {
            path,
            watcher,
            event_rx,
            current,
            debounce: Duration::from_millis(500),
        })
    }

    /// Start watching for rules file changes
    pub fn start(&mut self) -> Result<()> {
        info!(path = %self.path.display(), "starting config watcher");

        self.watcher
            .watch(&self.path, RecursiveMode::NonRecursive)?;

        Ok(())
    }

    /// Subscribe to compiled snapshot changes
    pub fn subscribe(&self) -> watch::Receiver<Arc<CompiledFirewall>> {
        self.current.subscribe()
    }

    /// Get current compiled snapshot
    pub fn current(&self) -> Arc<CompiledFirewall> {
        self.current.borrow().clone()
    }

    /// Process events (call in a loop)
    pub async fn process_events(&mut self) -> Option<ConfigEvent> {
        // Wait for file event
        let event = self.event_rx.recv().await?;

        match event {
            Ok(event) => {
                // Only care about modify events
                if !matches!(
                    event.kind,
                    EventKind::Modify(ModifyKind::Data(_))
                        | EventKind::Modify(ModifyKind::Any)
                ) {
                    return None;
                }

                debug!(paths = ?event.paths, "rules file modified");

                // Debounce - wait a bit before reloading
                tokio::time::sleep(self.debounce).await;

                Some(self.apply_reload())
            }
            Err(e) => {
                error!(error = %e, "file watcher error");
                None
            }
        }
    }

    /// Reload the rules file, recompile and publish the new snapshot.
    ///
    /// A successful reload replaces the current snapshot even when no
    /// subscriber exists: `send_replace` stores unconditionally, while
    /// `send` drops the value without receivers. A failed reload leaves
    /// the current snapshot untouched.
    fn apply_reload(&self) -> ConfigEvent {
        match Self::reload(&self.path) {
            Ok(compiled) => {
                let compiled = Arc::new(compiled);
                let stats = compiled.stats();
                info!(
                    rule_sets = stats.rule_sets,
                    rules = stats.rules,
                    "firewall rules reloaded"
                );

                self.current.send_replace(compiled.clone());
                ConfigEvent::Reloaded(compiled)
            }
            Err(e) => {
                warn!(error = %e, "rules reload failed, keeping current rules");
                ConfigEvent::ReloadFailed(format!("{:#}", e))
            }
        }
    }

    fn reload(path: &Path) -> Result<CompiledFirewall> {
        let config = Config::load(path)?;
        Ok(CompiledFirewall::from_config(&config.firewall)?)
    }

    /// Run the watcher loop
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = self.process_events() => {}
                _ = shutdown.changed() => {
                    info!("config watcher shutting down");
                    break;
                }
            }
        }
    }
}
