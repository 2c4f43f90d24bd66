//! Rule file watcher for hot reload.

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::rules::Rule;

/// Watches the config file and forwards freshly parsed rule sets.
///
/// The parent directory is watched rather than the file itself so that
/// editors which save by renaming a temp file over the original still
/// trigger a reload.
pub struct RuleWatcher {
    path: PathBuf,
    updates: mpsc::UnboundedSender<Vec<Rule>>,
}

impl RuleWatcher {
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<Vec<Rule>>) {
        let (updates, rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                updates,
            },
            rx,
        )
    }

    /// Start watching. Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self { path, updates } = self;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path.file_name().map(|n| n.to_os_string());
        let config_path = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!(error = %e, "Config watch error");
                        return;
                    }
                };
                if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                    return;
                }
                let touches_config = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                if !touches_config {
                    return;
                }

                match load_config(&config_path) {
                    Ok(config) => {
                        tracing::info!(
                            path = %config_path.display(),
                            rules = config.rules.len(),
                            "Config file changed, reloading rules"
                        );
                        if updates.send(config.rules).is_err() {
                            tracing::debug!("Rule update receiver dropped");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Config reload failed, keeping current rules");
                    }
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::info!(path = %path.display(), "Rule watcher started");
        Ok(watcher)
    }
}
