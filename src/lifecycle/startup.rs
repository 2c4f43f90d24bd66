//! Startup orchestration for the daemon.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::admin::{self, AdminState};
use crate::config::watcher::RuleWatcher;
use crate::config::{load_config, GuardConfig};
use crate::engine::GuardEngine;
use crate::events::AlertDispatcher;
use crate::lifecycle::signals::{self, Signal};
use crate::lifecycle::Shutdown;
use crate::limiter::Sweeper;
use crate::observability::{logging, metrics};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Load configuration, start every subsystem, and run until a shutdown signal.
pub async fn run(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &config_path {
        Some(path) => load_config(path)?,
        None => GuardConfig::default(),
    };

    logging::init_tracing(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "abuse-guard starting");
    tracing::info!(
        config = ?config_path,
        rules = config.rules.len(),
        event_log_capacity = config.engine.event_log_capacity,
        sweep_interval_secs = config.engine.sweep_interval_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let mut tasks: Vec<JoinHandle<()>> = Vec::new();

    let (alerts, dispatcher) = AlertDispatcher::from_config(&config.alerts)?;
    tasks.push(tokio::spawn(dispatcher.run(shutdown.subscribe())));

    let engine = Arc::new(GuardEngine::builder(config.clone()).alerts(alerts).build());

    let sweeper = Sweeper::new(
        engine.clone(),
        Duration::from_secs(config.engine.sweep_interval_secs),
    );
    tasks.push(tokio::spawn(sweeper.run(shutdown.subscribe())));

    // Held for the life of the process; dropping it stops the watch.
    let _watcher = match &config_path {
        Some(path) => {
            let (watcher, mut updates) = RuleWatcher::new(path);
            let engine = engine.clone();
            let mut stop = shutdown.subscribe();
            tasks.push(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        update = updates.recv() => match update {
                            Some(rules) => {
                                engine.reload_rules(rules);
                            }
                            None => break,
                        },
                        _ = stop.recv() => break,
                    }
                }
            }));
            match watcher.run() {
                Ok(w) => Some(w),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Rule watcher unavailable, reload via SIGHUP or admin API"
                    );
                    None
                }
            }
        }
        None => None,
    };

    if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        let state = AdminState::new(engine.clone(), &config.admin.api_key, config_path.clone());
        let rx = shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = admin::serve(listener, state, rx).await {
                tracing::error!(error = %e, "Admin API stopped with error");
            }
        }));
    }

    loop {
        match signals::next_signal().await? {
            Signal::Reload => match &config_path {
                Some(path) => reload(&engine, path),
                None => tracing::warn!("SIGHUP received but no config file to reload"),
            },
            Signal::Shutdown => break,
        }
    }

    shutdown.trigger();
    for task in tasks {
        if tokio::time::timeout(DRAIN_TIMEOUT, task).await.is_err() {
            tracing::warn!("Background task did not stop in time");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn reload(engine: &GuardEngine, path: &Path) {
    match load_config(path) {
        Ok(config) => {
            engine.reload_rules(config.rules);
        }
        Err(e) => tracing::error!(error = %e, "Reload failed, keeping current rules"),
    }
}
