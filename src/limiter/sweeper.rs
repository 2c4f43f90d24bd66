//! Periodic eviction of stale engine state.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;

use crate::engine::GuardEngine;
use crate::observability::metrics;

/// Background task that keeps the engine's in-memory tables bounded.
pub struct Sweeper {
    engine: Arc<GuardEngine>,
    interval: Duration,
}

impl Sweeper {
    pub fn new(engine: Arc<GuardEngine>, interval: Duration) -> Self {
        Self { engine, interval }
    }

    /// Tick until the shutdown signal fires.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Sweeper starting");

        let mut ticker = time::interval(self.interval);
        // The first tick completes immediately; skip it so startup isn't a sweep.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.engine.sweep();
                    tracing::debug!(
                        windows = report.windows,
                        blocks = report.blocks,
                        csrf_tokens = report.csrf_tokens,
                        "Sweep complete"
                    );
                    metrics::record_table_sizes(
                        self.engine.window_entries(),
                        self.engine.active_blocks().len(),
                    );
                }
                _ = shutdown.recv() => {
                    tracing::info!("Sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GuardConfig;
    use crate::time::ManualClock;

    #[tokio::test]
    async fn test_sweeper_stops_on_shutdown() {
        let clock = ManualClock::new(0);
        let engine = Arc::new(GuardEngine::builder(GuardConfig::default()).clock(clock).build());
        let (tx, rx) = broadcast::channel(1);

        let handle = tokio::spawn(Sweeper::new(engine, Duration::from_millis(10)).run(rx));
        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }
}
