//! Fire-and-forget delivery of alerts to external sinks.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::{broadcast, mpsc};

use crate::config::{AlertSinkConfig, AlertsConfig};
use crate::events::types::{SecurityEvent, Severity};
use crate::observability::metrics;
use crate::rules::Rule;

/// Payload sent to the notification channel when a block is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockNotice {
    pub target_key: String,
    /// Rule that triggered the block; absent for manual or critical-event blocks.
    pub rule: Option<Rule>,
    pub reason: String,
    pub expires_at: u64,
}

/// Something worth telling an operator about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "alert", rename_all = "snake_case")]
pub enum Alert {
    Event(SecurityEvent),
    Block(BlockNotice),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("alert serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("webhook delivery failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Producer side handed to the engine. Never blocks.
#[derive(Clone)]
pub struct AlertQueue {
    tx: Option<mpsc::Sender<Alert>>,
    min_severity: Severity,
}

impl AlertQueue {
    pub fn channel(capacity: usize, min_severity: Severity) -> (Self, mpsc::Receiver<Alert>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx: Some(tx),
                min_severity,
            },
            rx,
        )
    }

    /// A queue that discards everything.
    pub fn disabled() -> Self {
        Self {
            tx: None,
            min_severity: Severity::Critical,
        }
    }

    /// Queue an event if it is severe enough to forward.
    pub fn forward_event(&self, event: &SecurityEvent) {
        if event.severity >= self.min_severity {
            self.push(Alert::Event(event.clone()));
        }
    }

    pub fn notify_block(&self, notice: BlockNotice) {
        self.push(Alert::Block(notice));
    }

    fn push(&self, alert: Alert) {
        let Some(tx) = &self.tx else { return };
        match tx.try_send(alert) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Alert queue full, dropping alert");
                metrics::record_alert_dropped("queue_full");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Alert dispatcher gone, dropping alert");
                metrics::record_alert_dropped("closed");
            }
        }
    }
}

enum Sink {
    Log,
    File(PathBuf),
    Webhook { url: String, client: reqwest::Client },
}

impl Sink {
    fn from_config(config: &AlertSinkConfig) -> Result<Self, SinkError> {
        Ok(match config {
            AlertSinkConfig::Log => Sink::Log,
            AlertSinkConfig::File { path } => Sink::File(PathBuf::from(path)),
            AlertSinkConfig::Webhook { url, timeout_secs } => Sink::Webhook {
                url: url.clone(),
                client: reqwest::Client::builder()
                    .timeout(Duration::from_secs(*timeout_secs))
                    .build()?,
            },
        })
    }

    fn name(&self) -> &'static str {
        match self {
            Sink::Log => "log",
            Sink::File(_) => "file",
            Sink::Webhook { .. } => "webhook",
        }
    }

    async fn deliver(&self, alert: &Alert) -> Result<(), SinkError> {
        match self {
            Sink::Log => {
                match alert {
                    Alert::Event(e) => tracing::warn!(
                        event_id = %e.id,
                        kind = %e.kind,
                        severity = %e.severity,
                        subject = ?e.subject_id,
                        blocked = e.blocked,
                        "Security alert"
                    ),
                    Alert::Block(b) => tracing::warn!(
                        target_key = %b.target_key,
                        rule = ?b.rule.as_ref().map(|r| r.id.as_str()),
                        expires_at = b.expires_at,
                        "Block notification"
                    ),
                }
                Ok(())
            }
            Sink::File(path) => {
                let mut line = serde_json::to_vec(alert)?;
                line.push(b'\n');
                let mut file = tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .await?;
                file.write_all(&line).await?;
                Ok(())
            }
            Sink::Webhook { url, client } => {
                client
                    .post(url)
                    .json(alert)
                    .send()
                    .await?
                    .error_for_status()?;
                Ok(())
            }
        }
    }
}

/// Consumer side: drains the queue into the configured sinks.
pub struct AlertDispatcher {
    rx: mpsc::Receiver<Alert>,
    sinks: Vec<Sink>,
}

impl AlertDispatcher {
    /// Build the queue/dispatcher pair from configuration.
    pub fn from_config(config: &AlertsConfig) -> Result<(AlertQueue, Self), SinkError> {
        let (queue, rx) = AlertQueue::channel(config.queue_capacity, config.min_severity);
        let sinks = config
            .sinks
            .iter()
            .map(Sink::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((queue, Self { rx, sinks }))
    }

    /// Run until shutdown, then flush whatever is still queued.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(sinks = self.sinks.len(), "Alert dispatcher starting");
        loop {
            tokio::select! {
                alert = self.rx.recv() => match alert {
                    Some(alert) => self.dispatch(&alert).await,
                    None => break,
                },
                _ = shutdown.recv() => {
                    while let Ok(alert) = self.rx.try_recv() {
                        self.dispatch(&alert).await;
                    }
                    tracing::info!("Alert dispatcher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    async fn dispatch(&self, alert: &Alert) {
        for sink in &self.sinks {
            if let Err(e) = sink.deliver(alert).await {
                tracing::error!(sink = sink.name(), error = %e, "Alert delivery failed");
                metrics::record_alert_dropped(sink.name());
            }
        }
    }
}
