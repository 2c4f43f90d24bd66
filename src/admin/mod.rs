//! Authenticated admin API over a running engine.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::engine::GuardEngine;
use self::auth::admin_auth_middleware;
use self::handlers::*;

/// Shared state for admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub engine: Arc<GuardEngine>,
    pub api_key: Arc<str>,
    /// Config file re-read by `POST /admin/rules/reload`.
    pub config_path: Option<PathBuf>,
}

impl AdminState {
    pub fn new(engine: Arc<GuardEngine>, api_key: &str, config_path: Option<PathBuf>) -> Self {
        Self {
            engine,
            api_key: Arc::from(api_key),
            config_path,
        }
    }
}

pub fn router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/events", get(get_events))
        .route("/admin/stats", get(get_stats))
        .route("/admin/blocks", get(get_blocks))
        .route("/admin/blocks/{key}", delete(delete_block))
        .route("/admin/rules", get(get_rules))
        .route("/admin/rules/reload", post(reload_rules))
        .route("/admin/classify", post(classify))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the admin API until shutdown.
pub async fn serve(
    listener: TcpListener,
    state: AdminState,
    mut shutdown: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Admin API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;

    tracing::info!("Admin API stopped");
    Ok(())
}
