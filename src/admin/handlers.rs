use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::admin::AdminState;
use crate::config::load_config;
use crate::detection::Verdict;
use crate::escalation::Block;
use crate::events::{EventStats, SecurityEvent};
use crate::rules::Rule;

const MAX_EVENTS: usize = 1000;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub rules: usize,
    pub active_blocks: usize,
    pub window_entries: usize,
    pub events_retained: usize,
}

#[derive(Deserialize)]
pub struct EventsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

#[derive(Deserialize)]
pub struct StatsQuery {
    #[serde(default = "default_since")]
    pub since_secs: u64,
}

fn default_since() -> u64 {
    3600
}

#[derive(Serialize)]
pub struct ReloadSummary {
    pub accepted: usize,
    pub rejected: Vec<String>,
}

#[derive(Deserialize)]
pub struct ClassifyRequest {
    pub text: String,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let engine = &state.engine;
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        rules: engine.rules().len(),
        active_blocks: engine.active_blocks().len(),
        window_entries: engine.window_entries(),
        events_retained: engine.events().len(),
    })
}

pub async fn get_events(
    State(state): State<AdminState>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<SecurityEvent>> {
    Json(state.engine.recent_events(query.limit.min(MAX_EVENTS)))
}

pub async fn get_stats(
    State(state): State<AdminState>,
    Query(query): Query<StatsQuery>,
) -> Json<EventStats> {
    Json(state.engine.event_stats(Duration::from_secs(query.since_secs)))
}

pub async fn get_blocks(State(state): State<AdminState>) -> Json<Vec<Block>> {
    Json(state.engine.active_blocks())
}

pub async fn delete_block(
    State(state): State<AdminState>,
    Path(key): Path<String>,
) -> StatusCode {
    if state.engine.unblock(&key) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn get_rules(State(state): State<AdminState>) -> Json<Vec<Rule>> {
    Json(state.engine.rules())
}

pub async fn reload_rules(
    State(state): State<AdminState>,
) -> Result<Json<ReloadSummary>, (StatusCode, String)> {
    let Some(path) = &state.config_path else {
        return Err((StatusCode::CONFLICT, "no config file to reload".to_string()));
    };
    let config = load_config(path).map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    let report = state.engine.reload_rules(config.rules);
    Ok(Json(ReloadSummary {
        accepted: report.accepted,
        rejected: report.rejected.iter().map(ToString::to_string).collect(),
    }))
}

pub async fn classify(
    State(state): State<AdminState>,
    Json(request): Json<ClassifyRequest>,
) -> Json<Verdict> {
    Json(state.engine.inspect(&request.text))
}
