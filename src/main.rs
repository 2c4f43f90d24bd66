//! abuse-guard daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                     GuardEngine                       │
//!   guard(ctx) ──▶│  blocks ─▶ rules ─▶ window counter ─▶ classifier      │──▶ Decision
//!                 │                 │                                     │
//!                 │                 ▼                                     │
//!   csrf / authz ▶│          escalation controller ──▶ event log          │
//!                 │                 │                                     │
//!                 └─────────────────┼─────────────────────────────────────┘
//!                                   ▼
//!                         alert queue ─▶ dispatcher ─▶ log / file / webhook
//!
//!   Background: sweeper, rule watcher, admin API, metrics exporter
//! ```

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "abuse-guard")]
#[command(about = "Adaptive rate-limiting and threat-detection engine", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "ABUSE_GUARD_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    abuse_guard::lifecycle::startup::run(args.config).await
}
