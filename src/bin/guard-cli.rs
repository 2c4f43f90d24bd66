use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use std::path::{Path, PathBuf};

use abuse_guard::config::{load_config, validation::validate_rules};
use abuse_guard::detection::ContentClassifier;

#[derive(Parser)]
#[command(name = "guard-cli")]
#[command(about = "Operator CLI for abuse-guard", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "ABUSE_GUARD_API_KEY", default_value = "")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Engine status summary
    Status,
    /// Most recent security events
    Events {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Event counts over a time range
    Stats {
        #[arg(short, long, default_value_t = 3600)]
        since_secs: u64,
    },
    /// Active blocks
    Blocks,
    /// Lift a block
    Unblock { key: String },
    /// Loaded rules
    Rules,
    /// Re-read rules from the daemon's config file
    Reload,
    /// Classify text locally
    Classify { text: String },
    /// Validate a config file locally
    CheckConfig { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let request = match cli.command {
        Commands::Status => client.get(format!("{base}/admin/status")),
        Commands::Events { limit } => client.get(format!("{base}/admin/events?limit={limit}")),
        Commands::Stats { since_secs } => {
            client.get(format!("{base}/admin/stats?since_secs={since_secs}"))
        }
        Commands::Blocks => client.get(format!("{base}/admin/blocks")),
        Commands::Unblock { key } => {
            // Keys may contain characters that need escaping in a path segment.
            let mut url = url::Url::parse(base)?;
            url.path_segments_mut()
                .map_err(|_| "admin URL cannot carry a path")?
                .pop_if_empty()
                .extend(["admin", "blocks", key.as_str()]);
            client.delete(url)
        }
        Commands::Rules => client.get(format!("{base}/admin/rules")),
        Commands::Reload => client.post(format!("{base}/admin/rules/reload")),
        Commands::Classify { text } => {
            let verdict = ContentClassifier::new().classify(&text);
            println!("{}", serde_json::to_string_pretty(&verdict)?);
            return Ok(());
        }
        Commands::CheckConfig { path } => return check_config(&path),
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

fn check_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(path)?;
    let problems = validate_rules(&config.rules);
    println!("{} rules, {} rejected", config.rules.len(), problems.len());
    for problem in &problems {
        println!("  - {}", problem);
    }
    if !problems.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let body = res.text().await?;
    if body.is_empty() {
        println!("{}", status);
        return Ok(());
    }
    let json: Value = serde_json::from_str(&body)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
