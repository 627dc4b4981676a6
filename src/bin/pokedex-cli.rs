use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use pokedex_edge::config::loader::load_config;
use pokedex_edge::security::{GateDecision, Gatekeeper};

#[derive(Parser)]
#[command(name = "pokedex-cli")]
#[command(about = "Management CLI for pokedex-edge", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, default_value = "admin-secret-key")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service status
    Status,
    /// List in-flight deduplicated upstream requests
    Dedup,
    /// Show the active gate rules
    Gate,
    /// Evaluate the gate locally for a path
    Check {
        /// Request path, e.g. /pokemon/25
        path: String,
        /// Raw Cookie header to send along
        #[arg(long)]
        cookie: Option<String>,
        /// Config file to take gate rules from (defaults otherwise)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let endpoint = match cli.command {
        Commands::Status => "status",
        Commands::Dedup => "dedup",
        Commands::Gate => "gate",
        Commands::Check { path, cookie, config } => {
            let gate = match config {
                Some(config_path) => Gatekeeper::from_config(load_config(&config_path)?.gate)?,
                None => Gatekeeper::default(),
            };
            print_decision(&path, &gate.evaluate(&path, cookie.as_deref()));
            return Ok(());
        }
    };

    let client = reqwest::Client::new();
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = client
        .get(format!("{}/admin/{}", cli.url.trim_end_matches('/'), endpoint))
        .headers(headers)
        .send()
        .await?;
    print_response(res).await
}

fn print_decision(path: &str, decision: &GateDecision) {
    match decision {
        GateDecision::Reject => println!("{} -> 404 Not Found (deny-list)", path),
        GateDecision::RedirectToVerify { location } => println!("{} -> 307 {}", path, location),
        GateDecision::Allow(reason) => println!("{} -> allowed ({:?})", path, reason),
    }
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
