//! Reposter CLI - keyword-driven LinkedIn reposting agent.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reposter::browser::{ChromeLauncher, Credential};
use reposter::config::AgentConfig;
use reposter::control::{run_server, ControlState};
use reposter::history::HistoryStore;
use reposter::supervisor::{SessionParams, SessionState, Supervisor};

/// Reposter CLI - Find high-engagement posts for a keyword and republish them.
#[derive(Parser)]
#[command(name = "reposter")]
#[command(about = "Keyword-driven LinkedIn reposting agent")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Run the browser without a visible window
    #[arg(long, global = true)]
    headless: bool,

    /// Seconds between cycles (overrides `REPOSTER_INTERVAL_SECS`)
    #[arg(long, global = true)]
    interval_secs: Option<u64>,

    /// Engagement history file (overrides `REPOSTER_HISTORY_PATH`)
    #[arg(long, global = true)]
    history: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the HTTP control surface
    Serve {
        /// Address to bind
        #[arg(long, env = "REPOSTER_ADDR", default_value = "127.0.0.1:5000")]
        addr: String,
    },

    /// Run a session in the foreground until Ctrl-C
    Run {
        /// Search keyword
        #[arg(long)]
        keyword: String,

        /// LinkedIn API access token
        #[arg(long, env = "LINKEDIN_ACCESS_TOKEN", hide_env_values = true)]
        access_token: String,

        /// Login email; omit to log in by hand in the browser window
        #[arg(long, env = "LINKEDIN_EMAIL", requires = "password")]
        email: Option<String>,

        /// Login password
        #[arg(long, env = "LINKEDIN_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Show the engagement history
    History {
        /// Limit results
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("reposter=debug,info")
    } else {
        EnvFilter::new("reposter=info,warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let mut config = AgentConfig::from_env();
    if cli.headless {
        config.browser.headless = true;
    }
    if let Some(secs) = cli.interval_secs {
        config.interval = Duration::from_secs(secs);
    }
    if let Some(path) = cli.history {
        config.history_path = path;
    }

    match cli.command {
        Commands::Serve { addr } => run_serve(config, &addr).await,
        Commands::Run {
            keyword,
            access_token,
            email,
            password,
        } => {
            let credential = email
                .zip(password)
                .map(|(email, password)| Credential::new(email, password));
            run_foreground(config, keyword, access_token, credential).await
        }
        Commands::History { limit } => {
            run_history(&config, limit);
            Ok(())
        }
    }
}

async fn run_serve(config: AgentConfig, addr: &str) -> Result<()> {
    let launcher = Arc::new(ChromeLauncher::new(config.browser.clone()));
    let state = Arc::new(ControlState::new(config, launcher));
    run_server(state, addr).await
}

async fn run_foreground(
    config: AgentConfig,
    keyword: String,
    access_token: String,
    credential: Option<Credential>,
) -> Result<()> {
    tracing::info!(
        keyword = %keyword,
        interval = ?config.interval,
        manual_login = credential.is_none(),
        "Starting foreground session"
    );

    let launcher = Arc::new(ChromeLauncher::new(config.browser.clone()));
    let params = SessionParams {
        access_token,
        search_keyword: keyword,
        credential,
    };
    let supervisor =
        Supervisor::new(params, config, launcher).context("Failed to create supervisor")?;
    let mut state = supervisor.subscribe();
    supervisor.start().await;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
            tracing::info!("Interrupted, stopping session");
            supervisor.stop().await;
        }
        _ = state.wait_for(|s| *s == SessionState::Idle) => {
            tracing::warn!("Session ended on its own");
        }
    }

    Ok(())
}

fn run_history(config: &AgentConfig, limit: usize) {
    let store = HistoryStore::load(&config.history_path);
    let history = store.history();

    println!("Engagement history in {}\n", store.path().display());

    if history.is_empty() {
        println!("No entries found.");
        return;
    }

    for record in history.posts.iter().rev().take(limit) {
        println!("{}  {}  {}", record.timestamp, record.post_id, record.author);
    }

    println!("\nTotal: {} entries", history.len());
}
