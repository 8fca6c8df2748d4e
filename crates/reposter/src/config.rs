//! Agent configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::browser::LaunchOptions;
use crate::finder::FinderConfig;
use crate::publisher::DEFAULT_API_BASE;
use crate::quota::DEFAULT_DAILY_CAP;

/// Default time between cycles.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2 * 60 * 60);

/// Default wait for the authenticated marker after login.
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(120);

/// Default bounded wait for the worker to join on stop.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Default history file.
pub const DEFAULT_HISTORY_PATH: &str = "engagement_history.json";

/// Everything a supervisor needs besides the per-session inputs.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Wait between cycles.
    pub interval: Duration,
    /// Posts allowed per 24h window.
    pub daily_cap: u32,
    /// Engagement history file.
    pub history_path: PathBuf,
    /// Wait for the authenticated marker.
    pub login_timeout: Duration,
    /// Bounded join on stop.
    pub stop_timeout: Duration,
    /// Content API host.
    pub api_base: String,
    /// Where downloaded images are staged (system temp dir when unset).
    pub temp_dir: Option<PathBuf>,
    /// Origins the control server answers CORS preflights for. Empty disables CORS.
    pub allowed_origins: Vec<String>,
    pub browser: LaunchOptions,
    pub finder: FinderConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            daily_cap: DEFAULT_DAILY_CAP,
            history_path: PathBuf::from(DEFAULT_HISTORY_PATH),
            login_timeout: DEFAULT_LOGIN_TIMEOUT,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            api_base: DEFAULT_API_BASE.to_string(),
            temp_dir: None,
            allowed_origins: Vec::new(),
            browser: LaunchOptions::default(),
            finder: FinderConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Create configuration from environment variables.
    ///
    /// # Optional Environment Variables
    /// - `REPOSTER_INTERVAL_SECS`: Seconds between cycles (default: 7200)
    /// - `REPOSTER_DAILY_CAP`: Posts per 24h (default: 10)
    /// - `REPOSTER_HISTORY_PATH`: History file (default: engagement_history.json)
    /// - `REPOSTER_LOGIN_TIMEOUT_SECS`: Login wait (default: 120)
    /// - `REPOSTER_STOP_TIMEOUT_SECS`: Stop join wait (default: 5)
    /// - `REPOSTER_HEADLESS`: Run the browser headless (default: false)
    /// - `REPOSTER_TEMP_DIR`: Staging directory for images
    /// - `REPOSTER_ALLOWED_ORIGINS`: Comma-separated CORS origins for the control server
    /// - `LINKEDIN_API_BASE`: API host (default: https://api.linkedin.com)
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            interval: env_secs("REPOSTER_INTERVAL_SECS").unwrap_or(defaults.interval),
            daily_cap: env_parse("REPOSTER_DAILY_CAP").unwrap_or(defaults.daily_cap),
            history_path: std::env::var("REPOSTER_HISTORY_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.history_path),
            login_timeout: env_secs("REPOSTER_LOGIN_TIMEOUT_SECS")
                .unwrap_or(defaults.login_timeout),
            stop_timeout: env_secs("REPOSTER_STOP_TIMEOUT_SECS").unwrap_or(defaults.stop_timeout),
            api_base: std::env::var("LINKEDIN_API_BASE").unwrap_or(defaults.api_base),
            temp_dir: std::env::var("REPOSTER_TEMP_DIR").ok().map(PathBuf::from),
            allowed_origins: std::env::var("REPOSTER_ALLOWED_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or(defaults.allowed_origins),
            browser: LaunchOptions {
                headless: env_flag("REPOSTER_HEADLESS"),
                ..defaults.browser
            },
            finder: defaults.finder,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable environment variable");
            None
        }
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_secs)
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
}
