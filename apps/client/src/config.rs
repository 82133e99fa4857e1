use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";
const DEFAULT_SESSION_FILE: &str = ".jobseek/session.json";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client configuration loaded from environment variables.
/// Every setting has a default; only malformed values are rejected.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL the auth and data paths are joined onto.
    pub api_url: String,
    /// Location of the persisted session snapshot.
    pub session_file: PathBuf,
    pub timeout_secs: u64,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            api_url: env_or("JOBSEEK_API_URL", DEFAULT_API_URL),
            session_file: PathBuf::from(env_or("JOBSEEK_SESSION_FILE", DEFAULT_SESSION_FILE)),
            timeout_secs: match std::env::var("JOBSEEK_TIMEOUT_SECS") {
                Ok(raw) => raw
                    .parse::<u64>()
                    .context("JOBSEEK_TIMEOUT_SECS must be a whole number of seconds")?,
                Err(_) => DEFAULT_TIMEOUT_SECS,
            },
            rust_log: env_or("RUST_LOG", "info"),
        })
    }

    /// Builds the HTTP client shared by the auth service and the gateway.
    pub fn build_http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .context("Failed to build HTTP client")
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_url: DEFAULT_API_URL.to_string(),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            rust_log: "info".to_string(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
