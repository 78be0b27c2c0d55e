use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::error::{Result, SyncError};

/// Poll periods for the two timers.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub roster_interval: Duration,
    pub message_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            roster_interval: Duration::from_secs(5),
            message_interval: Duration::from_secs(3),
        }
    }
}

/// Where and how to reach the collaborator service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: Url,
    pub presence_url: Option<Url>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            presence_url: None,
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub client: ClientConfig,
    pub sync: SyncConfig,
    pub state_path: PathBuf,
}

impl Config {
    /// Read `PARLEY_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = lookup("PARLEY_API_URL")
            .ok_or_else(|| SyncError::Config("PARLEY_API_URL is not set".into()))?;
        let api_url = parse_url("PARLEY_API_URL", &api_url)?;

        let presence_url = match lookup("PARLEY_PRESENCE_URL") {
            Some(raw) if !raw.trim().is_empty() => Some(parse_url("PARLEY_PRESENCE_URL", &raw)?),
            _ => None,
        };

        let defaults = SyncConfig::default();
        let roster_interval =
            secs(&lookup, "PARLEY_ROSTER_INTERVAL_SECS", defaults.roster_interval)?;
        let message_interval =
            secs(&lookup, "PARLEY_MESSAGE_INTERVAL_SECS", defaults.message_interval)?;
        let timeout = secs(&lookup, "PARLEY_HTTP_TIMEOUT_SECS", Duration::from_secs(10))?;

        let state_path: PathBuf = lookup("PARLEY_STATE_PATH")
            .unwrap_or_else(|| "parley-state.db".into())
            .into();

        Ok(Self {
            client: ClientConfig {
                api_url,
                presence_url,
                timeout,
            },
            sync: SyncConfig {
                roster_interval,
                message_interval,
            },
            state_path,
        })
    }
}

fn parse_url(key: &str, raw: &str) -> Result<Url> {
    Url::parse(raw.trim()).map_err(|e| SyncError::Config(format!("{key}: {e}")))
}

fn secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Result<Duration> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let secs: u64 = raw.trim().parse().map_err(|_| {
        SyncError::Config(format!("{key} must be a whole number of seconds, got '{raw}'"))
    })?;
    if secs == 0 {
        return Err(SyncError::Config(format!("{key} must be greater than zero")));
    }
    Ok(Duration::from_secs(secs))
}
