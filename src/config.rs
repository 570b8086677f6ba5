//! read configuration from a file or the environment

use std::path::Path;

use serde::Deserialize;

use crate::errors::Error;

pub const DEFAULT_BASE_URL: &str = "https://anilist.co/api/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    /// Refresh token restored from a previously persisted session.
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Config {
    pub fn from_values(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        base_url: Option<String>,
        redirect_uri: Option<String>,
        refresh_token: Option<String>,
        timeout_secs: Option<u64>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            base_url,
            redirect_uri,
            refresh_token,
            timeout_secs,
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, Error> {
        let timeout_secs = match optional_env("ANILIST_TIMEOUT_SECS") {
            Some(raw) => Some(raw.parse::<u64>().map_err(|e| {
                Error::Config(format!("Invalid ANILIST_TIMEOUT_SECS '{raw}': {e}"))
            })?),
            None => None,
        };
        Ok(Self {
            client_id: std::env::var("ANILIST_CLIENT_ID")
                .map_err(|_| Error::Config("Missing ANILIST_CLIENT_ID env var".to_string()))?,
            client_secret: std::env::var("ANILIST_CLIENT_SECRET")
                .map_err(|_| Error::Config("Missing ANILIST_CLIENT_SECRET env var".to_string()))?,
            base_url: optional_env("ANILIST_BASE_URL"),
            redirect_uri: optional_env("ANILIST_REDIRECT_URI"),
            refresh_token: optional_env("ANILIST_REFRESH_TOKEN"),
            timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
