//! Client configuration.
//!
//! The backend origin always comes from outside: either passed in directly or
//! read from `MONKEYPAD_BACKEND_URL`.

use reqwest::Url;

use crate::error::ClientError;

/// Environment variable holding the backend base URL.
pub const BACKEND_URL_ENV: &str = "MONKEYPAD_BACKEND_URL";

/// Connection settings for the code service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL without a trailing slash, e.g. `http://localhost:8000`.
    pub base_url: String,
}

impl ClientConfig {
    /// Validates `base_url` as an http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let trimmed = base_url.trim();
        let url = Url::parse(trimmed)
            .map_err(|err| ClientError::Config(format!("invalid backend URL '{}': {}", trimmed, err)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::Config(format!(
                "unsupported backend URL scheme '{}': use http or https",
                url.scheme()
            )));
        }
        Ok(ClientConfig {
            base_url: trimmed.trim_end_matches('/').to_string(),
        })
    }

    /// Reads the base URL from `MONKEYPAD_BACKEND_URL`.
    pub fn from_env() -> Result<Self, ClientError> {
        let raw = std::env::var(BACKEND_URL_ENV)
            .map_err(|_| ClientError::Config(format!("{} is not set", BACKEND_URL_ENV)))?;
        Self::new(&raw)
    }

    /// Joins an endpoint path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}
