use serde::{Deserialize, Serialize};

use crate::error::ParchmentError;

/// Environment variable holding the API base URL.
pub const API_BASE_URL_VAR: &str = "PARCHMENT_API_BASE_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Prefix for every relative endpoint path.
    pub base_url: String,
}

impl ApiConfig {
    /// Loads the base URL from [`API_BASE_URL_VAR`], falling back to the
    /// default when unset or blank.
    pub fn from_env() -> Self {
        Self::from_base_url(std::env::var(API_BASE_URL_VAR).ok())
    }

    pub fn from_base_url(base_url: Option<String>) -> Self {
        match base_url.map(|url| url.trim().to_owned()) {
            Some(url) if !url.is_empty() => Self { base_url: url },
            _ => Self::default(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ParchmentError> {
        let config: Self = serde_json::from_str(json)?;
        if config.base_url.trim().is_empty() {
            return Err(ParchmentError::Config("base_url is empty".into()));
        }
        Ok(config)
    }
}

impl Default for ApiConfig {
    /// Creates a new default configuration.
    ///
    /// The default configuration points at a local development backend.
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_owned(),
        }
    }
}
