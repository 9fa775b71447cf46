//! Session configuration loaded from TOML.
//!
//! ```toml
//! [service]
//! base_url = "http://127.0.0.1:8787"
//! request_timeout_ms = 10000
//! analysis_timeout_ms = 30000
//! explain = true
//!
//! [session]
//! start_position = "startpos"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::position::{MalformedPositionError, STARTPOS_ALIAS, Sfen};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8787";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_ANALYSIS_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid start position: {0}")]
    StartPosition(#[from] MalformedPositionError),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub service: ServiceConfig,
    pub session: SessionSection,
}

/// Remote service endpoint and request bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    /// Upper bound for state fetches and move submission.
    pub request_timeout_ms: u64,
    /// Upper bound for analysis and explanation requests.
    pub analysis_timeout_ms: u64,
    /// Ask the service for a natural-language explanation after each move.
    pub explain: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            analysis_timeout_ms: DEFAULT_ANALYSIS_TIMEOUT_MS,
            explain: true,
        }
    }
}

impl ServiceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_millis(self.analysis_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// `"startpos"` or a full SFEN.
    pub start_position: String,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            start_position: STARTPOS_ALIAS.to_string(),
        }
    }
}

impl SessionConfig {
    /// Read and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<SessionConfig, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse config text. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<SessionConfig, ConfigError> {
        let config: SessionConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// The start position must be a parseable position string.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Sfen::parse(&self.session.start_position)?;
        Ok(())
    }
}
