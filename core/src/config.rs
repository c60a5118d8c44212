//! Application configuration with TOML file support.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a QuorumDB node.
///
/// Loaded from a TOML file via [`AppConfig::from_toml_file`] or built
/// programmatically (e.g. for tests). Every field has a default, so an
/// empty file is a valid configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Address for the consensus-engine transport to bind. The transport
    /// itself lives outside this workspace; the daemon resolves the
    /// address and reports it at startup.
    #[serde(default = "default_consensus_listen")]
    pub consensus_listen: String,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            consensus_listen: default_consensus_listen(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&text)
            .map_err(|e| AppError::Config(format!("cannot parse {}: {e}", path.display())))
    }
}

fn default_consensus_listen() -> String {
    "127.0.0.1:26658".to_owned()
}

fn default_log_format() -> String {
    "human".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}
