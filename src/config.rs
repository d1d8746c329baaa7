//! Configuration Management
//!
//! Handles persistent configuration storage for the nitrapi CLI.

use crate::api::auth::AccessToken;
use crate::api::client::DEFAULT_BASE_URL;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable overriding the API endpoint
pub const URL_ENV: &str = "NITRAPI_URL";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Stored access token
    #[serde(default)]
    pub access_token: Option<String>,
    /// API endpoint override
    #[serde(default)]
    pub base_url: Option<String>,
    /// Name reported in restart/stop messages
    #[serde(default)]
    pub application_name: Option<String>,
    /// Service used when none is given on the command line
    #[serde(default)]
    pub default_service: Option<u64>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("nitrapi").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from a specific file, falling back to defaults when it is missing
    /// or unreadable
    pub fn load_from(path: &std::path::Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk, returning where it was written
    pub fn save(&self) -> Result<PathBuf> {
        let path = writable_path(Self::config_path())?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get effective token (CLI > environment > config)
    pub fn effective_token(&self, cli: Option<&str>) -> Result<AccessToken> {
        if let Some(raw) = cli {
            return Ok(AccessToken::new(raw)?);
        }
        if let Some(token) = AccessToken::from_env() {
            return Ok(token);
        }
        match self.access_token.as_deref() {
            Some(raw) => Ok(AccessToken::new(raw)?),
            None => Err(anyhow::anyhow!(
                "No access token configured. Set {} or use --token",
                crate::api::auth::TOKEN_ENV
            )),
        }
    }

    /// Get effective endpoint (CLI > environment > config > production)
    pub fn effective_base_url(&self, cli: Option<&str>) -> String {
        cli.map(str::to_string)
            .or_else(|| std::env::var(URL_ENV).ok())
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    /// Remember a token and save
    pub fn set_access_token(&mut self, token: &str) -> Result<PathBuf> {
        AccessToken::new(token)?;
        self.access_token = Some(token.trim().to_string());
        self.save()
    }
}

fn writable_path(path: Option<PathBuf>) -> Result<PathBuf> {
    path.context("No configuration directory available on this system")
}
