//! Configuration Management
//!
//! Handles persistent configuration storage for konctl.

use crate::konnect::client::DEFAULT_BASE_URL;
use crate::pagination::effective_page_size;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const BASE_URL_ENV: &str = "KONNECT_ADDR";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Konnect API base URL
    #[serde(default)]
    pub base_url: Option<String>,
    /// Items requested per page during lookups
    #[serde(default)]
    pub page_size: Option<i64>,
    /// Namespace used by `adopt` when none is given
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Config {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("konctl").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Get effective base URL (config > KONNECT_ADDR > default)
    pub fn effective_base_url(&self) -> String {
        self.base_url
            .clone()
            .filter(|url| !url.is_empty())
            .or_else(|| std::env::var(BASE_URL_ENV).ok().filter(|url| !url.is_empty()))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    /// Get effective page size (non-positive values fall back to the default)
    pub fn effective_page_size(&self) -> usize {
        effective_page_size(self.page_size.unwrap_or(0))
    }

    /// Set namespace and save
    pub fn set_namespace(&mut self, namespace: &str) -> Result<()> {
        self.namespace = Some(namespace.to_string());
        self.save()
    }
}
