// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Lightwatch.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use anyhow::{Context, Result, anyhow, bail};
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeartbeatConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub status: StatusSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    /// Text file holding the last heartbeat timestamp
    #[serde(default = "default_store_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusSettings {
    /// Max heartbeat age still reported as OK
    #[serde(default = "default_freshness_secs")]
    pub freshness_secs: u64,
    /// Zone the stored timestamp is written in
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_owned()
}

fn default_port() -> u16 {
    8080
}

fn default_store_path() -> String {
    "./data/heartbeat.txt".to_owned()
}

fn default_freshness_secs() -> u64 {
    60
}

fn default_timezone() -> String {
    "Europe/Kyiv".to_owned()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for StatusSettings {
    fn default() -> Self {
        Self {
            freshness_secs: default_freshness_secs(),
            timezone: default_timezone(),
        }
    }
}

impl StatusSettings {
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("invalid status.timezone {}: {e}", self.timezone))
    }

    #[must_use]
    pub fn freshness(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.freshness_secs).unwrap_or(i64::MAX))
    }
}

impl HeartbeatConfig {
    /// Load from `path`; a missing file means all defaults.
    pub fn from_file(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            warn!(path = %path, "Config file not found, using defaults");
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(Path::new(path))
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).with_context(|| "Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.status.freshness_secs == 0 {
            bail!("status.freshness_secs must be greater than zero");
        }
        if self.store.path.trim().is_empty() {
            bail!("store.path must be set");
        }
        self.status.tz()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = HeartbeatConfig::from_toml("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.status.freshness_secs, 60);
        assert_eq!(config.status.tz().unwrap(), chrono_tz::Europe::Kyiv);
    }

    #[test]
    fn test_partial_override() {
        let config = HeartbeatConfig::from_toml(
            r#"
            [server]
            port = 9000

            [status]
            freshness_secs = 120
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.status.freshness(), chrono::Duration::seconds(120));
    }

    #[test]
    fn test_rejects_zero_freshness() {
        let err = HeartbeatConfig::from_toml("[status]\nfreshness_secs = 0").unwrap_err();
        assert!(err.to_string().contains("freshness_secs"));
    }

    #[test]
    fn test_rejects_unknown_timezone() {
        assert!(HeartbeatConfig::from_toml("[status]\ntimezone = \"Mars/Olympus\"").is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = HeartbeatConfig::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.store.path, "./data/heartbeat.txt");
    }
}
