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

//! Monitor configuration, loaded once at startup from a TOML file or from
//! the environment and then passed by reference into every component.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;

use crate::alerts::Language;
use crate::error::{MonitorError, MonitorResult};

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub source: StatusSourceKind,
    #[serde(default)]
    pub api: Option<Credentials>,
    #[serde(default)]
    pub heartbeat: HeartbeatClientSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    pub notifier: NotifierSettings,
    #[serde(default)]
    pub schedule: ScheduleSettings,
    #[serde(default)]
    pub alerts: AlertSettings,
}

/// Which liveness source the monitor polls. One per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusSourceKind {
    #[default]
    SignedApi,
    Heartbeat,
}

impl std::str::FromStr for StatusSourceKind {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "signed_api" | "api" | "cloud" => Ok(Self::SignedApi),
            "heartbeat" => Ok(Self::Heartbeat),
            other => Err(MonitorError::Config(format!(
                "unknown status source: {other}"
            ))),
        }
    }
}

/// Cloud API credentials for the signed status client.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub base_url: String,
    pub client_id: String,
    pub secret: String,
    pub device_id: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("secret", &"<redacted>")
            .field("device_id", &self.device_id)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatClientSettings {
    #[serde(default = "default_heartbeat_url")]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NotifierSettings {
    Telegram(TelegramSettings),
    Email(EmailSettings),
}

#[derive(Clone, Deserialize)]
pub struct TelegramSettings {
    pub bot_token: String,
    pub channel_id: String,
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
}

impl fmt::Debug for TelegramSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramSettings")
            .field("bot_token", &"<redacted>")
            .field("channel_id", &self.channel_id)
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailSettings {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_address: String,
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSettings {
    /// Poll period in minutes, fractions allowed
    #[serde(default = "default_poll_interval_minutes")]
    pub poll_interval_minutes: f64,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// `None` retries a failing tick forever
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertSettings {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_quiet_start_hour")]
    pub quiet_start_hour: u32,
    #[serde(default = "default_quiet_end_hour")]
    pub quiet_end_hour: u32,
    #[serde(default)]
    pub language: Language,
}

fn default_heartbeat_url() -> String {
    "http://127.0.0.1:8080".to_owned()
}

fn default_db_path() -> String {
    "./data/lightwatch.db".to_owned()
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".to_owned()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_use_tls() -> bool {
    true
}

fn default_poll_interval_minutes() -> f64 {
    1.0
}

fn default_retry_delay_secs() -> u64 {
    2
}

fn default_cooldown_secs() -> u64 {
    600
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_timezone() -> String {
    "Europe/Kyiv".to_owned()
}

fn default_quiet_start_hour() -> u32 {
    23
}

fn default_quiet_end_hour() -> u32 {
    9
}

impl Default for HeartbeatClientSettings {
    fn default() -> Self {
        Self {
            url: default_heartbeat_url(),
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            poll_interval_minutes: default_poll_interval_minutes(),
            retry_delay_secs: default_retry_delay_secs(),
            max_attempts: None,
            cooldown_secs: default_cooldown_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            quiet_start_hour: default_quiet_start_hour(),
            quiet_end_hour: default_quiet_end_hour(),
            language: Language::default(),
        }
    }
}

/// Shortest accepted polling period
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

impl ScheduleSettings {
    /// Polling period, rejecting values a timer cannot represent.
    pub fn poll_interval(&self) -> MonitorResult<Duration> {
        let minutes = self.poll_interval_minutes;
        let interval = Duration::try_from_secs_f64(minutes * 60.0).map_err(|e| {
            MonitorError::Config(format!(
                "schedule.poll_interval_minutes is out of range ({minutes}): {e}"
            ))
        })?;
        if interval < MIN_POLL_INTERVAL {
            return Err(MonitorError::Config(format!(
                "schedule.poll_interval_minutes must be at least one second, got {minutes}"
            )));
        }
        Ok(interval)
    }

    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl AlertSettings {
    pub fn tz(&self) -> MonitorResult<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| MonitorError::Config(format!("invalid timezone {}: {e}", self.timezone)))
    }
}

impl MonitorConfig {
    pub fn from_file(path: &str) -> MonitorResult<Self> {
        let content = std::fs::read_to_string(Path::new(path))
            .map_err(|e| MonitorError::Config(format!("Failed to read config file {path}: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> MonitorResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| MonitorError::Config(format!("Failed to parse config TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Build the configuration from process environment variables.
    pub fn from_env() -> MonitorResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Environment loading over an arbitrary lookup, so tests need not touch
    /// the real process environment.
    pub fn from_lookup<F>(lookup: F) -> MonitorResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| MonitorError::Config(format!("{key} environment variable not set")))
        };

        let source = match lookup("STATUS_SOURCE") {
            Some(raw) => raw.parse()?,
            None => StatusSourceKind::default(),
        };

        let api = if source == StatusSourceKind::SignedApi {
            Some(Credentials {
                base_url: required("BASE_URL")?,
                client_id: required("CLIENT_ID")?,
                secret: required("SECRET")?,
                device_id: required("DEVICE_ID")?,
            })
        } else {
            None
        };

        let heartbeat = HeartbeatClientSettings {
            url: lookup("HEARTBEAT_URL").unwrap_or_else(default_heartbeat_url),
        };

        let database = DatabaseSettings {
            path: required("DB_FILE")?,
        };

        let notifier = NotifierSettings::Telegram(TelegramSettings {
            bot_token: required("BOT_TOKEN")?,
            channel_id: required("CHANNEL_ID")?,
            api_base: lookup("TELEGRAM_API_BASE").unwrap_or_else(default_telegram_api),
        });

        let mut schedule = ScheduleSettings::default();
        let raw_interval = required("SCHEDULE_TIME")?;
        schedule.poll_interval_minutes = raw_interval.trim().parse().map_err(|e| {
            MonitorError::Config(format!("SCHEDULE_TIME is not a number ({raw_interval}): {e}"))
        })?;
        if let Some(raw) = lookup("REQUEST_TIMEOUT_SECS") {
            schedule.request_timeout_secs = raw.trim().parse().map_err(|e| {
                MonitorError::Config(format!("REQUEST_TIMEOUT_SECS is not a number ({raw}): {e}"))
            })?;
        }

        let mut alerts = AlertSettings::default();
        if let Some(tz) = lookup("TIMEZONE") {
            alerts.timezone = tz;
        }
        if let Some(lang) = lookup("ALERT_LANGUAGE") {
            alerts.language = lang.parse()?;
        }

        let config = Self {
            source,
            api,
            heartbeat,
            database,
            notifier,
            schedule,
            alerts,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> MonitorResult<()> {
        match self.source {
            StatusSourceKind::SignedApi => {
                let Some(api) = &self.api else {
                    return Err(MonitorError::Config(
                        "[api] section is required for the signed_api source".to_owned(),
                    ));
                };
                if !api.base_url.starts_with("http://") && !api.base_url.starts_with("https://") {
                    return Err(MonitorError::Config(format!(
                        "api.base_url must be an http(s) URL, got {}",
                        api.base_url
                    )));
                }
                for (name, value) in [
                    ("api.client_id", &api.client_id),
                    ("api.secret", &api.secret),
                    ("api.device_id", &api.device_id),
                ] {
                    if value.is_empty() {
                        return Err(MonitorError::Config(format!("{name} must be set")));
                    }
                }
            }
            StatusSourceKind::Heartbeat => {
                if self.heartbeat.url.is_empty() {
                    return Err(MonitorError::Config("heartbeat.url must be set".to_owned()));
                }
            }
        }

        match &self.notifier {
            NotifierSettings::Telegram(tg) => {
                if tg.bot_token.is_empty() || tg.channel_id.is_empty() {
                    return Err(MonitorError::Config(
                        "notifier.bot_token and notifier.channel_id must be set".to_owned(),
                    ));
                }
            }
            NotifierSettings::Email(email) => {
                if email.smtp_host.is_empty() {
                    return Err(MonitorError::Config("notifier.smtp_host must be set".to_owned()));
                }
                if email.recipients.is_empty() {
                    return Err(MonitorError::Config(
                        "notifier.recipients must contain at least one address".to_owned(),
                    ));
                }
            }
        }

        self.schedule.poll_interval()?;
        if self.alerts.quiet_start_hour > 23 || self.alerts.quiet_end_hour > 23 {
            return Err(MonitorError::Config(
                "alerts quiet hours must be between 0 and 23".to_owned(),
            ));
        }
        self.alerts.tz()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn full_env() -> HashMap<String, String> {
        env(&[
            ("BASE_URL", "https://openapi.tuyaeu.com"),
            ("CLIENT_ID", "client"),
            ("SECRET", "secret"),
            ("DEVICE_ID", "device-1"),
            ("DB_FILE", "/tmp/status.db"),
            ("BOT_TOKEN", "123:abc"),
            ("CHANNEL_ID", "@power"),
            ("SCHEDULE_TIME", "0.5"),
        ])
    }

    #[test]
    fn test_from_env_reads_legacy_variable_names() {
        let vars = full_env();
        let config = MonitorConfig::from_lookup(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.source, StatusSourceKind::SignedApi);
        let api = config.api.as_ref().unwrap();
        assert_eq!(api.device_id, "device-1");
        assert_eq!(config.database.path, "/tmp/status.db");
        assert_eq!(config.schedule.poll_interval().unwrap(), Duration::from_secs(30));
        assert_eq!(config.schedule.retry_delay_secs, 2);
        assert_eq!(config.schedule.cooldown(), Duration::from_secs(600));
        assert_eq!(config.alerts.timezone, "Europe/Kyiv");
        assert!(matches!(config.notifier, NotifierSettings::Telegram(_)));
    }

    #[test]
    fn test_from_env_missing_secret_fails() {
        let mut vars = full_env();
        vars.remove("SECRET");
        let err = MonitorConfig::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert!(err.to_string().contains("SECRET"));
    }

    #[test]
    fn test_from_env_heartbeat_source_needs_no_credentials() {
        let vars = env(&[
            ("STATUS_SOURCE", "heartbeat"),
            ("HEARTBEAT_URL", "http://10.0.0.2:8080"),
            ("DB_FILE", "/tmp/status.db"),
            ("BOT_TOKEN", "123:abc"),
            ("CHANNEL_ID", "@power"),
            ("SCHEDULE_TIME", "1"),
        ]);
        let config = MonitorConfig::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.source, StatusSourceKind::Heartbeat);
        assert!(config.api.is_none());
        assert_eq!(config.heartbeat.url, "http://10.0.0.2:8080");
    }

    #[test]
    fn test_from_env_rejects_bad_schedule() {
        let mut vars = full_env();
        vars.insert("SCHEDULE_TIME".to_owned(), "soon".to_owned());
        assert!(MonitorConfig::from_lookup(|k| vars.get(k).cloned()).is_err());

        vars.insert("SCHEDULE_TIME".to_owned(), "0".to_owned());
        assert!(MonitorConfig::from_lookup(|k| vars.get(k).cloned()).is_err());
    }

    #[test]
    fn test_poll_interval_outside_timer_range_is_rejected() {
        let mut vars = full_env();
        for raw in ["1e300", "1e-12", "0.01", "-1", "NaN", "inf"] {
            vars.insert("SCHEDULE_TIME".to_owned(), raw.to_owned());
            let result = MonitorConfig::from_lookup(|k| vars.get(k).cloned());
            assert!(
                matches!(result, Err(MonitorError::Config(_))),
                "SCHEDULE_TIME={raw} was accepted"
            );
        }

        let schedule = ScheduleSettings {
            poll_interval_minutes: 0.02,
            ..ScheduleSettings::default()
        };
        assert!(schedule.poll_interval().unwrap() >= MIN_POLL_INTERVAL);
    }

    #[test]
    fn test_toml_with_defaults() {
        let config = MonitorConfig::from_toml(
            r#"
            [api]
            base_url = "https://openapi.tuyaeu.com"
            client_id = "client"
            secret = "secret"
            device_id = "device-1"

            [notifier]
            kind = "telegram"
            bot_token = "123:abc"
            channel_id = "@power"
            "#,
        )
        .unwrap();

        assert_eq!(config.source, StatusSourceKind::SignedApi);
        assert_eq!(config.database.path, "./data/lightwatch.db");
        assert_eq!(config.alerts.quiet_start_hour, 23);
        assert_eq!(config.alerts.quiet_end_hour, 9);
        assert_eq!(config.alerts.language, Language::Ukrainian);
        assert!(config.schedule.max_attempts.is_none());
    }

    #[test]
    fn test_toml_email_notifier() {
        let config = MonitorConfig::from_toml(
            r#"
            source = "heartbeat"

            [heartbeat]
            url = "http://router.lan:8080"

            [notifier]
            kind = "email"
            smtp_host = "smtp.example.com"
            smtp_username = "bot"
            smtp_password = "pw"
            from_address = "bot@example.com"
            recipients = ["me@example.com"]

            [alerts]
            language = "en"
            timezone = "Europe/Prague"
            "#,
        )
        .unwrap();

        let NotifierSettings::Email(email) = &config.notifier else {
            panic!("expected email notifier");
        };
        assert_eq!(email.smtp_port, 587);
        assert!(email.use_tls);
        assert_eq!(config.alerts.language, Language::English);
    }

    #[test]
    fn test_toml_signed_api_without_credentials_fails() {
        let err = MonitorConfig::from_toml(
            r#"
            [notifier]
            kind = "telegram"
            bot_token = "123:abc"
            channel_id = "@power"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("[api]"));
    }

    #[test]
    fn test_invalid_timezone_fails() {
        let mut vars = full_env();
        vars.insert("TIMEZONE".to_owned(), "Mars/Olympus".to_owned());
        let err = MonitorConfig::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert!(err.to_string().contains("timezone"));
    }

    #[test]
    fn test_credentials_debug_hides_secret() {
        let creds = Credentials {
            base_url: "https://x".to_owned(),
            client_id: "id".to_owned(),
            secret: "super-secret".to_owned(),
            device_id: "dev".to_owned(),
        };
        let printed = format!("{creds:?}");
        assert!(!printed.contains("super-secret"));
    }
}
