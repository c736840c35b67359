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

//! Alert texts and human readable durations.
//!
//! Ukrainian is the default and its output is kept byte-for-byte stable,
//! since channel subscribers are used to exactly these messages.

use serde::{Deserialize, Serialize};

use crate::error::MonitorError;

/// Supported alert languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Language {
    #[default]
    #[serde(rename = "uk")]
    Ukrainian,
    #[serde(rename = "en")]
    English,
}

impl Language {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Ukrainian => "uk",
            Self::English => "en",
        }
    }

    /// Parse language from string code
    ///
    /// # Errors
    ///
    /// Returns `MonitorError::Config` if the language code is not supported.
    pub fn from_code(code: &str) -> Result<Self, MonitorError> {
        match code.trim().to_lowercase().as_str() {
            "uk" | "ua" | "ukrainian" => Ok(Self::Ukrainian),
            "en" | "english" => Ok(Self::English),
            _ => Err(MonitorError::Config(format!("unsupported language: {code}"))),
        }
    }

    /// Localizer implementing this language
    #[must_use]
    pub fn localizer(&self) -> &'static dyn Localizer {
        match self {
            Self::Ukrainian => &Ukrainian,
            Self::English => &English,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Language {
    type Err = MonitorError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
    }
}

/// Unit of a duration fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Days,
    Hours,
    Minutes,
}

/// Per-language wording. Implementors only supply words; composition
/// lives in [`format_duration_with`].
pub trait Localizer: Send + Sync {
    /// Fragment for a non-zero `value` of `unit`, including any separator
    /// that must follow it.
    fn unit_fragment(&self, value: i64, unit: Unit) -> String;

    /// Phrase used when the duration is shorter than one minute
    fn less_than_minute(&self) -> &'static str;

    fn restored_message(&self, duration: &str) -> String;

    fn lost_message(&self, duration: &str) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Ukrainian;

impl Localizer for Ukrainian {
    fn unit_fragment(&self, value: i64, unit: Unit) -> String {
        // 1 | 2..=4 | everything else, no 11..14 or 21+ special casing
        let (one, few, many) = match unit {
            Unit::Days => ("день ", "дні ", "днів "),
            Unit::Hours => ("година ", "години ", "годин "),
            Unit::Minutes => ("хвилину", "хвилини", "хвилин"),
        };
        let word = match value {
            1 => one,
            2..=4 => few,
            _ => many,
        };
        format!("{value} {word}")
    }

    fn less_than_minute(&self) -> &'static str {
        "менше хвилини"
    }

    fn restored_message(&self, duration: &str) -> String {
        format!("Є світло 💡\nВідключення тривало: {duration}")
    }

    fn lost_message(&self, duration: &str) -> String {
        format!("Світло відключили 🕯🔋\nСвітло було: {duration}")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct English;

impl Localizer for English {
    fn unit_fragment(&self, value: i64, unit: Unit) -> String {
        let word = match (unit, value == 1) {
            (Unit::Days, true) => "day ",
            (Unit::Days, false) => "days ",
            (Unit::Hours, true) => "hour ",
            (Unit::Hours, false) => "hours ",
            (Unit::Minutes, true) => "minute",
            (Unit::Minutes, false) => "minutes",
        };
        format!("{value} {word}")
    }

    fn less_than_minute(&self) -> &'static str {
        "less than a minute"
    }

    fn restored_message(&self, duration: &str) -> String {
        format!("Power is back 💡\nOutage lasted: {duration}")
    }

    fn lost_message(&self, duration: &str) -> String {
        format!("Power is out 🕯🔋\nPower was on for: {duration}")
    }
}

/// Format `total_seconds` with the default Ukrainian wording.
#[must_use]
pub fn format_duration(total_seconds: i64) -> String {
    format_duration_with(&Ukrainian, total_seconds)
}

/// Split into days, hours and minutes; leftover seconds are dropped.
#[expect(clippy::integer_division, clippy::modulo_arithmetic)]
pub fn format_duration_with(localizer: &dyn Localizer, total_seconds: i64) -> String {
    let total_seconds = total_seconds.max(0);
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;

    if days == 0 && hours == 0 && minutes == 0 {
        return localizer.less_than_minute().to_owned();
    }

    [(days, Unit::Days), (hours, Unit::Hours), (minutes, Unit::Minutes)]
        .into_iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| localizer.unit_fragment(value, unit))
        .collect()
}

/// Builds complete alert messages for one language.
#[derive(Clone, Copy)]
pub struct AlertFormatter {
    localizer: &'static dyn Localizer,
}

impl std::fmt::Debug for AlertFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertFormatter").finish_non_exhaustive()
    }
}

impl AlertFormatter {
    #[must_use]
    pub fn new(language: Language) -> Self {
        Self {
            localizer: language.localizer(),
        }
    }

    #[must_use]
    pub fn duration(&self, total_seconds: i64) -> String {
        format_duration_with(self.localizer, total_seconds)
    }

    /// Power came back after an outage of `elapsed_secs`
    #[must_use]
    pub fn restored(&self, elapsed_secs: i64) -> String {
        self.localizer.restored_message(&self.duration(elapsed_secs))
    }

    /// Power went away after being on for `elapsed_secs`
    #[must_use]
    pub fn lost(&self, elapsed_secs: i64) -> String {
        self.localizer.lost_message(&self.duration(elapsed_secs))
    }
}

impl Default for AlertFormatter {
    fn default() -> Self {
        Self::new(Language::default())
    }
}
