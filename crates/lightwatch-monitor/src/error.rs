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

//! Error types for the monitor crate

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("token exchange failed: {0}")]
    Auth(String),

    #[error("status query failed: {0}")]
    Api(String),

    #[error("request encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("notification failed: {0}")]
    Notify(String),

    #[error("config error: {0}")]
    Config(String),
}

impl MonitorError {
    /// Whether the retry loop should try the tick again.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Config(_))
    }
}

pub type MonitorResult<T> = std::result::Result<T, MonitorError>;
