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

//! Single-file store for the last heartbeat time.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use lightwatch_shared::heartbeat::{HeartbeatStatusResponse, Liveness};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

pub const NO_HEARTBEAT_DETAIL: &str = "No heartbeat received";

#[derive(Debug, Clone)]
pub struct HeartbeatStore {
    path: PathBuf,
    tz: Tz,
}

impl HeartbeatStore {
    pub fn new(path: impl Into<PathBuf>, tz: Tz) -> Self {
        Self {
            path: path.into(),
            tz,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist `now` as an RFC 3339 timestamp in the store's zone.
    ///
    /// Each call writes its own temp file next to the target and renames it
    /// over the target.
    pub async fn record(&self, now: DateTime<Utc>) -> std::io::Result<DateTime<Tz>> {
        let local = now.with_timezone(&self.tz);

        let dir = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        tokio::fs::create_dir_all(&dir).await?;

        let path = self.path.clone();
        let contents = local.to_rfc3339();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = NamedTempFile::new_in(&dir)?;
            tmp.write_all(contents.as_bytes())?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(std::io::Error::other)??;

        debug!(at = %local, "Heartbeat stored");
        Ok(local)
    }

    /// Last stored heartbeat, `None` if absent or unreadable.
    pub async fn last(&self) -> Option<DateTime<FixedOffset>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read heartbeat file");
                return None;
            }
        };

        match DateTime::parse_from_rfc3339(raw.trim()) {
            Ok(at) => Some(at),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Unparseable heartbeat timestamp");
                None
            }
        }
    }
}

/// OK while the last heartbeat is at most `freshness` old.
#[must_use]
pub fn evaluate(
    last: Option<DateTime<FixedOffset>>,
    now: DateTime<Utc>,
    freshness: chrono::Duration,
) -> HeartbeatStatusResponse {
    let Some(last) = last else {
        return HeartbeatStatusResponse {
            status: Liveness::NotOk,
            detail: Some(NO_HEARTBEAT_DETAIL.to_owned()),
        };
    };

    let age = now.signed_duration_since(last);
    let status = if age <= freshness {
        Liveness::Ok
    } else {
        Liveness::NotOk
    };

    HeartbeatStatusResponse {
        status,
        detail: None,
    }
}
