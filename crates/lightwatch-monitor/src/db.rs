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

use parking_lot::Mutex;
use rusqlite::{OptionalExtension, params};
use std::path::Path;

use crate::error::MonitorResult;

/// Append-only log of observed device states.
#[derive(Debug)]
pub struct StateStore {
    conn: Mutex<rusqlite::Connection>,
}

/// One persisted observation. `timestamp` is Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRecord {
    pub timestamp: i64,
    pub online: bool,
}

impl StateStore {
    /// Open or create the store. `":memory:"` gives a throwaway database.
    pub fn open(path: &str) -> MonitorResult<Self> {
        if path != ":memory:"
            && let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = rusqlite::Connection::open(path)?;

        // `status` stays TEXT so databases written by earlier deployments
        // ('0'/'1' strings) keep working
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS status (
                timestamp  INTEGER,
                status     TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_status_timestamp
                ON status(timestamp DESC);",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Most recent row, ties broken by insertion order.
    pub fn get_last(&self) -> MonitorResult<Option<StatusRecord>> {
        let conn = self.conn.lock();
        let record = conn
            .query_row(
                "SELECT timestamp, CAST(status AS INTEGER) FROM status
                 ORDER BY timestamp DESC, rowid DESC LIMIT 1",
                [],
                |row| {
                    Ok(StatusRecord {
                        timestamp: row.get(0)?,
                        online: row.get::<_, i64>(1)? != 0,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    pub fn insert(&self, timestamp: i64, online: bool) -> MonitorResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO status (timestamp, status) VALUES (?1, ?2)",
            params![timestamp, i64::from(online)],
        )?;
        Ok(())
    }

    pub fn count(&self) -> MonitorResult<u64> {
        let conn = self.conn.lock();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM status", [], |row| row.get(0))?;
        Ok(u64::try_from(n).unwrap_or_default())
    }
}
