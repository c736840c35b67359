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

//! Heartbeat receiver: a router pings `POST /api/heartbeat` while it has
//! power, `GET /api/status` tells whether the last ping is recent enough.

pub mod config;
pub mod handlers;
pub mod store;

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::routing::{get, post};

use crate::config::HeartbeatConfig;
use crate::handlers::AppState;
use crate::store::HeartbeatStore;

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/heartbeat", post(handlers::heartbeat_handler))
        .route("/api/status", get(handlers::status_handler))
        .with_state(state)
}

/// Application state for a loaded configuration.
pub fn state_from_config(config: &HeartbeatConfig) -> Result<AppState> {
    let tz = config.status.tz()?;
    Ok(AppState {
        store: Arc::new(HeartbeatStore::new(&config.store.path, tz)),
        freshness: config.status.freshness(),
    })
}
