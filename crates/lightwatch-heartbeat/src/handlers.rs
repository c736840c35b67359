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

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use tracing::{error, info};

use lightwatch_shared::heartbeat::{HeartbeatAck, HeartbeatStatusResponse};

use crate::store::{HeartbeatStore, evaluate};

#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<HeartbeatStore>,
    pub freshness: chrono::Duration,
}

pub async fn heartbeat_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<HeartbeatAck>) {
    match state.store.record(Utc::now()).await {
        Ok(at) => {
            info!(at = %at.to_rfc3339(), "Heartbeat received");
            (
                StatusCode::OK,
                Json(HeartbeatAck {
                    message: "Heartbeat received".to_owned(),
                }),
            )
        }
        Err(e) => {
            error!(
                path = %state.store.path().display(),
                error = %e,
                "Failed to store heartbeat"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HeartbeatAck {
                    message: "Failed to store heartbeat".to_owned(),
                }),
            )
        }
    }
}

pub async fn status_handler(State(state): State<AppState>) -> Json<HeartbeatStatusResponse> {
    let last = state.store.last().await;
    Json(evaluate(last, Utc::now(), state.freshness))
}
