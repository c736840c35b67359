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

//! Access token exchange

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::api::{ApiEnvelope, build_request};
use crate::config::Credentials;
use crate::error::{MonitorError, MonitorResult};
use crate::signer::SignedRequest;

const TOKEN_PATH: &str = "v1.0/token";
/// `grant_type=1` is the simple-mode grant (client credentials only)
const GRANT_TYPE: &str = "1";

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    pub obtained_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResult {
    #[serde(default)]
    access_token: Option<String>,
}

/// Exchanges client credentials for a short-lived access token.
///
/// Nothing is cached: each call is a full round trip.
#[derive(Debug, Clone)]
pub struct TokenProvider {
    http: Client,
    credentials: Arc<Credentials>,
}

impl TokenProvider {
    #[must_use]
    pub fn new(http: Client, credentials: Arc<Credentials>) -> Self {
        Self { http, credentials }
    }

    pub async fn fetch_access_token(&self) -> MonitorResult<AccessToken> {
        let timestamp = Utc::now().timestamp_millis().to_string();
        let signed = SignedRequest::get(TOKEN_PATH)
            .query("grant_type", GRANT_TYPE)
            .sign(&self.credentials, None, &timestamp, "");

        let response = build_request(
            &self.http,
            &self.credentials.base_url,
            &self.credentials.client_id,
            &signed,
            None,
        )
        .send()
        .await
        .map_err(|e| MonitorError::Auth(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MonitorError::Auth(format!("HTTP {status}: {body}")));
        }

        let envelope: ApiEnvelope<TokenResult> = response
            .json()
            .await
            .map_err(|e| MonitorError::Auth(format!("Failed to parse response: {e}")))?;

        let value = envelope
            .into_result()
            .map_err(MonitorError::Auth)?
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| MonitorError::Auth("response has no result.access_token".to_owned()))?;

        debug!("Access token obtained");
        Ok(AccessToken {
            value,
            obtained_at: Utc::now(),
        })
    }
}
