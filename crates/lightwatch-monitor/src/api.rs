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

//! Plumbing shared by the token and device calls of the cloud API.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;

use crate::error::{MonitorError, MonitorResult};
use crate::signer::SignedRequest;

/// Every cloud API response is wrapped like this. Failures usually still come
/// back as HTTP 200 with `success: false` and no `result`.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub result: Option<T>,
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    #[serde(default)]
    pub msg: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// Unwrap `result`, or describe why it is missing.
    pub fn into_result(self) -> Result<T, String> {
        if let Some(result) = self.result {
            return Ok(result);
        }
        let code = self
            .code
            .map_or_else(|| "none".to_owned(), |c| c.to_string());
        let msg = self.msg.unwrap_or_else(|| "no message".to_owned());
        Err(format!(
            "response has no result (success={:?}, code={code}, msg={msg})",
            self.success
        ))
    }
}

pub fn http_client(timeout: Duration) -> MonitorResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| MonitorError::Config(format!("Failed to build HTTP client: {e}")))
}

/// Turn a signed request into an HTTP request carrying all signing headers.
pub fn build_request(
    http: &Client,
    base_url: &str,
    client_id: &str,
    signed: &SignedRequest,
    access_token: Option<&str>,
) -> RequestBuilder {
    let method = if signed.method == "POST" {
        Method::POST
    } else {
        Method::GET
    };

    let mut request = http.request(method, signed.url(base_url));
    if !signed.query.is_empty() {
        request = request.query(&signed.query);
    }
    for (name, value) in signed.auth_headers(client_id) {
        request = request.header(name, value);
    }
    if let Some(token) = access_token {
        request = request
            .header("access_token", token)
            .header("nonce", signed.nonce.as_str());
    }
    for (name, value) in &signed.headers {
        request = request.header(name.as_str(), value.as_str());
    }
    if !signed.body.is_empty() {
        request = request
            .header("content-type", "application/json")
            .body(signed.body.clone());
    }
    request
}
