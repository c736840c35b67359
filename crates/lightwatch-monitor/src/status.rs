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

//! Device liveness sources
//!
//! Two interchangeable strategies answer "is the device online right now":
//! the signed cloud API and the heartbeat service. A deployment uses exactly
//! one of them, chosen by `MonitorConfig::source`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use lightwatch_shared::heartbeat::HeartbeatStatusResponse;

use crate::api::{ApiEnvelope, build_request, http_client};
use crate::config::{Credentials, MonitorConfig, StatusSourceKind};
use crate::error::{MonitorError, MonitorResult};
use crate::signer::SignedRequest;
use crate::token::TokenProvider;

/// Generic liveness source. The monitor only ever talks to this trait.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Current online state of the watched device
    async fn is_online(&self) -> MonitorResult<bool>;

    /// Source name for logging
    fn name(&self) -> &'static str;
}

#[derive(Debug, Deserialize)]
struct DeviceResult {
    #[serde(default)]
    online: Option<bool>,
}

/// Reads `result.online` of a device through the signed cloud API.
#[derive(Debug, Clone)]
pub struct SignedApiClient {
    http: Client,
    credentials: Arc<Credentials>,
    tokens: TokenProvider,
}

impl SignedApiClient {
    #[must_use]
    pub fn new(http: Client, credentials: Arc<Credentials>) -> Self {
        let tokens = TokenProvider::new(http.clone(), Arc::clone(&credentials));
        Self {
            http,
            credentials,
            tokens,
        }
    }

    pub async fn get_status(&self, device_id: &str) -> MonitorResult<bool> {
        // A fresh token per check, never reused
        let token = self.tokens.fetch_access_token().await?;

        let timestamp = Utc::now().timestamp_millis().to_string();
        let signed = SignedRequest::get(format!("v1.0/devices/{device_id}")).sign(
            &self.credentials,
            Some(&token.value),
            &timestamp,
            "",
        );

        let response = build_request(
            &self.http,
            &self.credentials.base_url,
            &self.credentials.client_id,
            &signed,
            Some(&token.value),
        )
        .send()
        .await
        .map_err(|e| MonitorError::Api(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MonitorError::Api(format!("HTTP {status}: {body}")));
        }

        let envelope: ApiEnvelope<DeviceResult> = response
            .json()
            .await
            .map_err(|e| MonitorError::Api(format!("Failed to parse response: {e}")))?;

        let online = envelope
            .into_result()
            .map_err(MonitorError::Api)?
            .online
            .ok_or_else(|| MonitorError::Api("response has no result.online".to_owned()))?;

        debug!(device_id, online, "Device status fetched");
        Ok(online)
    }
}

#[async_trait]
impl StatusSource for SignedApiClient {
    async fn is_online(&self) -> MonitorResult<bool> {
        self.get_status(&self.credentials.device_id).await
    }

    fn name(&self) -> &'static str {
        "signed-api"
    }
}

/// Polls the heartbeat service; `"OK"` means online.
#[derive(Debug, Clone)]
pub struct HeartbeatClient {
    http: Client,
    base_url: String,
}

impl HeartbeatClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl StatusSource for HeartbeatClient {
    async fn is_online(&self) -> MonitorResult<bool> {
        let url = format!("{}/api/status", self.base_url.trim_end_matches('/'));

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| MonitorError::Api(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::Api(format!("Heartbeat service returned {status}")));
        }

        let body: HeartbeatStatusResponse = response
            .json()
            .await
            .map_err(|e| MonitorError::Api(format!("Failed to parse response: {e}")))?;

        debug!(status = ?body.status, detail = ?body.detail, "Heartbeat status fetched");
        Ok(body.status.is_ok())
    }

    fn name(&self) -> &'static str {
        "heartbeat"
    }
}

/// Build the status source selected by the configuration.
pub fn status_source_from_config(config: &MonitorConfig) -> MonitorResult<Arc<dyn StatusSource>> {
    let http = http_client(config.schedule.request_timeout())?;
    match config.source {
        StatusSourceKind::SignedApi => {
            let credentials = config.api.clone().ok_or_else(|| {
                MonitorError::Config("[api] section is required for the signed_api source".to_owned())
            })?;
            Ok(Arc::new(SignedApiClient::new(http, Arc::new(credentials))))
        }
        StatusSourceKind::Heartbeat => Ok(Arc::new(HeartbeatClient::new(
            http,
            config.heartbeat.url.clone(),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;
    use std::time::Duration;

    fn client(base_url: String) -> SignedApiClient {
        let creds = Credentials {
            base_url,
            client_id: "client123".to_owned(),
            secret: "s3cret".to_owned(),
            device_id: "dev1".to_owned(),
        };
        SignedApiClient::new(http_client(Duration::from_secs(5)).unwrap(), Arc::new(creds))
    }

    async fn mock_token(server: &mut ServerGuard) -> mockito::Mock {
        server
            .mock("GET", "/v1.0/token")
            .match_query(Matcher::UrlEncoded("grant_type".into(), "1".into()))
            .with_status(200)
            .with_body(json!({"success": true, "result": {"access_token": "tok-abc"}}).to_string())
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_signed_api_online() {
        let mut server = Server::new_async().await;
        let token_mock = mock_token(&mut server).await;
        let device_mock = server
            .mock("GET", "/v1.0/devices/dev1")
            .match_header("access_token", "tok-abc")
            .match_header("client_id", "client123")
            .match_header("sign_method", "HMAC-SHA256")
            .match_header("sign", Matcher::Regex("^[0-9A-F]{64}$".into()))
            .with_status(200)
            .with_body(json!({"success": true, "result": {"id": "dev1", "online": true}}).to_string())
            .create_async()
            .await;

        let api = client(server.url());
        assert!(api.is_online().await.unwrap());
        token_mock.assert_async().await;
        device_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_signed_api_offline() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let _device = server
            .mock("GET", "/v1.0/devices/dev1")
            .with_status(200)
            .with_body(json!({"success": true, "result": {"online": false}}).to_string())
            .create_async()
            .await;

        assert!(!client(server.url()).is_online().await.unwrap());
    }

    #[tokio::test]
    async fn test_signed_api_fetches_token_every_call() {
        let mut server = Server::new_async().await;
        let token_mock = server
            .mock("GET", "/v1.0/token")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({"success": true, "result": {"access_token": "tok"}}).to_string())
            .expect(2)
            .create_async()
            .await;
        let _device = server
            .mock("GET", "/v1.0/devices/dev1")
            .with_status(200)
            .with_body(json!({"success": true, "result": {"online": true}}).to_string())
            .create_async()
            .await;

        let api = client(server.url());
        api.get_status("dev1").await.unwrap();
        api.get_status("dev1").await.unwrap();
        token_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_signed_api_http_error_is_api_error() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let _device = server
            .mock("GET", "/v1.0/devices/dev1")
            .with_status(502)
            .create_async()
            .await;

        let result = client(server.url()).is_online().await;
        assert!(matches!(result, Err(MonitorError::Api(_))));
    }

    #[tokio::test]
    async fn test_signed_api_missing_online_field() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let _device = server
            .mock("GET", "/v1.0/devices/dev1")
            .with_status(200)
            .with_body(json!({"success": false, "code": 1010, "msg": "token invalid"}).to_string())
            .create_async()
            .await;

        let err = client(server.url()).is_online().await.unwrap_err();
        assert!(matches!(err, MonitorError::Api(_)));
        assert!(err.to_string().contains("token invalid"));
    }

    #[tokio::test]
    async fn test_signed_api_token_failure_propagates_as_auth() {
        let mut server = Server::new_async().await;
        let _token = server
            .mock("GET", "/v1.0/token")
            .match_query(Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let result = client(server.url()).is_online().await;
        assert!(matches!(result, Err(MonitorError::Auth(_))));
    }

    #[tokio::test]
    async fn test_heartbeat_client_ok_and_not_ok() {
        let mut server = Server::new_async().await;
        let ok = server
            .mock("GET", "/api/status")
            .with_status(200)
            .with_body(r#"{"status":"OK"}"#)
            .create_async()
            .await;

        let hb = HeartbeatClient::new(Client::new(), server.url());
        assert!(hb.is_online().await.unwrap());
        ok.assert_async().await;
        ok.remove_async().await;

        let _not_ok = server
            .mock("GET", "/api/status")
            .with_status(200)
            .with_body(r#"{"status":"NOT_OK","detail":"No heartbeat received"}"#)
            .create_async()
            .await;
        assert!(!hb.is_online().await.unwrap());
    }

    #[tokio::test]
    async fn test_heartbeat_client_server_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/status")
            .with_status(503)
            .create_async()
            .await;

        let hb = HeartbeatClient::new(Client::new(), format!("{}/", server.url()));
        assert!(matches!(hb.is_online().await, Err(MonitorError::Api(_))));
    }
}
