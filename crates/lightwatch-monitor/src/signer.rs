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

//! Cloud API request signing
//!
//! Every upstream call carries an HMAC-SHA256 signature over a canonical
//! string built from the method, the SHA-256 of the body, an optional block
//! of signed headers, and the path with its query sorted by key:
//!
//! ```text
//! GET
//! e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855
//!
//! /v1.0/token?grant_type=1
//! ```
//!
//! The HMAC message is `client_id [+ access_token] + t + nonce + canonical`,
//! keyed with the client secret, hex-encoded and upper-cased.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::Credentials;
use crate::error::MonitorResult;

type HmacSha256 = Hmac<Sha256>;

/// Header whose value lists (colon-separated) the headers covered by the signature.
pub const SIGNATURE_HEADERS: &str = "Signature-Headers";

pub const SIGN_METHOD: &str = "HMAC-SHA256";

/// Build the canonical string that gets signed.
#[must_use]
pub fn canonical_string(
    method: &str,
    base_path: &str,
    query: &BTreeMap<String, String>,
    body: &[u8],
    headers: &BTreeMap<String, String>,
) -> String {
    let body_hash = hex::encode(Sha256::digest(body));

    let mut headers_block = String::new();
    if let Some(directive) = headers.get(SIGNATURE_HEADERS) {
        for key in directive.split(':') {
            let value = headers.get(key).map_or("", String::as_str);
            headers_block.push_str(key);
            headers_block.push(':');
            headers_block.push_str(value);
            headers_block.push('\n');
        }
    }

    let mut url = format!("/{base_path}");
    if !query.is_empty() {
        // BTreeMap iterates in key order
        let joined = query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        url.push('?');
        url.push_str(&joined);
    }

    format!(
        "{}\n{body_hash}\n{headers_block}\n{url}",
        method.to_uppercase()
    )
}

/// Signature for the token exchange call, which has no access token yet.
#[must_use]
pub fn sign_token_request(
    client_id: &str,
    secret: &str,
    timestamp_ms: &str,
    nonce: &str,
    canonical: &str,
) -> String {
    hmac_upper_hex(secret, &[client_id, timestamp_ms, nonce, canonical])
}

/// Signature for calls made on behalf of an access token.
#[must_use]
pub fn sign_service_request(
    client_id: &str,
    access_token: &str,
    secret: &str,
    timestamp_ms: &str,
    nonce: &str,
    canonical: &str,
) -> String {
    hmac_upper_hex(
        secret,
        &[client_id, access_token, timestamp_ms, nonce, canonical],
    )
}

fn hmac_upper_hex(secret: &str, parts: &[&str]) -> String {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        unreachable!("HMAC-SHA256 accepts keys of any length");
    };
    for part in parts {
        mac.update(part.as_bytes());
    }
    hex::encode_upper(mac.finalize().into_bytes())
}

/// A request ready to be sent: canonical inputs plus the computed signature.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub method: String,
    pub canonical_path: String,
    pub query: BTreeMap<String, String>,
    pub body: Vec<u8>,
    /// Extra headers, including any `Signature-Headers` directive; sent as-is
    pub headers: BTreeMap<String, String>,
    pub timestamp_ms: String,
    pub nonce: String,
    pub signature: String,
}

impl SignedRequest {
    pub fn get(base_path: impl Into<String>) -> SignedRequestBuilder {
        SignedRequestBuilder::new("GET", base_path)
    }

    pub fn post(base_path: impl Into<String>) -> SignedRequestBuilder {
        SignedRequestBuilder::new("POST", base_path)
    }

    /// Absolute URL of the path against `base_url`. The query string is
    /// attached by the HTTP client from `self.query`.
    #[must_use]
    pub fn url(&self, base_url: &str) -> String {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            self.canonical_path
        )
    }

    /// Headers common to every signed call.
    #[must_use]
    pub fn auth_headers<'a>(&'a self, client_id: &'a str) -> Vec<(&'static str, &'a str)> {
        vec![
            ("client_id", client_id),
            ("sign_method", SIGN_METHOD),
            ("t", self.timestamp_ms.as_str()),
            ("sign", self.signature.as_str()),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct SignedRequestBuilder {
    method: String,
    base_path: String,
    query: BTreeMap<String, String>,
    body: Vec<u8>,
    headers: BTreeMap<String, String>,
}

impl SignedRequestBuilder {
    fn new(method: &str, base_path: impl Into<String>) -> Self {
        let base_path: String = base_path.into();
        Self {
            method: method.to_owned(),
            base_path: base_path.trim_start_matches('/').to_owned(),
            query: BTreeMap::new(),
            body: Vec::new(),
            headers: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Serialize `body` as JSON; the same bytes are hashed and sent.
    pub fn json_body<T: Serialize + ?Sized>(mut self, body: &T) -> MonitorResult<Self> {
        self.body = serde_json::to_vec(body)?;
        Ok(self)
    }

    /// Sign the request. With `access_token` the service-call form is used,
    /// without it the token-exchange form.
    #[must_use]
    pub fn sign(
        self,
        credentials: &Credentials,
        access_token: Option<&str>,
        timestamp_ms: &str,
        nonce: &str,
    ) -> SignedRequest {
        let canonical = canonical_string(
            &self.method,
            &self.base_path,
            &self.query,
            &self.body,
            &self.headers,
        );
        let signature = match access_token {
            Some(token) => sign_service_request(
                &credentials.client_id,
                token,
                &credentials.secret,
                timestamp_ms,
                nonce,
                &canonical,
            ),
            None => sign_token_request(
                &credentials.client_id,
                &credentials.secret,
                timestamp_ms,
                nonce,
                &canonical,
            ),
        };

        SignedRequest {
            method: self.method,
            canonical_path: self.base_path,
            query: self.query,
            body: self.body,
            headers: self.headers,
            timestamp_ms: timestamp_ms.to_owned(),
            nonce: nonce.to_owned(),
            signature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn creds() -> Credentials {
        Credentials {
            base_url: "https://openapi.example.com".to_owned(),
            client_id: "client123".to_owned(),
            secret: "s3cret".to_owned(),
            device_id: "dev1".to_owned(),
        }
    }

    #[test]
    fn test_canonical_string_token_call() {
        let canonical = canonical_string(
            "get",
            "v1.0/token",
            &params(&[("grant_type", "1")]),
            b"",
            &BTreeMap::new(),
        );
        assert_eq!(
            canonical,
            format!("GET\n{EMPTY_SHA256}\n\n/v1.0/token?grant_type=1")
        );
    }

    #[test]
    fn test_canonical_string_without_query() {
        let canonical = canonical_string(
            "GET",
            "v1.0/devices/abc",
            &BTreeMap::new(),
            b"",
            &BTreeMap::new(),
        );
        assert_eq!(canonical, format!("GET\n{EMPTY_SHA256}\n\n/v1.0/devices/abc"));
    }

    #[test]
    fn test_query_is_sorted_regardless_of_insertion_order() {
        let forward = SignedRequest::get("v1.0/things")
            .query("a", "1")
            .query("m", "2")
            .query("z", "3")
            .sign(&creds(), None, "1700000000000", "");
        let backward = SignedRequest::get("v1.0/things")
            .query("z", "3")
            .query("a", "1")
            .query("m", "2")
            .sign(&creds(), None, "1700000000000", "");

        assert_eq!(forward.signature, backward.signature);
        let canonical =
            canonical_string("GET", "v1.0/things", &forward.query, b"", &BTreeMap::new());
        assert!(canonical.ends_with("/v1.0/things?a=1&m=2&z=3"));
    }

    #[test]
    fn test_signature_headers_block_in_listed_order() {
        let headers = params(&[
            (SIGNATURE_HEADERS, "area_id:call_id"),
            ("call_id", "42"),
            ("area_id", "eu"),
            ("unlisted", "x"),
        ]);
        let canonical = canonical_string("POST", "v1.0/x", &BTreeMap::new(), b"", &headers);
        assert_eq!(
            canonical,
            format!("POST\n{EMPTY_SHA256}\narea_id:eu\ncall_id:42\n\n/v1.0/x")
        );
    }

    #[test]
    fn test_signature_headers_missing_value_is_empty() {
        let headers = params(&[(SIGNATURE_HEADERS, "missing")]);
        let canonical = canonical_string("GET", "p", &BTreeMap::new(), b"", &headers);
        assert!(canonical.contains("\nmissing:\n\n/p"));
    }

    #[test]
    fn test_body_hash_covers_serialized_json() {
        let req = SignedRequest::post("v1.0/commands")
            .json_body(&serde_json::json!({"code": "switch", "value": true}))
            .unwrap()
            .sign(&creds(), Some("tok"), "1", "");
        assert_eq!(req.body, br#"{"code":"switch","value":true}"#.to_vec());

        let canonical = canonical_string(
            "POST",
            "v1.0/commands",
            &BTreeMap::new(),
            &req.body,
            &BTreeMap::new(),
        );
        assert!(!canonical.contains(EMPTY_SHA256));
    }

    #[test]
    fn test_sign_is_deterministic_and_upper_hex() {
        let canonical = format!("GET\n{EMPTY_SHA256}\n\n/v1.0/token?grant_type=1");
        let a = sign_token_request("client123", "s3cret", "1700000000000", "", &canonical);
        let b = sign_token_request("client123", "s3cret", "1700000000000", "", &canonical);

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_sign_matches_reference_hmac() {
        // HMAC-SHA256("key", "The quick brown fox jumps over the lazy dog")
        let sig = sign_token_request(
            "The quick ",
            "key",
            "brown fox ",
            "jumps over ",
            "the lazy dog",
        );
        assert_eq!(
            sig,
            "F7BC83F430538424B13298E6AA6FB143EF4D59A14946175997479DBC2D1A3CD8"
        );
    }

    #[test]
    fn test_single_byte_change_alters_signature() {
        let canonical = format!("GET\n{EMPTY_SHA256}\n\n/v1.0/devices/dev1");
        let other_path = canonical.replace("dev1", "dev2");
        let sign = |client: &str, token: &str, secret: &str, t: &str, nonce: &str, c: &str| {
            sign_service_request(client, token, secret, t, nonce, c)
        };
        let base = sign("client123", "token", "s3cret", "1700000000000", "", &canonical);

        let variants = [
            sign("client124", "token", "s3cret", "1700000000000", "", &canonical),
            sign("client123", "tokem", "s3cret", "1700000000000", "", &canonical),
            sign("client123", "token", "s3cres", "1700000000000", "", &canonical),
            sign("client123", "token", "s3cret", "1700000000001", "", &canonical),
            sign("client123", "token", "s3cret", "1700000000000", "n", &canonical),
            sign("client123", "token", "s3cret", "1700000000000", "", &other_path),
        ];
        for variant in variants {
            assert_ne!(variant, base);
        }
    }

    #[test]
    fn test_token_and_service_forms_differ() {
        let canonical = "GET\n\n\n/p";
        let token_form = sign_token_request("c", "s", "1", "", canonical);
        let service_form = sign_service_request("c", "tok", "s", "1", "", canonical);
        assert_ne!(token_form, service_form);
        // An empty access token degenerates to the token-exchange form
        assert_eq!(token_form, sign_service_request("c", "", "s", "1", "", canonical));
    }

    #[test]
    fn test_url_includes_path() {
        let req = SignedRequest::get("/v1.0/devices/dev1").sign(&creds(), Some("tok"), "1", "");
        assert_eq!(req.canonical_path, "v1.0/devices/dev1");
        assert_eq!(
            req.url("https://openapi.example.com/"),
            "https://openapi.example.com/v1.0/devices/dev1"
        );
    }
}
