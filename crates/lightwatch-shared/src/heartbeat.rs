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

use serde::{Deserialize, Serialize};

/// Liveness verdict reported by `GET /api/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Liveness {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "NOT_OK")]
    NotOk,
}

impl Liveness {
    #[must_use]
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatStatusResponse {
    pub status: Liveness,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Body returned by `POST /api/heartbeat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatAck {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn liveness_uses_upper_case_wire_names() {
        let ok = HeartbeatStatusResponse {
            status: Liveness::Ok,
            detail: None,
        };
        assert_eq!(serde_json::to_string(&ok).unwrap(), r#"{"status":"OK"}"#);

        let parsed: HeartbeatStatusResponse =
            serde_json::from_str(r#"{"status":"NOT_OK","detail":"No heartbeat received"}"#)
                .unwrap();
        assert_eq!(parsed.status, Liveness::NotOk);
        assert_eq!(parsed.detail.as_deref(), Some("No heartbeat received"));
        assert!(!parsed.status.is_ok());
    }
}
