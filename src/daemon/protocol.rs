//! Daemon protocol types for NDJSON communication over UNIX socket.
//!
//! CHANGELOG:
//! - 10/19/2026 - Request constructor for the client, error codes from MessagesError
//! - 01/10/2026 - Initial implementation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::MessagesError;

pub const PROTOCOL_V: u8 = 1;

pub type Params = HashMap<String, serde_json::Value>;

/// One request line: `{"id", "v", "method", "params"}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    /// Unique request ID (UUID)
    pub id: String,
    /// Protocol version
    pub v: u8,
    /// Method name (e.g., "health", "recent", "send")
    pub method: String,
    /// Method parameters
    #[serde(default)]
    pub params: Params,
}

/// One response line, echoing the request id.
#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    pub ok: bool,
    pub result: Option<serde_json::Value>,
    pub error: Option<ErrorInfo>,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Error code (e.g., "NOT_FOUND", "CHANNEL_FAILURE")
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResponseMeta {
    /// Server execution time in milliseconds
    pub server_ms: f64,
    pub protocol_v: u8,
}

impl Request {
    pub fn new(method: &str, params: Params) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            v: PROTOCOL_V,
            method: method.to_string(),
            params,
        }
    }

    /// Parse request from NDJSON line.
    pub fn from_ndjson_line(line: &str) -> Result<Self> {
        serde_json::from_str(line).context("Failed to parse request JSON")
    }

    pub fn to_ndjson_line(&self) -> Result<String> {
        Ok(format!("{}\n", serde_json::to_string(self)?))
    }
}

impl ResponseMeta {
    fn new(server_ms: f64) -> Self {
        Self {
            server_ms,
            protocol_v: PROTOCOL_V,
        }
    }
}

impl Response {
    pub fn success(id: String, result: serde_json::Value, server_ms: f64) -> Self {
        Self {
            id,
            ok: true,
            result: Some(result),
            error: None,
            meta: ResponseMeta::new(server_ms),
        }
    }

    pub fn error(id: String, code: &str, message: String, server_ms: f64) -> Self {
        let error = ErrorInfo {
            code: code.to_string(),
            message,
            details: None,
        };
        Self {
            id,
            ok: false,
            result: None,
            error: Some(error),
            meta: ResponseMeta::new(server_ms),
        }
    }

    /// Error response coded from a [`MessagesError`].
    pub fn from_error(id: String, err: &MessagesError, server_ms: f64) -> Self {
        Self::error(id, err.code(), err.to_string(), server_ms)
    }

    pub fn from_ndjson_line(line: &str) -> Result<Self> {
        serde_json::from_str(line).context("Failed to parse response JSON")
    }

    pub fn to_ndjson_line(&self) -> Result<String> {
        Ok(format!("{}\n", serde_json::to_string(self)?))
    }
}
