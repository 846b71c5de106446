//! JSON-RPC 2.0 wire format and the method payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version string carried by every message.
pub const JSONRPC_VERSION: &str = "2.0";

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// Standard and application-defined JSON-RPC error codes.
pub mod codes {
    /// Invalid JSON was received.
    pub const PARSE_ERROR: i64 = -32700;
    /// The JSON sent is not a valid request object.
    pub const INVALID_REQUEST: i64 = -32600;
    /// The method does not exist.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Invalid method parameters.
    pub const INVALID_PARAMS: i64 = -32602;
    /// Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i64 = -32603;

    /// Wrong password or unknown account.
    pub const INVALID_CREDENTIALS: i64 = -32001;
    /// The messaging key registry rejected the operation; retryable.
    pub const REGISTRY_UNAVAILABLE: i64 = -32002;
    /// No account is selected.
    pub const NO_ACCOUNT_SELECTED: i64 = -32003;
    /// Startup restore of the selected account failed.
    pub const RESTORE_FAILED: i64 = -32004;
    /// The session record could not be persisted; retryable.
    pub const STORE_UNAVAILABLE: i64 = -32005;
    /// Node lifecycle or keystore failure.
    pub const NODE_ERROR: i64 = -32010;
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// JSON-RPC 2.0 request. A request without `id` is a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(Value::from(id)),
            method: method.to_string(),
            params,
        }
    }
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attaches a `retryable` hint for clients.
    pub fn retryable(mut self, retryable: bool) -> Self {
        self.data = Some(serde_json::json!({ "retryable": retryable }));
        self
    }
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcError {}

// ---------------------------------------------------------------------------
// Method payloads
// ---------------------------------------------------------------------------

/// Params of `status_login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub address: String,
    pub password: String,
}

/// Result of `status_login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub address_key_id: String,
}

/// Params of `status_signup`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub password: String,
}

/// Result of `status_signup`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupResponse {
    pub address: String,
    pub pubkey: String,
}

/// Result of `status_selectedAccount`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedAccountResponse {
    pub address: String,
    pub pubkey: String,
    pub key_id: String,
}

/// Result of `node_status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStatusResponse {
    pub state: String,
    pub selected_address: Option<String>,
    pub injected_keys: usize,
    pub started_at: Option<String>,
}
