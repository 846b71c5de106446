//! Request dispatch.
//!
//! Every method runs on tokio's blocking pool: account unlocking is
//! CPU-bound (Argon2id) and the node API is synchronous.

use std::sync::Arc;

use keyward_crypto::signing::PublicKey;
use keyward_node::Node;
use keyward_session::SessionError;
use keyward_types::{Address, KeyId, KeywardError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::types::{
    codes, JsonRpcError, JsonRpcRequest, JsonRpcResponse, LoginRequest, LoginResponse,
    NodeStatusResponse, SelectedAccountResponse, SignupRequest, SignupResponse, JSONRPC_VERSION,
};

type RpcResult = std::result::Result<Value, JsonRpcError>;

// ---------------------------------------------------------------------------
// RpcHandler
// ---------------------------------------------------------------------------

/// Dispatches JSON-RPC requests to a [`Node`].
#[derive(Clone)]
pub struct RpcHandler {
    node: Arc<Node>,
}

impl RpcHandler {
    /// Creates a handler for `node`.
    pub fn new(node: Arc<Node>) -> Self {
        Self { node }
    }

    /// Handles one raw request line.
    ///
    /// Returns `None` for notifications, which get no response.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => self.handle(request).await,
            Err(e) => Some(JsonRpcResponse::failure(
                Value::Null,
                JsonRpcError::new(codes::PARSE_ERROR, format!("parse error: {e}")),
            )),
        }
    }

    /// Handles one decoded request.
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let JsonRpcRequest {
            jsonrpc,
            id,
            method,
            params,
        } = request;

        let outcome = if jsonrpc != JSONRPC_VERSION {
            Err(JsonRpcError::new(
                codes::INVALID_REQUEST,
                format!("unsupported jsonrpc version '{jsonrpc}'"),
            ))
        } else {
            tracing::debug!(%method, "rpc request");
            let node = Arc::clone(&self.node);
            let name = method.clone();
            tokio::task::spawn_blocking(move || dispatch(&node, &name, params))
                .await
                .unwrap_or_else(|e| {
                    tracing::error!(%method, %e, "rpc handler task failed");
                    Err(JsonRpcError::new(codes::INTERNAL_ERROR, "internal error"))
                })
        };

        let Some(id) = id else {
            if let Err(e) = outcome {
                tracing::debug!(%method, %e, "notification failed");
            }
            return None;
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        })
    }
}

// ---------------------------------------------------------------------------
// Methods
// ---------------------------------------------------------------------------

fn dispatch(node: &Node, method: &str, params: Option<Value>) -> RpcResult {
    match method {
        "status_signup" => status_signup(node, params),
        "status_login" => status_login(node, params),
        "status_logout" => status_logout(node),
        "status_selectedAccount" => status_selected_account(node),
        "shh_hasKeyPair" => shh_has_key_pair(node, params),
        "node_status" => node_status(node),
        "node_restart" => node_restart(node),
        other => Err(JsonRpcError::new(
            codes::METHOD_NOT_FOUND,
            format!("method not found: {other}"),
        )),
    }
}

fn status_signup(node: &Node, params: Option<Value>) -> RpcResult {
    let req: SignupRequest = parse_params(params)?;
    let info = node.create_account(&req.password).map_err(|e| {
        JsonRpcError::new(
            codes::NODE_ERROR,
            format!("could not create the specified account : {e}"),
        )
    })?;

    to_value(SignupResponse {
        address: info.address.to_string(),
        pubkey: info.public_key.to_string(),
    })
}

fn status_login(node: &Node, params: Option<Value>) -> RpcResult {
    let req: LoginRequest = parse_params(params)?;
    let address: Address = req
        .address
        .parse()
        .map_err(|e: KeywardError| JsonRpcError::new(codes::INVALID_PARAMS, e.to_string()))?;

    let key_id = node
        .select_account(&address, &req.password)
        .map_err(session_error)?;

    to_value(LoginResponse {
        address_key_id: key_id.to_string(),
    })
}

fn status_logout(node: &Node) -> RpcResult {
    node.logout().map_err(session_error)?;
    Ok(Value::Null)
}

fn status_selected_account(node: &Node) -> RpcResult {
    let selected = node.selected_account().map_err(session_error)?;
    to_value(SelectedAccountResponse {
        address: selected.address.to_string(),
        pubkey: selected.public_key.to_string(),
        key_id: selected.key_id.to_string(),
    })
}

/// Accepts either a key id or a public key, both 32 bytes hex.
fn shh_has_key_pair(node: &Node, params: Option<Value>) -> RpcResult {
    let (key,): (String,) = parse_params(params)?;
    let public_key: PublicKey = key
        .parse()
        .map_err(|e: KeywardError| JsonRpcError::new(codes::INVALID_PARAMS, e.to_string()))?;

    let key_id = KeyId::new(*public_key.as_bytes());
    Ok(Value::Bool(
        node.has_key_id(&key_id) || node.has_key_pair(&public_key),
    ))
}

fn node_status(node: &Node) -> RpcResult {
    let status = node.status().map_err(node_error)?;
    to_value(NodeStatusResponse {
        state: status.state.to_string(),
        selected_address: status.selected.map(|a| a.to_string()),
        injected_keys: status.injected_keys,
        started_at: status.started_at.map(|t| t.to_string()),
    })
}

fn node_restart(node: &Node) -> RpcResult {
    node.restart().map_err(node_error)?;
    Ok(Value::Null)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Decodes `params`, also accepting the positional form `[{...}]`.
fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> std::result::Result<T, JsonRpcError> {
    let params = params.ok_or_else(|| JsonRpcError::new(codes::INVALID_PARAMS, "missing params"))?;

    let params = match params {
        Value::Array(mut items) if items.len() == 1 && items[0].is_object() => items.remove(0),
        other => other,
    };

    serde_json::from_value(params)
        .map_err(|e| JsonRpcError::new(codes::INVALID_PARAMS, format!("invalid params: {e}")))
}

fn to_value<T: Serialize>(value: T) -> RpcResult {
    serde_json::to_value(value).map_err(|e| {
        JsonRpcError::new(codes::INTERNAL_ERROR, format!("failed to encode result: {e}"))
    })
}

/// Maps a session error to its JSON-RPC error object.
pub fn session_error(err: SessionError) -> JsonRpcError {
    let code = match &err {
        SessionError::InvalidCredentials { .. } => codes::INVALID_CREDENTIALS,
        SessionError::RegistryUnavailable { .. } => codes::REGISTRY_UNAVAILABLE,
        SessionError::NoAccountSelected => codes::NO_ACCOUNT_SELECTED,
        SessionError::RestoreFailed { .. } => codes::RESTORE_FAILED,
        SessionError::StoreUnavailable { .. } => codes::STORE_UNAVAILABLE,
    };
    JsonRpcError::new(code, err.to_string()).retryable(err.is_retryable())
}

fn node_error(err: KeywardError) -> JsonRpcError {
    JsonRpcError::new(codes::NODE_ERROR, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_object_params_accepted() -> std::result::Result<(), JsonRpcError> {
        let params = serde_json::json!([{ "address": "aa", "password": "pw" }]);
        let req: LoginRequest = parse_params(Some(params))?;
        assert_eq!(req.address, "aa");
        Ok(())
    }

    #[test]
    fn missing_params_rejected() {
        let result: std::result::Result<SignupRequest, _> = parse_params(None);
        assert_eq!(result.map_err(|e| e.code).err(), Some(codes::INVALID_PARAMS));
    }

    #[test]
    fn session_error_codes() {
        let err = session_error(SessionError::NoAccountSelected);
        assert_eq!(err.code, codes::NO_ACCOUNT_SELECTED);
        assert_eq!(err.message, "no account has been selected, please login");

        let err = session_error(SessionError::RegistryUnavailable {
            reason: "stopped".into(),
        });
        assert_eq!(err.code, codes::REGISTRY_UNAVAILABLE);
        assert_eq!(err.data, Some(serde_json::json!({ "retryable": true })));
    }
}
