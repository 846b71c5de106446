//! Typed wrapper over the JSON-RPC client.
//!
//! Applies the request timeout and maps every failure to a
//! human-readable string.

use std::net::SocketAddr;
use std::time::Duration;

use keyward_rpc::client::{ClientError, RpcClient as JsonRpcClient};
use keyward_rpc::types::{
    LoginResponse, NodeStatusResponse, SelectedAccountResponse, SignupResponse,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

/// Connection to the daemon with one method per RPC call.
pub struct RpcClient {
    inner: JsonRpcClient,
    timeout: Duration,
}

impl RpcClient {
    /// Connects to the daemon at `addr`.
    pub async fn connect(addr: SocketAddr, timeout_secs: u64) -> std::result::Result<Self, String> {
        let timeout = Duration::from_secs(timeout_secs);
        let inner = tokio::time::timeout(timeout, JsonRpcClient::connect(addr))
            .await
            .map_err(|_| format!("timed out connecting to '{addr}'"))?
            .map_err(describe)?;

        Ok(Self { inner, timeout })
    }

    pub async fn signup(&mut self, password: &str) -> std::result::Result<SignupResponse, String> {
        self.call("status_signup", Some(json!({ "password": password })))
            .await
    }

    pub async fn login(
        &mut self,
        address: &str,
        password: &str,
    ) -> std::result::Result<LoginResponse, String> {
        self.call(
            "status_login",
            Some(json!({ "address": address, "password": password })),
        )
        .await
    }

    pub async fn logout(&mut self) -> std::result::Result<(), String> {
        self.raw("status_logout", None).await.map(|_| ())
    }

    pub async fn selected_account(&mut self) -> std::result::Result<SelectedAccountResponse, String> {
        self.call("status_selectedAccount", None).await
    }

    pub async fn node_status(&mut self) -> std::result::Result<NodeStatusResponse, String> {
        self.call("node_status", None).await
    }

    pub async fn node_restart(&mut self) -> std::result::Result<(), String> {
        self.raw("node_restart", None).await.map(|_| ())
    }

    async fn call<T: DeserializeOwned>(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> std::result::Result<T, String> {
        let value = self.raw(method, params).await?;
        serde_json::from_value(value).map_err(|e| format!("unexpected {method} result: {e}"))
    }

    async fn raw(&mut self, method: &str, params: Option<Value>) -> std::result::Result<Value, String> {
        tokio::time::timeout(self.timeout, self.inner.call(method, params))
            .await
            .map_err(|_| format!("{method} timed out after {}s", self.timeout.as_secs()))?
            .map_err(describe)
    }
}

fn describe(err: ClientError) -> String {
    match err {
        ClientError::Rpc(e) => {
            let retry = e
                .data
                .as_ref()
                .and_then(|d| d.get("retryable"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if retry {
                format!("{} (retryable)", e.message)
            } else {
                e.message
            }
        }
        other => other.to_string(),
    }
}
