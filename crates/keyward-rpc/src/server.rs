//! RPC server entry point.
//!
//! [`RpcServer::start`] binds the listener, spawns the accept loop as a
//! tokio task and returns the bound address plus a `JoinHandle` for the
//! caller to await.
//!
//! # Graceful shutdown
//!
//! The server takes a `watch::Receiver<bool>`. When the value becomes
//! `true` it stops accepting connections; open connections finish the
//! request in flight and close.

use std::net::SocketAddr;
use std::sync::Arc;

use keyward_node::Node;
use keyward_types::{KeywardError, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::RpcConfig;
use crate::handler::RpcHandler;
use crate::types::{codes, JsonRpcError, JsonRpcResponse};

// ---------------------------------------------------------------------------
// Shutdown helper
// ---------------------------------------------------------------------------

/// Resolves when the shutdown watch fires or its sender is dropped.
async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            break;
        }
        if rx.changed().await.is_err() {
            break;
        }
    }
}

// ---------------------------------------------------------------------------
// RpcServer
// ---------------------------------------------------------------------------

/// Manages the lifecycle of the JSON-RPC server.
pub struct RpcServer;

impl RpcServer {
    /// Binds `config.addr` and starts serving `node`.
    ///
    /// Returns the actually bound address (useful with port 0).
    ///
    /// # Errors
    ///
    /// - `KeywardError::ConfigError` if `config` is invalid.
    /// - `KeywardError::NetworkError` if the address cannot be bound.
    pub async fn start(
        config: RpcConfig,
        node: Arc<Node>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Result<(SocketAddr, JoinHandle<()>)> {
        config.validate()?;

        let listener = TcpListener::bind(config.addr)
            .await
            .map_err(|e| KeywardError::NetworkError {
                reason: format!("failed to bind RPC server on {}: {e}", config.addr),
            })?;
        let local_addr = listener.local_addr().map_err(|e| KeywardError::NetworkError {
            reason: format!("failed to read bound address: {e}"),
        })?;

        tracing::info!(addr = %local_addr, "RPC server listening on TCP");

        let handler = RpcHandler::new(node);
        let max_request_bytes = config.max_request_bytes;

        let handle = tokio::spawn(async move {
            let shutdown = wait_for_shutdown(shutdown_rx.clone());
            tokio::pin!(shutdown);

            loop {
                tokio::select! {
                    _ = &mut shutdown => break,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            tracing::debug!(%peer, "RPC connection accepted");
                            let handler = handler.clone();
                            let shutdown_rx = shutdown_rx.clone();
                            tokio::spawn(async move {
                                if let Err(e) =
                                    serve_connection(stream, handler, max_request_bytes, shutdown_rx).await
                                {
                                    tracing::debug!(%peer, %e, "RPC connection closed with error");
                                }
                            });
                        }
                        Err(e) => tracing::warn!(%e, "failed to accept RPC connection"),
                    },
                }
            }

            tracing::info!("RPC server (TCP) stopped");
        });

        Ok((local_addr, handle))
    }
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// Serves one connection: one request per line, one response per line.
async fn serve_connection(
    stream: TcpStream,
    handler: RpcHandler,
    max_request_bytes: usize,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    let shutdown = wait_for_shutdown(shutdown_rx);
    tokio::pin!(shutdown);

    loop {
        line.clear();
        // The limit applies to the request without its line terminator;
        // one extra byte is enough to see either the newline or an overrun.
        let mut limited = (&mut reader).take(max_request_bytes as u64 + 1);
        let read = tokio::select! {
            _ = &mut shutdown => return Ok(()),
            read = limited.read_line(&mut line) => read.map_err(|e| KeywardError::NetworkError {
                reason: format!("failed to read request: {e}"),
            })?,
        };
        if read == 0 {
            return Ok(());
        }

        if line.trim_end_matches(['\r', '\n']).len() > max_request_bytes {
            let response = JsonRpcResponse::failure(
                serde_json::Value::Null,
                JsonRpcError::new(codes::INVALID_REQUEST, "request too large"),
            );
            write_response(&mut writer, &response).await?;
            return Ok(());
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(response) = handler.handle_line(trimmed).await {
            write_response(&mut writer, &response).await?;
        }
    }
}

async fn write_response(
    writer: &mut tokio::net::tcp::OwnedWriteHalf,
    response: &JsonRpcResponse,
) -> Result<()> {
    let mut bytes = serde_json::to_vec(response).map_err(|e| KeywardError::NetworkError {
        reason: format!("failed to encode response: {e}"),
    })?;
    bytes.push(b'\n');

    writer
        .write_all(&bytes)
        .await
        .map_err(|e| KeywardError::NetworkError {
            reason: format!("failed to write response: {e}"),
        })
}
