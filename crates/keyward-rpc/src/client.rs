//! Minimal async client for the line-delimited JSON-RPC interface.

use std::net::SocketAddr;

use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};

/// Failure of an RPC call.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Could not reach the server or the connection broke.
    #[error("transport error: {reason}")]
    Transport {
        /// What failed.
        reason: String,
    },

    /// The server answered with something that is not a valid response.
    #[error("invalid response: {reason}")]
    Protocol {
        /// What was wrong with it.
        reason: String,
    },

    /// The server answered with a JSON-RPC error object.
    #[error(transparent)]
    Rpc(#[from] JsonRpcError),
}

/// A connection to a Keyward node's RPC server.
pub struct RpcClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    next_id: u64,
}

impl RpcClient {
    /// Connects to the server at `addr`.
    pub async fn connect(addr: SocketAddr) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| ClientError::Transport {
                reason: format!("failed to connect to {addr}: {e}"),
            })?;
        let (reader, writer) = stream.into_split();

        Ok(Self {
            reader: BufReader::new(reader),
            writer,
            next_id: 1,
        })
    }

    /// Calls `method` and returns its `result`.
    pub async fn call(&mut self, method: &str, params: Option<Value>) -> Result<Value, ClientError> {
        let id = self.next_id;
        self.next_id += 1;

        let request = JsonRpcRequest::new(id, method, params);
        let mut bytes = serde_json::to_vec(&request).map_err(|e| ClientError::Protocol {
            reason: format!("failed to encode request: {e}"),
        })?;
        bytes.push(b'\n');

        self.writer
            .write_all(&bytes)
            .await
            .map_err(|e| ClientError::Transport {
                reason: format!("failed to send request: {e}"),
            })?;

        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .await
            .map_err(|e| ClientError::Transport {
                reason: format!("failed to read response: {e}"),
            })?;
        if read == 0 {
            return Err(ClientError::Transport {
                reason: "connection closed by server".into(),
            });
        }

        let response: JsonRpcResponse =
            serde_json::from_str(line.trim()).map_err(|e| ClientError::Protocol {
                reason: format!("failed to decode response: {e}"),
            })?;

        if response.id != Value::from(id) {
            return Err(ClientError::Protocol {
                reason: format!("response id {} does not match request id {id}", response.id),
            });
        }

        match (response.result, response.error) {
            (_, Some(error)) => Err(ClientError::Rpc(error)),
            (Some(result), None) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }
}
