//! RPC server configuration.
//!
//! The server only ever binds a loopback address: the channel is not
//! encrypted and carries account passwords.

use std::net::SocketAddr;

use keyward_types::{KeywardError, Result};

/// Default upper bound on a single request line, in bytes.
const DEFAULT_MAX_REQUEST_BYTES: usize = 64 * 1024;

/// Configuration for the RPC server.
#[derive(Clone, Debug)]
pub struct RpcConfig {
    /// Bind address (must be a loopback address).
    pub addr: SocketAddr,

    /// Requests longer than this are rejected and the connection closed.
    pub max_request_bytes: usize,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8645)),
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
        }
    }
}

impl RpcConfig {
    /// Creates a configuration bound to `addr` with default limits.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            ..Self::default()
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// - Non-loopback bind address.
    /// - Zero `max_request_bytes`.
    pub fn validate(&self) -> Result<()> {
        if !self.addr.ip().is_loopback() {
            return Err(KeywardError::ConfigError {
                reason: format!(
                    "RPC server requires a loopback address, got {}",
                    self.addr.ip()
                ),
            });
        }

        if self.max_request_bytes == 0 {
            return Err(KeywardError::ConfigError {
                reason: "max_request_bytes must be greater than 0".into(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(RpcConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_public_bind() {
        let cfg = RpcConfig::new(SocketAddr::from(([0, 0, 0, 0], 8645)));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn accepts_ipv6_loopback() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let cfg = RpcConfig::new("[::1]:8645".parse()?);
        assert!(cfg.validate().is_ok());
        Ok(())
    }
}
