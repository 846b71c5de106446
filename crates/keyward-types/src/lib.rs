//! Core shared types for the Keyward node.
//!
//! Every crate in the workspace converts its internal failures into
//! [`KeywardError`] and exchanges identities as [`Address`] and
//! registry handles as [`KeyId`].

pub mod config;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// Account address derived from SHA3-256(public_key).
///
/// Stable public identifier of an account. Displayed and parsed as
/// 64 lowercase hex characters.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Address([u8; 32]);

impl Address {
    /// The fixed byte length of an address.
    pub const LEN: usize = 32;

    /// Creates a new `Address` from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = KeywardError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let bytes = decode_hex_32(trimmed).map_err(|reason| KeywardError::InvalidAddress {
            reason,
        })?;
        Ok(Self(bytes))
    }
}

// ---------------------------------------------------------------------------
// KeyId
// ---------------------------------------------------------------------------

/// Opaque identifier handed out by the messaging key registry.
///
/// Random, carries no information about the key it refers to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct KeyId([u8; 32]);

impl KeyId {
    /// The fixed byte length of a key identifier.
    pub const LEN: usize = 32;

    /// Creates a new `KeyId` from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for KeyId {
    type Err = KeywardError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let bytes = decode_hex_32(s).map_err(|reason| KeywardError::RegistryError {
            reason: format!("invalid key id: {reason}"),
        })?;
        Ok(Self(bytes))
    }
}

// ---------------------------------------------------------------------------
// Timestamp
// ---------------------------------------------------------------------------

/// UTC timestamp, serialized as RFC 3339.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a `Timestamp` representing the current UTC time.
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl FromStr for Timestamp {
    type Err = KeywardError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| KeywardError::ConfigError {
                reason: format!("invalid RFC 3339 timestamp: {e}"),
            })?
            .with_timezone(&Utc);
        Ok(Self(dt))
    }
}

// ---------------------------------------------------------------------------
// KeywardError
// ---------------------------------------------------------------------------

/// Central collaborator error type.
///
/// The keystore, the key registry, the session store and the node all
/// report failures through this enum. The account session manager maps
/// it into its own boundary error before anything reaches a caller.
#[derive(Debug, Error)]
pub enum KeywardError {
    /// The provided address is malformed.
    #[error("invalid address: {reason}")]
    InvalidAddress {
        /// Human-readable description of why the address is invalid.
        reason: String,
    },

    /// A cryptographic operation failed (decryption, key mismatch, signing).
    #[error("crypto error: {reason}")]
    CryptoError {
        /// Human-readable description of the cryptographic failure.
        reason: String,
    },

    /// A file or persistence operation failed.
    #[error("storage error: {reason}")]
    StorageError {
        /// Human-readable description of the storage failure.
        reason: String,
    },

    /// The messaging key registry rejected an operation.
    #[error("registry error: {reason}")]
    RegistryError {
        /// Human-readable description of the registry failure.
        reason: String,
    },

    /// A requested item (account file, cached key) does not exist.
    #[error("not found: {reason}")]
    NotFound {
        /// What was looked up.
        reason: String,
    },

    /// A configuration value is invalid or missing.
    #[error("config error: {reason}")]
    ConfigError {
        /// Human-readable description of the configuration problem.
        reason: String,
    },

    /// The node is in a lifecycle state that does not allow the call.
    #[error("node error: {reason}")]
    NodeError {
        /// Human-readable description of the lifecycle violation.
        reason: String,
    },

    /// The RPC transport failed (bind, connect, read or write).
    #[error("network error: {reason}")]
    NetworkError {
        /// Human-readable description of the transport failure.
        reason: String,
    },
}

/// Convenience result type using [`KeywardError`].
pub type Result<T> = std::result::Result<T, KeywardError>;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn decode_hex_32(s: &str) -> std::result::Result<[u8; 32], String> {
    let bytes = hex::decode(s).map_err(|_| "invalid hex encoding".to_string())?;
    if bytes.len() != 32 {
        return Err(format!("expected 32 bytes, got {}", bytes.len()));
    }
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
