//! Node configuration with sensible defaults.
//!
//! Every operational parameter of the account session layer lives
//! here so the daemon, the node and the tests share one definition.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{KeywardError, Result};

// ---------------------------------------------------------------------------
// SwitchFailurePolicy
// ---------------------------------------------------------------------------

/// What the session manager does when injecting a newly selected
/// account fails after the previous account was already evicted.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchFailurePolicy {
    /// Re-inject the previous account from the unlocked cache and keep
    /// it selected. Falls back to `LeaveEmpty` if re-injection fails.
    #[default]
    Rollback,
    /// Drop the previous selection entirely: empty slot, cleared record.
    LeaveEmpty,
}

// ---------------------------------------------------------------------------
// KdfCost
// ---------------------------------------------------------------------------

/// Argon2id cost parameters used when sealing new account key files.
///
/// | Field    | Default | Meaning                      |
/// |----------|---------|------------------------------|
/// | `m_cost` | 65 536  | Memory usage in KiB (64 MiB) |
/// | `t_cost` | 3       | Number of passes             |
/// | `p_cost` | 1       | Degree of parallelism        |
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct KdfCost {
    /// Memory cost in KiB.
    pub m_cost: u32,
    /// Time cost (number of passes).
    pub t_cost: u32,
    /// Parallelism degree.
    pub p_cost: u32,
}

impl Default for KdfCost {
    fn default() -> Self {
        Self {
            m_cost: 65_536,
            t_cost: 3,
            p_cost: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// NodeConfig
// ---------------------------------------------------------------------------

/// Configuration of a Keyward node instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Root directory for the keystore, the session record and the
    /// node-local secret.
    pub data_dir: PathBuf,

    /// Behaviour when switching accounts fails halfway.
    pub switch_failure_policy: SwitchFailurePolicy,

    /// Persist the unlocked-key cache so a selection survives a full
    /// process restart. When `false` the cache lives in memory only and
    /// a selection is reinstated across node restarts within the same
    /// process.
    pub persist_unlocked_cache: bool,

    /// Argon2id parameters for newly created accounts.
    pub kdf: KdfCost,

    /// Loopback address the JSON-RPC server binds to.
    pub rpc_addr: SocketAddr,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("keyward-data"),
            switch_failure_policy: SwitchFailurePolicy::default(),
            persist_unlocked_cache: true,
            kdf: KdfCost::default(),
            rpc_addr: SocketAddr::from(([127, 0, 0, 1], 8645)),
        }
    }
}

impl NodeConfig {
    /// Validates all configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(KeywardError::ConfigError {
                reason: "data_dir must not be empty".into(),
            });
        }

        if self.kdf.t_cost == 0 {
            return Err(KeywardError::ConfigError {
                reason: "kdf.t_cost must be greater than 0".into(),
            });
        }

        if self.kdf.p_cost == 0 {
            return Err(KeywardError::ConfigError {
                reason: "kdf.p_cost must be greater than 0".into(),
            });
        }

        if self.kdf.m_cost < 8 * self.kdf.p_cost {
            return Err(KeywardError::ConfigError {
                reason: format!(
                    "kdf.m_cost must be at least 8 * p_cost ({}), got {}",
                    8 * self.kdf.p_cost,
                    self.kdf.m_cost
                ),
            });
        }

        if !self.rpc_addr.ip().is_loopback() {
            return Err(KeywardError::ConfigError {
                reason: format!(
                    "rpc_addr must be a loopback address, got {}",
                    self.rpc_addr.ip()
                ),
            });
        }

        Ok(())
    }

    /// Directory holding account key files.
    pub fn keystore_dir(&self) -> PathBuf {
        self.data_dir.join("keystore")
    }

    /// Path of the persisted selection record.
    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }
}
