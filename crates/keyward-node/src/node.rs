//! Node lifecycle and state machine.
//!
//! The [`Node`] owns everything that outlives a single run (the keystore
//! and the session record) and rebuilds everything that does not (the
//! messaging service and the account manager) on every start.
//!
//! # State machine
//!
//! ```text
//! Stopped ──start()──▶ Running ──stop()──▶ Stopped
//!                        │  ▲
//!                        └──┘ restart()
//! ```
//!
//! `start` creates a fresh messaging service, then reinstates the
//! previously selected account before the node reports `Running`.
//! `stop` wipes every key from the messaging service.
//!
//! Lifecycle transitions take the runtime lock exclusively; account
//! operations hold it shared for their whole duration, so a restart
//! never interleaves with a half-finished account switch.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use keyward_crypto::kdf::Argon2Params;
use keyward_crypto::signing::PublicKey;
use keyward_keystore::keystore::Keystore;
use keyward_keystore::AccountInfo;
use keyward_messaging::registry::KeyRegistry;
use keyward_messaging::service::MessagingService;
use keyward_session::{AccountManager, FileSessionStore, SelectedAccount, SessionError};
use keyward_types::config::NodeConfig;
use keyward_types::{Address, KeyId, KeywardError, Result, Timestamp};

// ---------------------------------------------------------------------------
// NodeState
// ---------------------------------------------------------------------------

/// Lifecycle state of the node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NodeState {
    /// No messaging service; account operations are unavailable.
    Stopped,
    /// Messaging service running, account operations accepted.
    Running,
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Running => write!(f, "running"),
        }
    }
}

/// Snapshot returned by [`Node::status`].
#[derive(Clone, Debug)]
pub struct NodeStatus {
    /// Current lifecycle state.
    pub state: NodeState,
    /// Selected account, if any.
    pub selected: Option<Address>,
    /// Number of keys in the messaging key registry.
    pub injected_keys: usize,
    /// When the current run started. `None` while stopped.
    pub started_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Runtime (internal)
// ---------------------------------------------------------------------------

/// Everything that lives exactly as long as one run of the node.
struct NodeRuntime {
    messaging: Arc<MessagingService>,
    accounts: AccountManager,
    started_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A Keyward node. Shareable across threads behind an `Arc`.
pub struct Node {
    config: NodeConfig,
    keystore: Arc<Keystore>,
    store: Arc<FileSessionStore>,
    runtime: RwLock<Option<NodeRuntime>>,
}

impl Node {
    /// Opens the node's persistent state under `config.data_dir`.
    ///
    /// The node starts in [`NodeState::Stopped`].
    ///
    /// # Errors
    ///
    /// - `KeywardError::ConfigError` if `config` is invalid.
    /// - `KeywardError::StorageError` if the keystore cannot be opened.
    pub fn new(config: NodeConfig) -> Result<Self> {
        config.validate()?;

        let keystore = Arc::new(Keystore::open(
            &config.keystore_dir(),
            Argon2Params::from(config.kdf),
            config.persist_unlocked_cache,
        )?);
        let store = Arc::new(FileSessionStore::new(config.session_path()));

        tracing::debug!(data_dir = %config.data_dir.display(), "node opened");

        Ok(Self {
            config,
            keystore,
            store,
            runtime: RwLock::new(None),
        })
    }

    /// The configuration this node was opened with.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Starts the messaging service and restores the selected account.
    ///
    /// A failed restore is logged and the node runs without a selected
    /// account.
    ///
    /// # Errors
    ///
    /// `KeywardError::NodeError` if the node is already running.
    pub fn start(&self) -> Result<()> {
        let mut runtime = self.write_runtime()?;
        if runtime.is_some() {
            return Err(KeywardError::NodeError {
                reason: format!(
                    "cannot start node in state '{}'; expected '{}'",
                    NodeState::Running,
                    NodeState::Stopped
                ),
            });
        }

        *runtime = Some(self.boot());
        Ok(())
    }

    /// Stops the messaging service, wiping every injected key.
    ///
    /// The session record is left untouched, so the selection comes
    /// back on the next start.
    ///
    /// # Errors
    ///
    /// `KeywardError::NodeError` if the node is not running.
    pub fn stop(&self) -> Result<()> {
        let mut runtime = self.write_runtime()?;
        let current = runtime.take().ok_or_else(|| KeywardError::NodeError {
            reason: format!(
                "cannot stop node in state '{}'; expected '{}'",
                NodeState::Stopped,
                NodeState::Running
            ),
        })?;

        current.messaging.stop()?;
        tracing::info!("node stopped");
        Ok(())
    }

    /// Stops and starts the node as one transition.
    ///
    /// # Errors
    ///
    /// `KeywardError::NodeError` if the node is not running.
    pub fn restart(&self) -> Result<()> {
        let mut runtime = self.write_runtime()?;
        let current = runtime.take().ok_or_else(|| KeywardError::NodeError {
            reason: "cannot restart a node that is not running".into(),
        })?;

        if let Err(e) = current.messaging.stop() {
            // Keep the old run rather than leaving the node half-stopped.
            *runtime = Some(current);
            return Err(e);
        }
        tracing::info!("node restarting");

        *runtime = Some(self.boot());
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> NodeState {
        match self.read_runtime() {
            Ok(runtime) if runtime.is_some() => NodeState::Running,
            _ => NodeState::Stopped,
        }
    }

    /// Point-in-time status snapshot.
    pub fn status(&self) -> Result<NodeStatus> {
        let runtime = self.read_runtime()?;
        Ok(match runtime.as_ref() {
            None => NodeStatus {
                state: NodeState::Stopped,
                selected: None,
                injected_keys: 0,
                started_at: None,
            },
            Some(rt) => NodeStatus {
                state: NodeState::Running,
                selected: rt.accounts.selected_identity().ok().map(|s| s.address),
                injected_keys: rt.messaging.key_count(),
                started_at: Some(rt.started_at.clone()),
            },
        })
    }

    // -----------------------------------------------------------------------
    // Accounts
    // -----------------------------------------------------------------------

    /// Creates a new password-protected account. Does not select it.
    pub fn create_account(&self, password: &str) -> Result<AccountInfo> {
        self.keystore.create_account(password)
    }

    /// Lists all accounts in the keystore.
    pub fn accounts(&self) -> Result<Vec<AccountInfo>> {
        self.keystore.accounts()
    }

    /// Unlocks and selects `address`. See [`AccountManager::select_account`].
    ///
    /// # Errors
    ///
    /// [`SessionError::RegistryUnavailable`] if the node is not running,
    /// otherwise whatever the account manager reports.
    pub fn select_account(
        &self,
        address: &Address,
        password: &str,
    ) -> std::result::Result<KeyId, SessionError> {
        let runtime = self.read_runtime().map_err(not_running)?;
        let rt = runtime.as_ref().ok_or_else(|| not_running(stopped()))?;
        rt.accounts.select_account(address, password)
    }

    /// Logs the selected account out. See [`AccountManager::logout`].
    ///
    /// A stopped node holds no keys; logging out of it only clears the
    /// persisted record through a throwaway manager.
    pub fn logout(&self) -> std::result::Result<(), SessionError> {
        let runtime = self.read_runtime().map_err(not_running)?;
        match runtime.as_ref() {
            Some(rt) => rt.accounts.logout(),
            None => AccountManager::new(
                self.keystore.clone(),
                Arc::new(MessagingService::new()),
                self.store.clone(),
                self.config.switch_failure_policy,
            )
            .logout(),
        }
    }

    /// The selected account.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoAccountSelected`] if nothing is selected or the
    /// node is stopped.
    pub fn selected_account(&self) -> std::result::Result<SelectedAccount, SessionError> {
        let runtime = self
            .read_runtime()
            .map_err(|_| SessionError::NoAccountSelected)?;
        match runtime.as_ref() {
            Some(rt) => rt.accounts.selected_identity(),
            None => Err(SessionError::NoAccountSelected),
        }
    }

    /// The running messaging service, or `None` while stopped.
    pub fn messaging(&self) -> Option<Arc<MessagingService>> {
        self.read_runtime()
            .ok()
            .and_then(|rt| rt.as_ref().map(|r| Arc::clone(&r.messaging)))
    }

    /// Returns `true` if a key with this public half is injected.
    pub fn has_key_pair(&self, public_key: &PublicKey) -> bool {
        self.messaging()
            .map(|m| m.has_key_pair(public_key))
            .unwrap_or(false)
    }

    /// Returns `true` if `key_id` is injected.
    pub fn has_key_id(&self, key_id: &KeyId) -> bool {
        self.messaging()
            .map(|m| m.has_key_id(key_id))
            .unwrap_or(false)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Builds a fresh run: new registry first, then restore.
    fn boot(&self) -> NodeRuntime {
        let messaging = Arc::new(MessagingService::new());
        messaging.start();

        let accounts = AccountManager::new(
            self.keystore.clone(),
            messaging.clone(),
            self.store.clone(),
            self.config.switch_failure_policy,
        );

        match accounts.restore_on_startup() {
            Ok(Some(address)) => tracing::info!(%address, "node started with restored account"),
            Ok(None) => tracing::info!("node started"),
            Err(e) => tracing::warn!(%e, "node started without a selected account"),
        }

        NodeRuntime {
            messaging,
            accounts,
            started_at: Timestamp::now(),
        }
    }

    fn read_runtime(&self) -> Result<RwLockReadGuard<'_, Option<NodeRuntime>>> {
        self.runtime.read().map_err(|e| KeywardError::NodeError {
            reason: format!("node runtime lock poisoned: {e}"),
        })
    }

    fn write_runtime(&self) -> Result<RwLockWriteGuard<'_, Option<NodeRuntime>>> {
        self.runtime.write().map_err(|e| KeywardError::NodeError {
            reason: format!("node runtime lock poisoned: {e}"),
        })
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        if let Ok(mut runtime) = self.runtime.write() {
            if let Some(rt) = runtime.take() {
                let _ = rt.messaging.stop();
            }
        }
    }
}

fn stopped() -> KeywardError {
    KeywardError::NodeError {
        reason: "node is not running".into(),
    }
}

fn not_running(err: KeywardError) -> SessionError {
    SessionError::RegistryUnavailable {
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_display() {
        assert_eq!(NodeState::Stopped.to_string(), "stopped");
        assert_eq!(NodeState::Running.to_string(), "running");
    }

    #[test]
    fn invalid_config_rejected() {
        let cfg = NodeConfig {
            data_dir: std::path::PathBuf::new(),
            ..NodeConfig::default()
        };
        assert!(matches!(
            Node::new(cfg),
            Err(KeywardError::ConfigError { .. })
        ));
    }
}
