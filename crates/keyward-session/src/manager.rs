//! The account session manager.
//!
//! Holds the single selected-identity slot of a node and keeps three
//! collaborators in step with it:
//!
//! - the messaging key registry contains the selected account's key and
//!   no other key injected by this manager,
//! - the session store records the selected address,
//! - the credential store's unlocked cache holds the selected account's
//!   key so it can be reinstated without a password.
//!
//! # State machine
//!
//! ```text
//!            select_account                select_account
//!   Empty ─────────────────────▶ Selected ◀──────────────┐
//!     ▲  restore_on_startup        │   └─────────────────┘
//!     └──────────── logout ────────┘
//! ```
//!
//! # Concurrency
//!
//! Every transition runs under one mutex around the slot. The slot is
//! assigned only at commit points, so [`AccountManager::selected_identity`]
//! never observes a half-finished switch.

use std::sync::{Arc, Mutex, MutexGuard};

use keyward_crypto::signing::{Keypair, PublicKey};
use keyward_keystore::CredentialStore;
use keyward_messaging::registry::KeyRegistry;
use keyward_types::config::SwitchFailurePolicy;
use keyward_types::{Address, KeyId};

use crate::error::SessionError;
use crate::store::SessionStore;

/// Convenience result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

/// The currently selected identity.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SelectedAccount {
    /// Account address.
    pub address: Address,
    /// Public key, for registry membership checks.
    pub public_key: PublicKey,
    /// Registry handle of the injected key.
    pub key_id: KeyId,
}

impl SelectedAccount {
    fn new(keypair: &Keypair, key_id: KeyId) -> Self {
        Self {
            address: keypair.address(),
            public_key: keypair.public_key(),
            key_id,
        }
    }
}

#[derive(Debug)]
enum SessionSlot {
    Empty,
    Selected(SelectedAccount),
}

impl SessionSlot {
    fn selected(&self) -> Option<SelectedAccount> {
        match self {
            Self::Empty => None,
            Self::Selected(account) => Some(*account),
        }
    }
}

// ---------------------------------------------------------------------------
// AccountManager
// ---------------------------------------------------------------------------

/// Owner of the selected-identity slot.
pub struct AccountManager {
    credentials: Arc<dyn CredentialStore>,
    registry: Arc<dyn KeyRegistry>,
    store: Arc<dyn SessionStore>,
    policy: SwitchFailurePolicy,
    slot: Mutex<SessionSlot>,
}

impl AccountManager {
    /// Creates a manager with an empty slot.
    ///
    /// The persisted selection is not consulted until
    /// [`restore_on_startup`](Self::restore_on_startup) is called.
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        registry: Arc<dyn KeyRegistry>,
        store: Arc<dyn SessionStore>,
        policy: SwitchFailurePolicy,
    ) -> Self {
        Self {
            credentials,
            registry,
            store,
            policy,
            slot: Mutex::new(SessionSlot::Empty),
        }
    }

    /// The configured switch failure policy.
    pub fn policy(&self) -> SwitchFailurePolicy {
        self.policy
    }

    /// Unlocks `address` with `password` and makes it the selected
    /// account.
    ///
    /// On success the previously injected key (if any) has been removed
    /// from the registry, the new key injected, and the selection
    /// recorded. Re-selecting the current account replaces its registry
    /// entry.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidCredentials`]: nothing changed.
    /// - [`SessionError::RegistryUnavailable`]: eviction failed (nothing
    ///   changed) or injection failed (previous selection handled per
    ///   [`SwitchFailurePolicy`]).
    /// - [`SessionError::StoreUnavailable`]: the record could not be
    ///   written; the new key was removed and the previous selection
    ///   handled per [`SwitchFailurePolicy`]. If the new key cannot be
    ///   removed either, it stays selected without a record.
    pub fn select_account(&self, address: &Address, password: &str) -> Result<KeyId> {
        let mut slot = self.lock_slot();

        let keypair = self.credentials.decrypt(address, password).map_err(|e| {
            tracing::debug!(%address, %e, "account unlock failed");
            SessionError::credentials(e)
        })?;

        let previous = slot.selected();
        if let Some(prev) = &previous {
            self.registry.delete_key_pair(&prev.key_id).map_err(|e| {
                tracing::warn!(address = %prev.address, key_id = %prev.key_id, %e, "failed to evict selected account");
                SessionError::registry(e)
            })?;
        }

        let key_id = match self.registry.add_key_pair(&keypair) {
            Ok(key_id) => key_id,
            Err(e) => {
                tracing::warn!(%address, %e, "failed to inject account key");
                *slot = self.recover_switch(previous);
                return Err(SessionError::registry(e));
            }
        };

        if let Err(e) = self.store.write(address) {
            tracing::warn!(%address, %e, "failed to record selected account");
            if let Err(delete_err) = self.registry.delete_key_pair(&key_id) {
                // The new key is still live: it stays in the slot so the
                // next logout or switch evicts it.
                tracing::warn!(%key_id, %delete_err, "failed to remove key of unrecorded selection, keeping it selected");
                self.update_unlocked_cache(address, &keypair, previous);
                if let Err(e) = self.store.clear() {
                    tracing::warn!(%e, "failed to clear outdated session record");
                }
                *slot = SessionSlot::Selected(SelectedAccount::new(&keypair, key_id));
                return Err(SessionError::store(e));
            }
            *slot = self.recover_switch(previous);
            return Err(SessionError::store(e));
        }

        self.update_unlocked_cache(address, &keypair, previous);

        *slot = SessionSlot::Selected(SelectedAccount::new(&keypair, key_id));
        tracing::info!(%address, %key_id, "account selected");
        Ok(key_id)
    }

    /// Clears the selection: evicts the key, invalidates the record and
    /// forgets the cached key.
    ///
    /// Calling it with nothing selected succeeds; a record left behind by
    /// an earlier failed logout is cleared again.
    ///
    /// # Errors
    ///
    /// - [`SessionError::RegistryUnavailable`]: eviction failed, the
    ///   account stays selected.
    /// - [`SessionError::StoreUnavailable`]: the key is gone and the slot
    ///   is empty, but the record could not be cleared.
    pub fn logout(&self) -> Result<()> {
        let mut slot = self.lock_slot();

        let Some(current) = slot.selected() else {
            return self.clear_leftover_record();
        };

        self.registry.delete_key_pair(&current.key_id).map_err(|e| {
            tracing::warn!(address = %current.address, key_id = %current.key_id, %e, "failed to evict account on logout");
            SessionError::registry(e)
        })?;
        *slot = SessionSlot::Empty;

        if let Err(e) = self.credentials.forget_unlocked(&current.address) {
            tracing::warn!(address = %current.address, %e, "failed to forget unlocked key");
        }

        self.store.clear().map_err(|e| {
            tracing::warn!(address = %current.address, %e, "failed to clear session record");
            SessionError::store(e)
        })?;

        tracing::info!(address = %current.address, "account logged out");
        Ok(())
    }

    /// Returns the selected account.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoAccountSelected`] when the slot is empty.
    pub fn selected_identity(&self) -> Result<SelectedAccount> {
        self.lock_slot()
            .selected()
            .ok_or(SessionError::NoAccountSelected)
    }

    /// Reinstates the persisted selection without a password.
    ///
    /// Meant to run once, right after the registry was created. Returns
    /// the restored address, or `None` if no selection was recorded. If
    /// an account is already selected the call changes nothing.
    ///
    /// # Errors
    ///
    /// [`SessionError::RestoreFailed`]. The slot stays empty. If the key
    /// could not be reloaded, the stale record and cache entry are
    /// cleared; if only the registry refused it, the record is kept.
    pub fn restore_on_startup(&self) -> Result<Option<Address>> {
        let mut slot = self.lock_slot();

        if let Some(current) = slot.selected() {
            tracing::debug!(address = %current.address, "restore skipped, account already selected");
            return Ok(Some(current.address));
        }

        let address = match self.store.read() {
            Ok(Some(address)) => address,
            Ok(None) => return Ok(None),
            Err(e) => {
                tracing::warn!(%e, "unreadable session record, discarding it");
                if let Err(e) = self.store.clear() {
                    tracing::warn!(%e, "failed to clear session record");
                }
                return Err(SessionError::restore(e));
            }
        };

        let keypair = match self.credentials.decrypt_cached(&address) {
            Ok(keypair) if keypair.address() == address => keypair,
            Ok(_) => {
                tracing::warn!(%address, "cached key does not match recorded account");
                self.abandon(&address);
                return Err(SessionError::RestoreFailed {
                    reason: format!("cached key does not belong to {address}"),
                });
            }
            Err(e) => {
                tracing::warn!(%address, %e, "failed to reload selected account");
                self.abandon(&address);
                return Err(SessionError::restore(e));
            }
        };

        let key_id = self.registry.add_key_pair(&keypair).map_err(|e| {
            tracing::warn!(%address, %e, "failed to re-inject selected account");
            SessionError::restore(e)
        })?;

        *slot = SessionSlot::Selected(SelectedAccount::new(&keypair, key_id));
        tracing::info!(%address, %key_id, "selected account restored");
        Ok(Some(address))
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Transitions complete before the slot is assigned, so a poisoned
    /// slot still holds a committed state.
    fn lock_slot(&self) -> MutexGuard<'_, SessionSlot> {
        self.slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Decides the slot after a switch failed with `previous` already
    /// evicted from the registry.
    fn recover_switch(&self, previous: Option<SelectedAccount>) -> SessionSlot {
        let Some(prev) = previous else {
            return SessionSlot::Empty;
        };

        if self.policy == SwitchFailurePolicy::Rollback {
            match self.reinject(&prev.address) {
                Ok(restored) => {
                    tracing::info!(address = %restored.address, key_id = %restored.key_id, "switch rolled back");
                    return SessionSlot::Selected(restored);
                }
                Err(e) => {
                    tracing::warn!(address = %prev.address, %e, "rollback failed, leaving no account selected");
                }
            }
        }

        self.abandon(&prev.address);
        SessionSlot::Empty
    }

    /// Caches the key of the account entering the slot and forgets the
    /// one leaving it.
    fn update_unlocked_cache(
        &self,
        address: &Address,
        keypair: &Keypair,
        previous: Option<SelectedAccount>,
    ) {
        if let Err(e) = self.credentials.retain_unlocked(address, keypair) {
            tracing::warn!(%address, %e, "selected account will not survive a restart");
        }
        if let Some(prev) = previous.filter(|p| p.address != *address) {
            if let Err(e) = self.credentials.forget_unlocked(&prev.address) {
                tracing::warn!(address = %prev.address, %e, "failed to forget previous unlocked key");
            }
        }
    }

    fn reinject(&self, address: &Address) -> keyward_types::Result<SelectedAccount> {
        let keypair = self.credentials.decrypt_cached(address)?;
        let key_id = self.registry.add_key_pair(&keypair)?;
        Ok(SelectedAccount::new(&keypair, key_id))
    }

    /// Drops every trace of `address` outside the registry. Failures are
    /// logged: the caller is already reporting an error.
    fn abandon(&self, address: &Address) {
        if let Err(e) = self.store.clear() {
            tracing::warn!(%address, %e, "failed to clear session record");
        }
        if let Err(e) = self.credentials.forget_unlocked(address) {
            tracing::warn!(%address, %e, "failed to forget unlocked key");
        }
    }

    fn clear_leftover_record(&self) -> Result<()> {
        let leftover = match self.store.read() {
            Ok(None) => return Ok(()),
            Ok(Some(address)) => Some(address),
            Err(_) => None,
        };

        self.store.clear().map_err(SessionError::store)?;
        if let Some(address) = leftover {
            if let Err(e) = self.credentials.forget_unlocked(&address) {
                tracing::warn!(%address, %e, "failed to forget unlocked key");
            }
            tracing::info!(%address, "stale session record cleared");
        }
        Ok(())
    }
}
