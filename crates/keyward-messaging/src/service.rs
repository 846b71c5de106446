//! Messaging service lifecycle.
//!
//! The service owns a [`KeyRing`]. While running it accepts key
//! injections and signs payloads; [`MessagingService::stop`] wipes every
//! key, and a stopped service rejects registry mutations.

use std::sync::atomic::{AtomicBool, Ordering};

use keyward_crypto::signing::{PublicKey, Signature};
use keyward_types::{KeyId, KeywardError, Result};

use crate::registry::{KeyRegistry, KeyRing};

/// The node's message-routing subsystem, reduced to its key handling.
pub struct MessagingService {
    ring: KeyRing,
    running: AtomicBool,
}

impl MessagingService {
    /// Creates a stopped service with an empty key ring.
    pub fn new() -> Self {
        Self {
            ring: KeyRing::new(),
            running: AtomicBool::new(false),
        }
    }

    /// Starts accepting keys. Starting a running service is a no-op.
    pub fn start(&self) {
        if !self.running.swap(true, Ordering::SeqCst) {
            tracing::debug!("messaging service started");
        }
    }

    /// Stops the service and wipes every registered key.
    pub fn stop(&self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        let wiped = self.ring.wipe()?;
        tracing::debug!(wiped, "messaging service stopped");
        Ok(())
    }

    /// Returns `true` between [`start`](Self::start) and [`stop`](Self::stop).
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Number of keys currently registered.
    pub fn key_count(&self) -> usize {
        self.ring.len()
    }

    /// Signs `data` with the key registered under `key_id`.
    pub fn sign_with(&self, key_id: &KeyId, data: &[u8]) -> Result<Signature> {
        self.ensure_running()?;
        self.ring.sign_with(key_id, data)
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(KeywardError::RegistryError {
                reason: "messaging service is not running".into(),
            })
        }
    }
}

impl Default for MessagingService {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyRegistry for MessagingService {
    fn add_key_pair(&self, keypair: &keyward_crypto::signing::Keypair) -> Result<KeyId> {
        self.ensure_running()?;
        self.ring.add_key_pair(keypair)
    }

    fn delete_key_pair(&self, key_id: &KeyId) -> Result<()> {
        self.ensure_running()?;
        self.ring.delete_key_pair(key_id)
    }

    fn has_key_pair(&self, public_key: &PublicKey) -> bool {
        self.ring.has_key_pair(public_key)
    }

    fn has_key_id(&self, key_id: &KeyId) -> bool {
        self.ring.has_key_id(key_id)
    }
}
