//! Key registry: key id → injected private key.
//!
//! Entries are added and removed only through explicit calls. Callers
//! get an opaque random [`KeyId`] back and may ask whether a public key
//! or key id is present, but can never read key material out.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use keyward_crypto::signing::{Keypair, PublicKey, Signature};
use keyward_types::{KeyId, KeywardError, Result};
use rand::rngs::OsRng;
use rand::RngCore;

// ---------------------------------------------------------------------------
// KeyRegistry trait
// ---------------------------------------------------------------------------

/// Registry of private keys the messaging layer may use.
pub trait KeyRegistry: Send + Sync {
    /// Stores an independent copy of `keypair` and returns its id.
    fn add_key_pair(&self, keypair: &Keypair) -> Result<KeyId>;

    /// Removes the entry for `key_id`. Removing an absent id is a no-op.
    fn delete_key_pair(&self, key_id: &KeyId) -> Result<()>;

    /// Returns `true` if a key with this public half is registered.
    fn has_key_pair(&self, public_key: &PublicKey) -> bool;

    /// Returns `true` if `key_id` is registered.
    fn has_key_id(&self, key_id: &KeyId) -> bool;
}

// ---------------------------------------------------------------------------
// KeyRing
// ---------------------------------------------------------------------------

/// In-memory [`KeyRegistry`]. Keys are zeroized when removed or wiped.
#[derive(Default)]
pub struct KeyRing {
    keys: Mutex<HashMap<KeyId, Keypair>>,
}

impl KeyRing {
    /// Creates an empty key ring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered keys. Returns 0 if the lock is poisoned.
    pub fn len(&self) -> usize {
        self.lock_keys().map(|k| k.len()).unwrap_or(0)
    }

    /// Returns `true` if no key is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every key.
    pub fn wipe(&self) -> Result<usize> {
        let mut keys = self.lock_keys()?;
        let count = keys.len();
        keys.clear();
        Ok(count)
    }

    /// Signs `data` with the key registered under `key_id`.
    pub fn sign_with(&self, key_id: &KeyId, data: &[u8]) -> Result<Signature> {
        let keys = self.lock_keys()?;
        let keypair = keys.get(key_id).ok_or_else(|| KeywardError::NotFound {
            reason: format!("no key registered under id {key_id}"),
        })?;
        Ok(keypair.sign(data))
    }

    fn lock_keys(&self) -> Result<MutexGuard<'_, HashMap<KeyId, Keypair>>> {
        self.keys.lock().map_err(|e| KeywardError::RegistryError {
            reason: format!("key ring lock poisoned: {e}"),
        })
    }
}

impl KeyRegistry for KeyRing {
    fn add_key_pair(&self, keypair: &Keypair) -> Result<KeyId> {
        let mut keys = self.lock_keys()?;

        let key_id = loop {
            let mut bytes = [0u8; KeyId::LEN];
            OsRng
                .try_fill_bytes(&mut bytes)
                .map_err(|e| KeywardError::RegistryError {
                    reason: format!("failed to generate key id: {e}"),
                })?;
            let candidate = KeyId::new(bytes);
            if !keys.contains_key(&candidate) {
                break candidate;
            }
        };

        keys.insert(key_id, keypair.duplicate());
        Ok(key_id)
    }

    fn delete_key_pair(&self, key_id: &KeyId) -> Result<()> {
        self.lock_keys()?.remove(key_id);
        Ok(())
    }

    fn has_key_pair(&self, public_key: &PublicKey) -> bool {
        self.lock_keys()
            .map(|keys| keys.values().any(|kp| kp.public_key() == *public_key))
            .unwrap_or(false)
    }

    fn has_key_id(&self, key_id: &KeyId) -> bool {
        self.lock_keys()
            .map(|keys| keys.contains_key(key_id))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_query() -> std::result::Result<(), KeywardError> {
        let ring = KeyRing::new();
        let kp = Keypair::generate();

        let id = ring.add_key_pair(&kp)?;
        assert!(ring.has_key_id(&id));
        assert!(ring.has_key_pair(&kp.public_key()));
        assert!(!ring.has_key_pair(&Keypair::generate().public_key()));
        Ok(())
    }

    #[test]
    fn same_key_twice_gets_distinct_ids() -> std::result::Result<(), KeywardError> {
        let ring = KeyRing::new();
        let kp = Keypair::generate();

        let a = ring.add_key_pair(&kp)?;
        let b = ring.add_key_pair(&kp)?;
        assert_ne!(a, b);
        assert_eq!(ring.len(), 2);
        Ok(())
    }

    #[test]
    fn delete_is_idempotent() -> std::result::Result<(), KeywardError> {
        let ring = KeyRing::new();
        let kp = Keypair::generate();
        let id = ring.add_key_pair(&kp)?;

        ring.delete_key_pair(&id)?;
        ring.delete_key_pair(&id)?;
        assert!(!ring.has_key_id(&id));
        assert!(!ring.has_key_pair(&kp.public_key()));
        Ok(())
    }

    #[test]
    fn sign_with_registered_key() -> std::result::Result<(), KeywardError> {
        let ring = KeyRing::new();
        let kp = Keypair::generate();
        let id = ring.add_key_pair(&kp)?;

        let sig = ring.sign_with(&id, b"envelope")?;
        keyward_crypto::signing::verify(&kp.public_key(), b"envelope", &sig)?;

        assert!(matches!(
            ring.sign_with(&KeyId::new([0u8; 32]), b"envelope"),
            Err(KeywardError::NotFound { .. })
        ));
        Ok(())
    }

    #[test]
    fn wipe_removes_everything() -> std::result::Result<(), KeywardError> {
        let ring = KeyRing::new();
        ring.add_key_pair(&Keypair::generate())?;
        ring.add_key_pair(&Keypair::generate())?;
        assert_eq!(ring.wipe()?, 2);
        assert!(ring.is_empty());
        Ok(())
    }
}
