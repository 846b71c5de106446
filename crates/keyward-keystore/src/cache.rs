//! Unlocked-key cache.
//!
//! Holds the seed of the account that is currently selected, so the node
//! can reinstate the selection after a restart without asking for the
//! password again, and roll back to it when a switch fails.
//!
//! The cache is always kept in memory. When persistence is enabled it is
//! mirrored to `unlocked.dat`, sealed under the node-local secret:
//!
//! ```text
//! [nonce 24B][XChaCha20-Poly1305(bincode(Vec<CacheRecord>))]
//! ```
//!
//! AAD: `b"keyward-unlocked-v1"`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use keyward_crypto::aead::{open, seal};
use keyward_crypto::signing::Keypair;
use keyward_types::{Address, KeywardError, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use crate::atomic::{remove_if_exists, write_atomic};

/// AAD for the sealed cache file.
const CACHE_AAD: &[u8] = b"keyward-unlocked-v1";

/// Length of the node-local secret in bytes.
const SECRET_LEN: usize = 32;

#[derive(Serialize, Deserialize, Zeroize)]
struct CacheRecord {
    address: [u8; 32],
    seed: [u8; 32],
}

struct Backing {
    path: PathBuf,
    secret: Zeroizing<[u8; SECRET_LEN]>,
}

// ---------------------------------------------------------------------------
// UnlockedCache
// ---------------------------------------------------------------------------

/// Address → private seed map, optionally mirrored to disk.
pub struct UnlockedCache {
    entries: Mutex<HashMap<Address, Zeroizing<[u8; 32]>>>,
    backing: Option<Backing>,
}

impl UnlockedCache {
    /// Creates an empty cache that lives only as long as this value.
    pub fn in_memory() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            backing: None,
        }
    }

    /// Opens a cache mirrored to `path`, sealed under the secret stored
    /// at `secret_path` (created on first use).
    ///
    /// A cache file that cannot be opened (wrong secret, corruption) is
    /// discarded with a warning: the affected selection simply cannot be
    /// restored without a password.
    pub fn persistent(path: &Path, secret_path: &Path) -> Result<Self> {
        let secret = load_or_create_secret(secret_path)?;

        let entries = match load_entries(path, &secret) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = %path.display(), %e, "discarding unreadable unlocked cache");
                remove_if_exists(path)?;
                HashMap::new()
            }
        };

        if !entries.is_empty() {
            tracing::debug!(entries = entries.len(), "unlocked cache loaded");
        }

        Ok(Self {
            entries: Mutex::new(entries),
            backing: Some(Backing {
                path: path.to_path_buf(),
                secret,
            }),
        })
    }

    /// Returns `true` if the cache is mirrored to disk.
    pub fn is_persistent(&self) -> bool {
        self.backing.is_some()
    }

    /// Rebuilds the keypair cached for `address`.
    ///
    /// # Errors
    ///
    /// [`KeywardError::NotFound`] if nothing is cached for `address`.
    pub fn get(&self, address: &Address) -> Result<Keypair> {
        let entries = self.lock_entries();
        let seed = entries.get(address).ok_or_else(|| KeywardError::NotFound {
            reason: format!("no unlocked key cached for {address}"),
        })?;
        Ok(Keypair::from_seed(seed))
    }

    /// Returns `true` if `address` has a cached key.
    pub fn contains(&self, address: &Address) -> bool {
        self.lock_entries().contains_key(address)
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    /// Returns `true` if no key is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Caches `keypair` under `address`.
    ///
    /// If mirroring to disk fails the in-memory map is left as it was.
    pub fn insert(&self, address: &Address, keypair: &Keypair) -> Result<()> {
        let mut entries = self.lock_entries();
        let previous = entries.insert(*address, keypair.seed_bytes());

        if let Err(e) = self.flush(&entries) {
            match previous {
                Some(seed) => {
                    entries.insert(*address, seed);
                }
                None => {
                    entries.remove(address);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    /// Drops the cached key of `address`, if any.
    pub fn remove(&self, address: &Address) -> Result<()> {
        let mut entries = self.lock_entries();
        let Some(seed) = entries.remove(address) else {
            return Ok(());
        };

        if let Err(e) = self.flush(&entries) {
            entries.insert(*address, seed);
            return Err(e);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Every mutation runs to completion under the lock, so a poisoned
    /// map is still consistent.
    fn lock_entries(&self) -> MutexGuard<'_, HashMap<Address, Zeroizing<[u8; 32]>>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn flush(&self, entries: &HashMap<Address, Zeroizing<[u8; 32]>>) -> Result<()> {
        let Some(backing) = &self.backing else {
            return Ok(());
        };

        if entries.is_empty() {
            return remove_if_exists(&backing.path);
        }

        let records: Zeroizing<Vec<CacheRecord>> = Zeroizing::new(
            entries
                .iter()
                .map(|(address, seed)| CacheRecord {
                    address: *address.as_bytes(),
                    seed: **seed,
                })
                .collect(),
        );

        let plaintext = Zeroizing::new(bincode::serialize(&*records).map_err(|e| {
            KeywardError::StorageError {
                reason: format!("failed to serialize unlocked cache: {e}"),
            }
        })?);

        let sealed = seal(&backing.secret, &plaintext, CACHE_AAD)?;
        write_atomic(&backing.path, &sealed, true)
    }
}

fn load_entries(
    path: &Path,
    secret: &[u8; SECRET_LEN],
) -> Result<HashMap<Address, Zeroizing<[u8; 32]>>> {
    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => {
            return Err(KeywardError::StorageError {
                reason: format!("failed to read unlocked cache: {e}"),
            })
        }
    };

    if raw.is_empty() {
        return Ok(HashMap::new());
    }

    let plaintext = Zeroizing::new(open(secret, &raw, CACHE_AAD)?);
    let records: Zeroizing<Vec<CacheRecord>> =
        Zeroizing::new(bincode::deserialize(&plaintext).map_err(|e| {
            KeywardError::StorageError {
                reason: format!("failed to deserialize unlocked cache: {e}"),
            }
        })?);

    Ok(records
        .iter()
        .map(|r| (Address::new(r.address), Zeroizing::new(r.seed)))
        .collect())
}

// ---------------------------------------------------------------------------
// Node-local secret
// ---------------------------------------------------------------------------

/// Loads the 32-byte node secret from `path`, generating it on first use.
pub fn load_or_create_secret(path: &Path) -> Result<Zeroizing<[u8; SECRET_LEN]>> {
    match std::fs::read(path) {
        Ok(bytes) => {
            let bytes = Zeroizing::new(bytes);
            if bytes.len() != SECRET_LEN {
                return Err(KeywardError::StorageError {
                    reason: format!(
                        "node secret {} must be {SECRET_LEN} bytes, got {}",
                        path.display(),
                        bytes.len()
                    ),
                });
            }
            let mut secret = Zeroizing::new([0u8; SECRET_LEN]);
            secret.copy_from_slice(&bytes);
            Ok(secret)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let mut secret = Zeroizing::new([0u8; SECRET_LEN]);
            OsRng
                .try_fill_bytes(secret.as_mut_slice())
                .map_err(|e| KeywardError::CryptoError {
                    reason: format!("failed to generate node secret: {e}"),
                })?;
            write_atomic(path, secret.as_slice(), true)?;
            tracing::info!(path = %path.display(), "node secret created");
            Ok(secret)
        }
        Err(e) => Err(KeywardError::StorageError {
            reason: format!("failed to read node secret {}: {e}", path.display()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_insert_get_remove() -> std::result::Result<(), KeywardError> {
        let cache = UnlockedCache::in_memory();
        let kp = Keypair::generate();
        let addr = kp.address();

        assert!(matches!(cache.get(&addr), Err(KeywardError::NotFound { .. })));

        cache.insert(&addr, &kp)?;
        assert_eq!(cache.get(&addr)?.public_key(), kp.public_key());
        assert_eq!(cache.len(), 1);

        cache.remove(&addr)?;
        assert!(cache.is_empty());
        Ok(())
    }

    #[test]
    fn remove_absent_is_ok() {
        let cache = UnlockedCache::in_memory();
        assert!(cache.remove(&Address::new([1u8; 32])).is_ok());
    }

    #[test]
    fn persistent_cache_survives_reopen() -> std::result::Result<(), KeywardError> {
        let dir = std::env::temp_dir().join(format!("keyward_cache_{}", std::process::id()));
        let path = dir.join("unlocked.dat");
        let secret = dir.join("node.secret");

        let kp = Keypair::generate();
        {
            let cache = UnlockedCache::persistent(&path, &secret)?;
            cache.insert(&kp.address(), &kp)?;
        }

        let reopened = UnlockedCache::persistent(&path, &secret)?;
        assert_eq!(reopened.get(&kp.address())?.public_key(), kp.public_key());

        reopened.remove(&kp.address())?;
        assert!(!path.exists());

        let _ = std::fs::remove_dir_all(&dir);
        Ok(())
    }

    #[test]
    fn cache_sealed_under_other_secret_is_discarded() -> std::result::Result<(), KeywardError> {
        let dir = std::env::temp_dir().join(format!("keyward_cache_rekey_{}", std::process::id()));
        let path = dir.join("unlocked.dat");

        let kp = Keypair::generate();
        UnlockedCache::persistent(&path, &dir.join("a.secret"))?.insert(&kp.address(), &kp)?;

        let other = UnlockedCache::persistent(&path, &dir.join("b.secret"))?;
        assert!(other.is_empty());
        assert!(!path.exists());

        let _ = std::fs::remove_dir_all(&dir);
        Ok(())
    }

    #[test]
    fn secret_is_stable_across_loads() -> std::result::Result<(), KeywardError> {
        let path = std::env::temp_dir().join(format!("keyward_secret_{}", std::process::id()));
        let a = load_or_create_secret(&path)?;
        let b = load_or_create_secret(&path)?;
        assert_eq!(*a, *b);
        let _ = std::fs::remove_file(&path);
        Ok(())
    }
}
