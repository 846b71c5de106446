//! File-backed account keystore.
//!
//! Layout under the keystore directory:
//!
//! ```text
//! keystore/
//!   <address>.json   one sealed key file per account
//!   unlocked.dat     sealed unlocked-key cache (if persisted)
//!   node.secret      32-byte node-local secret sealing unlocked.dat
//! ```

use std::path::{Path, PathBuf};

use keyward_crypto::kdf::Argon2Params;
use keyward_crypto::signing::Keypair;
use keyward_types::{Address, KeywardError, Result};

use crate::atomic::ensure_dir;
use crate::cache::UnlockedCache;
use crate::key_file::KeyFile;
use crate::{AccountInfo, CredentialStore};

const UNLOCKED_FILE: &str = "unlocked.dat";
const SECRET_FILE: &str = "node.secret";

/// Password-protected account storage plus the unlocked-key cache.
pub struct Keystore {
    dir: PathBuf,
    params: Argon2Params,
    cache: UnlockedCache,
}

impl Keystore {
    /// Opens (creating if needed) the keystore at `dir`.
    ///
    /// `params` applies to accounts created from now on; existing key
    /// files carry their own parameters. With `persist_cache` the
    /// unlocked cache is mirrored to disk and survives process restarts.
    pub fn open(dir: &Path, params: Argon2Params, persist_cache: bool) -> Result<Self> {
        ensure_dir(dir)?;

        let cache = if persist_cache {
            UnlockedCache::persistent(&dir.join(UNLOCKED_FILE), &dir.join(SECRET_FILE))?
        } else {
            UnlockedCache::in_memory()
        };

        tracing::debug!(dir = %dir.display(), persist_cache, "keystore opened");

        Ok(Self {
            dir: dir.to_path_buf(),
            params,
            cache,
        })
    }

    /// Directory holding the key files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates a new account protected by `password`.
    ///
    /// A fresh random Ed25519 keypair is generated, its seed sealed and
    /// written to `<address>.json`. The new account is not selected.
    pub fn create_account(&self, password: &str) -> Result<AccountInfo> {
        if password.is_empty() {
            return Err(KeywardError::CryptoError {
                reason: "password must not be empty".into(),
            });
        }

        let keypair = Keypair::generate();
        let file = KeyFile::seal(&keypair, password, self.params)?;
        file.save(&self.key_path(file.address()))?;

        tracing::info!(address = %file.address(), "account created");

        Ok(AccountInfo {
            address: *file.address(),
            public_key: *file.public_key(),
        })
    }

    /// Lists every account in the keystore, sorted by address.
    ///
    /// Unreadable key files are skipped with a warning.
    pub fn accounts(&self) -> Result<Vec<AccountInfo>> {
        let read_dir = std::fs::read_dir(&self.dir).map_err(|e| KeywardError::StorageError {
            reason: format!("failed to list keystore {}: {e}", self.dir.display()),
        })?;

        let mut accounts = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| KeywardError::StorageError {
                reason: format!("failed to read keystore entry: {e}"),
            })?;
            let path = entry.path();

            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let is_account_file = path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.parse::<Address>().is_ok())
                .unwrap_or(false);
            if !is_account_file {
                continue;
            }

            match KeyFile::load(&path) {
                Ok(file) => accounts.push(AccountInfo {
                    address: *file.address(),
                    public_key: *file.public_key(),
                }),
                Err(e) => {
                    tracing::warn!(path = %path.display(), %e, "skipping unreadable key file");
                }
            }
        }

        accounts.sort_by_key(|a| *a.address.as_bytes());
        Ok(accounts)
    }

    /// Returns `true` if a key file exists for `address`.
    pub fn has_account(&self, address: &Address) -> bool {
        self.key_path(address).exists()
    }

    /// The unlocked-key cache.
    pub fn cache(&self) -> &UnlockedCache {
        &self.cache
    }

    fn key_path(&self, address: &Address) -> PathBuf {
        self.dir.join(format!("{address}.json"))
    }
}

impl CredentialStore for Keystore {
    fn decrypt(&self, address: &Address, password: &str) -> Result<Keypair> {
        let file = KeyFile::load(&self.key_path(address)).map_err(|e| match e {
            KeywardError::NotFound { .. } => KeywardError::NotFound {
                reason: format!("no account for address {address}"),
            },
            other => other,
        })?;

        if file.address() != address {
            return Err(KeywardError::CryptoError {
                reason: format!("key file for {address} belongs to {}", file.address()),
            });
        }

        file.unseal(password)
    }

    fn decrypt_cached(&self, address: &Address) -> Result<Keypair> {
        self.cache.get(address)
    }

    fn retain_unlocked(&self, address: &Address, keypair: &Keypair) -> Result<()> {
        if keypair.address() != *address {
            return Err(KeywardError::CryptoError {
                reason: format!("keypair does not belong to {address}"),
            });
        }
        self.cache.insert(address, keypair)
    }

    fn forget_unlocked(&self, address: &Address) -> Result<()> {
        self.cache.remove(address)
    }
}
