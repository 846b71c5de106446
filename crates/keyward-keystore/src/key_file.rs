//! Account key file format.
//!
//! # File format (v1)
//!
//! ```json
//! {
//!   "version": 1,
//!   "address": "<hex 32 bytes>",
//!   "public_key": "<hex 32 bytes>",
//!   "encrypted_seed": "<hex 48 bytes>",
//!   "salt": "<hex 32 bytes>",
//!   "nonce": "<hex 24 bytes>",
//!   "kdf": { "m_cost": 65536, "t_cost": 3, "p_cost": 1 }
//! }
//! ```
//!
//! The 32-byte Ed25519 seed is sealed with XChaCha20-Poly1305 under an
//! Argon2id key derived from the account password. No plaintext secret
//! material is written to disk.

use std::path::Path;

use keyward_crypto::aead::{decrypt_xchacha20, encrypt_xchacha20, generate_aead_nonce, AeadNonce};
use keyward_crypto::kdf::{argon2id_derive_key, Argon2Params};
use keyward_crypto::signing::{Keypair, PublicKey};
use keyward_types::{Address, KeywardError, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::atomic::write_atomic;

/// Current key file version.
pub const KEY_FILE_VERSION: u32 = 1;

/// AAD binding the sealed seed to this file format.
const KEY_FILE_AAD: &[u8] = b"keyward-account-v1";

/// Salt length in bytes.
const SALT_LEN: usize = 32;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
struct KdfSection {
    m_cost: u32,
    t_cost: u32,
    p_cost: u32,
}

#[derive(Serialize, Deserialize)]
struct KeyFileData {
    version: u32,
    address: String,
    public_key: String,
    encrypted_seed: String,
    salt: String,
    nonce: String,
    kdf: KdfSection,
}

// ---------------------------------------------------------------------------
// KeyFile
// ---------------------------------------------------------------------------

/// A locked account: everything needed to unlock it with a password.
#[derive(Clone, Debug)]
pub struct KeyFile {
    address: Address,
    public_key: PublicKey,
    encrypted_seed: Vec<u8>,
    salt: [u8; SALT_LEN],
    nonce: AeadNonce,
    params: Argon2Params,
}

impl KeyFile {
    /// Seals `keypair` under `password`.
    pub fn seal(keypair: &Keypair, password: &str, params: Argon2Params) -> Result<Self> {
        let mut salt = [0u8; SALT_LEN];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|e| KeywardError::CryptoError {
                reason: format!("failed to generate salt: {e}"),
            })?;
        let nonce = generate_aead_nonce();

        let key = argon2id_derive_key(password.as_bytes(), &salt, &params)?;
        let seed = keypair.seed_bytes();
        let encrypted_seed = encrypt_xchacha20(key.as_bytes(), &nonce, &seed[..], KEY_FILE_AAD)?;

        Ok(Self {
            address: keypair.address(),
            public_key: keypair.public_key(),
            encrypted_seed,
            salt,
            nonce,
            params,
        })
    }

    /// Unlocks the key file with `password`.
    ///
    /// # Errors
    ///
    /// [`KeywardError::CryptoError`] if the password is wrong, or if the
    /// decrypted seed does not reproduce the recorded public key.
    pub fn unseal(&self, password: &str) -> Result<Keypair> {
        let key = argon2id_derive_key(password.as_bytes(), &self.salt, &self.params)?;
        let seed = Zeroizing::new(
            decrypt_xchacha20(key.as_bytes(), &self.nonce, &self.encrypted_seed, KEY_FILE_AAD)
                .map_err(|_| KeywardError::CryptoError {
                    reason: "could not decrypt key with given passphrase".into(),
                })?,
        );

        let keypair = Keypair::from_seed_slice(&seed)?;
        if keypair.public_key() != self.public_key || keypair.address() != self.address {
            return Err(KeywardError::CryptoError {
                reason: "decrypted key does not match the account".into(),
            });
        }
        Ok(keypair)
    }

    /// Account address recorded in the file.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Public key recorded in the file.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Argon2id parameters the seed was sealed with.
    pub fn params(&self) -> &Argon2Params {
        &self.params
    }

    // -----------------------------------------------------------------------
    // Disk I/O
    // -----------------------------------------------------------------------

    /// Writes the key file atomically with owner-only permissions.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = KeyFileData {
            version: KEY_FILE_VERSION,
            address: self.address.to_string(),
            public_key: self.public_key.to_string(),
            encrypted_seed: hex::encode(&self.encrypted_seed),
            salt: hex::encode(self.salt),
            nonce: hex::encode(self.nonce.as_bytes()),
            kdf: KdfSection {
                m_cost: self.params.m_cost,
                t_cost: self.params.t_cost,
                p_cost: self.params.p_cost,
            },
        };

        let json = serde_json::to_string_pretty(&data).map_err(|e| KeywardError::StorageError {
            reason: format!("key file serialization failed: {e}"),
        })?;

        write_atomic(path, json.as_bytes(), true)
    }

    /// Reads and validates a key file.
    ///
    /// # Errors
    ///
    /// - [`KeywardError::NotFound`] if `path` does not exist.
    /// - [`KeywardError::StorageError`] for unreadable, malformed or
    ///   unsupported-version files.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                KeywardError::NotFound {
                    reason: format!("key file {}", path.display()),
                }
            } else {
                KeywardError::StorageError {
                    reason: format!("failed to read key file {}: {e}", path.display()),
                }
            }
        })?;

        let data: KeyFileData =
            serde_json::from_str(&json).map_err(|e| KeywardError::StorageError {
                reason: format!("failed to parse key file {}: {e}", path.display()),
            })?;

        if data.version != KEY_FILE_VERSION {
            return Err(KeywardError::StorageError {
                reason: format!(
                    "unsupported key file version {} (expected {KEY_FILE_VERSION})",
                    data.version
                ),
            });
        }

        let address: Address = data.address.parse()?;
        let public_key = PublicKey::from_bytes(hex_decode_fixed::<32>(&data.public_key, "public_key")?);
        let encrypted_seed = hex::decode(&data.encrypted_seed).map_err(|e| {
            KeywardError::StorageError {
                reason: format!("invalid encrypted_seed hex: {e}"),
            }
        })?;
        let salt = hex_decode_fixed::<SALT_LEN>(&data.salt, "salt")?;
        let nonce = AeadNonce::from_bytes(hex_decode_fixed::<24>(&data.nonce, "nonce")?);

        if keyward_crypto::signing::pubkey_to_address(&public_key) != address {
            return Err(KeywardError::StorageError {
                reason: format!("key file {} address does not match its public key", path.display()),
            });
        }

        Ok(Self {
            address,
            public_key,
            encrypted_seed,
            salt,
            nonce,
            params: Argon2Params {
                m_cost: data.kdf.m_cost,
                t_cost: data.kdf.t_cost,
                p_cost: data.kdf.p_cost,
            },
        })
    }
}

fn hex_decode_fixed<const N: usize>(hex_str: &str, field: &str) -> Result<[u8; N]> {
    let bytes = hex::decode(hex_str).map_err(|e| KeywardError::StorageError {
        reason: format!("invalid {field} hex: {e}"),
    })?;
    if bytes.len() != N {
        return Err(KeywardError::StorageError {
            reason: format!("{field} must be {N} bytes, got {}", bytes.len()),
        });
    }
    let mut arr = [0u8; N];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> Argon2Params {
        Argon2Params {
            m_cost: 256,
            t_cost: 1,
            p_cost: 1,
        }
    }

    #[test]
    fn seal_unseal_with_right_password() -> std::result::Result<(), KeywardError> {
        let kp = Keypair::generate();
        let file = KeyFile::seal(&kp, "hunter2", fast())?;
        let unlocked = file.unseal("hunter2")?;
        assert_eq!(unlocked.public_key(), kp.public_key());
        Ok(())
    }

    #[test]
    fn wrong_password_is_crypto_error() -> std::result::Result<(), KeywardError> {
        let file = KeyFile::seal(&Keypair::generate(), "hunter2", fast())?;
        match file.unseal("hunter3") {
            Err(KeywardError::CryptoError { reason }) => {
                assert_eq!(reason, "could not decrypt key with given passphrase");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("wrong password unlocked the key"),
        }
        Ok(())
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let path = std::env::temp_dir().join(format!(
            "keyward_missing_key_{}.json",
            std::process::id()
        ));
        assert!(matches!(
            KeyFile::load(&path),
            Err(KeywardError::NotFound { .. })
        ));
    }

    #[test]
    fn save_load_keeps_kdf_params() -> std::result::Result<(), KeywardError> {
        let dir = std::env::temp_dir().join(format!("keyward_keyfile_{}", std::process::id()));
        let path = dir.join("account.json");

        let kp = Keypair::generate();
        KeyFile::seal(&kp, "pw", fast())?.save(&path)?;

        let loaded = KeyFile::load(&path)?;
        assert_eq!(*loaded.params(), fast());
        assert_eq!(*loaded.address(), kp.address());
        assert!(loaded.unseal("pw").is_ok());

        let _ = std::fs::remove_dir_all(&dir);
        Ok(())
    }
}
