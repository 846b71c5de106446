//! Account credential storage for the Keyward node.
//!
//! - [`keystore`]: file-backed [`Keystore`](keystore::Keystore): one
//!   password-sealed JSON key file per account.
//! - [`key_file`]: the on-disk key file format (v1).
//! - [`cache`]: the unlocked-key cache used for password-less restore.
//! - [`atomic`]: crash-safe file replacement shared with the session
//!   record.
//!
//! The session manager only sees the [`CredentialStore`] trait.

pub mod atomic;
pub mod cache;
pub mod key_file;
pub mod keystore;

use keyward_crypto::signing::{Keypair, PublicKey};
use keyward_types::{Address, Result};

/// Public description of a stored account.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AccountInfo {
    /// Account address, `SHA3-256(public_key)`.
    pub address: Address,
    /// Ed25519 public key of the account.
    pub public_key: PublicKey,
}

/// Source of decrypted account keys.
///
/// `decrypt` is deterministic: the same address and password either
/// always produce the same keypair or always fail. The unlocked cache
/// is the only path that yields a key without a password.
pub trait CredentialStore: Send + Sync {
    /// Decrypts the private key of `address` with `password`.
    ///
    /// # Errors
    ///
    /// - [`KeywardError::NotFound`](keyward_types::KeywardError::NotFound)
    ///   if no account exists for `address`.
    /// - [`KeywardError::CryptoError`](keyward_types::KeywardError::CryptoError)
    ///   if the password is wrong or the key file is corrupt.
    fn decrypt(&self, address: &Address, password: &str) -> Result<Keypair>;

    /// Returns the previously unlocked key of `address` without a password.
    fn decrypt_cached(&self, address: &Address) -> Result<Keypair>;

    /// Stores `keypair` in the unlocked cache under `address`.
    fn retain_unlocked(&self, address: &Address, keypair: &Keypair) -> Result<()>;

    /// Removes `address` from the unlocked cache. Absent entries are not
    /// an error.
    fn forget_unlocked(&self, address: &Address) -> Result<()>;
}
