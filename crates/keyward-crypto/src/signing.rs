//! Ed25519 account keypairs.
//!
//! An account's private key is the 32-byte Ed25519 seed. The public
//! key is used for registry membership checks and the account address
//! is `SHA3-256(public_key)`. Private material is zeroized on drop via
//! `ed25519-dalek`'s `ZeroizeOnDrop`.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use keyward_types::{Address, KeywardError, Result};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::hash::sha3_256;

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

/// Ed25519 public key (32 bytes).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    /// Fixed byte length of an Ed25519 public key.
    pub const LEN: usize = 32;

    /// Creates a [`PublicKey`] from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying 32-byte array.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for PublicKey {
    type Err = KeywardError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s)).map_err(|_| {
            KeywardError::CryptoError {
                reason: "invalid hex encoding for public key".into(),
            }
        })?;
        let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            KeywardError::CryptoError {
                reason: format!("public key must be 32 bytes, got {}", bytes.len()),
            }
        })?;
        Ok(Self(arr))
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// Ed25519 signature (64 bytes).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Signature([u8; 64]);

impl Signature {
    /// Fixed byte length of an Ed25519 signature.
    pub const LEN: usize = 64;

    /// Creates a [`Signature`] from raw bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying 64-byte array.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Keypair
// ---------------------------------------------------------------------------

/// Ed25519 account keypair.
///
/// Deliberately neither `Clone` nor `Debug`: a second copy of the
/// private key can only be made through [`Keypair::seed_bytes`], which
/// hands out a zeroizing buffer.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generates a new random keypair using OS-level entropy.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Reconstructs a keypair deterministically from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Reconstructs a keypair from a seed of unchecked length.
    ///
    /// # Errors
    ///
    /// [`KeywardError::CryptoError`] if `seed` is not exactly 32 bytes.
    pub fn from_seed_slice(seed: &[u8]) -> Result<Self> {
        let arr: Zeroizing<[u8; 32]> = Zeroizing::new(seed.try_into().map_err(|_| {
            KeywardError::CryptoError {
                reason: format!("private key seed must be 32 bytes, got {}", seed.len()),
            }
        })?);
        Ok(Self::from_seed(&arr))
    }

    /// Returns the public half of this keypair.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Returns the account address of this keypair.
    pub fn address(&self) -> Address {
        pubkey_to_address(&self.public_key())
    }

    /// Signs `message` and returns the Ed25519 signature.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }

    /// Returns the 32-byte private seed in a buffer that is wiped on drop.
    pub fn seed_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.signing_key.to_bytes())
    }

    /// Makes an independent copy of this keypair.
    ///
    /// Used where a subsystem must own its key material (the messaging
    /// key registry) while the caller keeps its own copy.
    pub fn duplicate(&self) -> Self {
        Self::from_seed(&self.seed_bytes())
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Verifies an Ed25519 signature against a public key and message.
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &Signature) -> Result<()> {
    let vk = VerifyingKey::from_bytes(&public_key.0).map_err(|e| KeywardError::CryptoError {
        reason: format!("invalid public key: {e}"),
    })?;
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    vk.verify_strict(message, &sig)
        .map_err(|e| KeywardError::CryptoError {
            reason: format!("signature verification failed: {e}"),
        })
}

/// Derives an [`Address`] from an Ed25519 public key: `SHA3-256(pk)`.
pub fn pubkey_to_address(public_key: &PublicKey) -> Address {
    Address::new(sha3_256(&public_key.0))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_signs_and_verifies() {
        let kp = Keypair::generate();
        let sig = kp.sign(b"payload");
        assert!(verify(&kp.public_key(), b"payload", &sig).is_ok());
        assert!(verify(&kp.public_key(), b"other", &sig).is_err());
    }

    #[test]
    fn from_seed_is_deterministic() {
        let seed = [0x42u8; 32];
        let a = Keypair::from_seed(&seed);
        let b = Keypair::from_seed(&seed);
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.address(), b.address());
    }

    #[test]
    fn from_seed_slice_rejects_wrong_length() {
        assert!(Keypair::from_seed_slice(&[0u8; 31]).is_err());
        assert!(Keypair::from_seed_slice(&[0u8; 32]).is_ok());
    }

    #[test]
    fn duplicate_has_same_identity() {
        let kp = Keypair::generate();
        let copy = kp.duplicate();
        assert_eq!(kp.public_key(), copy.public_key());
        assert_eq!(*kp.seed_bytes(), *copy.seed_bytes());
    }

    #[test]
    fn address_matches_pubkey_hash() {
        let kp = Keypair::from_seed(&[0xAA; 32]);
        assert_eq!(kp.address(), pubkey_to_address(&kp.public_key()));
    }

    #[test]
    fn public_key_hex_roundtrip() -> std::result::Result<(), KeywardError> {
        let pk = Keypair::generate().public_key();
        let parsed: PublicKey = pk.to_string().parse()?;
        assert_eq!(pk, parsed);
        Ok(())
    }
}
