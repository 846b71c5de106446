//! XChaCha20-Poly1305 authenticated encryption.
//!
//! Used to seal account seeds under a password-derived key and to seal
//! the unlocked-key cache under the node-local secret. Nonces are
//! 192-bit, drawn from OS entropy, and never reused with the same key.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use keyward_types::{KeywardError, Result};
use rand::rngs::OsRng;
use rand::RngCore;

/// Length of the Poly1305 authentication tag appended to ciphertext.
pub const TAG_LEN: usize = 16;

// ---------------------------------------------------------------------------
// AeadNonce
// ---------------------------------------------------------------------------

/// 192-bit (24-byte) nonce for XChaCha20-Poly1305.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AeadNonce([u8; 24]);

impl AeadNonce {
    /// Fixed byte length of an XChaCha20-Poly1305 nonce.
    pub const LEN: usize = 24;

    /// Creates an [`AeadNonce`] from raw bytes.
    pub fn from_bytes(bytes: [u8; 24]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying 24-byte array.
    pub fn as_bytes(&self) -> &[u8; 24] {
        &self.0
    }
}

/// Generates a fresh 192-bit random nonce from OS entropy.
pub fn generate_aead_nonce() -> AeadNonce {
    let mut bytes = [0u8; 24];
    OsRng.fill_bytes(&mut bytes);
    AeadNonce(bytes)
}

// ---------------------------------------------------------------------------
// Encrypt / Decrypt
// ---------------------------------------------------------------------------

/// Encrypts `plaintext` and returns ciphertext with the tag appended.
pub fn encrypt_xchacha20(
    key: &[u8; 32],
    nonce: &AeadNonce,
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let payload = Payload {
        msg: plaintext,
        aad,
    };

    cipher
        .encrypt(XNonce::from_slice(&nonce.0), payload)
        .map_err(|e| KeywardError::CryptoError {
            reason: format!("XChaCha20-Poly1305 encryption failed: {e}"),
        })
}

/// Decrypts `ciphertext` (tag appended).
///
/// # Errors
///
/// [`KeywardError::CryptoError`] if authentication fails: wrong key,
/// wrong nonce, wrong AAD or tampered data.
pub fn decrypt_xchacha20(
    key: &[u8; 32],
    nonce: &AeadNonce,
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let payload = Payload {
        msg: ciphertext,
        aad,
    };

    cipher
        .decrypt(XNonce::from_slice(&nonce.0), payload)
        .map_err(|e| KeywardError::CryptoError {
            reason: format!("XChaCha20-Poly1305 decryption failed: {e}"),
        })
}

// ---------------------------------------------------------------------------
// Sealed blobs: nonce || ciphertext
// ---------------------------------------------------------------------------

/// Encrypts under a fresh nonce and returns `nonce || ciphertext`.
pub fn seal(key: &[u8; 32], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let nonce = generate_aead_nonce();
    let ciphertext = encrypt_xchacha20(key, &nonce, plaintext, aad)?;

    let mut out = Vec::with_capacity(AeadNonce::LEN + ciphertext.len());
    out.extend_from_slice(nonce.as_bytes());
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Opens a blob produced by [`seal`].
pub fn open(key: &[u8; 32], sealed: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < AeadNonce::LEN + TAG_LEN {
        return Err(KeywardError::CryptoError {
            reason: format!(
                "sealed blob too short: expected at least {} bytes, got {}",
                AeadNonce::LEN + TAG_LEN,
                sealed.len()
            ),
        });
    }

    let mut nonce_bytes = [0u8; AeadNonce::LEN];
    nonce_bytes.copy_from_slice(&sealed[..AeadNonce::LEN]);
    decrypt_xchacha20(
        key,
        &AeadNonce::from_bytes(nonce_bytes),
        &sealed[AeadNonce::LEN..],
        aad,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt_roundtrip() -> std::result::Result<(), KeywardError> {
        let key = [0x42u8; 32];
        let nonce = generate_aead_nonce();

        let ct = encrypt_xchacha20(&key, &nonce, b"account seed", b"aad")?;
        assert_eq!(ct.len(), b"account seed".len() + TAG_LEN);

        let pt = decrypt_xchacha20(&key, &nonce, &ct, b"aad")?;
        assert_eq!(pt, b"account seed");
        Ok(())
    }

    #[test]
    fn wrong_key_fails() -> std::result::Result<(), KeywardError> {
        let nonce = generate_aead_nonce();
        let ct = encrypt_xchacha20(&[1u8; 32], &nonce, b"secret", b"")?;
        assert!(decrypt_xchacha20(&[2u8; 32], &nonce, &ct, b"").is_err());
        Ok(())
    }

    #[test]
    fn wrong_aad_fails() -> std::result::Result<(), KeywardError> {
        let sealed = seal(&[7u8; 32], b"secret", b"right")?;
        assert!(open(&[7u8; 32], &sealed, b"wrong").is_err());
        Ok(())
    }

    #[test]
    fn seal_open_roundtrip_uses_fresh_nonces() -> std::result::Result<(), KeywardError> {
        let key = [9u8; 32];
        let a = seal(&key, b"same", b"ctx")?;
        let b = seal(&key, b"same", b"ctx")?;
        assert_ne!(a, b);
        assert_eq!(open(&key, &a, b"ctx")?, b"same");
        Ok(())
    }

    #[test]
    fn open_rejects_truncated_blob() {
        assert!(open(&[0u8; 32], &[0u8; 10], b"").is_err());
    }
}
