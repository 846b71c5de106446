//! Argon2id password-based key derivation.
//!
//! Turns an account password and a per-account random salt into the
//! 256-bit key that seals the account's private seed.

use keyward_types::config::KdfCost;
use keyward_types::{KeywardError, Result};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Minimum acceptable salt length in bytes.
const MIN_SALT_LEN: usize = 8;

// ---------------------------------------------------------------------------
// Argon2Params
// ---------------------------------------------------------------------------

/// Argon2id tuning parameters as stored alongside an account file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Argon2Params {
    /// Memory cost in KiB. Must be at least 8 × `p_cost`.
    pub m_cost: u32,
    /// Time cost (number of passes). Must be at least 1.
    pub t_cost: u32,
    /// Parallelism degree. Must be at least 1.
    pub p_cost: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        KdfCost::default().into()
    }
}

impl From<KdfCost> for Argon2Params {
    fn from(cost: KdfCost) -> Self {
        Self {
            m_cost: cost.m_cost,
            t_cost: cost.t_cost,
            p_cost: cost.p_cost,
        }
    }
}

// ---------------------------------------------------------------------------
// DerivedKey
// ---------------------------------------------------------------------------

/// 256-bit key derived by Argon2id, wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; 32]);

impl DerivedKey {
    /// Fixed byte length of the derived key.
    pub const LEN: usize = 32;

    /// Returns the raw 32-byte key material.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Derives a 256-bit key from `password` and `salt` using Argon2id v0x13.
///
/// # Errors
///
/// - [`KeywardError::ConfigError`] for invalid parameters or a short salt.
/// - [`KeywardError::CryptoError`] if the computation itself fails.
pub fn argon2id_derive_key(
    password: &[u8],
    salt: &[u8],
    params: &Argon2Params,
) -> Result<DerivedKey> {
    if salt.len() < MIN_SALT_LEN {
        return Err(KeywardError::ConfigError {
            reason: format!(
                "salt must be at least {MIN_SALT_LEN} bytes, got {}",
                salt.len()
            ),
        });
    }

    let argon2_params = argon2::Params::new(
        params.m_cost,
        params.t_cost,
        params.p_cost,
        Some(DerivedKey::LEN),
    )
    .map_err(|e| KeywardError::ConfigError {
        reason: format!("invalid Argon2 parameters: {e}"),
    })?;

    let argon2 = argon2::Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon2_params,
    );

    let mut output = [0u8; 32];
    argon2
        .hash_password_into(password, salt, &mut output)
        .map_err(|e| KeywardError::CryptoError {
            reason: format!("Argon2id derivation failed: {e}"),
        })?;

    Ok(DerivedKey(output))
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
    fn derive_is_deterministic() -> std::result::Result<(), KeywardError> {
        let a = argon2id_derive_key(b"pw", b"0123456789abcdef", &fast())?;
        let b = argon2id_derive_key(b"pw", b"0123456789abcdef", &fast())?;
        assert_eq!(a.as_bytes(), b.as_bytes());
        Ok(())
    }

    #[test]
    fn different_password_different_key() -> std::result::Result<(), KeywardError> {
        let a = argon2id_derive_key(b"pw-a", b"0123456789abcdef", &fast())?;
        let b = argon2id_derive_key(b"pw-b", b"0123456789abcdef", &fast())?;
        assert_ne!(a.as_bytes(), b.as_bytes());
        Ok(())
    }

    #[test]
    fn short_salt_rejected() {
        assert!(matches!(
            argon2id_derive_key(b"pw", b"short", &fast()),
            Err(KeywardError::ConfigError { .. })
        ));
    }

    #[test]
    fn zero_t_cost_rejected() {
        let params = Argon2Params {
            t_cost: 0,
            ..fast()
        };
        assert!(argon2id_derive_key(b"pw", b"0123456789abcdef", &params).is_err());
    }

    #[test]
    fn params_from_kdf_cost() {
        let cost = KdfCost {
            m_cost: 512,
            t_cost: 2,
            p_cost: 1,
        };
        let params = Argon2Params::from(cost);
        assert_eq!(params.m_cost, 512);
        assert_eq!(params.t_cost, 2);
    }
}
