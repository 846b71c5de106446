//! Errors surfaced by the account session manager.
//!
//! Collaborator failures ([`KeywardError`]) never cross the manager
//! boundary; they are folded into one of the kinds below.

use keyward_types::KeywardError;
use thiserror::Error;

/// Failure of an account session operation.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum SessionError {
    /// Wrong password, unknown address or unreadable key file. Nothing
    /// was changed.
    #[error("cannot retrieve a valid key for a given account: {reason}")]
    InvalidCredentials {
        /// Why the key could not be obtained.
        reason: String,
    },

    /// The key registry rejected an injection or eviction.
    #[error("key registry unavailable: {reason}")]
    RegistryUnavailable {
        /// The registry's reason.
        reason: String,
    },

    /// A selection query was made while no account is selected.
    #[error("no account has been selected, please login")]
    NoAccountSelected,

    /// Reinstating the persisted selection at startup failed.
    #[error("failed to restore selected account: {reason}")]
    RestoreFailed {
        /// What went wrong.
        reason: String,
    },

    /// The persisted selection record could not be written or cleared.
    #[error("session store unavailable: {reason}")]
    StoreUnavailable {
        /// The store's reason.
        reason: String,
    },
}

impl SessionError {
    /// Returns `true` if repeating the call may succeed without any
    /// change on the caller's side.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RegistryUnavailable { .. } | Self::StoreUnavailable { .. }
        )
    }

    pub(crate) fn credentials(err: KeywardError) -> Self {
        let reason = match err {
            KeywardError::CryptoError { reason } | KeywardError::NotFound { reason } => reason,
            other => other.to_string(),
        };
        Self::InvalidCredentials { reason }
    }

    pub(crate) fn registry(err: KeywardError) -> Self {
        Self::RegistryUnavailable {
            reason: reason_of(err),
        }
    }

    pub(crate) fn store(err: KeywardError) -> Self {
        Self::StoreUnavailable {
            reason: reason_of(err),
        }
    }

    pub(crate) fn restore(err: KeywardError) -> Self {
        Self::RestoreFailed {
            reason: err.to_string(),
        }
    }
}

fn reason_of(err: KeywardError) -> String {
    match err {
        KeywardError::RegistryError { reason } | KeywardError::StorageError { reason } => reason,
        other => other.to_string(),
    }
}
