//! Account session lifecycle for the Keyward node.
//!
//! The [`AccountManager`] keeps exactly one selected identity per node.
//! Selecting unlocks the account through a
//! [`CredentialStore`](keyward_keystore::CredentialStore), injects the
//! key into the messaging [`KeyRegistry`](keyward_messaging::registry::KeyRegistry)
//! and records the choice in a [`SessionStore`] so it can be reinstated
//! after a restart. Logging out evicts the key and invalidates the
//! record.

pub mod error;
pub mod manager;
pub mod store;

pub use error::SessionError;
pub use manager::{AccountManager, SelectedAccount};
pub use store::{FileSessionStore, MemorySessionStore, SessionRecord, SessionStore};
