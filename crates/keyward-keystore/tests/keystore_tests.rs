//! Integration tests for keyward-keystore.
//!
//! Every test works in its own temporary directory and uses cheap
//! Argon2 parameters so unlocking stays fast.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use keyward_crypto::kdf::Argon2Params;
use keyward_crypto::signing::Keypair;
use keyward_keystore::keystore::Keystore;
use keyward_keystore::CredentialStore;
use keyward_types::{Address, KeywardError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const PASSWORD: &str = "correct horse battery staple";
const WRONG_PASSWORD: &str = "wrong password entirely";

static COUNTER: AtomicU32 = AtomicU32::new(0);

/// RAII guard that removes a temporary directory on drop.
struct TempDir(PathBuf);

impl TempDir {
    fn new(name: &str) -> Self {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "keyward_keystore_{name}_{}_{n}",
            std::process::id()
        ));
        Self(path)
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn fast_params() -> Argon2Params {
    Argon2Params {
        m_cost: 256,
        t_cost: 1,
        p_cost: 1,
    }
}

// ---------------------------------------------------------------------------
// 1. Create → decrypt
// ---------------------------------------------------------------------------

#[test]
fn create_then_decrypt_with_password() -> std::result::Result<(), KeywardError> {
    let tmp = TempDir::new("create");
    let ks = Keystore::open(tmp.path(), fast_params(), false)?;

    let info = ks.create_account(PASSWORD)?;
    assert!(ks.has_account(&info.address));

    let kp = ks.decrypt(&info.address, PASSWORD)?;
    assert_eq!(kp.public_key(), info.public_key);
    assert_eq!(kp.address(), info.address);
    Ok(())
}

#[test]
fn decrypt_is_deterministic() -> std::result::Result<(), KeywardError> {
    let tmp = TempDir::new("deterministic");
    let ks = Keystore::open(tmp.path(), fast_params(), false)?;
    let info = ks.create_account(PASSWORD)?;

    let a = ks.decrypt(&info.address, PASSWORD)?;
    let b = ks.decrypt(&info.address, PASSWORD)?;
    assert_eq!(*a.seed_bytes(), *b.seed_bytes());
    Ok(())
}

// ---------------------------------------------------------------------------
// 2. Failure paths
// ---------------------------------------------------------------------------

#[test]
fn wrong_password_fails() -> std::result::Result<(), KeywardError> {
    let tmp = TempDir::new("wrong_pw");
    let ks = Keystore::open(tmp.path(), fast_params(), false)?;
    let info = ks.create_account(PASSWORD)?;

    assert!(matches!(
        ks.decrypt(&info.address, WRONG_PASSWORD),
        Err(KeywardError::CryptoError { .. })
    ));
    Ok(())
}

#[test]
fn unknown_address_is_not_found() -> std::result::Result<(), KeywardError> {
    let tmp = TempDir::new("unknown");
    let ks = Keystore::open(tmp.path(), fast_params(), false)?;

    assert!(matches!(
        ks.decrypt(&Address::new([0x77; 32]), PASSWORD),
        Err(KeywardError::NotFound { .. })
    ));
    Ok(())
}

#[test]
fn empty_password_rejected_on_create() -> std::result::Result<(), KeywardError> {
    let tmp = TempDir::new("empty_pw");
    let ks = Keystore::open(tmp.path(), fast_params(), false)?;
    assert!(ks.create_account("").is_err());
    assert!(ks.accounts()?.is_empty());
    Ok(())
}

// ---------------------------------------------------------------------------
// 3. Listing
// ---------------------------------------------------------------------------

#[test]
fn accounts_lists_created_accounts_only() -> std::result::Result<(), KeywardError> {
    let tmp = TempDir::new("list");
    let ks = Keystore::open(tmp.path(), fast_params(), true)?;

    let a = ks.create_account(PASSWORD)?;
    let b = ks.create_account(PASSWORD)?;

    // Cache and secret files share the directory but are not accounts.
    ks.retain_unlocked(&a.address, &ks.decrypt(&a.address, PASSWORD)?)?;
    std::fs::write(tmp.path().join("notes.json"), b"{}").map_err(|e| {
        KeywardError::StorageError {
            reason: e.to_string(),
        }
    })?;

    let listed: Vec<Address> = ks.accounts()?.into_iter().map(|i| i.address).collect();
    assert_eq!(listed.len(), 2);
    assert!(listed.contains(&a.address));
    assert!(listed.contains(&b.address));
    Ok(())
}

// ---------------------------------------------------------------------------
// 4. Unlocked cache
// ---------------------------------------------------------------------------

#[test]
fn cached_key_available_without_password() -> std::result::Result<(), KeywardError> {
    let tmp = TempDir::new("cached");
    let ks = Keystore::open(tmp.path(), fast_params(), false)?;
    let info = ks.create_account(PASSWORD)?;

    assert!(ks.decrypt_cached(&info.address).is_err());

    let kp = ks.decrypt(&info.address, PASSWORD)?;
    ks.retain_unlocked(&info.address, &kp)?;
    assert_eq!(ks.decrypt_cached(&info.address)?.public_key(), info.public_key);

    ks.forget_unlocked(&info.address)?;
    assert!(matches!(
        ks.decrypt_cached(&info.address),
        Err(KeywardError::NotFound { .. })
    ));
    Ok(())
}

#[test]
fn retain_rejects_foreign_keypair() -> std::result::Result<(), KeywardError> {
    let tmp = TempDir::new("foreign");
    let ks = Keystore::open(tmp.path(), fast_params(), false)?;
    let info = ks.create_account(PASSWORD)?;

    assert!(ks.retain_unlocked(&info.address, &Keypair::generate()).is_err());
    assert!(ks.decrypt_cached(&info.address).is_err());
    Ok(())
}

#[test]
fn persisted_cache_survives_reopen() -> std::result::Result<(), KeywardError> {
    let tmp = TempDir::new("persisted");
    let info = {
        let ks = Keystore::open(tmp.path(), fast_params(), true)?;
        let info = ks.create_account(PASSWORD)?;
        ks.retain_unlocked(&info.address, &ks.decrypt(&info.address, PASSWORD)?)?;
        info
    };

    let reopened = Keystore::open(tmp.path(), fast_params(), true)?;
    assert_eq!(
        reopened.decrypt_cached(&info.address)?.public_key(),
        info.public_key
    );
    Ok(())
}

#[test]
fn memory_cache_lost_on_reopen() -> std::result::Result<(), KeywardError> {
    let tmp = TempDir::new("memory");
    let info = {
        let ks = Keystore::open(tmp.path(), fast_params(), false)?;
        let info = ks.create_account(PASSWORD)?;
        ks.retain_unlocked(&info.address, &ks.decrypt(&info.address, PASSWORD)?)?;
        info
    };

    let reopened = Keystore::open(tmp.path(), fast_params(), false)?;
    assert!(reopened.decrypt_cached(&info.address).is_err());
    assert!(!tmp.path().join("unlocked.dat").exists());
    Ok(())
}
