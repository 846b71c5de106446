//! Node-level integration tests: account selection across stop/start,
//! restart and full process restarts.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use keyward_node::{Node, NodeState};
use keyward_session::SessionError;
use keyward_types::config::{KdfCost, NodeConfig, SwitchFailurePolicy};
use keyward_types::KeywardError;

type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

const PASSWORD: &str = "test-password";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

static COUNTER: AtomicU32 = AtomicU32::new(0);

/// RAII guard that removes a temporary data directory on drop.
struct TempDir(PathBuf);

impl TempDir {
    fn new(name: &str) -> Self {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        Self(std::env::temp_dir().join(format!(
            "keyward_node_{name}_{}_{n}",
            std::process::id()
        )))
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn test_config(tmp: &TempDir, persist_unlocked_cache: bool) -> NodeConfig {
    NodeConfig {
        data_dir: tmp.0.clone(),
        switch_failure_policy: SwitchFailurePolicy::Rollback,
        persist_unlocked_cache,
        kdf: KdfCost {
            m_cost: 256,
            t_cost: 1,
            p_cost: 1,
        },
        ..NodeConfig::default()
    }
}

// ---------------------------------------------------------------------------
// 1. Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn lifecycle_transitions() -> std::result::Result<(), KeywardError> {
    let tmp = TempDir::new("lifecycle");
    let node = Node::new(test_config(&tmp, false))?;
    assert_eq!(node.state(), NodeState::Stopped);
    assert!(node.messaging().is_none());

    node.start()?;
    assert_eq!(node.state(), NodeState::Running);
    assert!(matches!(node.start(), Err(KeywardError::NodeError { .. })));

    node.restart()?;
    assert_eq!(node.state(), NodeState::Running);

    node.stop()?;
    assert_eq!(node.state(), NodeState::Stopped);
    assert!(matches!(node.stop(), Err(KeywardError::NodeError { .. })));
    assert!(matches!(node.restart(), Err(KeywardError::NodeError { .. })));
    Ok(())
}

#[test]
fn stopped_node_rejects_selection() -> TestResult {
    let tmp = TempDir::new("stopped_select");
    let node = Node::new(test_config(&tmp, false))?;
    let a = node.create_account(PASSWORD)?;

    assert!(matches!(
        node.select_account(&a.address, PASSWORD),
        Err(SessionError::RegistryUnavailable { .. })
    ));
    assert_eq!(
        node.selected_account().err(),
        Some(SessionError::NoAccountSelected)
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// 2. Selected account across restarts
// ---------------------------------------------------------------------------

#[test]
fn selected_account_on_restart() -> TestResult {
    let tmp = TempDir::new("selected_on_restart");
    let node = Node::new(test_config(&tmp, false))?;
    node.start()?;

    let a1 = node.create_account(PASSWORD)?;
    let a2 = node.create_account(PASSWORD)?;
    assert!(!node.has_key_pair(&a1.public_key));
    assert_eq!(
        node.selected_account().err(),
        Some(SessionError::NoAccountSelected)
    );

    let err = node.select_account(&a1.address, "wrongPassword").err();
    assert_eq!(
        err.map(|e| e.to_string()).as_deref(),
        Some("cannot retrieve a valid key for a given account: could not decrypt key with given passphrase")
    );

    node.select_account(&a1.address, PASSWORD)?;
    assert!(node.has_key_pair(&a1.public_key));

    assert!(!node.has_key_pair(&a2.public_key));
    node.select_account(&a2.address, PASSWORD)?;
    assert!(node.has_key_pair(&a2.public_key));
    assert!(!node.has_key_pair(&a1.public_key));

    // Stop and start: a2 must come back.
    node.stop()?;
    node.start()?;
    assert_eq!(node.selected_account()?.address, a2.address);
    assert!(node.has_key_pair(&a2.public_key));
    assert!(!node.has_key_pair(&a1.public_key));

    // Restart keeps it too.
    node.restart()?;
    assert!(node.has_key_pair(&a2.public_key));
    assert!(!node.has_key_pair(&a1.public_key));

    // Logout, then restart: nothing selected.
    node.logout()?;
    node.restart()?;
    assert!(!node.has_key_pair(&a2.public_key));
    assert!(!node.has_key_pair(&a1.public_key));
    assert_eq!(
        node.selected_account().err(),
        Some(SessionError::NoAccountSelected)
    );
    Ok(())
}

#[test]
fn stop_wipes_injected_keys() -> TestResult {
    let tmp = TempDir::new("stop_wipes");
    let node = Node::new(test_config(&tmp, false))?;
    node.start()?;

    let a = node.create_account(PASSWORD)?;
    let key_id = node.select_account(&a.address, PASSWORD)?;
    let messaging = node.messaging().ok_or("messaging missing while running")?;

    node.stop()?;
    assert!(!messaging.is_running());
    assert_eq!(messaging.key_count(), 0);
    assert!(!node.has_key_id(&key_id));
    Ok(())
}

#[test]
fn restart_issues_new_key_id() -> TestResult {
    let tmp = TempDir::new("new_key_id");
    let node = Node::new(test_config(&tmp, false))?;
    node.start()?;

    let a = node.create_account(PASSWORD)?;
    let before = node.select_account(&a.address, PASSWORD)?;
    node.restart()?;

    let after = node.selected_account()?;
    assert_eq!(after.address, a.address);
    assert_ne!(after.key_id, before);
    assert!(node.has_key_id(&after.key_id));
    Ok(())
}

#[test]
fn selection_survives_process_restart_with_persisted_cache() -> TestResult {
    let tmp = TempDir::new("process_restart");

    let a = {
        let node = Node::new(test_config(&tmp, true))?;
        node.start()?;
        let a = node.create_account(PASSWORD)?;
        node.select_account(&a.address, PASSWORD)?;
        a
    };

    let node = Node::new(test_config(&tmp, true))?;
    node.start()?;
    assert_eq!(node.selected_account()?.address, a.address);
    assert!(node.has_key_pair(&a.public_key));

    let status = node.status()?;
    assert_eq!(status.state, NodeState::Running);
    assert_eq!(status.selected, Some(a.address));
    assert_eq!(status.injected_keys, 1);
    Ok(())
}

#[test]
fn process_restart_without_persisted_cache_starts_empty() -> TestResult {
    let tmp = TempDir::new("process_restart_memory");

    {
        let node = Node::new(test_config(&tmp, false))?;
        node.start()?;
        let a = node.create_account(PASSWORD)?;
        node.select_account(&a.address, PASSWORD)?;
    }

    let node = Node::new(test_config(&tmp, false))?;
    node.start()?;
    assert_eq!(node.state(), NodeState::Running);
    assert!(node.selected_account().is_err());

    // The stale record was dropped; the next start is clean as well.
    node.restart()?;
    assert!(node.selected_account().is_err());
    assert_eq!(node.status()?.injected_keys, 0);
    Ok(())
}

#[test]
fn logout_while_stopped_prevents_restore() -> TestResult {
    let tmp = TempDir::new("logout_stopped");
    let node = Node::new(test_config(&tmp, false))?;
    node.start()?;

    let a = node.create_account(PASSWORD)?;
    node.select_account(&a.address, PASSWORD)?;
    node.stop()?;

    node.logout()?;
    node.start()?;
    assert!(node.selected_account().is_err());
    assert!(!node.has_key_pair(&a.public_key));
    Ok(())
}

#[test]
fn accounts_lists_created() -> TestResult {
    let tmp = TempDir::new("accounts");
    let node = Node::new(test_config(&tmp, false))?;
    let a = node.create_account(PASSWORD)?;
    let b = node.create_account(PASSWORD)?;

    let listed = node.accounts()?;
    assert_eq!(listed.len(), 2);
    assert!(listed.contains(&a));
    assert!(listed.contains(&b));
    Ok(())
}
