//! Persisted selection record.
//!
//! # File format (`session.json`, v1)
//!
//! ```json
//! {
//!   "version": 1,
//!   "address": "<hex 32 bytes>" | null,
//!   "selected_at": "<rfc3339>"
//! }
//! ```
//!
//! `address` is `null` after a logout. Writes replace the file
//! atomically, so after a crash the record reads back as either the
//! previous or the new selection.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use keyward_keystore::atomic::write_atomic;
use keyward_types::{Address, KeywardError, Result, Timestamp};
use serde::{Deserialize, Serialize};

/// Current record format version.
pub const SESSION_RECORD_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// SessionStore trait
// ---------------------------------------------------------------------------

/// Durable record of which account was selected last.
///
/// There is a single writer, the account manager.
pub trait SessionStore: Send + Sync {
    /// Records `address` as the selected account.
    fn write(&self, address: &Address) -> Result<()>;

    /// Invalidates the record.
    fn clear(&self) -> Result<()>;

    /// Returns the recorded address, or `None` if nothing is selected.
    fn read(&self) -> Result<Option<Address>>;
}

/// Decoded contents of a session record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionRecord {
    /// Selected account, `None` after logout.
    pub address: Option<Address>,
    /// When the record was last written.
    pub selected_at: Timestamp,
}

#[derive(Serialize, Deserialize)]
struct RecordData {
    version: u32,
    address: Option<String>,
    selected_at: String,
}

// ---------------------------------------------------------------------------
// FileSessionStore
// ---------------------------------------------------------------------------

/// [`SessionStore`] backed by a JSON file.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Creates a store at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the record file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the full record, or `None` if the file does not exist.
    pub fn record(&self) -> Result<Option<SessionRecord>> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(KeywardError::StorageError {
                    reason: format!("failed to read {}: {e}", self.path.display()),
                })
            }
        };

        let data: RecordData =
            serde_json::from_str(&json).map_err(|e| KeywardError::StorageError {
                reason: format!("failed to parse {}: {e}", self.path.display()),
            })?;

        if data.version != SESSION_RECORD_VERSION {
            return Err(KeywardError::StorageError {
                reason: format!(
                    "unsupported session record version {} (expected {SESSION_RECORD_VERSION})",
                    data.version
                ),
            });
        }

        let address = data
            .address
            .as_deref()
            .map(str::parse::<Address>)
            .transpose()?;
        let selected_at: Timestamp = data.selected_at.parse()?;

        Ok(Some(SessionRecord {
            address,
            selected_at,
        }))
    }

    fn save(&self, address: Option<&Address>) -> Result<()> {
        let data = RecordData {
            version: SESSION_RECORD_VERSION,
            address: address.map(|a| a.to_string()),
            selected_at: Timestamp::now().to_string(),
        };

        let json = serde_json::to_string_pretty(&data).map_err(|e| KeywardError::StorageError {
            reason: format!("session record serialization failed: {e}"),
        })?;

        write_atomic(&self.path, json.as_bytes(), false)
    }
}

impl SessionStore for FileSessionStore {
    fn write(&self, address: &Address) -> Result<()> {
        self.save(Some(address))
    }

    fn clear(&self) -> Result<()> {
        self.save(None)
    }

    fn read(&self) -> Result<Option<Address>> {
        Ok(self.record()?.and_then(|r| r.address))
    }
}

// ---------------------------------------------------------------------------
// MemorySessionStore
// ---------------------------------------------------------------------------

/// Volatile [`SessionStore`], for nodes without a data directory and
/// for tests.
#[derive(Default)]
pub struct MemorySessionStore {
    address: Mutex<Option<Address>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Address>>> {
        self.address.lock().map_err(|e| KeywardError::StorageError {
            reason: format!("session store lock poisoned: {e}"),
        })
    }
}

impl SessionStore for MemorySessionStore {
    fn write(&self, address: &Address) -> Result<()> {
        *self.lock()? = Some(*address);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.lock()? = None;
        Ok(())
    }

    fn read(&self) -> Result<Option<Address>> {
        Ok(*self.lock()?)
    }
}
