//! CLI argument parsing and config file support.
//!
//! The daemon can be configured via CLI flags, a JSON config file,
//! or a combination of both (CLI overrides config file).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::Parser;
use keyward_types::config::{KdfCost, NodeConfig, SwitchFailurePolicy};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// Keyward daemon - account session node.
#[derive(Parser, Debug, Default)]
#[command(name = "keyward-daemon", version, about)]
pub struct CliArgs {
    /// Data directory (default: platform-specific).
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// JSON-RPC listen address; must be loopback.
    #[arg(long)]
    pub rpc_addr: Option<SocketAddr>,

    /// What to do when an account switch fails halfway.
    #[arg(long, value_parser = parse_policy)]
    pub switch_failure_policy: Option<SwitchFailurePolicy>,

    /// Keep the unlocked-key cache in memory only. The selected account
    /// is then lost on process exit.
    #[arg(long)]
    pub no_persist_cache: bool,

    /// Load settings from a JSON config file.
    #[arg(long = "config")]
    pub config_path: Option<PathBuf>,
}

fn parse_policy(s: &str) -> std::result::Result<SwitchFailurePolicy, String> {
    match s {
        "rollback" => Ok(SwitchFailurePolicy::Rollback),
        "leave_empty" | "leave-empty" => Ok(SwitchFailurePolicy::LeaveEmpty),
        other => Err(format!(
            "unknown policy '{other}' (expected 'rollback' or 'leave_empty')"
        )),
    }
}

// ---------------------------------------------------------------------------
// Config file (JSON)
// ---------------------------------------------------------------------------

/// JSON config file format.
///
/// Example `daemon.json`:
/// ```json
/// {
///   "data_dir": "/var/lib/keyward",
///   "rpc_addr": "127.0.0.1:8645",
///   "switch_failure_policy": "leave_empty",
///   "persist_unlocked_cache": true,
///   "kdf": { "m_cost": 65536, "t_cost": 3, "p_cost": 1 }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfigFile {
    pub data_dir: Option<PathBuf>,
    pub rpc_addr: Option<SocketAddr>,
    pub switch_failure_policy: Option<SwitchFailurePolicy>,
    pub persist_unlocked_cache: Option<bool>,
    pub kdf: Option<KdfCost>,
}

// ---------------------------------------------------------------------------
// Resolved config
// ---------------------------------------------------------------------------

/// Fully resolved daemon configuration with all defaults applied.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub node: NodeConfig,
}

impl DaemonConfig {
    /// Build config purely from CLI args with defaults.
    pub fn from_cli(cli: &CliArgs) -> Self {
        Self::from_file(DaemonConfigFile::default()).merge_cli(cli)
    }

    /// Load config from a JSON file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config file: {e}"))?;

        let file: DaemonConfigFile =
            serde_json::from_str(&text).map_err(|e| format!("invalid config JSON: {e}"))?;

        Ok(Self::from_file(file))
    }

    fn from_file(file: DaemonConfigFile) -> Self {
        let defaults = NodeConfig::default();
        Self {
            node: NodeConfig {
                data_dir: file.data_dir.unwrap_or_else(default_data_dir),
                switch_failure_policy: file
                    .switch_failure_policy
                    .unwrap_or(defaults.switch_failure_policy),
                persist_unlocked_cache: file
                    .persist_unlocked_cache
                    .unwrap_or(defaults.persist_unlocked_cache),
                kdf: file.kdf.unwrap_or(defaults.kdf),
                rpc_addr: file.rpc_addr.unwrap_or(defaults.rpc_addr),
            },
        }
    }

    /// Merge CLI overrides onto a config-file base.
    pub fn merge_cli(mut self, cli: &CliArgs) -> Self {
        if let Some(ref dir) = cli.data_dir {
            self.node.data_dir = dir.clone();
        }
        if let Some(addr) = cli.rpc_addr {
            self.node.rpc_addr = addr;
        }
        if let Some(policy) = cli.switch_failure_policy {
            self.node.switch_failure_policy = policy;
        }
        if cli.no_persist_cache {
            self.node.persist_unlocked_cache = false;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Platform-specific default data directory.
fn default_data_dir() -> PathBuf {
    if cfg!(target_os = "linux") {
        if let Some(home) = dirs::home_dir() {
            return home.join(".keyward");
        }
    }
    if let Some(data) = dirs::data_dir() {
        return data.join("Keyward");
    }
    PathBuf::from("keyward-data")
}
