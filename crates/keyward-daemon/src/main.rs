//! Keyward daemon: headless account session node.
//!
//! Usage:
//!
//!   keyward-daemon [OPTIONS]
//!
//! Options:
//!
//!   --data-dir <PATH>                 Data directory (default: platform-specific)
//!   --rpc-addr <ADDR>                 JSON-RPC listen address (default: 127.0.0.1:8645)
//!   --switch-failure-policy <POLICY>  `rollback` or `leave_empty`
//!   --no-persist-cache                Do not keep the selection across process restarts
//!   --config <PATH>                   Load config from JSON file
//!
//! The daemon runs until interrupted with Ctrl+C. On startup the
//! previously selected account, if any, is reinstated without a password.

use std::sync::Arc;

use clap::Parser;
use keyward_node::Node;
use keyward_rpc::config::RpcConfig;
use keyward_rpc::server::RpcServer;
use tokio::sync::watch;

mod config;

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = config::CliArgs::parse();

    let daemon_config = match &cli.config_path {
        Some(path) => match config::DaemonConfig::load(path) {
            Ok(cfg) => cfg.merge_cli(&cli),
            Err(e) => {
                tracing::error!("failed to load config file: {e}");
                std::process::exit(1);
            }
        },
        None => config::DaemonConfig::from_cli(&cli),
    };

    if let Err(e) = run_daemon(daemon_config).await {
        tracing::error!("daemon error: {e}");
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Daemon main logic
// ---------------------------------------------------------------------------

async fn run_daemon(cfg: config::DaemonConfig) -> Result<(), String> {
    let node_config = cfg.node;
    let rpc_addr = node_config.rpc_addr;
    let data_dir = node_config.data_dir.clone();

    std::fs::create_dir_all(&data_dir)
        .map_err(|e| format!("failed to create data directory: {e}"))?;
    tracing::info!(data_dir = %data_dir.display(), "data directory ready");

    // -----------------------------------------------------------------------
    // 1. Node
    // -----------------------------------------------------------------------

    tracing::info!(
        policy = ?node_config.switch_failure_policy,
        persist_unlocked_cache = node_config.persist_unlocked_cache,
        "node config"
    );

    let node = Arc::new(Node::new(node_config).map_err(|e| format!("node creation failed: {e}"))?);
    node.start().map_err(|e| format!("node start failed: {e}"))?;

    let selected = node
        .selected_account()
        .map(|s| s.address.to_string())
        .unwrap_or_else(|_| "(none)".into());

    // -----------------------------------------------------------------------
    // 2. RPC server
    // -----------------------------------------------------------------------

    let (rpc_shutdown_tx, rpc_shutdown_rx) = watch::channel(false);

    let (bound, rpc_handle) =
        RpcServer::start(RpcConfig::new(rpc_addr), Arc::clone(&node), rpc_shutdown_rx)
            .await
            .map_err(|e| format!("RPC server start failed: {e}"))?;

    println!();
    println!("============================================================");
    println!("  Keyward daemon running");
    println!("============================================================");
    println!("  Selected:     {selected}");
    println!("  RPC listen:   {bound}");
    println!("  Data dir:     {}", data_dir.display());
    println!("============================================================");
    println!("  Press Ctrl+C to stop");
    println!("============================================================");
    println!();

    // -----------------------------------------------------------------------
    // 3. Wait for shutdown signal
    // -----------------------------------------------------------------------

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(%e, "failed to listen for Ctrl+C");
    }
    tracing::info!("received Ctrl+C, shutting down...");

    let _ = rpc_shutdown_tx.send(true);
    if let Err(e) = rpc_handle.await {
        tracing::warn!(%e, "RPC server task ended abnormally");
    }

    // Wipes injected keys; the session record and unlocked cache stay
    // on disk so the next start restores the selection.
    node.stop().map_err(|e| format!("node stop failed: {e}"))?;

    tracing::info!("daemon stopped");
    Ok(())
}
