//! Keyward CLI client.
//!
//! Talks to a running Keyward daemon over its loopback JSON-RPC port.

mod commands;
mod output;
mod rpc_client;

use std::net::SocketAddr;

use clap::{Parser, Subcommand};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Keyward: select, switch and log out of node accounts.
#[derive(Parser)]
#[command(name = "keyward", version, about)]
struct Cli {
    /// Output in JSON format (no colors, machine-readable).
    #[arg(long, global = true)]
    json: bool,

    /// JSON-RPC address of the Keyward daemon.
    #[arg(long, global = true, default_value = "127.0.0.1:8645")]
    rpc_addr: SocketAddr,

    /// Request timeout in seconds.
    #[arg(long, global = true, default_value = "30")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, select and log out of accounts.
    Account {
        #[command(subcommand)]
        action: commands::account::AccountAction,
    },
    /// Node status and lifecycle.
    Node {
        #[command(subcommand)]
        action: commands::node::NodeAction,
    },
}

// ---------------------------------------------------------------------------
// Global options passed to every command handler
// ---------------------------------------------------------------------------

/// Shared options threaded into command handlers.
pub struct GlobalOpts {
    pub json: bool,
    pub rpc_addr: SocketAddr,
    pub timeout_secs: u64,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let opts = GlobalOpts {
        json: cli.json,
        rpc_addr: cli.rpc_addr,
        timeout_secs: cli.timeout,
    };

    let result = match cli.command {
        Commands::Account { action } => commands::account::run(action, &opts).await,
        Commands::Node { action } => commands::node::run(action, &opts).await,
    };

    if let Err(e) = result {
        output::print_error(&e, cli.json);
        std::process::exit(1);
    }
}
