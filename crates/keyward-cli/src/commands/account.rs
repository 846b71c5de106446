//! Account commands: create, login, logout, selected.

use std::io::BufRead;

use clap::Subcommand;

use crate::output;
use crate::rpc_client::RpcClient;
use crate::GlobalOpts;

/// Environment variable consulted before prompting for a password.
const PASSWORD_ENV: &str = "KEYWARD_PASSWORD";

#[derive(Subcommand)]
pub enum AccountAction {
    /// Create a new account protected by a password.
    Create {
        /// Account password (or set KEYWARD_PASSWORD, or type it on stdin).
        #[arg(long)]
        password: Option<String>,
    },
    /// Select an account, replacing the current selection.
    Login {
        /// Account address (64 hex characters).
        address: String,
        /// Account password (or set KEYWARD_PASSWORD, or type it on stdin).
        #[arg(long)]
        password: Option<String>,
    },
    /// Clear the current selection and wipe its messaging key.
    Logout,
    /// Show the selected account.
    Selected,
}

pub async fn run(action: AccountAction, opts: &GlobalOpts) -> std::result::Result<(), String> {
    match action {
        AccountAction::Create { password } => create(password, opts).await,
        AccountAction::Login { address, password } => login(&address, password, opts).await,
        AccountAction::Logout => logout(opts).await,
        AccountAction::Selected => selected(opts).await,
    }
}

async fn create(password: Option<String>, opts: &GlobalOpts) -> std::result::Result<(), String> {
    let password = resolve_password(password)?;
    let mut client = RpcClient::connect(opts.rpc_addr, opts.timeout_secs).await?;
    let resp = client.signup(&password).await?;

    if !opts.json {
        output::print_success("account created", false);
    }
    output::print_fields(
        &[("address", resp.address), ("pubkey", resp.pubkey)],
        opts.json,
    );
    Ok(())
}

async fn login(
    address: &str,
    password: Option<String>,
    opts: &GlobalOpts,
) -> std::result::Result<(), String> {
    output::validate_address(address)?;
    let password = resolve_password(password)?;

    let mut client = RpcClient::connect(opts.rpc_addr, opts.timeout_secs).await?;
    let resp = client.login(address, &password).await?;

    if !opts.json {
        output::print_success("account selected", false);
    }
    output::print_fields(&[("address_key_id", resp.address_key_id)], opts.json);
    Ok(())
}

async fn logout(opts: &GlobalOpts) -> std::result::Result<(), String> {
    let mut client = RpcClient::connect(opts.rpc_addr, opts.timeout_secs).await?;
    client.logout().await?;
    output::print_success("logged out", opts.json);
    Ok(())
}

async fn selected(opts: &GlobalOpts) -> std::result::Result<(), String> {
    let mut client = RpcClient::connect(opts.rpc_addr, opts.timeout_secs).await?;
    let resp = client.selected_account().await?;

    output::print_fields(
        &[
            ("address", resp.address),
            ("pubkey", resp.pubkey),
            ("key_id", resp.key_id),
        ],
        opts.json,
    );
    Ok(())
}

/// Flag first, then the environment, then one line from stdin.
fn resolve_password(flag: Option<String>) -> std::result::Result<String, String> {
    if let Some(password) = flag {
        return Ok(password);
    }
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }

    eprint!("Password: ");
    let mut input = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut input)
        .map_err(|e| format!("failed to read password: {e}"))?;

    let password = input.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err("password must not be empty".into());
    }
    Ok(password)
}
