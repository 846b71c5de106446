//! Node commands: status, restart.

use clap::Subcommand;

use crate::output;
use crate::rpc_client::RpcClient;
use crate::GlobalOpts;

#[derive(Subcommand)]
pub enum NodeAction {
    /// Show node status.
    Status,
    /// Stop and start the node. The selected account is reinstated
    /// under a new key id.
    Restart,
}

pub async fn run(action: NodeAction, opts: &GlobalOpts) -> std::result::Result<(), String> {
    match action {
        NodeAction::Status => status(opts).await,
        NodeAction::Restart => restart(opts).await,
    }
}

async fn status(opts: &GlobalOpts) -> std::result::Result<(), String> {
    let mut client = RpcClient::connect(opts.rpc_addr, opts.timeout_secs).await?;
    let resp = client.node_status().await?;

    if opts.json {
        let obj = serde_json::json!({
            "state": resp.state,
            "selected_address": resp.selected_address,
            "injected_keys": resp.injected_keys,
            "started_at": resp.started_at,
        });
        println!("{obj}");
        return Ok(());
    }

    output::print_fields(
        &[
            ("State", resp.state),
            (
                "Selected",
                resp.selected_address.unwrap_or_else(|| "(none)".into()),
            ),
            ("Keys", resp.injected_keys.to_string()),
            ("Started", resp.started_at.unwrap_or_else(|| "-".into())),
        ],
        false,
    );
    Ok(())
}

async fn restart(opts: &GlobalOpts) -> std::result::Result<(), String> {
    let mut client = RpcClient::connect(opts.rpc_addr, opts.timeout_secs).await?;
    client.node_restart().await?;
    output::print_success("node restarted", opts.json);
    Ok(())
}
