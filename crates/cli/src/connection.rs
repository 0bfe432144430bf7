//! Connection resolution: IPC wins over everything, then named presets, then
//! the raw host/port/TLS flags.

use crate::args::Args;
use crate::commands::CommandKind;
use crate::config::Config;
use crate::input::InputKind;
use argus_analysis::CodeLoader;
use argus_chain::{NodeClient, Preset, RpcSettings};
use argus_utils::errors::ConnectionError;
use async_trait::async_trait;

/// RPC endpoint settings from the flags. A preset overrides host, port and
/// TLS as a unit; the raw flags only apply when no preset is selected.
pub fn rpc_settings(args: &Args) -> RpcSettings {
    let preset = if args.infura_mainnet {
        Some(Preset::Mainnet)
    } else if args.infura_rinkeby {
        Some(Preset::Rinkeby)
    } else if args.infura_kovan {
        Some(Preset::Kovan)
    } else if args.infura_ropsten {
        Some(Preset::Ropsten)
    } else {
        None
    };
    if let Some(preset) = preset {
        return preset.settings();
    }

    let defaults = RpcSettings::default();
    RpcSettings::new(
        args.rpchost.clone().unwrap_or(defaults.host),
        args.rpcport.unwrap_or(defaults.port),
        args.rpctls,
    )
}

/// Whether this run needs chain data at all: an address input, or dynamic
/// dependency loading alongside a state-space mode.
pub fn needs_connection(input: &InputKind, kind: &CommandKind, dynld: bool) -> bool {
    input.needs_connection()
        || (dynld && matches!(kind, CommandKind::Graph(_) | CommandKind::FireLasers))
}

/// Builds the connection. Failures are fatal; nothing retries.
pub async fn resolve(args: &Args, config: &Config) -> Result<NodeClient, ConnectionError> {
    if args.ipc {
        let path = config.home.join(".ethereum").join("geth.ipc");
        NodeClient::ipc(path).await
    } else {
        Ok(NodeClient::rpc(&rpc_settings(args)))
    }
}

/// Adapter letting the state-space builder pull dependency code through the
/// resolved connection.
pub struct ChainLoader<'a>(pub &'a NodeClient);

#[async_trait]
impl CodeLoader for ChainLoader<'_> {
    async fn code_at(&self, address: &str) -> Result<Vec<u8>, ConnectionError> {
        self.0.code_at(address).await
    }
}
