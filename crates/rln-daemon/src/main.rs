//! rln-daemon: the RLN protocol server.
//!
//! Single OS process running a Tokio async runtime. Clients speak
//! line-delimited JSON-RPC over TCP; broadcast events are pushed to
//! subscribed connections as notifications.

mod commands;
mod config;
mod proof;
mod rpc;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::config::DaemonConfig;
use crate::proof::Groth16Verifier;
use crate::rpc::RpcServer;
use rln_engine::{EngineConfig, ProtocolEngine};

/// Daemon-wide shared state.
pub struct DaemonState {
    /// The protocol engine; owns all membership and share state.
    pub engine: ProtocolEngine,
    /// Configuration.
    pub config: DaemonConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config (log level lives there)
    let config = DaemonConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("rln={}", config.advanced.log_level).parse()?),
        )
        .init();

    info!("RLN daemon starting");

    // 2. Load the verifying key and build the proof system
    let vk_path = config.verifying_key_path();
    let verifier = Groth16Verifier::load(&vk_path)?;

    // 3. Build the protocol engine
    let engine_config = EngineConfig {
        tree_depth: config.tree.depth,
        tree_arity: config.tree.arity,
        proof_timeout: Duration::from_millis(config.proof.verify_timeout_ms),
        ..EngineConfig::default()
    };
    let engine = ProtocolEngine::new(engine_config, Arc::new(verifier))?;

    // 4. Build daemon state and the RPC server
    let listen_addr = config.network.listen_addr.clone();
    let state = Arc::new(DaemonState { engine, config });
    let rpc_server = RpcServer::new(state, listen_addr);

    // 5. Run until shutdown
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {e}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    info!("daemon stopped");
    Ok(())
}
