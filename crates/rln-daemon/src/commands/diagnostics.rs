//! Diagnostics and admin command handlers.

use std::sync::Arc;

use rln_crypto::field;
use serde_json::Value;
use tracing::info;

use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Engine counters and the current membership root.
pub async fn get_stats(state: &Arc<DaemonState>) -> Result {
    let stats = state.engine.stats().await;
    Ok(serde_json::json!({
        "members": stats.members,
        "banned": stats.banned,
        "trackedEpochs": stats.tracked_epochs,
        "storedShares": stats.stored_shares,
        "root": field::field_to_decimal(&stats.root),
        "treeDepth": state.config.tree.depth,
        "treeArity": state.config.tree.arity,
        "eventsEmitted": state.engine.events().sequence(),
    }))
}

/// Drop all share records for an expired epoch tag.
pub async fn purge_epoch(state: &Arc<DaemonState>, params: &Value) -> Result {
    let epoch = params
        .get("epoch")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("epoch required"))?;
    let epoch = field::field_from_decimal(epoch)
        .map_err(|_| RpcError::invalid_params("epoch is not a field element"))?;

    let purged = state.engine.purge_epoch(epoch).await;
    info!(purged, "epoch purged");
    Ok(serde_json::json!({ "purged": purged }))
}
