//! Protocol command handlers: registration, witnesses, messages.

use std::sync::Arc;

use rln_crypto::field;
use rln_engine::{EngineError, RegistrationOutcome};
use rln_types::wire::{
    FetchStatus, GetWitnessResponse, Message, RegisterResponse, RegistrationStatus,
    SubmitResponse,
};
use serde_json::Value;
use tracing::error;

use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Register an identity commitment; the response carries the leaf index
/// and a fresh witness so a new member can send immediately.
pub async fn register(state: &Arc<DaemonState>, params: &Value) -> Result {
    let commitment = params
        .get("identityCommitment")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("identityCommitment required"))?;
    let commitment = field::field_from_decimal(commitment)
        .map_err(|_| RpcError::invalid_params("identityCommitment is not a field element"))?;

    let response = match state.engine.register(commitment).await {
        Ok(RegistrationOutcome::Registered {
            leaf_index,
            witness,
        }) => RegisterResponse {
            status: RegistrationStatus::Valid,
            leaf_index: Some(leaf_index),
            witness: Some(witness.to_wire()),
        },
        Ok(RegistrationOutcome::AlreadyRegistered) => RegisterResponse {
            status: RegistrationStatus::AlreadyRegistered,
            leaf_index: None,
            witness: None,
        },
        Ok(RegistrationOutcome::Banned) => RegisterResponse {
            status: RegistrationStatus::Banned,
            leaf_index: None,
            witness: None,
        },
        Err(e) => {
            error!(error = %e, "registration failed");
            return Err(RpcError::internal_error(&e.to_string()));
        }
    };

    serde_json::to_value(response).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// Fetch a fresh witness for an assigned leaf.
pub async fn get_witness(state: &Arc<DaemonState>, params: &Value) -> Result {
    let leaf_index = params
        .get("leafIndex")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params("leafIndex required"))? as usize;

    let witness = match state.engine.witness(leaf_index).await {
        Ok(witness) => witness,
        Err(EngineError::Tree(e)) => {
            return Err(RpcError::invalid_params(&e.to_string()));
        }
        Err(e) => {
            error!(error = %e, "witness generation failed");
            return Err(RpcError::internal_error(&e.to_string()));
        }
    };

    let response = GetWitnessResponse {
        status: FetchStatus::Success,
        witness: witness.to_wire(),
    };
    serde_json::to_value(response).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// Classify a submitted message and apply its consequences.
pub async fn submit_message(state: &Arc<DaemonState>, params: &Value) -> Result {
    let message: Message = serde_json::from_value(params.clone())
        .map_err(|e| RpcError::invalid_params(&format!("malformed message: {e}")))?;

    let status = match state.engine.submit_message(&message).await {
        Ok(status) => status,
        Err(EngineError::Crypto(e)) => {
            return Err(RpcError::invalid_params(&e.to_string()));
        }
        Err(e) => {
            error!(error = %e, "message classification failed");
            return Err(RpcError::internal_error(&e.to_string()));
        }
    };

    serde_json::to_value(SubmitResponse { status })
        .map_err(|e| RpcError::internal_error(&e.to_string()))
}
