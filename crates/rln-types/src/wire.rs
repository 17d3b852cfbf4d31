//! Wire schema for the request/response surface.
//!
//! Field elements are decimal-string integers in transit. Field names and
//! status strings are part of the protocol: existing clients match on
//! `alreadyRegistered`, `yShare`, `pathElements` and friends, so every
//! rename here is camelCase.

use serde::{Deserialize, Serialize};

/// A message submitted for broadcast.
///
/// `xShare` never travels: it is the hash of `content`, and the engine
/// recomputes it so a sender cannot lie about which point on their secret
/// line the message reveals.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Opaque serialized proof, forwarded to the proof system unparsed.
    pub proof: Vec<u8>,
    /// Per-(identity, epoch) nullifier tag.
    pub nullifier: String,
    /// Message content.
    pub content: String,
    /// Rate-limiting window tag.
    pub epoch: String,
    /// The y-coordinate of the revealed share point.
    pub y_share: String,
    /// Application separation tag for multi-tenant deployments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rln_identifier: Option<String>,
}

/// A membership witness in wire form.
///
/// `path_elements` is ordered leaf-to-root; each inner group carries the
/// `arity - 1` sibling values of one level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WitnessWire {
    pub root: String,
    pub path_elements: Vec<Vec<String>>,
    pub path_indices: Vec<usize>,
}

/// Outcome of a registration attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegistrationStatus {
    Valid,
    AlreadyRegistered,
    Banned,
}

/// Classification of a submitted message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageStatus {
    Valid,
    Duplicate,
    Invalid,
    Spam,
}

/// Response to a registration request.
///
/// On success the witness rides along so a fresh member does not need a
/// second round-trip before sending its first message.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub status: RegistrationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaf_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness: Option<WitnessWire>,
}

/// Response to a witness request.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetWitnessResponse {
    pub status: FetchStatus,
    pub witness: WitnessWire,
}

/// Status tag for fetch-style requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FetchStatus {
    Success,
}

/// Response to a message submission.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub status: MessageStatus,
}
