//! Broadcast events pushed from the engine to every connected party.
//!
//! Events deliberately carry no identity material: `userSlashed` announces
//! that a removal happened without saying who was removed, and
//! `userRegistered` carries nothing at all. Clients react by refreshing
//! their witness, since both events move the membership root.

use serde::{Deserialize, Serialize};

/// An event broadcast to all connected clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ProtocolEvent {
    /// A new member joined the tree.
    UserRegistered,
    /// A member was slashed and removed from the tree.
    UserSlashed,
    /// A valid message to relay to everyone.
    ReceiveMessage(String),
}
