//! Message parsing and classification rules.
//!
//! A submitted message lands in exactly one of four buckets:
//!
//! - **duplicate** — byte-for-byte resend of a share already on record;
//!   idempotent, nothing to do.
//! - **invalid** — the proof does not verify against the current root;
//!   nothing is mutated, and in particular an attacker cannot force a
//!   slashing by lobbing garbage at someone else's nullifier.
//! - **spam** — a second, different message under an occupied
//!   `(epoch, nullifier)` slot; the two shares reconstruct the secret key.
//! - **valid** — first message in this epoch; its share goes on record.
//!
//! The ordering is load-bearing: duplicates short-circuit before proof
//! verification, and verification happens before the spam check so that
//! only proven messages can trigger a ban.

use rln_crypto::{field, Fr};
use rln_types::wire::Message;

use crate::shares::ShareRecord;
use crate::Result;

/// A message with every wire string decoded into the field.
///
/// `x_share` is recomputed from the content here, so the sender never
/// gets to claim which point on its line a message reveals.
#[derive(Clone, Debug)]
pub struct ParsedMessage {
    pub nullifier: Fr,
    pub epoch: Fr,
    pub x_share: Fr,
    pub y_share: Fr,
    pub rln_identifier: Option<Fr>,
    pub content: String,
    pub proof: Vec<u8>,
}

impl ParsedMessage {
    /// Decode a wire message. A malformed field element anywhere is a
    /// structural error, not an `invalid` classification.
    pub fn parse(message: &Message) -> Result<Self> {
        let rln_identifier = message
            .rln_identifier
            .as_deref()
            .map(field::field_from_decimal)
            .transpose()?;

        Ok(Self {
            nullifier: field::field_from_decimal(&message.nullifier)?,
            epoch: field::field_from_decimal(&message.epoch)?,
            x_share: field::signal_hash(message.content.as_bytes()),
            y_share: field::field_from_decimal(&message.y_share)?,
            rln_identifier,
            content: message.content.clone(),
            proof: message.proof.clone(),
        })
    }

    /// Whether a stored share makes this message a resend.
    ///
    /// Matching x alone is enough to rule out spam: the same content can
    /// only reveal the same point, so two records sharing an x-coordinate
    /// are indistinguishable from a resend and never interpolable. An
    /// honest resend also matches in y (y is a deterministic function of
    /// x for a given sender and epoch); a mismatched y under a matched x
    /// is a malformed share that still classifies as duplicate rather
    /// than handing the classifier a degenerate point pair.
    pub fn resends(&self, existing: &ShareRecord) -> bool {
        existing.x_share == self.x_share
    }

    /// The share this message reveals.
    pub fn share(&self) -> ShareRecord {
        ShareRecord {
            x_share: self.x_share,
            y_share: self.y_share,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire_message(content: &str) -> Message {
        Message {
            proof: vec![1, 2, 3],
            nullifier: "11".into(),
            content: content.into(),
            epoch: "1000".into(),
            y_share: "42".into(),
            rln_identifier: None,
        }
    }

    #[test]
    fn test_parse_recomputes_x_share() {
        let parsed = ParsedMessage::parse(&wire_message("hello")).expect("parse");
        assert_eq!(parsed.x_share, field::signal_hash(b"hello"));
        assert_eq!(parsed.y_share, Fr::from(42u64));
        assert_eq!(parsed.nullifier, Fr::from(11u64));
    }

    #[test]
    fn test_parse_rejects_malformed_fields() {
        let mut msg = wire_message("hello");
        msg.epoch = "not-a-number".into();
        assert!(ParsedMessage::parse(&msg).is_err());

        let mut msg = wire_message("hello");
        msg.rln_identifier = Some("xyz".into());
        assert!(ParsedMessage::parse(&msg).is_err());
    }

    #[test]
    fn test_resend_detection() {
        let parsed = ParsedMessage::parse(&wire_message("hello")).expect("parse");

        // Exact duplicate.
        assert!(parsed.resends(&parsed.share()));

        // Same content, different y: still a resend, never spam material.
        let same_x = ShareRecord {
            x_share: parsed.x_share,
            y_share: Fr::from(999u64),
        };
        assert!(parsed.resends(&same_x));

        // Different content: spam material.
        let other = ParsedMessage::parse(&wire_message("world")).expect("parse");
        assert!(!parsed.resends(&other.share()));
    }
}
