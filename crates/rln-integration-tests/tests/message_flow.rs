//! Integration test: message classification across epochs and senders.

mod common;

use common::{proof_system, Sender};
use rln_crypto::Fr;
use rln_engine::{EngineConfig, ProtocolEngine, RegistrationOutcome};
use rln_types::wire::MessageStatus;

async fn engine_with_member(sender: &Sender) -> (ProtocolEngine, Fr) {
    let engine = ProtocolEngine::new(EngineConfig::default(), proof_system()).expect("engine");
    let RegistrationOutcome::Registered { leaf_index, .. } =
        engine.register(sender.commitment()).await.expect("register")
    else {
        panic!("sender should be admitted");
    };
    let root = engine.witness(leaf_index).await.expect("witness").root;
    (engine, root)
}

#[tokio::test]
async fn identical_resend_is_duplicate() {
    let alice = Sender::new(7, 3, 11);
    let (engine, root) = engine_with_member(&alice).await;

    let msg = alice.message(1000, "hello", root);
    assert_eq!(
        engine.submit_message(&msg).await.expect("submit"),
        MessageStatus::Valid
    );
    assert_eq!(
        engine.submit_message(&msg).await.expect("submit"),
        MessageStatus::Duplicate
    );
    // Idempotent: no new share, nobody slashed.
    let stats = engine.stats().await;
    assert_eq!(stats.stored_shares, 1);
    assert_eq!(stats.banned, 0);
}

#[tokio::test]
async fn same_content_with_tweaked_y_share_is_still_duplicate() {
    let alice = Sender::new(7, 3, 11);
    let (engine, root) = engine_with_member(&alice).await;

    let msg = alice.message(1000, "hello", root);
    engine.submit_message(&msg).await.expect("submit");

    // Same content means the same x-coordinate: whatever the y claims,
    // this pair can never interpolate, so it must not slash.
    let mut tweaked = msg.clone();
    tweaked.y_share = "123456".into();
    assert_eq!(
        engine.submit_message(&tweaked).await.expect("submit"),
        MessageStatus::Duplicate
    );
    assert_eq!(engine.stats().await.banned, 0);
}

#[tokio::test]
async fn one_message_per_epoch_across_epochs() {
    let alice = Sender::new(7, 3, 11);
    let (engine, root) = engine_with_member(&alice).await;

    // One message per epoch is always within allowance.
    for epoch in [1000u64, 1001, 1002] {
        let msg = alice.message(epoch, "ping", root);
        assert_eq!(
            engine.submit_message(&msg).await.expect("submit"),
            MessageStatus::Valid
        );
    }
    let stats = engine.stats().await;
    assert_eq!(stats.tracked_epochs, 3);
    assert_eq!(stats.banned, 0);
}

#[tokio::test]
async fn distinct_nullifiers_are_independent_senders() {
    let alice = Sender::new(7, 3, 11);
    let bob = Sender::new(8, 4, 22);

    let (engine, _) = engine_with_member(&alice).await;
    let RegistrationOutcome::Registered { leaf_index, .. } =
        engine.register(bob.commitment()).await.expect("register")
    else {
        panic!("bob should be admitted");
    };
    let root = engine.witness(leaf_index).await.expect("witness").root;

    // Both send in the same epoch under different nullifiers: both valid.
    let a = alice.message(1000, "from alice", root);
    let b = bob.message(1000, "from bob", root);
    assert_eq!(
        engine.submit_message(&a).await.expect("submit"),
        MessageStatus::Valid
    );
    assert_eq!(
        engine.submit_message(&b).await.expect("submit"),
        MessageStatus::Valid
    );
    assert_eq!(engine.stats().await.stored_shares, 2);
}

#[tokio::test]
async fn stale_root_proof_is_invalid_and_mutates_nothing() {
    let alice = Sender::new(7, 3, 11);
    let (engine, root) = engine_with_member(&alice).await;

    // A proof bound to a root the tree never had.
    let msg = alice.message(1000, "hello", Fr::from(12345u64));
    assert_eq!(
        engine.submit_message(&msg).await.expect("submit"),
        MessageStatus::Invalid
    );
    assert_eq!(engine.stats().await.stored_shares, 0);

    // The honest version still goes through afterwards.
    let msg = alice.message(1000, "hello", root);
    assert_eq!(
        engine.submit_message(&msg).await.expect("submit"),
        MessageStatus::Valid
    );
}

#[tokio::test]
async fn purged_epoch_resets_the_allowance() {
    let alice = Sender::new(7, 3, 11);
    let (engine, root) = engine_with_member(&alice).await;

    let msg = alice.message(1000, "hello", root);
    engine.submit_message(&msg).await.expect("submit");
    assert_eq!(engine.purge_epoch(Fr::from(1000u64)).await, 1);

    // The window is gone; the same share is fresh again rather than a
    // duplicate or spam.
    assert_eq!(
        engine.submit_message(&msg).await.expect("submit"),
        MessageStatus::Valid
    );
}

#[tokio::test]
async fn malformed_field_is_a_structural_error() {
    let alice = Sender::new(7, 3, 11);
    let (engine, root) = engine_with_member(&alice).await;

    let mut msg = alice.message(1000, "hello", root);
    msg.epoch = "not-a-field-element".into();
    assert!(engine.submit_message(&msg).await.is_err());
}
