//! Protocol orchestration.
//!
//! All mutable protocol state lives in one [`EngineState`] behind a single
//! `RwLock`; every check-then-act sequence completes under one guard, so
//! two concurrent registrations of the same commitment cannot both win and
//! a slashing's ban-plus-zeroing is atomic.
//!
//! Proof verification is the expensive step and runs off-lock: the
//! classifier snapshots `(root, share slot)` under a read guard, verifies
//! on a blocking worker, then takes the write guard and re-validates the
//! snapshot before mutating anything. A root that advanced during
//! verification restarts classification; a share slot that filled in the
//! meantime re-branches to duplicate or spam.

use std::sync::Arc;
use std::time::Duration;

use rln_crypto::{poseidon, shamir, Fr};
use rln_tree::{MembershipTree, Witness};
use rln_types::events::ProtocolEvent;
use rln_types::wire::{Message, MessageStatus};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::detector::ParsedMessage;
use crate::events::EventBus;
use crate::proof::{ProofSystem, PublicSignals};
use crate::registry::{Admission, RegistrationManager};
use crate::shares::EpochShareStore;
use crate::Result;

/// How many times a classification restarts after losing a race with a
/// concurrent root change before failing closed.
const MAX_REVALIDATIONS: usize = 3;

/// Engine construction parameters.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub tree_depth: usize,
    pub tree_arity: usize,
    /// Budget for one external proof verification; overrun classifies the
    /// message as invalid.
    pub proof_timeout: Duration,
    /// Event bus buffer per subscriber.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tree_depth: rln_types::DEFAULT_TREE_DEPTH,
            tree_arity: rln_types::DEFAULT_TREE_ARITY,
            proof_timeout: Duration::from_millis(rln_types::DEFAULT_PROOF_TIMEOUT_MS),
            event_capacity: 1000,
        }
    }
}

/// Outcome of a registration request.
#[derive(Clone, Debug)]
pub enum RegistrationOutcome {
    /// Admitted; the witness is generated in the same critical section so
    /// it is fresh by construction.
    Registered { leaf_index: usize, witness: Witness },
    AlreadyRegistered,
    Banned,
}

/// Point-in-time engine counters for diagnostics.
#[derive(Clone, Copy, Debug)]
pub struct EngineStats {
    pub members: usize,
    pub banned: usize,
    pub tracked_epochs: usize,
    pub stored_shares: usize,
    pub root: Fr,
}

struct EngineState {
    registry: RegistrationManager,
    shares: EpochShareStore,
}

/// The protocol engine: a serialized facade over the membership tree,
/// the ban list and the share store.
pub struct ProtocolEngine {
    state: RwLock<EngineState>,
    proof_system: Arc<dyn ProofSystem>,
    events: EventBus,
    proof_timeout: Duration,
}

impl ProtocolEngine {
    pub fn new(config: EngineConfig, proof_system: Arc<dyn ProofSystem>) -> Result<Self> {
        let tree = MembershipTree::new(config.tree_depth, config.tree_arity)?;
        info!(
            depth = config.tree_depth,
            arity = config.tree_arity,
            capacity = tree.capacity(),
            "protocol engine initialized"
        );
        Ok(Self {
            state: RwLock::new(EngineState {
                registry: RegistrationManager::new(tree),
                shares: EpochShareStore::new(),
            }),
            proof_system,
            events: EventBus::new(config.event_capacity),
            proof_timeout: config.proof_timeout,
        })
    }

    /// The engine's event bus.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Register an identity commitment.
    pub async fn register(&self, commitment: Fr) -> Result<RegistrationOutcome> {
        let mut state = self.state.write().await;
        match state.registry.register(commitment)? {
            Admission::Admitted(leaf_index) => {
                let witness = state.registry.witness_for(leaf_index)?;
                drop(state);
                self.events.emit(ProtocolEvent::UserRegistered);
                Ok(RegistrationOutcome::Registered {
                    leaf_index,
                    witness,
                })
            }
            Admission::AlreadyRegistered => Ok(RegistrationOutcome::AlreadyRegistered),
            Admission::Banned => Ok(RegistrationOutcome::Banned),
        }
    }

    /// Witness for an assigned leaf against the current root.
    pub async fn witness(&self, leaf_index: usize) -> Result<Witness> {
        let state = self.state.read().await;
        Ok(state.registry.witness_for(leaf_index)?)
    }

    /// Classify a submitted message, applying its side effects.
    ///
    /// Returns the domain classification; errors are reserved for
    /// structural problems (malformed field encodings).
    pub async fn submit_message(&self, message: &Message) -> Result<MessageStatus> {
        let parsed = ParsedMessage::parse(message)?;

        for _ in 0..MAX_REVALIDATIONS {
            // Snapshot under a read guard.
            let (root, existing) = {
                let state = self.state.read().await;
                let existing = state
                    .shares
                    .lookup(parsed.epoch, parsed.nullifier)
                    .copied();
                (state.registry.root(), existing)
            };

            // Resends short-circuit before the expensive verification.
            if let Some(ref record) = existing {
                if parsed.resends(record) {
                    return Ok(MessageStatus::Duplicate);
                }
            }

            // Verify off-lock against the snapshot root.
            let signals = PublicSignals {
                y_share: parsed.y_share,
                root,
                nullifier: parsed.nullifier,
                x_share: parsed.x_share,
                epoch: parsed.epoch,
                rln_identifier: parsed.rln_identifier,
            };
            if !self.verify_off_lock(signals, parsed.proof.clone()).await {
                return Ok(MessageStatus::Invalid);
            }

            // Settle under the write guard, re-validating the snapshot.
            let mut state = self.state.write().await;
            if state.registry.root() != root {
                debug!("root advanced during verification; re-evaluating");
                continue;
            }

            match state.shares.lookup(parsed.epoch, parsed.nullifier).copied() {
                Some(record) if parsed.resends(&record) => {
                    return Ok(MessageStatus::Duplicate);
                }
                Some(record) => {
                    // Second distinct share under this key: spam. Both
                    // points lie on the sender's line and differ in x, so
                    // interpolation recovers the secret key.
                    let secret = shamir::recover_secret(
                        record.x_share,
                        record.y_share,
                        parsed.x_share,
                        parsed.y_share,
                    )?;
                    let commitment = poseidon::identity_commitment(secret);
                    state.registry.ban(&commitment);
                    drop(state);
                    info!("rate limit violation; member slashed");
                    self.events.emit(ProtocolEvent::UserSlashed);
                    return Ok(MessageStatus::Spam);
                }
                None => {
                    state
                        .shares
                        .record(parsed.epoch, parsed.nullifier, parsed.share());
                    drop(state);
                    self.events
                        .emit(ProtocolEvent::ReceiveMessage(parsed.content.clone()));
                    return Ok(MessageStatus::Valid);
                }
            }
        }

        // Persistent contention: never apply a stale verdict.
        warn!("classification lost {MAX_REVALIDATIONS} root races; failing closed");
        Ok(MessageStatus::Invalid)
    }

    /// Drop all share records for one epoch tag.
    pub async fn purge_epoch(&self, epoch: Fr) -> usize {
        let mut state = self.state.write().await;
        state.shares.purge_epoch(epoch)
    }

    /// Current engine counters.
    pub async fn stats(&self) -> EngineStats {
        let state = self.state.read().await;
        EngineStats {
            members: state.registry.member_count(),
            banned: state.registry.banned_count(),
            tracked_epochs: state.shares.epoch_count(),
            stored_shares: state.shares.len(),
            root: state.registry.root(),
        }
    }

    /// Run proof verification on a blocking worker under the configured
    /// timeout. Any failure (backend error, dead worker, timeout)
    /// verifies to false; the engine never fails open.
    async fn verify_off_lock(&self, signals: PublicSignals, proof: Vec<u8>) -> bool {
        let proof_system = Arc::clone(&self.proof_system);
        let flat = signals.to_vec();
        let task = tokio::task::spawn_blocking(move || proof_system.verify_proof(&flat, &proof));

        match tokio::time::timeout(self.proof_timeout, task).await {
            Ok(Ok(Ok(verified))) => verified,
            Ok(Ok(Err(e))) => {
                warn!(error = %e, "proof system failure; treating message as invalid");
                false
            }
            Ok(Err(e)) => {
                warn!(error = %e, "verification worker died; treating message as invalid");
                false
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.proof_timeout.as_millis() as u64,
                    "proof verification timed out; treating message as invalid"
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for ProtocolEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolEngine")
            .field("proof_timeout", &self.proof_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::ProofSystemError;
    use rln_crypto::field;

    /// Proof system that trusts everything; classification tests care
    /// about the share algebra, not SNARK internals.
    struct AcceptAll;

    impl ProofSystem for AcceptAll {
        fn verify_proof(
            &self,
            _public_signals: &[Fr],
            _proof: &[u8],
        ) -> std::result::Result<bool, ProofSystemError> {
            Ok(true)
        }
    }

    /// Proof system that rejects everything.
    struct RejectAll;

    impl ProofSystem for RejectAll {
        fn verify_proof(
            &self,
            _public_signals: &[Fr],
            _proof: &[u8],
        ) -> std::result::Result<bool, ProofSystemError> {
            Ok(false)
        }
    }

    /// Proof system that outlives any reasonable timeout.
    struct Stall;

    impl ProofSystem for Stall {
        fn verify_proof(
            &self,
            _public_signals: &[Fr],
            _proof: &[u8],
        ) -> std::result::Result<bool, ProofSystemError> {
            std::thread::sleep(Duration::from_secs(5));
            Ok(true)
        }
    }

    fn engine_with(proof_system: Arc<dyn ProofSystem>) -> ProtocolEngine {
        let config = EngineConfig {
            tree_depth: 6,
            ..EngineConfig::default()
        };
        ProtocolEngine::new(config, proof_system).expect("engine")
    }

    /// Build a wire message the way an honest client would: one point on
    /// `y = a1 * x + sk`, tagged with the sender's per-epoch nullifier.
    fn client_message(sk: Fr, a1: Fr, nullifier: u64, epoch: u64, content: &str) -> Message {
        let x = field::signal_hash(content.as_bytes());
        let y = a1 * x + sk;
        Message {
            proof: vec![0xAB; 4],
            nullifier: nullifier.to_string(),
            content: content.into(),
            epoch: epoch.to_string(),
            y_share: field::field_to_decimal(&y),
            rln_identifier: None,
        }
    }

    #[tokio::test]
    async fn test_register_then_already_registered() {
        let engine = engine_with(Arc::new(AcceptAll));
        let commitment = poseidon::identity_commitment(Fr::from(7u64));

        let first = engine.register(commitment).await.expect("register");
        let RegistrationOutcome::Registered { leaf_index, witness } = first else {
            panic!("expected admission");
        };
        assert_eq!(leaf_index, 0);
        assert!(rln_tree::witness::verify_witness(commitment, &witness));

        let second = engine.register(commitment).await.expect("register");
        assert!(matches!(second, RegistrationOutcome::AlreadyRegistered));
    }

    #[tokio::test]
    async fn test_valid_message_records_share_and_broadcasts() {
        let engine = engine_with(Arc::new(AcceptAll));
        let mut rx = engine.events().subscribe();

        let sk = Fr::from(7u64);
        engine
            .register(poseidon::identity_commitment(sk))
            .await
            .expect("register");
        rx.try_recv().expect("registration event");

        let msg = client_message(sk, Fr::from(3u64), 11, 1000, "hello");
        let status = engine.submit_message(&msg).await.expect("submit");
        assert_eq!(status, MessageStatus::Valid);
        assert_eq!(
            rx.try_recv().expect("event"),
            ProtocolEvent::ReceiveMessage("hello".into())
        );

        let stats = engine.stats().await;
        assert_eq!(stats.stored_shares, 1);
        assert_eq!(stats.tracked_epochs, 1);
    }

    #[tokio::test]
    async fn test_identical_resend_is_duplicate() {
        let engine = engine_with(Arc::new(AcceptAll));
        let sk = Fr::from(7u64);
        engine
            .register(poseidon::identity_commitment(sk))
            .await
            .expect("register");

        let msg = client_message(sk, Fr::from(3u64), 11, 1000, "hello");
        assert_eq!(
            engine.submit_message(&msg).await.expect("submit"),
            MessageStatus::Valid
        );
        assert_eq!(
            engine.submit_message(&msg).await.expect("submit"),
            MessageStatus::Duplicate
        );
        // Nothing new stored.
        assert_eq!(engine.stats().await.stored_shares, 1);
    }

    #[tokio::test]
    async fn test_second_distinct_message_slashes_sender() {
        let engine = engine_with(Arc::new(AcceptAll));
        let mut rx = engine.events().subscribe();

        let sk = Fr::from(7u64);
        let a1 = Fr::from(31337u64);
        let commitment = poseidon::identity_commitment(sk);
        engine.register(commitment).await.expect("register");
        let _ = rx.try_recv();

        let first = client_message(sk, a1, 11, 1000, "hello");
        assert_eq!(
            engine.submit_message(&first).await.expect("submit"),
            MessageStatus::Valid
        );
        let _ = rx.try_recv();

        let second = client_message(sk, a1, 11, 1000, "world");
        assert_eq!(
            engine.submit_message(&second).await.expect("submit"),
            MessageStatus::Spam
        );
        assert_eq!(rx.try_recv().expect("event"), ProtocolEvent::UserSlashed);

        // Reconstruction found the right member: banned and zeroed out.
        let stats = engine.stats().await;
        assert_eq!(stats.banned, 1);
        let witness = engine.witness(0).await.expect("witness");
        assert!(rln_tree::witness::verify_witness(Fr::from(0u64), &witness));

        // And the slashed identity can never come back.
        let again = engine.register(commitment).await.expect("register");
        assert!(matches!(again, RegistrationOutcome::Banned));
    }

    #[tokio::test]
    async fn test_invalid_proof_never_slashes_an_occupied_slot() {
        use std::sync::atomic::{AtomicBool, Ordering};

        /// Flips from accepting to rejecting mid-test.
        struct Toggle {
            accept: AtomicBool,
        }
        impl ProofSystem for Toggle {
            fn verify_proof(
                &self,
                _public_signals: &[Fr],
                _proof: &[u8],
            ) -> std::result::Result<bool, ProofSystemError> {
                Ok(self.accept.load(Ordering::SeqCst))
            }
        }

        let toggle = Arc::new(Toggle {
            accept: AtomicBool::new(true),
        });
        let engine = engine_with(toggle.clone());

        let sk = Fr::from(7u64);
        let a1 = Fr::from(3u64);
        engine
            .register(poseidon::identity_commitment(sk))
            .await
            .expect("register");
        let first = client_message(sk, a1, 11, 1000, "hello");
        assert_eq!(
            engine.submit_message(&first).await.expect("submit"),
            MessageStatus::Valid
        );

        // An attacker aims garbage at the now-occupied nullifier slot:
        // the proof fails, so this must be Invalid, never Spam.
        toggle.accept.store(false, Ordering::SeqCst);
        let forged = client_message(Fr::from(999u64), a1, 11, 1000, "world");
        assert_eq!(
            engine.submit_message(&forged).await.expect("submit"),
            MessageStatus::Invalid
        );
        let stats = engine.stats().await;
        assert_eq!(stats.banned, 0);
        assert_eq!(stats.stored_shares, 1);
    }

    #[tokio::test]
    async fn test_rejected_proof_is_invalid() {
        let engine = engine_with(Arc::new(RejectAll));
        let sk = Fr::from(9u64);
        engine
            .register(poseidon::identity_commitment(sk))
            .await
            .expect("register");

        let msg = client_message(sk, Fr::from(2u64), 5, 77, "hi");
        assert_eq!(
            engine.submit_message(&msg).await.expect("submit"),
            MessageStatus::Invalid
        );
        assert_eq!(engine.stats().await.stored_shares, 0);
    }

    #[tokio::test]
    async fn test_verification_timeout_is_invalid() {
        let config = EngineConfig {
            tree_depth: 4,
            proof_timeout: Duration::from_millis(50),
            ..EngineConfig::default()
        };
        let engine = ProtocolEngine::new(config, Arc::new(Stall)).expect("engine");
        let sk = Fr::from(9u64);
        engine
            .register(poseidon::identity_commitment(sk))
            .await
            .expect("register");

        let msg = client_message(sk, Fr::from(2u64), 5, 77, "hi");
        assert_eq!(
            engine.submit_message(&msg).await.expect("submit"),
            MessageStatus::Invalid
        );
    }

    #[tokio::test]
    async fn test_malformed_field_is_structural_error() {
        let engine = engine_with(Arc::new(AcceptAll));
        let mut msg = client_message(Fr::from(1u64), Fr::from(2u64), 5, 77, "hi");
        msg.nullifier = "deadbeef".into();
        assert!(engine.submit_message(&msg).await.is_err());
    }

    #[tokio::test]
    async fn test_purge_epoch_drops_shares() {
        let engine = engine_with(Arc::new(AcceptAll));
        let sk = Fr::from(7u64);
        engine
            .register(poseidon::identity_commitment(sk))
            .await
            .expect("register");

        let msg = client_message(sk, Fr::from(3u64), 11, 1000, "hello");
        engine.submit_message(&msg).await.expect("submit");
        assert_eq!(engine.purge_epoch(Fr::from(1000u64)).await, 1);
        assert_eq!(engine.stats().await.stored_shares, 0);

        // After the purge the same message is fresh again.
        assert_eq!(
            engine.submit_message(&msg).await.expect("submit"),
            MessageStatus::Valid
        );
    }
}
