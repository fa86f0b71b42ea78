//! The network boundary: everything the pipeline needs from a node, behind
//! one trait so the executor is testable without a chain.
//!
//! Wire formats (argument encoding, signing-message bytes) are owned by the
//! client implementation, never by adapters or the executor.

use crate::adapters::CallDescriptor;
use async_trait::async_trait;

pub mod rest;

/// An unsigned transaction envelope, ready for one signature.
///
/// `signing_message` is chain-native opaque bytes; the account signs them
/// without interpreting them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxEnvelope {
    pub sender: String,
    pub sequence_number: u64,
    pub max_gas_amount: u64,
    pub gas_unit_price: u64,
    pub expiration_timestamp_secs: u64,
    pub payload: serde_json::Value,
    pub signing_message: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx {
    pub envelope: TxEnvelope,
    pub public_key: String,
    pub signature: String,
}

/// Inclusion-and-execution outcome as reported by the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalityStatus {
    pub success: bool,
    pub vm_status: String,
    pub gas_used: u64,
}

/// One poll of a transaction by hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxLookup {
    /// The node has never seen the hash (yet).
    NotFound,
    /// Known but not yet executed.
    Pending,
    Executed(FinalityStatus),
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Construct an envelope for `sender` calling `call`: fetch the current
    /// sequence number, fill gas and expiry, and obtain the chain-native
    /// signing message.
    async fn build(&self, sender: &str, call: &CallDescriptor) -> eyre::Result<TxEnvelope>;

    /// Broadcast a signed transaction. Returns the transaction hash.
    /// Implementations must not re-sign or re-sequence on failure.
    async fn submit(&self, tx: &SignedTx) -> eyre::Result<String>;

    /// Poll the fate of a submitted transaction.
    async fn lookup(&self, hash: &str) -> eyre::Result<TxLookup>;
}

#[cfg(test)]
pub mod testing {
    //! Scriptable in-memory chain used by executor and orchestrator tests.

    use super::{ChainClient, FinalityStatus, SignedTx, TxEnvelope, TxLookup};
    use crate::adapters::CallDescriptor;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum MockOutcome {
        /// Found executed with success=true after `lookups_until_found`.
        Finalize,
        /// Found executed with success=false (on-chain abort).
        Revert,
        /// Never found; drives the confirmation timeout.
        Vanish,
        /// `build` fails before anything is signed.
        RefuseBuild,
        /// `submit` fails at broadcast.
        RefuseSubmit,
    }

    /// Records one submit critical section.
    #[derive(Debug, Clone)]
    pub struct SubmitSpan {
        pub hash: String,
        pub started: Instant,
        pub finished: Instant,
    }

    pub struct MockChain {
        pub outcome: MockOutcome,
        /// How long `submit` holds its critical section.
        pub submit_delay: Duration,
        /// Number of `lookup` calls answered `Pending` before the outcome.
        pub lookups_until_found: u64,
        next_seq: AtomicU64,
        lookups: AtomicU64,
        pub submits: Mutex<Vec<SubmitSpan>>,
        pub builds: AtomicU64,
    }

    impl MockChain {
        pub fn new(outcome: MockOutcome) -> Self {
            Self {
                outcome,
                submit_delay: Duration::from_millis(0),
                lookups_until_found: 0,
                next_seq: AtomicU64::new(0),
                lookups: AtomicU64::new(0),
                submits: Mutex::new(vec![]),
                builds: AtomicU64::new(0),
            }
        }

        pub fn network_calls(&self) -> u64 {
            let submits = self
                .submits
                .lock()
                .ok()
                .and_then(|s| u64::try_from(s.len()).ok())
                .unwrap_or(0);
            self.builds.load(Ordering::SeqCst) + submits + self.lookups.load(Ordering::SeqCst)
        }

        pub fn submit_spans(&self) -> Vec<SubmitSpan> {
            self.submits.lock().map(|s| s.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl ChainClient for MockChain {
        async fn build(&self, sender: &str, call: &CallDescriptor) -> eyre::Result<TxEnvelope> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            if self.outcome == MockOutcome::RefuseBuild {
                eyre::bail!("node rejected payload");
            }
            let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
            Ok(TxEnvelope {
                sender: sender.to_owned(),
                sequence_number: seq,
                max_gas_amount: 20_000,
                gas_unit_price: 100,
                expiration_timestamp_secs: 4_000_000_000,
                payload: serde_json::json!({ "function": call.function }),
                signing_message: format!("msg-{seq}").into_bytes(),
            })
        }

        async fn submit(&self, tx: &SignedTx) -> eyre::Result<String> {
            let started = Instant::now();
            tokio::time::sleep(self.submit_delay).await;
            if self.outcome == MockOutcome::RefuseSubmit {
                eyre::bail!("connection refused");
            }
            let hash = format!("0xhash{}", tx.envelope.sequence_number);
            let span = SubmitSpan {
                hash: hash.clone(),
                started,
                finished: Instant::now(),
            };
            self.submits
                .lock()
                .map_err(|e| eyre::eyre!("mutex poisoned: {e}"))?
                .push(span);
            Ok(hash)
        }

        async fn lookup(&self, _hash: &str) -> eyre::Result<TxLookup> {
            let n = self.lookups.fetch_add(1, Ordering::SeqCst);
            if n < self.lookups_until_found {
                return Ok(TxLookup::Pending);
            }
            match self.outcome {
                MockOutcome::Finalize => Ok(TxLookup::Executed(FinalityStatus {
                    success: true,
                    vm_status: "Executed successfully".to_owned(),
                    gas_used: 7,
                })),
                MockOutcome::Revert => Ok(TxLookup::Executed(FinalityStatus {
                    success: false,
                    vm_status: "Move abort in 0x1::coin: EINSUFFICIENT_BALANCE".to_owned(),
                    gas_used: 3,
                })),
                MockOutcome::Vanish => Ok(TxLookup::NotFound),
                MockOutcome::RefuseBuild | MockOutcome::RefuseSubmit => Ok(TxLookup::NotFound),
            }
        }
    }
}
