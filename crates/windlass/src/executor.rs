//! Drives one call through the transaction state machine:
//! `Building → Signed → Submitted → AwaitingFinality → {Finalized | Reverted | TimedOut}`.
//!
//! The machine is split at the sequencer boundary: [`Executor::submit`]
//! covers the stages that must hold the account slot, [`Executor::confirm`]
//! runs after the slot is released.

use crate::account::SigningAccount;
use crate::adapters::CallDescriptor;
use crate::chain::{ChainClient, SignedTx, TxLookup};
use crate::config::ExecutorSettings;
use crate::errors::ExecutionError;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// A broadcast transaction awaiting its fate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    pub hash: String,
}

/// A transaction included and executed successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmed {
    pub hash: String,
    pub gas_used: u64,
}

pub struct Executor<C> {
    client: Arc<C>,
    confirm_timeout: Duration,
    poll_interval: Duration,
}

impl<C: ChainClient> Executor<C> {
    pub fn new(client: Arc<C>, settings: &ExecutorSettings) -> Self {
        Self {
            client,
            confirm_timeout: Duration::from_secs(settings.confirm_timeout_secs),
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
        }
    }

    /// Build, sign and broadcast one call. Must run inside the account's
    /// sequencer slot. Nothing here retries: a second broadcast against an
    /// advanced sequence number is how double-spends happen.
    pub async fn submit(
        &self,
        account: &SigningAccount,
        call: &CallDescriptor,
    ) -> Result<Submitted, ExecutionError> {
        let envelope = self
            .client
            .build(account.address(), call)
            .await
            .map_err(|e| ExecutionError::BuildFailed(format!("{e:#}")))?;

        let signature = account.sign(&envelope.signing_message);
        let signed = SignedTx {
            envelope,
            public_key: account.public_key_hex().to_owned(),
            signature,
        };

        let hash = self
            .client
            .submit(&signed)
            .await
            .map_err(|e| ExecutionError::SubmitFailed(format!("{e:#}")))?;

        tracing::info!(
            %hash,
            function = %call.function,
            sequence_number = signed.envelope.sequence_number,
            "transaction submitted"
        );
        Ok(Submitted { hash })
    }

    /// Await finality for a broadcast transaction. Runs outside the
    /// sequencer slot. Transient lookup errors are tolerated until the
    /// deadline; the deadline itself is mandatory.
    pub async fn confirm(&self, submitted: Submitted) -> Result<Confirmed, ExecutionError> {
        let hash = submitted.hash;
        let deadline = Instant::now() + self.confirm_timeout;

        loop {
            match self.client.lookup(&hash).await {
                Ok(TxLookup::Executed(status)) => {
                    if status.success {
                        tracing::info!(%hash, gas_used = status.gas_used, "transaction finalized");
                        return Ok(Confirmed {
                            hash,
                            gas_used: status.gas_used,
                        });
                    }
                    tracing::warn!(%hash, vm_status = %status.vm_status, "transaction reverted");
                    return Err(ExecutionError::ChainReverted {
                        hash,
                        reason: status.vm_status,
                    });
                }
                Ok(TxLookup::NotFound | TxLookup::Pending) => {}
                Err(e) => {
                    // The node boundary owns its own retries; a flaky poll
                    // only matters if it outlasts the deadline.
                    tracing::warn!(%hash, error = %format!("{e:#}"), "finality poll failed");
                }
            }

            if Instant::now() + self.poll_interval > deadline {
                tracing::warn!(%hash, "finality wait exceeded deadline, outcome unknown");
                return Err(ExecutionError::ConfirmationTimeout { hash });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
