//! End-to-end coordination of one request:
//! validate → pending callback → resolve → sequenced submit →
//! unsequenced confirm → exactly one terminal callback.
//!
//! The orchestrator retries nothing. A failed request is terminal; retrying
//! a stale validated intent could double-spend if the first submission in
//! fact landed, so a retry is a brand-new request through the validator.

use crate::adapters;
use crate::callbacks::{ActionCallback, CallbackSink, RequestContext};
use crate::chain::ChainClient;
use crate::executor::Executor;
use crate::extract::IntentExtractor;
use crate::intent::{self, OperationKind, RawIntent};
use crate::sequencer::AccountSequencer;
use std::sync::Arc;

pub struct Orchestrator<C> {
    sequencer: Arc<AccountSequencer>,
    executor: Executor<C>,
    sink: Arc<dyn CallbackSink>,
}

impl<C: ChainClient> Orchestrator<C> {
    pub fn new(
        sequencer: Arc<AccountSequencer>,
        executor: Executor<C>,
        sink: Arc<dyn CallbackSink>,
    ) -> Self {
        Self {
            sequencer,
            executor,
            sink,
        }
    }

    /// Entry point for the surrounding host: extract, then run. Extraction
    /// transport failures terminate the request before validation.
    pub async fn dispatch(
        &self,
        extractor: &dyn IntentExtractor,
        kind: OperationKind,
        message: &str,
        ctx: &RequestContext,
    ) {
        match extractor.extract(kind, message).await {
            Ok(raw) => self.run(kind, &raw, ctx).await,
            Err(e) => {
                tracing::warn!(
                    kind = kind.as_str(),
                    error = %format!("{e:#}"),
                    "intent extraction failed"
                );
                self.emit(&ActionCallback::error(
                    kind,
                    ctx,
                    "extraction_failed",
                    "could not understand the request",
                    None,
                ))
                .await;
            }
        }
    }

    /// Run one raw intent through the pipeline. Side effects only through
    /// callback emission; every path emits exactly one terminal frame.
    pub async fn run(&self, kind: OperationKind, raw: &RawIntent, ctx: &RequestContext) {
        let validated = match intent::validate(kind, raw) {
            Ok(v) => v,
            Err(e) => {
                tracing::info!(kind = kind.as_str(), error = %e, "intent rejected");
                self.emit(&ActionCallback::error(kind, ctx, e.code(), &e.to_string(), None))
                    .await;
                return;
            }
        };

        let summary = adapters::describe(&validated);
        self.emit(&ActionCallback::pending(kind, ctx, &summary)).await;

        let call = adapters::resolve(&validated);

        // The slot covers build+sign+submit only; the finality wait below
        // must not block the next queued submission.
        let submitted = self
            .sequencer
            .with_account(|account| self.executor.submit(account, &call))
            .await;

        let submitted = match submitted {
            Ok(s) => s,
            Err(e) => {
                self.emit(&ActionCallback::execution_error(kind, ctx, &e)).await;
                return;
            }
        };

        match self.executor.confirm(submitted).await {
            Ok(confirmed) => {
                self.emit(&ActionCallback::complete(kind, ctx, &summary, &confirmed.hash))
                    .await;
            }
            Err(e) => {
                self.emit(&ActionCallback::execution_error(kind, ctx, &e)).await;
            }
        }
    }

    /// Callback delivery is best-effort: a broken transport must not take
    /// down the pipeline mid-transaction.
    async fn emit(&self, cb: &ActionCallback) {
        if let Err(e) = self.sink.emit(cb).await {
            tracing::warn!(
                request_id = %cb.content.request_id,
                error = %format!("{e:#}"),
                "callback emission failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::SigningAccount;
    use crate::callbacks::testing::MemorySink;
    use crate::callbacks::CallbackStatus;
    use crate::chain::testing::{MockChain, MockOutcome};
    use crate::config::ExecutorSettings;
    use secrecy::SecretString;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::Instant;

    struct Rig {
        chain: Arc<MockChain>,
        sink: Arc<MemorySink>,
        orch: Arc<Orchestrator<MockChain>>,
    }

    fn rig_with(chain: MockChain, settings: &ExecutorSettings) -> eyre::Result<Rig> {
        let material = SecretString::new(
            "0x0404040404040404040404040404040404040404040404040404040404040404"
                .to_owned()
                .into(),
        );
        let account = SigningAccount::from_private_key_hex(&material)?;
        let sequencer = Arc::new(AccountSequencer::new(account));
        let chain = Arc::new(chain);
        let sink = Arc::new(MemorySink::default());
        let executor = Executor::new(Arc::clone(&chain), settings);
        let orch = Arc::new(Orchestrator::new(
            sequencer,
            executor,
            Arc::clone(&sink) as Arc<dyn CallbackSink>,
        ));
        Ok(Rig { chain, sink, orch })
    }

    fn rig(outcome: MockOutcome) -> eyre::Result<Rig> {
        rig_with(
            MockChain::new(outcome),
            &ExecutorSettings {
                confirm_timeout_secs: 5,
                poll_interval_ms: 1,
            },
        )
    }

    fn raw(v: serde_json::Value) -> RawIntent {
        v.as_object().cloned().unwrap_or_default()
    }

    fn statuses(frames: &[ActionCallback]) -> Vec<CallbackStatus> {
        frames.iter().map(|f| f.content.status).collect()
    }

    fn terminal_count(frames: &[ActionCallback]) -> usize {
        frames.iter().filter(|f| f.is_terminal()).count()
    }

    #[tokio::test]
    async fn missing_field_rejects_before_any_network_call() -> eyre::Result<()> {
        let r = rig(MockOutcome::Finalize)?;
        let ctx = RequestContext::new(None);

        r.orch
            .run(OperationKind::Lend, &raw(json!({"token": "APT"})), &ctx)
            .await;

        let frames = r.sink.frames();
        assert_eq!(
            statuses(&frames),
            vec![CallbackStatus::Error],
            "single terminal error, no pending"
        );
        let first = frames.first();
        assert_eq!(
            first.and_then(|f| f.content.error_code),
            Some("missing_field"),
            "error names the validation failure"
        );
        assert!(
            first.is_some_and(|f| f.text.contains("amount")),
            "offending field named in text: {frames:?}"
        );
        assert_eq!(r.chain.network_calls(), 0, "nothing touched the network");
        Ok(())
    }

    #[tokio::test]
    async fn lend_happy_path_emits_pending_then_complete() -> eyre::Result<()> {
        let r = rig(MockOutcome::Finalize)?;
        let ctx = RequestContext::new(Some("room-9".to_owned()));

        r.orch
            .run(
                OperationKind::Lend,
                &raw(json!({"token": "APT", "amount": "100"})),
                &ctx,
            )
            .await;

        let frames = r.sink.frames();
        assert_eq!(
            statuses(&frames),
            vec![CallbackStatus::Pending, CallbackStatus::Complete],
            "pending precedes the single terminal"
        );
        let terminal = frames.last();
        let hash = terminal.and_then(|f| f.content.transaction_hash.clone());
        assert!(
            hash.as_deref().is_some_and(|h| !h.is_empty()),
            "complete carries a non-empty hash: {frames:?}"
        );
        assert!(
            terminal.is_some_and(|f| f.text.contains("100 APT")),
            "summary names amount and symbol: {frames:?}"
        );
        assert!(
            terminal.is_some_and(|f| f.content.channel.as_deref() == Some("room-9")),
            "channel echoed for routing"
        );
        Ok(())
    }

    #[tokio::test]
    async fn revert_surfaces_with_original_hash() -> eyre::Result<()> {
        let r = rig(MockOutcome::Revert)?;
        let ctx = RequestContext::new(None);

        r.orch
            .run(OperationKind::Stake, &raw(json!({"amount": 3})), &ctx)
            .await;

        let frames = r.sink.frames();
        assert_eq!(terminal_count(&frames), 1, "exactly one terminal");
        let terminal = frames.last();
        assert_eq!(
            terminal.and_then(|f| f.content.error_code),
            Some("chain_reverted"),
            "included-but-aborted is a revert, not a submit failure"
        );
        let submitted_hash = r.chain.submit_spans().first().map(|s| s.hash.clone());
        assert_eq!(
            terminal.and_then(|f| f.content.transaction_hash.clone()),
            submitted_hash,
            "revert keeps the broadcast hash"
        );
        Ok(())
    }

    #[tokio::test]
    async fn confirmation_timeout_is_exactly_one_terminal() -> eyre::Result<()> {
        let r = rig_with(
            MockChain::new(MockOutcome::Vanish),
            &ExecutorSettings {
                confirm_timeout_secs: 0,
                poll_interval_ms: 1,
            },
        )?;
        let ctx = RequestContext::new(None);

        r.orch
            .run(OperationKind::Stake, &raw(json!({"amount": 5})), &ctx)
            .await;

        let frames = r.sink.frames();
        assert_eq!(
            statuses(&frames),
            vec![CallbackStatus::Pending, CallbackStatus::Error],
            "pending then one timeout terminal"
        );
        assert_eq!(
            frames.last().and_then(|f| f.content.error_code),
            Some("confirmation_timeout"),
            "give-up reports unknown outcome, not failure"
        );
        assert!(
            frames
                .last()
                .is_some_and(|f| f.content.transaction_hash.is_some()),
            "timeout still reports the hash for audit"
        );
        Ok(())
    }

    #[tokio::test]
    async fn submit_refusal_reports_without_hash() -> eyre::Result<()> {
        let r = rig(MockOutcome::RefuseSubmit)?;
        let ctx = RequestContext::new(None);

        r.orch
            .run(OperationKind::Stake, &raw(json!({"amount": 5})), &ctx)
            .await;

        let frames = r.sink.frames();
        assert_eq!(terminal_count(&frames), 1, "exactly one terminal");
        let terminal = frames.last();
        assert_eq!(
            terminal.and_then(|f| f.content.error_code),
            Some("submit_failed"),
            "broadcast failure classified"
        );
        assert!(
            terminal.is_some_and(|f| f.content.transaction_hash.is_none()),
            "no fabricated hash on submit failure"
        );
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_runs_never_overlap_the_critical_section() -> eyre::Result<()> {
        let mut chain = MockChain::new(MockOutcome::Finalize);
        chain.submit_delay = Duration::from_millis(50);
        chain.lookups_until_found = 10;
        let r = rig_with(
            chain,
            &ExecutorSettings {
                confirm_timeout_secs: 30,
                poll_interval_ms: 20,
            },
        )?;

        let started = Instant::now();
        let mut handles = vec![];
        for _ in 0_u32..2 {
            let orch = Arc::clone(&r.orch);
            handles.push(tokio::spawn(async move {
                let ctx = RequestContext::new(None);
                orch.run(OperationKind::Stake, &raw(json!({"amount": 1})), &ctx)
                    .await;
            }));
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        for h in handles {
            h.await.map_err(|e| eyre::eyre!("task panicked: {e}"))?;
        }
        let elapsed = started.elapsed();

        let spans = r.chain.submit_spans();
        assert_eq!(spans.len(), 2, "both submissions broadcast");
        for pair in spans.windows(2) {
            let [a, b] = pair else { continue };
            assert!(
                a.finished <= b.started,
                "critical sections overlapped: {a:?} vs {b:?}"
            );
        }

        // Serial execution (confirm inside the slot) would need at least
        // two full submit+confirm rounds; pipelined waits come in well
        // under that. Virtual time makes this exact.
        let serial_floor = Duration::from_millis(2 * (50 + 200));
        assert!(
            elapsed < serial_floor,
            "finality waits blocked the account slot: {elapsed:?}"
        );

        let frames = r.sink.frames();
        assert_eq!(terminal_count(&frames), 2, "one terminal per request");
        Ok(())
    }

    #[tokio::test]
    async fn dispatch_reports_extractor_outage() -> eyre::Result<()> {
        struct DownExtractor;
        #[async_trait::async_trait]
        impl IntentExtractor for DownExtractor {
            async fn extract(
                &self,
                _kind: OperationKind,
                _message: &str,
            ) -> eyre::Result<RawIntent> {
                eyre::bail!("model endpoint unreachable")
            }
        }

        let r = rig(MockOutcome::Finalize)?;
        let ctx = RequestContext::new(None);
        r.orch
            .dispatch(&DownExtractor, OperationKind::Swap, "swap 1 apt", &ctx)
            .await;

        let frames = r.sink.frames();
        assert_eq!(
            frames.last().and_then(|f| f.content.error_code),
            Some("extraction_failed"),
            "outage surfaces as a terminal error"
        );
        assert_eq!(r.chain.network_calls(), 0, "chain untouched");
        Ok(())
    }
}
