//! Stdio serve loop: the surrounding chat host drives the pipeline with
//! line-delimited JSON requests on stdin and reads callback frames from
//! stdout. One spawned task per request; requests never block each other
//! except at the account slot.

use crate::callbacks::RequestContext;
use crate::chain::ChainClient;
use crate::extract::IntentExtractor;
use crate::intent::OperationKind;
use crate::orchestrator::Orchestrator;
use serde::Deserialize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tokio::task::JoinSet;

#[derive(Debug, Deserialize)]
struct InboundRequest {
    /// Which agent action the host selected for this message.
    action: OperationKind,
    /// Free-form user text; the extractor pulls parameters out of it.
    message: String,
    /// Opaque routing handle echoed on every callback.
    #[serde(default)]
    channel: Option<String>,
}

pub async fn run<C>(
    orchestrator: Arc<Orchestrator<C>>,
    extractor: Arc<dyn IntentExtractor>,
) -> eyre::Result<()>
where
    C: ChainClient + 'static,
{
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut inflight: JoinSet<()> = JoinSet::new();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    // EOF: the host hung up. Drain what's already running.
                    break;
                };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_str::<InboundRequest>(trimmed) {
                    Ok(req) => {
                        let ctx = RequestContext::new(req.channel.clone());
                        tracing::info!(
                            request_id = %ctx.request_id,
                            action = req.action.as_str(),
                            "request accepted"
                        );
                        let orch = Arc::clone(&orchestrator);
                        let extr = Arc::clone(&extractor);
                        inflight.spawn(async move {
                            orch.dispatch(extr.as_ref(), req.action, &req.message, &ctx)
                                .await;
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "unparseable request line dropped");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received, draining in-flight requests");
                break;
            }
        }

        // Reap finished tasks so the set doesn't grow with session length.
        while inflight.try_join_next().is_some() {}
    }

    while let Some(res) = inflight.join_next().await {
        if let Err(e) = res {
            tracing::warn!(error = %e, "request task failed");
        }
    }
    Ok(())
}
