//! Two-phase notifications to the chat transport.
//!
//! The transport contract is small: `status` is one of
//! `"pending" | "complete" | "error"`, and a `"complete"` frame always
//! carries `transactionHash`. Everything else is presentation sugar.

use crate::errors::ExecutionError;
use crate::intent::OperationKind;
use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackStatus {
    Pending,
    Complete,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackContent {
    pub action: OperationKind,
    pub status: CallbackStatus,
    pub request_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionCallback {
    pub text: String,
    pub content: CallbackContent,
}

/// Identity of one inbound request, echoed on every callback so the
/// transport can route frames back to the conversation.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub channel: Option<String>,
}

impl RequestContext {
    pub fn new(channel: Option<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            channel,
        }
    }
}

impl ActionCallback {
    fn base(
        kind: OperationKind,
        status: CallbackStatus,
        ctx: &RequestContext,
        text: String,
    ) -> Self {
        Self {
            text,
            content: CallbackContent {
                action: kind,
                status,
                request_id: ctx.request_id,
                channel: ctx.channel.clone(),
                transaction_hash: None,
                error_code: None,
            },
        }
    }

    pub fn pending(kind: OperationKind, ctx: &RequestContext, summary: &str) -> Self {
        Self::base(kind, CallbackStatus::Pending, ctx, format!("{summary}…"))
    }

    pub fn complete(kind: OperationKind, ctx: &RequestContext, summary: &str, hash: &str) -> Self {
        let mut cb = Self::base(
            kind,
            CallbackStatus::Complete,
            ctx,
            format!("{summary}: confirmed ({hash})"),
        );
        cb.content.transaction_hash = Some(hash.to_owned());
        cb
    }

    /// Terminal failure. The hash is attached only when the transaction
    /// actually reached broadcast; nothing here invents one.
    pub fn error(
        kind: OperationKind,
        ctx: &RequestContext,
        code: &'static str,
        detail: &str,
        hash: Option<&str>,
    ) -> Self {
        let mut cb = Self::base(
            kind,
            CallbackStatus::Error,
            ctx,
            format!("{} failed: {detail}", kind.as_str()),
        );
        cb.content.error_code = Some(code);
        cb.content.transaction_hash = hash.map(str::to_owned);
        cb
    }

    pub fn execution_error(
        kind: OperationKind,
        ctx: &RequestContext,
        err: &ExecutionError,
    ) -> Self {
        Self::error(kind, ctx, err.code(), &err.to_string(), err.transaction_hash())
    }

    pub fn is_terminal(&self) -> bool {
        self.content.status != CallbackStatus::Pending
    }
}

#[async_trait]
pub trait CallbackSink: Send + Sync {
    async fn emit(&self, cb: &ActionCallback) -> eyre::Result<()>;
}

/// Writes newline-delimited JSON frames to stdout for the parent process.
pub struct StdoutSink {
    out: tokio::sync::Mutex<tokio::io::Stdout>,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self {
            out: tokio::sync::Mutex::new(tokio::io::stdout()),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CallbackSink for StdoutSink {
    async fn emit(&self, cb: &ActionCallback) -> eyre::Result<()> {
        use tokio::io::AsyncWriteExt as _;

        let frame = format!("{}\n", serde_json::to_string(cb)?);
        let mut out = self.out.lock().await;
        out.write_all(frame.as_bytes()).await?;
        out.flush().await?;
        Ok(())
    }
}
