//! The intent-extraction boundary: a generative model turns free-form chat
//! text into an untyped field map. Nothing downstream trusts its output;
//! the validator is the sole gate.

use crate::intent::{OperationKind, RawIntent};
use async_trait::async_trait;
use eyre::Context as _;
use serde_json::Value;
use std::time::Duration;

#[async_trait]
pub trait IntentExtractor: Send + Sync {
    async fn extract(&self, kind: OperationKind, message: &str) -> eyre::Result<RawIntent>;
}

/// Fields the model is asked to produce for each operation. The validator
/// re-checks all of this; the prompt just raises the hit rate.
fn fields_for(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::Lend
        | OperationKind::Borrow
        | OperationKind::Repay
        | OperationKind::Withdraw => r#""token", "amount", optional "profile""#,
        OperationKind::Swap => {
            r#""amountIn", "tokenIn", "tokenOut", optional "slippage" (percent)"#
        }
        OperationKind::AddLiquidity => {
            r#""tokenA", "tokenB", "amountA", "amountB", optional "slippage" (percent)"#
        }
        OperationKind::RemoveLiquidity => r#""tokenA", "tokenB", "amount""#,
        OperationKind::Stake | OperationKind::Unstake => r#""amount""#,
        OperationKind::CreateProfile => r#"optional "profile""#,
    }
}

fn prompt_for(kind: OperationKind, message: &str) -> String {
    format!(
        "Extract the parameters of a {} request from the user message below.\n\
         Respond with only a JSON object containing the keys {}. Omit keys \
         the message does not specify. Amounts are plain integers.\n\n\
         User message:\n{message}",
        kind.as_str(),
        fields_for(kind),
    )
}

/// Pull a JSON object out of model output that may be wrapped in prose or a
/// code fence.
pub fn recover_json_object(text: &str) -> eyre::Result<RawIntent> {
    let start = text
        .find('{')
        .ok_or_else(|| eyre::eyre!("no JSON object in extractor output"))?;
    let end = text
        .rfind('}')
        .ok_or_else(|| eyre::eyre!("no JSON object in extractor output"))?;
    let slice = text
        .get(start..=end)
        .ok_or_else(|| eyre::eyre!("malformed extractor output"))?;
    let v: Value = serde_json::from_str(slice).context("parse extractor JSON")?;
    match v {
        Value::Object(m) => Ok(m),
        Value::Null
        | Value::Bool(_)
        | Value::Number(_)
        | Value::String(_)
        | Value::Array(_) => {
            eyre::bail!("extractor output is not a JSON object")
        }
    }
}

/// Default extractor: an OpenAI-compatible chat-completions endpoint.
pub struct HttpExtractor {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpExtractor {
    pub fn new(base_url: String, model: String, api_key: Option<String>) -> eyre::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            base_url,
            model,
            api_key,
        })
    }
}

#[async_trait]
impl IntentExtractor for HttpExtractor {
    async fn extract(&self, kind: OperationKind, message: &str) -> eyre::Result<RawIntent> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": prompt_for(kind, message) }
            ],
            "temperature": 0,
        });

        let mut req = self.http.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await.context("call extractor")?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            eyre::bail!("extractor returned {status}: {detail}");
        }
        let v: Value = resp.json().await.context("parse extractor response")?;
        let content = v
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| eyre::eyre!("extractor response missing content"))?;

        tracing::debug!(kind = kind.as_str(), "extractor answered");
        recover_json_object(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recovers_plain_object() -> eyre::Result<()> {
        let m = recover_json_object(r#"{"token": "APT", "amount": "5"}"#)?;
        assert_eq!(m.get("token"), Some(&json!("APT")), "field survives");
        Ok(())
    }

    #[test]
    fn recovers_fenced_object_with_prose() -> eyre::Result<()> {
        let text = "Sure! Here are the parameters:\n```json\n{\"amount\": 3}\n```\nDone.";
        let m = recover_json_object(text)?;
        assert_eq!(m.get("amount"), Some(&json!(3)), "fence stripped");
        Ok(())
    }

    #[test]
    fn rejects_non_objects() {
        for bad in ["[1,2]", "plain words", "\"str\"", ""] {
            let r = recover_json_object(bad);
            assert!(r.is_err(), "expected rejection of {bad:?}");
        }
    }

    #[test]
    fn prompts_name_the_operation_and_fields() {
        let p = prompt_for(OperationKind::Swap, "swap ten apt to usdc");
        assert!(p.contains("swap"), "operation named: {p}");
        assert!(p.contains("amountIn"), "fields listed: {p}");
        assert!(p.contains("swap ten apt to usdc"), "message embedded");
    }
}
