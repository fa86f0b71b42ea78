//! Default [`ChainClient`]: the fullnode REST API over `reqwest`.
//!
//! The node owns the bit-level wire format. Building asks it for the
//! signing message (`encode_submission`) instead of BCS-encoding locally,
//! so this client never needs the chain's serialization library. Reads
//! (account state, transaction lookups) rotate across fallback node URLs;
//! broadcast signs once and submits once.

use super::{ChainClient, FinalityStatus, SignedTx, TxEnvelope, TxLookup};
use crate::adapters::{CallDescriptor, EntryArg};
use crate::backoff::{rotate_nodes, RetryPlan};
use crate::config::NodeConfig;
use async_trait::async_trait;
use eyre::Context as _;
use serde_json::{json, Value};
use std::time::Duration;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct RestClient {
    http: reqwest::Client,
    node_urls: Vec<String>,
    retry: RetryPlan,
    max_gas_amount: u64,
    gas_unit_price: u64,
    expiration_secs: u64,
}

impl RestClient {
    pub fn new(node_urls: Vec<String>, cfg: &NodeConfig) -> eyre::Result<Self> {
        if node_urls.is_empty() {
            eyre::bail!("no node urls configured");
        }
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .connect_timeout(DEFAULT_HTTP_CONNECT_TIMEOUT)
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            node_urls,
            retry: RetryPlan::default(),
            max_gas_amount: cfg.max_gas_amount,
            gas_unit_price: cfg.gas_unit_price,
            expiration_secs: cfg.expiration_secs,
        })
    }

    async fn account_sequence(&self, address: &str) -> eyre::Result<u64> {
        let v = rotate_nodes(
            &self.node_urls,
            &self.retry,
            |base| {
                let url = format!("{base}/v1/accounts/{address}");
                let http = self.http.clone();
                async move {
                    let resp = http.get(&url).send().await.context("get account")?;
                    expect_2xx(resp).await?.json::<Value>().await.context("parse account")
                }
            },
            "fetch account sequence",
        )
        .await?;
        parse_sequence_number(&v)
    }

    async fn signing_message(&self, unsigned: &Value) -> eyre::Result<Vec<u8>> {
        let v = rotate_nodes(
            &self.node_urls,
            &self.retry,
            |base| {
                let url = format!("{base}/v1/transactions/encode_submission");
                let http = self.http.clone();
                let body = unsigned.clone();
                async move {
                    let resp = http
                        .post(&url)
                        .json(&body)
                        .send()
                        .await
                        .context("encode submission")?;
                    expect_2xx(resp)
                        .await?
                        .json::<Value>()
                        .await
                        .context("parse signing message")
                }
            },
            "encode submission",
        )
        .await?;
        let hex_msg = v
            .as_str()
            .ok_or_else(|| eyre::eyre!("signing message is not a string: {v}"))?;
        let stripped = hex_msg.strip_prefix("0x").unwrap_or(hex_msg);
        hex::decode(stripped).context("decode signing message hex")
    }

    fn unsigned_json(&self, sender: &str, sequence_number: u64, call: &CallDescriptor) -> Value {
        let expiry = u64::try_from(chrono::Utc::now().timestamp())
            .unwrap_or(0)
            .saturating_add(self.expiration_secs);
        json!({
            "sender": sender,
            "sequence_number": sequence_number.to_string(),
            "max_gas_amount": self.max_gas_amount.to_string(),
            "gas_unit_price": self.gas_unit_price.to_string(),
            "expiration_timestamp_secs": expiry.to_string(),
            "payload": {
                "type": "entry_function_payload",
                "function": call.function,
                "type_arguments": call.type_args,
                "arguments": encode_args(&call.args),
            },
        })
    }
}

/// JSON wire form of typed entry arguments: u64 as decimal string (JSON
/// numbers lose precision past 2^53), byte vectors as 0x-hex.
pub fn encode_args(args: &[EntryArg]) -> Vec<Value> {
    args.iter()
        .map(|a| match a {
            EntryArg::U64(n) => Value::String(n.to_string()),
            EntryArg::Bool(b) => Value::Bool(*b),
            EntryArg::Utf8(s) => Value::String(format!("0x{}", hex::encode(s.as_bytes()))),
        })
        .collect()
}

fn parse_sequence_number(account: &Value) -> eyre::Result<u64> {
    account
        .get("sequence_number")
        .and_then(Value::as_str)
        .ok_or_else(|| eyre::eyre!("account response missing sequence_number"))?
        .parse::<u64>()
        .context("parse sequence_number")
}

/// Classify a transaction-by-hash response body.
pub fn parse_lookup(body: &Value) -> eyre::Result<TxLookup> {
    let kind = body
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| eyre::eyre!("transaction response missing type"))?;
    if kind == "pending_transaction" {
        return Ok(TxLookup::Pending);
    }
    let success = body
        .get("success")
        .and_then(Value::as_bool)
        .ok_or_else(|| eyre::eyre!("executed transaction missing success flag"))?;
    let vm_status = body
        .get("vm_status")
        .and_then(Value::as_str)
        .unwrap_or("unknown vm status")
        .to_owned();
    let gas_used = body
        .get("gas_used")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);
    Ok(TxLookup::Executed(FinalityStatus {
        success,
        vm_status,
        gas_used,
    }))
}

async fn expect_2xx(resp: reqwest::Response) -> eyre::Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    eyre::bail!("node returned {status}: {}", truncate_body(&body))
}

fn truncate_body(body: &str) -> &str {
    let cut = body
        .char_indices()
        .nth(400)
        .map_or(body.len(), |(i, _c)| i);
    body.get(..cut).unwrap_or(body)
}

#[async_trait]
impl ChainClient for RestClient {
    async fn build(&self, sender: &str, call: &CallDescriptor) -> eyre::Result<TxEnvelope> {
        let sequence_number = self.account_sequence(sender).await?;
        let unsigned = self.unsigned_json(sender, sequence_number, call);
        let signing_message = self.signing_message(&unsigned).await?;

        let expiration_timestamp_secs = unsigned
            .get("expiration_timestamp_secs")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);
        let payload = unsigned.get("payload").cloned().unwrap_or(Value::Null);

        Ok(TxEnvelope {
            sender: sender.to_owned(),
            sequence_number,
            max_gas_amount: self.max_gas_amount,
            gas_unit_price: self.gas_unit_price,
            expiration_timestamp_secs,
            payload,
            signing_message,
        })
    }

    async fn submit(&self, tx: &SignedTx) -> eyre::Result<String> {
        // Single attempt, first configured node. Broadcasting the same body
        // again after an opaque failure could land twice with different
        // fates once the sequence number advances.
        let base = self
            .node_urls
            .first()
            .ok_or_else(|| eyre::eyre!("no node urls configured"))?;
        let url = format!("{base}/v1/transactions");
        let body = json!({
            "sender": tx.envelope.sender,
            "sequence_number": tx.envelope.sequence_number.to_string(),
            "max_gas_amount": tx.envelope.max_gas_amount.to_string(),
            "gas_unit_price": tx.envelope.gas_unit_price.to_string(),
            "expiration_timestamp_secs": tx.envelope.expiration_timestamp_secs.to_string(),
            "payload": tx.envelope.payload,
            "signature": {
                "type": "ed25519_signature",
                "public_key": tx.public_key,
                "signature": tx.signature,
            },
        });
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("broadcast transaction")?;
        let v = expect_2xx(resp)
            .await?
            .json::<Value>()
            .await
            .context("parse submit response")?;
        v.get("hash")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| eyre::eyre!("submit response missing hash"))
    }

    async fn lookup(&self, hash: &str) -> eyre::Result<TxLookup> {
        rotate_nodes(
            &self.node_urls,
            &self.retry,
            |base| {
                let url = format!("{base}/v1/transactions/by_hash/{hash}");
                let http = self.http.clone();
                async move {
                    let resp = http.get(&url).send().await.context("lookup transaction")?;
                    if resp.status() == reqwest::StatusCode::NOT_FOUND {
                        return Ok(TxLookup::NotFound);
                    }
                    let body = expect_2xx(resp)
                        .await?
                        .json::<Value>()
                        .await
                        .context("parse transaction")?;
                    parse_lookup(&body)
                }
            },
            "lookup transaction",
        )
        .await
    }
}
