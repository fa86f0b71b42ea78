//! Serializes use of the shared signing account.
//!
//! The chain advances a strictly increasing sequence number per account, so
//! two concurrent build+sign+submit sections over one account race each
//! other into `SEQUENCE_NUMBER_TOO_OLD` failures. The sequencer grants
//! exclusive slots in FIFO order (tokio's mutex queues waiters fairly);
//! callers must keep the slow finality wait *outside* the slot.

use crate::account::SigningAccount;
use std::future::Future;
use tokio::sync::Mutex;

#[derive(Debug)]
pub struct AccountSequencer {
    account: SigningAccount,
    slot: Mutex<()>,
}

impl AccountSequencer {
    pub fn new(account: SigningAccount) -> Self {
        Self {
            account,
            slot: Mutex::new(()),
        }
    }

    pub fn address(&self) -> &str {
        self.account.address()
    }

    /// Run `f` with exclusive use of the account, to completion, before the
    /// next queued caller is admitted. Nothing is rolled back on failure:
    /// the chain is authoritative, callers only report.
    pub async fn with_account<'s, T, F, Fut>(&'s self, f: F) -> T
    where
        F: FnOnce(&'s SigningAccount) -> Fut,
        Fut: Future<Output = T> + 's,
    {
        let _slot = self.slot.lock().await;
        f(&self.account).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex as AsyncMutex;
    use tokio::time::Instant;

    fn sequencer() -> eyre::Result<Arc<AccountSequencer>> {
        let material = SecretString::new(
            "0x0202020202020202020202020202020202020202020202020202020202020202"
                .to_owned()
                .into(),
        );
        let account = SigningAccount::from_private_key_hex(&material)?;
        Ok(Arc::new(AccountSequencer::new(account)))
    }

    #[tokio::test]
    async fn slots_are_exclusive_and_fifo() -> eyre::Result<()> {
        let seq = sequencer()?;
        let spans: Arc<AsyncMutex<Vec<(u32, Instant, Instant)>>> =
            Arc::new(AsyncMutex::new(vec![]));

        let mut handles = vec![];
        for id in 0_u32..3 {
            let seq2 = Arc::clone(&seq);
            let spans2 = Arc::clone(&spans);
            handles.push(tokio::spawn(async move {
                seq2.with_account(|_acct| async {
                    let start = Instant::now();
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    let end = Instant::now();
                    spans2.lock().await.push((id, start, end));
                })
                .await;
            }));
            // Stagger spawns so queue order is deterministic.
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        for h in handles {
            h.await.map_err(|e| eyre::eyre!("task panicked: {e}"))?;
        }

        let spans = spans.lock().await.clone();
        assert_eq!(spans.len(), 3, "all slots ran");
        for pair in spans.windows(2) {
            let [(a_id, _a_start, a_end), (b_id, b_start, _b_end)] = pair else {
                continue;
            };
            assert!(a_end <= b_start, "slot {a_id} and {b_id} overlapped");
            assert!(a_id < b_id, "slots granted out of request order");
        }
        Ok(())
    }

    #[tokio::test]
    async fn returns_the_closure_value() -> eyre::Result<()> {
        let seq = sequencer()?;
        let addr = seq
            .with_account(|acct| async move { acct.address().to_owned() })
            .await;
        assert_eq!(addr, seq.address(), "closure sees the shared account");
        Ok(())
    }
}
