use std::time::Duration;

/// Bounded retry schedule for idempotent node reads.
///
/// Broadcast is deliberately excluded: a submission is signed once and sent
/// once, because re-driving it after an opaque failure risks racing its own
/// advanced sequence number.
#[derive(Debug, Clone)]
pub struct RetryPlan {
    /// Full rounds; each round tries every node URL once.
    pub rounds: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Random jitter (`0..=jitter_max_ms`) added to each backoff sleep.
    pub jitter_max_ms: u64,
}

impl Default for RetryPlan {
    fn default() -> Self {
        Self {
            rounds: 3,
            base_delay: Duration::from_millis(300),
            max_delay: Duration::from_secs(3),
            jitter_max_ms: 200,
        }
    }
}

fn backoff_delay(plan: &RetryPlan, round: usize) -> Duration {
    let shift = u32::try_from(round.min(16)).unwrap_or(16_u32);
    let pow2 = 1_u64.checked_shl(shift).unwrap_or(u64::MAX);
    let base_ms = u64::try_from(plan.base_delay.as_millis()).unwrap_or(u64::MAX);
    let mut ms = base_ms.saturating_mul(pow2);
    let max_ms = u64::try_from(plan.max_delay.as_millis()).unwrap_or(u64::MAX);
    if ms > max_ms {
        ms = max_ms;
    }
    let jitter = if cfg!(test) || plan.jitter_max_ms == 0 {
        0
    } else {
        // Draw outside any await so the RNG never crosses a suspension point.
        rand::random::<u64>() % plan.jitter_max_ms.saturating_add(1)
    };
    Duration::from_millis(ms.saturating_add(jitter))
}

/// Try `op(url)` against every node URL in order, for `rounds` rounds,
/// sleeping with exponential backoff between rounds. First success wins.
pub async fn rotate_nodes<T, Fut>(
    urls: &[String],
    plan: &RetryPlan,
    mut op: impl FnMut(&str) -> Fut + Send,
    label: &'static str,
) -> eyre::Result<T>
where
    Fut: std::future::Future<Output = eyre::Result<T>> + Send,
{
    if urls.is_empty() {
        eyre::bail!("no node urls configured");
    }
    if plan.rounds == 0 {
        eyre::bail!("invalid retry plan: rounds=0");
    }

    let mut last_err: Option<eyre::Report> = None;
    for round in 0..plan.rounds {
        for url in urls {
            match op(url).await {
                Ok(v) => return Ok(v),
                Err(e) => last_err = Some(e),
            }
        }
        if round + 1 < plan.rounds {
            tokio::time::sleep(backoff_delay(plan, round)).await;
        }
    }

    Err(last_err
        .unwrap_or_else(|| eyre::eyre!("unknown error"))
        .wrap_err(label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn plan_without_sleeps(rounds: usize) -> RetryPlan {
        RetryPlan {
            rounds,
            base_delay: Duration::from_millis(0),
            max_delay: Duration::from_millis(0),
            jitter_max_ms: 0,
        }
    }

    #[tokio::test]
    async fn rotates_in_order_across_rounds() -> eyre::Result<()> {
        let urls: Vec<String> = vec!["a".into(), "b".into()];
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(vec![]));
        let seen2 = Arc::clone(&seen);

        let res: eyre::Result<()> = rotate_nodes(
            &urls,
            &plan_without_sleeps(2),
            move |u| {
                let u = u.to_owned();
                let seen3 = Arc::clone(&seen2);
                async move {
                    seen3
                        .lock()
                        .map_err(|e| eyre::eyre!("mutex poisoned: {e}"))?
                        .push(u);
                    eyre::bail!("down")
                }
            },
            "probe",
        )
        .await;
        assert!(res.is_err(), "all attempts failed");

        let got = seen
            .lock()
            .map_err(|e| eyre::eyre!("mutex poisoned: {e}"))?
            .clone();
        assert_eq!(got, vec!["a", "b", "a", "b"], "strict rotation order");
        Ok(())
    }

    #[tokio::test]
    async fn stops_at_first_success() -> eyre::Result<()> {
        let urls: Vec<String> = vec!["bad".into(), "good".into()];
        let v = rotate_nodes(
            &urls,
            &plan_without_sleeps(3),
            |u| {
                let healthy = u == "good";
                async move {
                    if healthy {
                        Ok(7_u64)
                    } else {
                        eyre::bail!("down")
                    }
                }
            },
            "probe",
        )
        .await?;
        assert_eq!(v, 7, "first healthy node answers");
        Ok(())
    }

    #[test]
    fn delay_is_capped() {
        let plan = RetryPlan {
            rounds: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            jitter_max_ms: 0,
        };
        assert_eq!(backoff_delay(&plan, 0), Duration::from_millis(100), "round 0");
        assert_eq!(backoff_delay(&plan, 9), Duration::from_millis(500), "capped");
    }
}
