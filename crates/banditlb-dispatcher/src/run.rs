use std::collections::HashSet;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use banditlb_bandit::Strategy;
use banditlb_core::{AttemptRecord, AttemptSink, Outcome, MAX_ATTEMPTS, PENALTY_FREE_ATTEMPTS};
use banditlb_downstream::DownstreamClient;
use banditlb_metrics::MetricsCollector;

use crate::context::{RequestContext, RunIdentity};

/// Whether a request completed within its attempt budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Success,
    Exhausted,
}

/// Runs one request's attempt loop to completion: selects a port, sends
/// through `downstream`, feeds the outcome back to `strategy`, and records
/// it in both `metrics` and `journal` — every attempt, regardless of
/// outcome. Retries until a `SUCCESS` or until `MAX_ATTEMPTS` is spent.
///
/// `strategy` is locked once per `select`/`best_server` call and once per
/// `update`/`update_rate_limited` call — never across the downstream
/// `.await` in between, so other requests' attempts may interleave freely.
/// The strategies are built to stay correct under that interleaving.
pub async fn dispatch(
    strategy: &Mutex<Strategy>,
    downstream: &DownstreamClient,
    metrics: &MetricsCollector,
    journal: &dyn AttemptSink,
    identity: &RunIdentity,
    ctx: &RequestContext,
) -> DispatchOutcome {
    let mut tried: HashSet<u16> = HashSet::new();

    for attempt in 0..MAX_ATTEMPTS {
        let port = {
            let mut strategy = strategy.lock().expect("strategy mutex poisoned");
            if attempt < PENALTY_FREE_ATTEMPTS {
                let port = strategy.select(&tried, attempt);
                tried.insert(port);
                port
            } else {
                strategy.best_server()
            }
        };

        let (outcome, latency_ms) = downstream.send(port, &ctx.request_id).await;

        {
            let mut strategy = strategy.lock().expect("strategy mutex poisoned");
            match outcome {
                Outcome::RateLimited => strategy.update_rate_limited(port, latency_ms),
                other => strategy.update(port, other.is_success(), latency_ms),
            }
        }

        metrics.record_attempt(port, outcome, latency_ms, attempt);

        let is_last_attempt = attempt == MAX_ATTEMPTS - 1;
        let record = AttemptRecord {
            session_id: identity.session_id.clone(),
            config_target: identity.config_target,
            request_number: ctx.request_number,
            attempt_number: attempt + 1,
            request_id: ctx.request_id.clone(),
            strategy: identity.strategy_name.clone(),
            timestamp: unix_timestamp(),
            server_port: port,
            success: outcome.is_success(),
            latency_ms,
            request_complete: outcome.is_success() || is_last_attempt,
            request_success: outcome.is_success(),
            rate_limited: outcome.is_rate_limited(),
        };
        if let Err(err) = journal.log_attempt(&record) {
            tracing::warn!(error = %err, "failed to journal attempt");
        }

        if outcome.is_success() {
            metrics.record_completion(true);
            return DispatchOutcome::Success;
        }
    }

    metrics.record_completion(false);
    DispatchOutcome::Exhausted
}

fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is after the unix epoch")
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use banditlb_core::{NullAttemptSink, Tier};
    use banditlb_bandit::StrategyConfig;

    #[derive(Default)]
    struct RecordingSink {
        records: Mutex<Vec<AttemptRecord>>,
    }

    impl AttemptSink for RecordingSink {
        fn log_attempt(&self, record: &AttemptRecord) -> Result<(), banditlb_core::SinkError> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn identity() -> RunIdentity {
        RunIdentity {
            run_id: "test-run".to_string(),
            session_id: None,
            strategy_name: "v1".to_string(),
            config_target: Tier::T1,
        }
    }

    #[tokio::test]
    async fn exhausts_after_max_attempts_against_unreachable_servers() {
        let strategy = Mutex::new(Strategy::new("v1", StrategyConfig::new(Tier::T1)).unwrap());
        let downstream = DownstreamClient::new(std::time::Duration::from_millis(50));
        let metrics = MetricsCollector::new();
        let journal = NullAttemptSink;
        let ctx = RequestContext::new("a".repeat(24), 1);

        let outcome = dispatch(&strategy, &downstream, &metrics, &journal, &identity(), &ctx).await;

        assert_eq!(outcome, DispatchOutcome::Exhausted);
        let snap = metrics.snapshot();
        assert_eq!(snap.total_requests, 1);
        assert_eq!(snap.total_failure, 1);
    }

    #[tokio::test]
    async fn beyond_the_penalty_free_prefix_traffic_commits_to_one_known_port() {
        // Three ports explored during the penalty-free prefix; once every
        // arm has failed at least once, `best_server()` deterministically
        // settles on the lowest-numbered tried port, so no new port is ever
        // touched beyond those three.
        let strategy = Mutex::new(Strategy::new("v2", StrategyConfig::new(Tier::T1)).unwrap());
        let downstream = DownstreamClient::new(std::time::Duration::from_millis(50));
        let metrics = MetricsCollector::new();
        let journal = NullAttemptSink;
        let ctx = RequestContext::new("b".repeat(24), 1);

        dispatch(&strategy, &downstream, &metrics, &journal, &identity(), &ctx).await;

        let snapshot = strategy.lock().unwrap().snapshot();
        let touched_ports = snapshot
            .values()
            .filter(|stats| stats.num_requests > 0)
            .count();
        let total_requests: u64 = snapshot.values().map(|stats| stats.num_requests).sum();
        assert_eq!(touched_ports, 3);
        assert_eq!(total_requests, u64::from(MAX_ATTEMPTS));
    }

    #[tokio::test]
    async fn single_attempt_success_journals_attempt_number_one() {
        use tokio::io::AsyncWriteExt;
        use tokio::net::TcpListener;

        // A different tier from the other tests in this module, which rely
        // on T1's ports staying unreachable — binding real listeners here
        // would otherwise race with those tests' connection attempts.
        let tier = Tier::T3;
        let mut responders = Vec::new();
        for port in tier.ports() {
            let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
            responders.push(tokio::spawn(async move {
                if let Ok((mut socket, _)) = listener.accept().await {
                    let _ = socket
                        .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                        .await;
                }
            }));
        }

        let strategy = Mutex::new(Strategy::new("v1", StrategyConfig::new(tier)).unwrap());
        let downstream = DownstreamClient::new(std::time::Duration::from_millis(500));
        let metrics = MetricsCollector::new();
        let journal = RecordingSink::default();
        let ctx = RequestContext::new("c".repeat(24), 1);

        let outcome = dispatch(&strategy, &downstream, &metrics, &journal, &identity(), &ctx).await;

        assert_eq!(outcome, DispatchOutcome::Success);
        let records = journal.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].attempt_number, 1);

        for responder in responders {
            responder.abort();
        }
    }
}
