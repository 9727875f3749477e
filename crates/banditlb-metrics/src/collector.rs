use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use banditlb_core::{Outcome, PENALTY_FREE_ATTEMPTS};

use crate::snapshot::{MetricsSnapshot, ServerMetricsSnapshot};

#[derive(Debug, Default, Clone)]
struct ServerMetrics {
    num_requests: u64,
    num_success: u64,
    num_failure: u64,
    num_rate_limited: u64,
    total_latency_ms: f64,
}

impl ServerMetrics {
    fn success_rate(&self) -> f64 {
        if self.num_requests == 0 {
            0.0
        } else {
            self.num_success as f64 / self.num_requests as f64
        }
    }

    fn avg_latency_ms(&self) -> f64 {
        if self.num_requests == 0 {
            0.0
        } else {
            self.total_latency_ms / self.num_requests as f64
        }
    }
}

#[derive(Debug, Default)]
struct Metrics {
    total_requests: u64,
    total_success: u64,
    total_failure: u64,
    total_retries: u64,
    total_rate_limited: u64,
    total_penalty: u64,
    latencies: Vec<f64>,
    per_server: HashMap<u16, ServerMetrics>,
    last_update: f64,
}

impl Metrics {
    fn global_regret(&self) -> i64 {
        self.total_requests as i64 - self.total_success as i64
    }

    fn best_guess_score(&self) -> i64 {
        self.total_success as i64 - self.total_penalty as i64
    }

    fn latency_percentile(&self, p: f64) -> f64 {
        if self.latencies.is_empty() {
            return 0.0;
        }
        if self.latencies.len() == 1 {
            return self.latencies[0];
        }
        let mut sorted = self.latencies.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).expect("latencies are never NaN"));
        let rank = ((p / 100.0) * (sorted.len() as f64 - 1.0)).round() as usize;
        sorted[rank.min(sorted.len() - 1)]
    }
}

/// Process-wide request metrics, protected by a single mutex whose
/// critical section never spans an `.await` — one lock per `record_*`
/// call, matching `banditlb-bandit::Strategy`'s locking discipline.
pub struct MetricsCollector {
    metrics: Mutex<Metrics>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            metrics: Mutex::new(Metrics::default()),
        }
    }

    /// Records one downstream attempt. `attempt` is 0-indexed; attempts at
    /// or beyond the penalty-free window count toward `total_penalty`.
    pub fn record_attempt(&self, port: u16, outcome: Outcome, latency_ms: f64, attempt: u32) {
        let mut metrics = self.metrics.lock().expect("metrics mutex poisoned");

        let server = metrics.per_server.entry(port).or_default();
        server.num_requests += 1;
        server.total_latency_ms += latency_ms;
        match outcome {
            Outcome::RateLimited => {
                server.num_rate_limited += 1;
                metrics.total_rate_limited += 1;
            }
            Outcome::Success => server.num_success += 1,
            Outcome::Failure => server.num_failure += 1,
        }

        if attempt > 0 {
            metrics.total_retries += 1;
        }
        if attempt >= PENALTY_FREE_ATTEMPTS {
            metrics.total_penalty += 1;
        }

        metrics.latencies.push(latency_ms);
    }

    /// Records the final outcome of a request, after every retry has run
    /// its course (or the first attempt already succeeded).
    pub fn record_completion(&self, success: bool) {
        let mut metrics = self.metrics.lock().expect("metrics mutex poisoned");
        metrics.total_requests += 1;
        if success {
            metrics.total_success += 1;
        } else {
            metrics.total_failure += 1;
        }
        metrics.last_update = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is after the unix epoch")
            .as_secs_f64();
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let metrics = self.metrics.lock().expect("metrics mutex poisoned");
        let per_server = metrics
            .per_server
            .iter()
            .map(|(port, server)| {
                (
                    port.to_string(),
                    ServerMetricsSnapshot {
                        port: *port,
                        num_requests: server.num_requests,
                        num_success: server.num_success,
                        num_failure: server.num_failure,
                        num_rate_limited: server.num_rate_limited,
                        success_rate: server.success_rate(),
                        avg_latency_ms: server.avg_latency_ms(),
                    },
                )
            })
            .collect::<BTreeMap<_, _>>();

        MetricsSnapshot {
            total_requests: metrics.total_requests,
            total_success: metrics.total_success,
            total_failure: metrics.total_failure,
            total_retries: metrics.total_retries,
            total_rate_limited: metrics.total_rate_limited,
            total_penalty: metrics.total_penalty,
            global_regret: metrics.global_regret(),
            best_guess_score: metrics.best_guess_score(),
            latency_p50: metrics.latency_percentile(50.0),
            latency_p99: metrics.latency_percentile(99.0),
            latencies: metrics.latencies.clone(),
            per_server,
            last_update: metrics.last_update,
        }
    }

    pub fn reset(&self) {
        let mut metrics = self.metrics.lock().expect("metrics mutex poisoned");
        *metrics = Metrics::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_regret_is_requests_minus_successes() {
        let collector = MetricsCollector::new();
        collector.record_completion(true);
        collector.record_completion(false);
        let snap = collector.snapshot();
        assert_eq!(snap.total_requests, 2);
        assert_eq!(snap.global_regret, 1);
    }

    #[test]
    fn penalty_only_counts_attempts_past_the_penalty_free_window() {
        let collector = MetricsCollector::new();
        collector.record_attempt(4000, Outcome::Failure, 1.0, 0);
        collector.record_attempt(4000, Outcome::Failure, 1.0, 3);
        let snap = collector.snapshot();
        assert_eq!(snap.total_penalty, 1);
        assert_eq!(snap.total_retries, 1);
    }

    #[test]
    fn rate_limited_attempts_do_not_count_as_failures() {
        let collector = MetricsCollector::new();
        collector.record_attempt(4000, Outcome::RateLimited, 1.0, 0);
        let snap = collector.snapshot();
        let server = &snap.per_server["4000"];
        assert_eq!(server.num_failure, 0);
        assert_eq!(server.num_rate_limited, 1);
        assert_eq!(snap.total_rate_limited, 1);
    }

    #[test]
    fn single_latency_sample_is_its_own_percentile() {
        let collector = MetricsCollector::new();
        collector.record_attempt(4000, Outcome::Success, 7.0, 0);
        let snap = collector.snapshot();
        assert_eq!(snap.latency_p50, 7.0);
        assert_eq!(snap.latency_p99, 7.0);
    }

    #[test]
    fn no_latency_samples_yields_zero_percentiles() {
        let collector = MetricsCollector::new();
        let snap = collector.snapshot();
        assert_eq!(snap.latency_p50, 0.0);
        assert_eq!(snap.latency_p99, 0.0);
    }
}
