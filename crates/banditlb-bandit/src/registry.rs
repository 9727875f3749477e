use std::collections::HashMap;
use std::time::Instant;

use banditlb_core::Tier;

/// Running statistics for one downstream server (one "arm").
///
/// `alpha`/`beta` are the Beta-distribution parameters used by every
/// Thompson-family strategy; they start at `Beta(1, 1)` (uniform prior) and
/// drift toward whichever outcome the arm produces more often.
#[derive(Debug, Clone)]
pub struct ArmStats {
    pub port: u16,
    pub num_success: u64,
    pub num_failure: u64,
    pub num_requests: u64,
    pub num_rate_limited: u64,
    pub total_latency_ms: f64,
    pub alpha: f64,
    pub beta: f64,
    pub last_rate_limited_at: Option<Instant>,
}

impl ArmStats {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            num_success: 0,
            num_failure: 0,
            num_requests: 0,
            num_rate_limited: 0,
            total_latency_ms: 0.0,
            alpha: 1.0,
            beta: 1.0,
            last_rate_limited_at: None,
        }
    }

    /// Variance of `Beta(num_success + 1, num_failure + 1)`. Untried arms
    /// sit at the maximum, 0.25; it shrinks toward zero as evidence piles up.
    pub fn beta_variance(&self) -> f64 {
        let alpha = self.num_success as f64 + 1.0;
        let beta = self.num_failure as f64 + 1.0;
        let total = alpha + beta;
        (alpha * beta) / (total * total * (total + 1.0))
    }

    pub fn success_rate(&self) -> f64 {
        if self.num_requests == 0 {
            0.0
        } else {
            self.num_success as f64 / self.num_requests as f64
        }
    }

    pub fn avg_latency_ms(&self) -> f64 {
        if self.num_requests == 0 {
            0.0
        } else {
            self.total_latency_ms / self.num_requests as f64
        }
    }

    /// Records a completed (non-rate-limited) attempt.
    pub fn record(&mut self, success: bool, latency_ms: f64) {
        self.num_requests += 1;
        self.total_latency_ms += latency_ms;
        if success {
            self.num_success += 1;
        } else {
            self.num_failure += 1;
        }
    }

    /// Records a 429 without touching success/failure counts — a rate limit
    /// is a capacity signal, not a quality signal.
    pub fn record_rate_limited(&mut self, latency_ms: f64, now: Instant) {
        self.num_rate_limited += 1;
        self.last_rate_limited_at = Some(now);
        self.num_requests += 1;
        self.total_latency_ms += latency_ms;
    }

    pub fn record_beta(&mut self, success: bool) {
        if success {
            self.alpha += 1.0;
        } else {
            self.beta += 1.0;
        }
    }

    fn reset(&mut self) {
        *self = ArmStats::new(self.port);
    }
}

/// Per-tier arm map plus the ordered port list the strategies iterate over.
#[derive(Debug, Clone)]
pub struct Registry {
    ports: Vec<u16>,
    stats: HashMap<u16, ArmStats>,
}

impl Registry {
    pub fn new(tier: Tier) -> Self {
        let ports: Vec<u16> = tier.ports().collect();
        let stats = ports.iter().map(|&p| (p, ArmStats::new(p))).collect();
        Self { ports, stats }
    }

    pub fn ports(&self) -> &[u16] {
        &self.ports
    }

    pub fn get(&self, port: u16) -> &ArmStats {
        &self.stats[&port]
    }

    pub fn get_mut(&mut self, port: u16) -> &mut ArmStats {
        self.stats.get_mut(&port).expect("port belongs to this tier")
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArmStats> {
        self.stats.values()
    }

    pub fn snapshot(&self) -> &HashMap<u16, ArmStats> {
        &self.stats
    }

    pub fn reset(&mut self) {
        for stats in self.stats.values_mut() {
            stats.reset();
        }
    }

    /// The arm with the highest observed success rate; arms with zero
    /// requests never win. Ties keep whichever arm was seen first in port
    /// order. Never filtered by exclusion or rate-limit state.
    pub fn best_server(&self) -> u16 {
        let mut best_port = self.ports[0];
        let mut best_rate = -1.0;
        for &port in &self.ports {
            let stats = &self.stats[&port];
            if stats.num_requests > 0 && stats.success_rate() > best_rate {
                best_rate = stats.success_rate();
                best_port = port;
            }
        }
        best_port
    }
}
