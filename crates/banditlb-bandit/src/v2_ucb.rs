use std::collections::HashSet;

use rand::rngs::StdRng;

use crate::registry::Registry;
use crate::sampling::{new_rng, random_pick};
use crate::strategy::{BanditStrategy, StrategyConfig};

/// V2 — UCB1.
///
/// `ucb(i) = success_rate(i) + c * sqrt(ln(t) / n_i)`, `c = sqrt(2)`. Arms
/// with zero requests score `+inf` and are picked before the formula ever
/// runs; before any request has landed at all, selection is uniform random.
pub struct Ucb1 {
    registry: Registry,
    rng: StdRng,
    total_requests: u64,
}

impl Ucb1 {
    pub fn new(config: StrategyConfig) -> Self {
        Self {
            registry: Registry::new(config.tier),
            rng: new_rng(config.seed),
            total_requests: 0,
        }
    }

    fn ucb(&self, success_rate: f64, num_attempts: u64, c: f64) -> f64 {
        if num_attempts == 0 {
            return f64::INFINITY;
        }
        let bonus = c * ((self.total_requests as f64).ln() / num_attempts as f64).sqrt();
        success_rate + bonus
    }
}

impl BanditStrategy for Ucb1 {
    fn select(&mut self, excluded: &HashSet<u16>, _attempt: u32) -> u16 {
        let candidates: Vec<u16> = self
            .registry
            .ports()
            .iter()
            .copied()
            .filter(|p| !excluded.contains(p))
            .collect();

        if candidates.is_empty() {
            return self.registry.best_server();
        }

        if self.total_requests == 0 {
            return random_pick(&mut self.rng, &candidates);
        }

        for &port in &candidates {
            if self.registry.get(port).num_requests == 0 {
                return port;
            }
        }

        let c = std::f64::consts::SQRT_2;
        let mut best_port = candidates[0];
        let mut best_ucb = f64::NEG_INFINITY;
        for &port in &candidates {
            let stats = self.registry.get(port);
            let score = self.ucb(stats.success_rate(), stats.num_requests, c);
            if score > best_ucb {
                best_ucb = score;
                best_port = port;
            }
        }
        best_port
    }

    fn best_server(&self) -> u16 {
        self.registry.best_server()
    }

    fn update(&mut self, port: u16, success: bool, latency_ms: f64) {
        self.total_requests += 1;
        self.registry.get_mut(port).record(success, latency_ms);
    }

    fn stats(&self) -> &Registry {
        &self.registry
    }

    fn reset(&mut self) {
        self.registry.reset();
        self.total_requests = 0;
    }
}
