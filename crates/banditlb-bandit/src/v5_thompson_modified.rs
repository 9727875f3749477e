use std::collections::HashSet;

use banditlb_core::PENALTY_FREE_ATTEMPTS;
use rand::rngs::StdRng;

use crate::registry::Registry;
use crate::sampling::{new_rng, sample_beta};
use crate::strategy::{BanditStrategy, StrategyConfig};

const C_INITIAL: f64 = 4.0;
const DECAY_RATE: f64 = 0.5;

/// V5 — Thompson sampling with variance scaling during the penalty-free
/// window: `variance_scale = C_INITIAL * DECAY_RATE^attempt` for
/// `attempt < 3`, `0` afterward. A non-zero scale (with enough accumulated
/// evidence) spreads the Beta draw out by shrinking `alpha`/`beta` toward 1,
/// trading confidence for exploration while it's still free to do so.
pub struct ThompsonModified {
    registry: Registry,
    rng: StdRng,
}

impl ThompsonModified {
    pub fn new(config: StrategyConfig) -> Self {
        Self {
            registry: Registry::new(config.tier),
            rng: new_rng(config.seed),
        }
    }

    fn variance_scale(attempt: u32) -> f64 {
        if attempt >= PENALTY_FREE_ATTEMPTS {
            0.0
        } else {
            C_INITIAL * DECAY_RATE.powi(attempt as i32)
        }
    }

    fn sample_with_variance_scale(
        rng: &mut StdRng,
        alpha: f64,
        beta: f64,
        variance_scale: f64,
    ) -> f64 {
        let total = alpha + beta;
        if variance_scale > 0.0 && total > 2.0 {
            let scale_factor = (total / variance_scale).max(2.0) / total;
            let scaled_alpha = (alpha * scale_factor).max(1.0);
            let scaled_beta = (beta * scale_factor).max(1.0);
            sample_beta(rng, scaled_alpha, scaled_beta)
        } else {
            sample_beta(rng, alpha, beta)
        }
    }
}

impl BanditStrategy for ThompsonModified {
    fn select(&mut self, excluded: &HashSet<u16>, attempt: u32) -> u16 {
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

        let variance_scale = Self::variance_scale(attempt);
        let mut best_port = candidates[0];
        let mut best_sample = -1.0;
        for &port in &candidates {
            let stats = self.registry.get(port);
            let sample = Self::sample_with_variance_scale(
                &mut self.rng,
                stats.alpha,
                stats.beta,
                variance_scale,
            );
            if sample > best_sample {
                best_sample = sample;
                best_port = port;
            }
        }
        best_port
    }

    fn best_server(&self) -> u16 {
        self.registry.best_server()
    }

    fn update(&mut self, port: u16, success: bool, latency_ms: f64) {
        let stats = self.registry.get_mut(port);
        stats.record_beta(success);
        stats.record(success, latency_ms);
    }

    fn stats(&self) -> &Registry {
        &self.registry
    }

    fn reset(&mut self) {
        self.registry.reset();
    }
}
