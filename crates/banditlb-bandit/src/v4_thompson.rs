use std::collections::HashSet;

use rand::rngs::StdRng;

use crate::registry::Registry;
use crate::sampling::{new_rng, sample_beta};
use crate::strategy::{BanditStrategy, StrategyConfig};

/// V4 — plain Thompson sampling: draw `Beta(alpha, beta)` per candidate
/// arm, pick the highest draw.
pub struct Thompson {
    registry: Registry,
    rng: StdRng,
}

impl Thompson {
    pub fn new(config: StrategyConfig) -> Self {
        Self {
            registry: Registry::new(config.tier),
            rng: new_rng(config.seed),
        }
    }
}

impl BanditStrategy for Thompson {
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

        let mut best_port = candidates[0];
        let mut best_sample = -1.0;
        for &port in &candidates {
            let stats = self.registry.get(port);
            let sample = sample_beta(&mut self.rng, stats.alpha, stats.beta);
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

#[cfg(test)]
mod tests {
    use super::*;
    use banditlb_core::Tier;

    #[test]
    fn update_keeps_alpha_in_sync_with_success_count() {
        let mut s = Thompson::new(StrategyConfig {
            seed: Some(42),
            ..StrategyConfig::new(Tier::T1)
        });
        s.update(4000, true, 1.0);
        s.update(4000, true, 1.0);
        s.update(4000, false, 1.0);
        let stats = s.registry.get(4000);
        assert_eq!(stats.alpha, stats.num_success as f64 + 1.0);
        assert_eq!(stats.beta, stats.num_failure as f64 + 1.0);
    }

    #[test]
    fn falls_back_to_best_server_when_all_excluded() {
        let mut s = Thompson::new(StrategyConfig::new(Tier::T1));
        s.update(4000, true, 1.0);
        let excluded: HashSet<u16> = s.registry.ports().iter().copied().collect();
        assert_eq!(s.select(&excluded, 0), 4000);
    }
}
