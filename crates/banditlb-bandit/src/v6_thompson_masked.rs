use std::collections::HashSet;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;

use crate::rate_limit::{available_ports, least_recently_rate_limited};
use crate::registry::Registry;
use crate::sampling::{new_rng, sample_beta};
use crate::strategy::{BanditStrategy, StrategyConfig};

/// V6 — Thompson sampling that masks out arms currently in rate-limit
/// cooldown. A 429 reflects capacity, not quality: it never touches
/// `alpha`/`beta`, only the cooldown clock. Best suited to a fixed,
/// predictable rate limit per arm.
pub struct ThompsonMasked {
    registry: Registry,
    rng: StdRng,
    cooldown: Duration,
}

impl ThompsonMasked {
    pub fn new(config: StrategyConfig) -> Self {
        Self {
            registry: Registry::new(config.tier),
            rng: new_rng(config.seed),
            cooldown: config.cooldown,
        }
    }
}

impl BanditStrategy for ThompsonMasked {
    fn select(&mut self, excluded: &HashSet<u16>, _attempt: u32) -> u16 {
        let now = Instant::now();
        let candidates = available_ports(&self.registry, excluded, self.cooldown, now);

        if candidates.is_empty() {
            let still_cooling = self
                .registry
                .ports()
                .iter()
                .any(|p| !excluded.contains(p));
            if still_cooling {
                return least_recently_rate_limited(&self.registry);
            }
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

    fn update_rate_limited(&mut self, port: u16, latency_ms: f64) {
        self.registry
            .get_mut(port)
            .record_rate_limited(latency_ms, Instant::now());
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
    fn rate_limit_does_not_move_beta_parameters() {
        let mut s = ThompsonMasked::new(StrategyConfig::new(Tier::T1));
        s.update_rate_limited(4000, 1.0);
        let stats = s.registry.get(4000);
        assert_eq!(stats.alpha, 1.0);
        assert_eq!(stats.beta, 1.0);
        assert_eq!(stats.num_rate_limited, 1);
    }

    #[test]
    fn cooling_arm_is_excluded_from_selection() {
        let mut s = ThompsonMasked::new(StrategyConfig {
            cooldown: Duration::from_secs(60),
            ..StrategyConfig::new(Tier::T1)
        });
        for &port in &s.registry.ports().to_vec() {
            if port != 4000 {
                s.update_rate_limited(port, 1.0);
            }
        }
        assert_eq!(s.select(&HashSet::new(), 0), 4000);
    }
}
