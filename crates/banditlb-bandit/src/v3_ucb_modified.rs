use std::collections::HashSet;

use banditlb_core::PENALTY_FREE_ATTEMPTS;
use rand::rngs::StdRng;

use crate::registry::Registry;
use crate::sampling::{new_rng, random_pick};
use crate::strategy::{BanditStrategy, StrategyConfig};

/// V3 — UCB1 with an attempt-dependent exploration constant: `c = 3.0`
/// while still inside the penalty-free attempt window, `c = 1.0` after —
/// explore aggressively while it's free, settle down once it isn't.
pub struct Ucb1Modified {
    registry: Registry,
    rng: StdRng,
    total_requests: u64,
}

impl Ucb1Modified {
    pub fn new(config: StrategyConfig) -> Self {
        Self {
            registry: Registry::new(config.tier),
            rng: new_rng(config.seed),
            total_requests: 0,
        }
    }

    fn exploration_constant(attempt: u32) -> f64 {
        if attempt < PENALTY_FREE_ATTEMPTS {
            3.0
        } else {
            1.0
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

impl BanditStrategy for Ucb1Modified {
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

        if self.total_requests == 0 {
            return random_pick(&mut self.rng, &candidates);
        }

        if attempt < PENALTY_FREE_ATTEMPTS {
            for &port in &candidates {
                if self.registry.get(port).num_requests == 0 {
                    return port;
                }
            }
        }

        let c = Self::exploration_constant(attempt);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exploration_constant_drops_after_penalty_free_window() {
        assert_eq!(Ucb1Modified::exploration_constant(0), 3.0);
        assert_eq!(Ucb1Modified::exploration_constant(2), 3.0);
        assert_eq!(Ucb1Modified::exploration_constant(3), 1.0);
    }

    #[test]
    fn untried_priority_only_applies_inside_penalty_free_window() {
        use banditlb_core::Tier;
        let mut s = Ucb1Modified::new(StrategyConfig {
            seed: Some(3),
            ..StrategyConfig::new(Tier::T1)
        });
        s.update(4000, true, 1.0);
        assert_ne!(s.select(&HashSet::new(), 0), 4000);
    }
}
