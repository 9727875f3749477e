use std::collections::HashSet;

use rand::rngs::StdRng;

use crate::registry::Registry;
use crate::sampling::{new_rng, random_pick};
use crate::strategy::{BanditStrategy, StrategyConfig};

/// Requests counted toward discovery before exploitation kicks in.
const DISCOVER_LIMIT: u64 = 50;

/// V1 — explore-then-exploit on beta variance.
///
/// While in discovery, picks the arm with the highest `beta_variance`
/// (least confidence); past the limit, picks the arm with the best
/// observed success rate. Only a fresh request (`attempt == 0`) advances
/// the discovery counter — retries of the same request don't count twice.
pub struct ExploreExploit {
    registry: Registry,
    rng: StdRng,
    total_new_requests: u64,
}

impl ExploreExploit {
    pub fn new(config: StrategyConfig) -> Self {
        Self {
            registry: Registry::new(config.tier),
            rng: new_rng(config.seed),
            total_new_requests: 0,
        }
    }

    fn in_discover_mode(&self) -> bool {
        self.total_new_requests < DISCOVER_LIMIT
    }

    fn select_least_confident(&mut self, candidates: &[u16]) -> u16 {
        let has_data = candidates
            .iter()
            .any(|&p| self.registry.get(p).num_requests > 0);
        if !has_data {
            return random_pick(&mut self.rng, candidates);
        }

        let mut best_port = candidates[0];
        let mut best_variance = -1.0;
        for &port in candidates {
            let stats = self.registry.get(port);
            if stats.num_requests == 0 {
                return port;
            }
            let variance = stats.beta_variance();
            if variance > best_variance {
                best_variance = variance;
                best_port = port;
            }
        }
        best_port
    }

    fn select_best_success_rate(&self, candidates: &[u16]) -> u16 {
        let mut best_port = candidates[0];
        let mut best_rate = -1.0;
        for &port in candidates {
            let stats = self.registry.get(port);
            if stats.num_requests > 0 && stats.success_rate() > best_rate {
                best_rate = stats.success_rate();
                best_port = port;
            }
        }
        best_port
    }
}

impl BanditStrategy for ExploreExploit {
    fn select(&mut self, excluded: &HashSet<u16>, attempt: u32) -> u16 {
        if attempt == 0 {
            self.total_new_requests += 1;
        }

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

        if self.in_discover_mode() {
            self.select_least_confident(&candidates)
        } else {
            self.select_best_success_rate(&candidates)
        }
    }

    fn best_server(&self) -> u16 {
        self.registry.best_server()
    }

    fn update(&mut self, port: u16, success: bool, latency_ms: f64) {
        self.registry.get_mut(port).record(success, latency_ms);
    }

    fn stats(&self) -> &Registry {
        &self.registry
    }

    fn reset(&mut self) {
        self.registry.reset();
        self.total_new_requests = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use banditlb_core::Tier;

    fn strategy() -> ExploreExploit {
        ExploreExploit::new(StrategyConfig {
            seed: Some(1),
            ..StrategyConfig::new(Tier::T1)
        })
    }

    #[test]
    fn untried_arm_wins_during_discovery() {
        let mut s = strategy();
        s.update(4000, true, 1.0);
        let port = s.select(&HashSet::new(), 0);
        assert_ne!(port, 4000);
    }

    #[test]
    fn retries_do_not_advance_discovery_counter() {
        let mut s = strategy();
        for _ in 0..5 {
            s.select(&HashSet::new(), 1);
        }
        assert_eq!(s.total_new_requests, 0);
    }

    #[test]
    fn exploitation_prefers_best_success_rate_once_discovery_ends() {
        let mut s = strategy();
        s.total_new_requests = DISCOVER_LIMIT;
        for port in s.registry.ports().to_vec() {
            s.update(port, port == 4005, 1.0);
        }
        assert_eq!(s.select(&HashSet::new(), 0), 4005);
    }

    #[test]
    fn excluding_every_candidate_falls_back_to_best_server() {
        let mut s = strategy();
        s.update(4000, true, 1.0);
        let excluded: HashSet<u16> = s.registry.ports().iter().copied().collect();
        assert_eq!(s.select(&excluded, 1), 4000);
    }
}
