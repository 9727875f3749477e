use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;

use crate::registry::Registry;
use crate::sampling::{new_rng, sample_beta};
use crate::strategy::{BanditStrategy, StrategyConfig};

const MAX_BACKOFF_MULTIPLIER: u32 = 4;

#[derive(Debug, Clone, Copy)]
struct BlockingState {
    blocked_until: Option<Instant>,
    consecutive_rate_limits: u32,
    current_multiplier: u32,
}

impl BlockingState {
    fn fresh() -> Self {
        Self {
            blocked_until: None,
            consecutive_rate_limits: 0,
            current_multiplier: 1,
        }
    }

    fn is_blocked(&self, now: Instant) -> bool {
        matches!(self.blocked_until, Some(until) if now < until)
    }
}

/// V8 — blocking bandits: models a fixed-window rate limit explicitly by
/// blocking an arm outright after a 429, for `block_duration * multiplier`
/// seconds. Consecutive 429s double the multiplier up to 4x; any success
/// resets it back to 1x. Best suited to a hard N-requests-per-window limit
/// with a predictable recovery time.
pub struct BlockingBandit {
    registry: Registry,
    rng: StdRng,
    block_duration: Duration,
    blocking: HashMap<u16, BlockingState>,
}

impl BlockingBandit {
    pub fn new(config: StrategyConfig) -> Self {
        let registry = Registry::new(config.tier);
        let blocking = registry.ports().iter().map(|&p| (p, BlockingState::fresh())).collect();
        Self {
            registry,
            rng: new_rng(config.seed),
            block_duration: config.block_duration,
            blocking,
        }
    }

    fn is_blocked(&self, port: u16, now: Instant) -> bool {
        self.blocking[&port].is_blocked(now)
    }

    fn available_ports(&self, excluded: &HashSet<u16>, now: Instant) -> Vec<u16> {
        self.registry
            .ports()
            .iter()
            .copied()
            .filter(|&p| !excluded.contains(&p) && !self.is_blocked(p, now))
            .collect()
    }

    fn least_blocked_server(&self) -> u16 {
        let mut earliest_port = self.registry.ports()[0];
        let mut earliest: Option<Instant> = None;
        for &port in self.registry.ports() {
            match self.blocking[&port].blocked_until {
                None => return port,
                Some(until) => {
                    let is_sooner = match earliest {
                        None => true,
                        Some(e) => until < e,
                    };
                    if is_sooner {
                        earliest = Some(until);
                        earliest_port = port;
                    }
                }
            }
        }
        earliest_port
    }
}

impl BanditStrategy for BlockingBandit {
    fn select(&mut self, excluded: &HashSet<u16>, _attempt: u32) -> u16 {
        let now = Instant::now();
        let candidates = self.available_ports(excluded, now);

        if candidates.is_empty() {
            let still_blocked = self
                .registry
                .ports()
                .iter()
                .any(|p| !excluded.contains(p));
            if still_blocked {
                return self.least_blocked_server();
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

        if success {
            let state = self.blocking.get_mut(&port).expect("tracked port");
            state.consecutive_rate_limits = 0;
            state.current_multiplier = 1;
        }
    }

    fn update_rate_limited(&mut self, port: u16, latency_ms: f64) {
        self.registry
            .get_mut(port)
            .record_rate_limited(latency_ms, Instant::now());

        let state = self.blocking.get_mut(&port).expect("tracked port");
        state.consecutive_rate_limits += 1;
        state.current_multiplier = (state.current_multiplier * 2).min(MAX_BACKOFF_MULTIPLIER);
        let block_for = self.block_duration * state.current_multiplier;
        state.blocked_until = Some(Instant::now() + block_for);
    }

    fn stats(&self) -> &Registry {
        &self.registry
    }

    fn reset(&mut self) {
        self.registry.reset();
        for state in self.blocking.values_mut() {
            *state = BlockingState::fresh();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use banditlb_core::Tier;

    #[test]
    fn rate_limit_blocks_the_arm() {
        let mut s = BlockingBandit::new(StrategyConfig {
            block_duration: Duration::from_secs(60),
            ..StrategyConfig::new(Tier::T1)
        });
        s.update_rate_limited(4000, 1.0);
        assert!(s.is_blocked(4000, Instant::now()));
    }

    #[test]
    fn consecutive_rate_limits_double_the_multiplier_up_to_the_cap() {
        let mut s = BlockingBandit::new(StrategyConfig::new(Tier::T1));
        for _ in 0..5 {
            s.update_rate_limited(4000, 1.0);
        }
        assert_eq!(s.blocking[&4000].current_multiplier, MAX_BACKOFF_MULTIPLIER);
    }

    #[test]
    fn success_resets_backoff() {
        let mut s = BlockingBandit::new(StrategyConfig::new(Tier::T1));
        s.update_rate_limited(4000, 1.0);
        s.update_rate_limited(4000, 1.0);
        assert!(s.blocking[&4000].current_multiplier > 1);
        s.update(4000, true, 1.0);
        assert_eq!(s.blocking[&4000].current_multiplier, 1);
        assert_eq!(s.blocking[&4000].consecutive_rate_limits, 0);
    }
}
