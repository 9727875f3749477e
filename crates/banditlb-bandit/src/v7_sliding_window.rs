use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;

use crate::rate_limit::{available_ports, least_recently_rate_limited};
use crate::registry::Registry;
use crate::sampling::{new_rng, sample_beta};
use crate::strategy::{BanditStrategy, StrategyConfig};

/// Beta parameters computed from a bounded window of recent outcomes
/// instead of all-time counts — lets the strategy forget stale history
/// when a server's rate limit changes shape over time.
struct WindowedStats {
    history: VecDeque<bool>,
    window_size: usize,
}

impl WindowedStats {
    fn new(window_size: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(window_size),
            window_size,
        }
    }

    fn push(&mut self, success: bool) {
        if self.history.len() == self.window_size {
            self.history.pop_front();
        }
        self.history.push_back(success);
    }

    fn alpha(&self) -> f64 {
        self.history.iter().filter(|&&s| s).count() as f64 + 1.0
    }

    fn beta(&self) -> f64 {
        self.history.iter().filter(|&&s| !s).count() as f64 + 1.0
    }
}

/// V7 — Thompson sampling over a sliding window of recent outcomes per
/// arm, layered on top of masked cooldown like v6. Reacts to a dynamic
/// rate limit much faster than an all-time Beta posterior would.
pub struct SlidingWindowThompson {
    registry: Registry,
    rng: StdRng,
    cooldown: Duration,
    windows: HashMap<u16, WindowedStats>,
}

impl SlidingWindowThompson {
    pub fn new(config: StrategyConfig) -> Self {
        let registry = Registry::new(config.tier);
        let windows = registry
            .ports()
            .iter()
            .map(|&p| (p, WindowedStats::new(config.sliding_window_size)))
            .collect();
        Self {
            registry,
            rng: new_rng(config.seed),
            cooldown: config.cooldown,
            windows,
        }
    }
}

impl BanditStrategy for SlidingWindowThompson {
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
            let window = &self.windows[&port];
            let sample = sample_beta(&mut self.rng, window.alpha(), window.beta());
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
        self.windows.get_mut(&port).expect("tracked port").push(success);

        let stats = self.registry.get_mut(port);
        stats.record_beta(success);
        stats.record(success, latency_ms);
    }

    fn stats(&self) -> &Registry {
        &self.registry
    }

    fn reset(&mut self) {
        self.registry.reset();
        for window in self.windows.values_mut() {
            window.history.clear();
        }
    }
}
