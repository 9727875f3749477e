use std::collections::HashSet;
use std::time::Duration;

use banditlb_core::{LbError, Tier};

use crate::registry::{ArmStats, Registry};
use crate::v1_explore_exploit::ExploreExploit;
use crate::v2_ucb::Ucb1;
use crate::v3_ucb_modified::Ucb1Modified;
use crate::v4_thompson::Thompson;
use crate::v5_thompson_modified::ThompsonModified;
use crate::v6_thompson_masked::ThompsonMasked;
use crate::v7_sliding_window::SlidingWindowThompson;
use crate::v8_blocking_bandit::BlockingBandit;

/// Knobs every rate-limit-aware strategy shares; plain bandits ignore the
/// fields they don't need.
#[derive(Debug, Clone, Copy)]
pub struct StrategyConfig {
    pub tier: Tier,
    pub cooldown: Duration,
    pub sliding_window_size: usize,
    pub block_duration: Duration,
    pub seed: Option<u64>,
}

impl StrategyConfig {
    pub fn new(tier: Tier) -> Self {
        Self {
            tier,
            cooldown: Duration::from_secs_f64(1.0),
            sliding_window_size: 30,
            block_duration: Duration::from_secs_f64(5.0),
            seed: None,
        }
    }
}

/// One selection/update algorithm over a fixed pool of arms.
///
/// `update_rate_limited` defaults to degrading into an ordinary failed
/// `update` — the behaviour every non-rate-limit-aware strategy (v1-v5)
/// wants. The three rate-limit-aware strategies (v6-v8) override it.
/// Because dispatch happens through the `Strategy` enum's `match`, the
/// dispatcher never has to ask a strategy at runtime whether it "supports"
/// rate limits — the right method simply runs.
pub trait BanditStrategy: Send {
    fn select(&mut self, excluded: &HashSet<u16>, attempt: u32) -> u16;

    fn best_server(&self) -> u16;

    fn update(&mut self, port: u16, success: bool, latency_ms: f64);

    fn update_rate_limited(&mut self, port: u16, latency_ms: f64) {
        self.update(port, false, latency_ms);
    }

    fn stats(&self) -> &Registry;

    fn reset(&mut self);
}

macro_rules! dispatch {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        match $self {
            Strategy::V1ExploreExploit(s) => s.$method($($arg),*),
            Strategy::V2Ucb1(s) => s.$method($($arg),*),
            Strategy::V3Ucb1Modified(s) => s.$method($($arg),*),
            Strategy::V4Thompson(s) => s.$method($($arg),*),
            Strategy::V5ThompsonModified(s) => s.$method($($arg),*),
            Strategy::V6ThompsonMasked(s) => s.$method($($arg),*),
            Strategy::V7SlidingWindow(s) => s.$method($($arg),*),
            Strategy::V8BlockingBandit(s) => s.$method($($arg),*),
        }
    };
}

/// Enum-dispatch over the eight bandit variants. One `Strategy` owns the
/// full arm pool for a single tier; the dispatcher keeps it behind one
/// mutex and locks across a whole select/update pair.
pub enum Strategy {
    V1ExploreExploit(ExploreExploit),
    V2Ucb1(Ucb1),
    V3Ucb1Modified(Ucb1Modified),
    V4Thompson(Thompson),
    V5ThompsonModified(ThompsonModified),
    V6ThompsonMasked(ThompsonMasked),
    V7SlidingWindow(SlidingWindowThompson),
    V8BlockingBandit(BlockingBandit),
}

impl Strategy {
    /// Builds the strategy named `name` ("v1".."v8") for `config.tier`.
    pub fn new(name: &str, config: StrategyConfig) -> Result<Self, LbError> {
        tracing::info!(strategy = name, tier = %config.tier, "initializing bandit strategy");
        Ok(match name {
            "v1" => Strategy::V1ExploreExploit(ExploreExploit::new(config)),
            "v2" => Strategy::V2Ucb1(Ucb1::new(config)),
            "v3" => Strategy::V3Ucb1Modified(Ucb1Modified::new(config)),
            "v4" => Strategy::V4Thompson(Thompson::new(config)),
            "v5" => Strategy::V5ThompsonModified(ThompsonModified::new(config)),
            "v6" => Strategy::V6ThompsonMasked(ThompsonMasked::new(config)),
            "v7" => Strategy::V7SlidingWindow(SlidingWindowThompson::new(config)),
            "v8" => Strategy::V8BlockingBandit(BlockingBandit::new(config)),
            other => {
                return Err(LbError::Config(format!(
                    "LB_STRATEGY must be one of v1..v8, got: {other}"
                )))
            }
        })
    }

    pub fn select(&mut self, excluded: &HashSet<u16>, attempt: u32) -> u16 {
        dispatch!(self, select, excluded, attempt)
    }

    pub fn best_server(&self) -> u16 {
        dispatch!(self, best_server)
    }

    pub fn update(&mut self, port: u16, success: bool, latency_ms: f64) {
        dispatch!(self, update, port, success, latency_ms)
    }

    pub fn update_rate_limited(&mut self, port: u16, latency_ms: f64) {
        dispatch!(self, update_rate_limited, port, latency_ms)
    }

    pub fn stats(&self) -> &Registry {
        dispatch!(self, stats)
    }

    pub fn snapshot(&self) -> std::collections::HashMap<u16, ArmStats> {
        self.stats().snapshot().clone()
    }

    pub fn reset(&mut self) {
        dispatch!(self, reset)
    }
}
