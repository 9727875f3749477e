//! Arm statistics and the eight server-selection strategies.
//!
//! Mirrors `tower-resilience-adaptive`'s shape: one trait
//! (`BanditStrategy`) that every algorithm implements, and one enum
//! (`Strategy`) that wraps all of them behind a single match, so the
//! dispatcher never needs a trait object or runtime reflection to find out
//! whether a strategy understands rate limits.

pub mod rate_limit;
pub mod registry;
mod sampling;
pub mod strategy;
mod v1_explore_exploit;
mod v2_ucb;
mod v3_ucb_modified;
mod v4_thompson;
mod v5_thompson_modified;
mod v6_thompson_masked;
mod v7_sliding_window;
mod v8_blocking_bandit;

pub use registry::ArmStats;
pub use strategy::{BanditStrategy, Strategy, StrategyConfig};
