//! HTTP client for talking to the flaky downstream servers.
//!
//! Grounded on `tower-resilience-healthcheck`'s use of `reqwest` for async
//! HTTP probing. Every outcome — success, 429, connection error, timeout —
//! is folded into `banditlb_core::Outcome`; nothing here returns `Result`,
//! since a flaky downstream is the expected steady state, not an error.

mod client;

pub use client::DownstreamClient;

/// Default request timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
