//! Shared types and contracts used across `banditlb` crates.
//!
//! A small, dependency-light crate every other crate can depend on without
//! creating cycles between the bandit, dispatcher, downstream, metrics and
//! journal crates.

pub mod error;
pub mod record;
pub mod sink;
pub mod tier;
pub mod validate;

pub use error::LbError;
pub use record::AttemptRecord;
pub use sink::{AttemptSink, NullAttemptSink, SinkError};
pub use tier::Tier;
pub use validate::validate_request_id;

/// Upper bound on attempts per request before the dispatcher gives up.
pub const MAX_ATTEMPTS: u32 = 10;

/// Width of the strategy's exploration budget: `select` is called for
/// attempts below this threshold, `best_server` for attempts at or
/// beyond it. Shared with the modified-UCB and modified-Thompson
/// strategies, whose own exploration-vs-penalty split uses the same
/// value.
pub const PENALTY_FREE_ATTEMPTS: u32 = 3;

/// Outcome of a single downstream attempt: 2xx maps to `Success`, HTTP 429
/// maps to `RateLimited`, and anything else — including connection errors
/// and timeouts — maps to `Failure`. The downstream client never returns a
/// `Result`; every failure mode is folded into this enum instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    RateLimited,
    Failure,
}

impl Outcome {
    /// `true` only for `Success`; used by the dispatcher to decide whether
    /// a request is complete.
    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Success)
    }

    pub fn is_rate_limited(self) -> bool {
        matches!(self, Outcome::RateLimited)
    }
}
