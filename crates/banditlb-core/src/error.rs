use thiserror::Error;

/// Startup and ingress errors recognised by `banditlb`.
///
/// Transient downstream failures and rate-limit signals never surface as
/// `LbError` — the downstream client folds every outcome into `Outcome`
/// instead, and the dispatcher never sees an `Err` on the happy path of a
/// flaky-but-reachable server.
#[derive(Debug, Error)]
pub enum LbError {
    /// Unknown strategy name or tier, raised at startup only.
    #[error("configuration error: {0}")]
    Config(String),

    /// A client-supplied request id failed the 24-char alphanumeric check.
    #[error("invalid request id: {0}")]
    InvalidRequestId(String),
}
