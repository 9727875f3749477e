use crate::tier::Tier;

/// One row of the attempt journal — one per downstream attempt, not one
/// per inbound request. A request that takes three attempts to succeed
/// produces three records, the first two with `request_complete: false`.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub session_id: Option<String>,
    pub config_target: Tier,
    pub request_number: u64,
    /// 1-indexed: a request's first attempt logs `1`, not `0`.
    pub attempt_number: u32,
    pub request_id: String,
    pub strategy: String,
    pub timestamp: f64,
    pub server_port: u16,
    pub success: bool,
    pub latency_ms: f64,
    pub request_complete: bool,
    pub request_success: bool,
    pub rate_limited: bool,
}
