use banditlb_core::Tier;

/// Identity shared by every request dispatched during one process run —
/// built once at startup, read by every request task, never mutated.
#[derive(Debug, Clone)]
pub struct RunIdentity {
    pub run_id: String,
    pub session_id: Option<String>,
    pub strategy_name: String,
    pub config_target: Tier,
}

/// Per-request bookkeeping: the request's own id and its sequence number
/// within the run. The set of ports already tried during the penalty-free
/// window lives in `dispatch()`'s own attempt loop, not here.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub request_number: u64,
}

impl RequestContext {
    pub fn new(request_id: String, request_number: u64) -> Self {
        Self {
            request_id,
            request_number,
        }
    }
}
