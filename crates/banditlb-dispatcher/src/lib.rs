//! The per-request attempt loop: picks a port via the strategy, sends
//! through the downstream client, feeds the outcome back to the strategy,
//! the metrics collector, and the attempt journal, and retries until
//! success or the attempt budget is exhausted.
//!
//! Grounded on the original `api/endpoints/root.py` request handler, with
//! the dispatcher state machine's own pseudocode resolving the places
//! where that file and `http_client.py` disagreed on the downstream
//! client's return shape.

mod context;
mod run;

pub use context::{RequestContext, RunIdentity};
pub use run::{dispatch, DispatchOutcome};
