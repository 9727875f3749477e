use std::path::{Path, PathBuf};

use serde::Serialize;

pub type SnapshotError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Serialize)]
pub struct ServerMetricsSnapshot {
    pub port: u16,
    pub num_requests: u64,
    pub num_success: u64,
    pub num_failure: u64,
    pub num_rate_limited: u64,
    pub success_rate: f64,
    pub avg_latency_ms: f64,
}

/// Point-in-time view of process-wide metrics, serialized the same shape
/// the original JSON snapshot used: `per_server` keyed by the port as a
/// string (Rust's `serde_json` follows the same string-keys-only map rule
/// `orjson` does).
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub total_success: u64,
    pub total_failure: u64,
    pub total_retries: u64,
    pub total_rate_limited: u64,
    pub total_penalty: u64,
    pub global_regret: i64,
    pub best_guess_score: i64,
    pub latency_p50: f64,
    pub latency_p99: f64,
    pub latencies: Vec<f64>,
    pub per_server: std::collections::BTreeMap<String, ServerMetricsSnapshot>,
    pub last_update: f64,
}

/// Persists a `MetricsSnapshot`. A sink error must never abort the
/// in-flight request — callers log and continue.
pub trait SnapshotSink: Send + Sync {
    fn write(&self, snapshot: &MetricsSnapshot) -> Result<(), SnapshotError>;
}

/// Writes the snapshot as pretty JSON to a fixed path, overwriting it each
/// time. Matches the original's `write_metrics` — one file, last writer
/// wins, no history kept.
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl SnapshotSink for JsonFileSink {
    fn write(&self, snapshot: &MetricsSnapshot) -> Result<(), SnapshotError> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }
}
