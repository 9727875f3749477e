//! Process-wide request metrics plus a JSON snapshot sink.
//!
//! Grounded on the original `metrics.py`'s `Metrics`/`ServerMetrics`
//! dataclasses for the derived-quantity formulas, and on
//! `tower-resilience-core::events`'s narrow-trait shape for the snapshot
//! sink — the collector never knows whether its snapshot ends up on disk,
//! in a test `Vec`, or nowhere at all.

mod collector;
mod snapshot;

pub use collector::MetricsCollector;
pub use snapshot::{JsonFileSink, MetricsSnapshot, SnapshotError, SnapshotSink};
