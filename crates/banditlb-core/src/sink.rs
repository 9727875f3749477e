use crate::record::AttemptRecord;

pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Consumes one record per downstream attempt. The production implementation
/// is the CSV attempt journal; tests use `NullAttemptSink` or an in-memory
/// collector.
///
/// A sink error must never abort the in-flight request or corrupt in-memory
/// state — callers log the error and continue.
pub trait AttemptSink: Send + Sync {
    fn log_attempt(&self, record: &AttemptRecord) -> Result<(), SinkError>;
}

/// A sink that discards every record; used in tests and as a safe default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAttemptSink;

impl AttemptSink for NullAttemptSink {
    fn log_attempt(&self, _record: &AttemptRecord) -> Result<(), SinkError> {
        Ok(())
    }
}
