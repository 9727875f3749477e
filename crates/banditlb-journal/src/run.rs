use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use banditlb_core::{AttemptRecord, AttemptSink, SinkError, Tier};

pub type JournalError = SinkError;

const CSV_HEADERS: [&str; 13] = [
    "session_id",
    "config_target",
    "request_number",
    "attempt_number",
    "request_id",
    "strategy",
    "timestamp",
    "server_port",
    "success",
    "latency_ms",
    "request_complete",
    "request_success",
    "rate_limited",
];

/// Appends one CSV row per downstream attempt to a single file for the
/// lifetime of a run. One `RunJournal` per process run; the mutex guards
/// the writer so concurrent requests don't interleave rows.
///
/// The run id is `{epoch_millis}_{strategy}_{tier}`, unique per process
/// start without needing a date-formatting dependency the rest of the
/// workspace has no other use for.
pub struct RunJournal {
    run_id: String,
    path: PathBuf,
    writer: Mutex<csv::Writer<std::fs::File>>,
}

impl RunJournal {
    pub fn start(
        runs_dir: impl AsRef<Path>,
        strategy: &str,
        tier: Tier,
    ) -> Result<Self, JournalError> {
        let runs_dir = runs_dir.as_ref();
        std::fs::create_dir_all(runs_dir)?;

        let epoch_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is after the unix epoch")
            .as_millis();
        let run_id = format!("{epoch_millis}_{strategy}_{tier}");
        let path = runs_dir.join(format!("{run_id}.csv"));

        let mut writer = csv::WriterBuilder::new().from_path(&path)?;
        writer.write_record(CSV_HEADERS)?;
        writer.flush()?;

        Ok(Self {
            run_id,
            path,
            writer: Mutex::new(writer),
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AttemptSink for RunJournal {
    fn log_attempt(&self, record: &AttemptRecord) -> Result<(), SinkError> {
        let mut writer = self.writer.lock().expect("journal writer mutex poisoned");
        writer.write_record(&[
            record.session_id.as_deref().unwrap_or(""),
            &record.config_target.to_string(),
            &record.request_number.to_string(),
            &record.attempt_number.to_string(),
            &record.request_id,
            &record.strategy,
            &record.timestamp.to_string(),
            &record.server_port.to_string(),
            &capitalized_bool(record.success),
            &record.latency_ms.to_string(),
            &capitalized_bool(record.request_complete),
            &capitalized_bool(record.request_success),
            &capitalized_bool(record.rate_limited),
        ])?;
        writer.flush()?;
        Ok(())
    }
}

/// Matches the original logger's `csv.writer` serialization of Python
/// booleans (`True`/`False`), so existing tooling that reads these files
/// keeps working unchanged.
fn capitalized_bool(value: bool) -> String {
    if value { "True".to_string() } else { "False".to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(attempt_number: u32, request_complete: bool) -> AttemptRecord {
        AttemptRecord {
            session_id: None,
            config_target: Tier::T1,
            request_number: 1,
            attempt_number,
            request_id: "a".repeat(24),
            strategy: "v1".to_string(),
            timestamp: 1_700_000_000.0,
            server_port: 4000,
            success: request_complete,
            latency_ms: 12.5,
            request_complete,
            request_success: request_complete,
            rate_limited: false,
        }
    }

    #[test]
    fn start_writes_the_header_row() {
        let dir = std::env::temp_dir().join("banditlb-journal-test-header");
        let journal = RunJournal::start(&dir, "v1", Tier::T1).unwrap();
        let contents = std::fs::read_to_string(journal.path()).unwrap();
        let first_line = contents.lines().next().unwrap();
        assert_eq!(first_line, CSV_HEADERS.join(","));
    }

    #[test]
    fn run_id_embeds_strategy_and_tier() {
        let dir = std::env::temp_dir().join("banditlb-journal-test-run-id");
        let journal = RunJournal::start(&dir, "v6", Tier::T2).unwrap();
        assert!(journal.run_id().ends_with("_v6_T2"));
    }

    #[test]
    fn log_attempt_appends_a_row_with_python_style_booleans() {
        let dir = std::env::temp_dir().join("banditlb-journal-test-append");
        let journal = RunJournal::start(&dir, "v1", Tier::T1).unwrap();
        journal.log_attempt(&sample_record(0, true)).unwrap();

        let contents = std::fs::read_to_string(journal.path()).unwrap();
        let row = contents.lines().nth(1).unwrap();
        assert!(row.contains("True"));
        assert!(!row.contains("true"));
    }

    #[test]
    fn multiple_attempts_append_without_clobbering_earlier_rows() {
        let dir = std::env::temp_dir().join("banditlb-journal-test-multi");
        let journal = RunJournal::start(&dir, "v1", Tier::T1).unwrap();
        journal.log_attempt(&sample_record(0, false)).unwrap();
        journal.log_attempt(&sample_record(1, true)).unwrap();

        let contents = std::fs::read_to_string(journal.path()).unwrap();
        assert_eq!(contents.lines().count(), 3);
    }
}
