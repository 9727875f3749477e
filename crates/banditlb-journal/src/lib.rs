//! Per-run CSV attempt journal.
//!
//! Grounded on the original `csv_logger.py`'s `CSVLogger`: one CSV file per
//! run under a runs directory, a fixed 13-column header, and a single
//! mutex guarding the writer so concurrent requests never interleave rows.

mod run;

pub use run::{JournalError, RunJournal};
