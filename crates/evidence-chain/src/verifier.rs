//! Whole-file chain verification.
//!
//! Reads a day-file front to back and stops at the first record whose
//! linkage or hash is wrong.  Line numbers are physical, 1-based line numbers
//! of the file, blank lines included, so they can be fed straight to an
//! editor.
//!
//! The verifier takes no lock and may run while an append is in progress.  A
//! final line that has no terminator and does not parse is what a reader sees
//! of an append still being written; it is skipped and flagged in the report
//! rather than reported as corruption.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use tracing::{info, warn};

use evidence_contracts::{
    day::DayId,
    envelope::RecordEnvelope,
    error::{EvidenceError, EvidenceResult},
    report::VerifyReport,
};

use crate::{chain::check_record, rotation::path_for_day};

/// Verify the day-file for `day` inside `dir`.
pub fn verify_day(dir: &Path, day: DayId) -> EvidenceResult<VerifyReport> {
    verify_file(&path_for_day(dir, day), day)
}

/// Verify the file at `path` as the day-file of `day`.
pub fn verify_file(path: &Path, day: DayId) -> EvidenceResult<VerifyReport> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(EvidenceError::NotFound {
                day: day.to_string(),
            })
        }
        Err(e) => return Err(e.into()),
    };

    let result = verify_lines(BufReader::new(file), day);
    match &result {
        Ok(report) => info!(
            day = %day,
            verified_lines = report.verified_lines,
            trailing_partial = report.trailing_partial,
            "evidence chain verified"
        ),
        Err(e) => warn!(day = %day, error = %e, "evidence chain verification failed"),
    }
    result
}

fn verify_lines(mut reader: impl BufRead, day: DayId) -> EvidenceResult<VerifyReport> {
    let mut buf = Vec::new();
    let mut line_no = 0usize;
    let mut verified = 0usize;
    let mut expected_prev: Option<String> = None;
    let mut trailing_partial = false;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;

        let terminated = buf.last() == Some(&b'\n');
        let content = buf.trim_ascii();
        if content.is_empty() {
            continue;
        }

        let record: RecordEnvelope = match serde_json::from_slice(content) {
            Ok(r) => r,
            // Only the last line can lack a terminator.
            Err(_) if !terminated => {
                trailing_partial = true;
                break;
            }
            Err(e) => {
                return Err(EvidenceError::Malformed {
                    line: line_no,
                    reason: e.to_string(),
                })
            }
        };

        check_record(line_no, &record, expected_prev.as_deref())?;
        expected_prev = Some(record.record_hash);
        verified += 1;
    }

    Ok(VerifyReport {
        day,
        verified_lines: verified,
        terminal_hash: expected_prev,
        trailing_partial,
    })
}
