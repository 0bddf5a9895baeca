//! Chain tail recovery from an existing day-file.
//!
//! Only the final non-empty line is read.  The file is scanned backward in
//! fixed-size chunks, so the cost is proportional to the length of the last
//! line plus any trailing whitespace, not to the size of the file.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use evidence_contracts::{
    day::DayId,
    envelope::RecordEnvelope,
    error::{EvidenceError, EvidenceResult},
};

use crate::rotation::path_for_day;

const CHUNK_SIZE: usize = 4096;

/// What to do when the last line of a day-file cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryPolicy {
    /// Treat the file as having no chain yet: the next record starts a fresh
    /// chain with a `null` prev_hash.  A warning is logged.  The verifier will
    /// later report the broken line.
    #[default]
    Lenient,
    /// Refuse to append to the day until the file is repaired.
    Strict,
}

/// What recovery learned about the end of a day-file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveredTail {
    /// `record_hash` of the last record, `None` for the empty sentinel.
    pub prev_hash: Option<String>,

    /// The file is non-empty and its last byte is not `\n`.  The next line
    /// written must start with a terminator or it would be glued onto the
    /// torn bytes.
    pub unterminated: bool,
}

/// Recover the chain tail of `day`'s file in `dir`.
///
/// Returns `None` (the empty sentinel) when the file does not exist or holds
/// no non-whitespace content.  An unparseable last line is handled per
/// `policy`.
pub fn recover_tail(
    dir: &Path,
    day: DayId,
    policy: RecoveryPolicy,
) -> EvidenceResult<Option<String>> {
    recover_day(dir, day, policy).map(|r| r.prev_hash)
}

/// Like [`recover_tail`], also reporting whether the file ends mid-line.
pub fn recover_day(
    dir: &Path,
    day: DayId,
    policy: RecoveryPolicy,
) -> EvidenceResult<RecoveredTail> {
    let path = path_for_day(dir, day);
    let mut file = match File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(day = %day, "no day-file yet; chain starts empty");
            return Ok(RecoveredTail::default());
        }
        Err(e) => return Err(e.into()),
    };

    let unterminated = !ends_with_newline(&mut file)?;

    let Some(last_line) = read_last_line(&mut file)? else {
        debug!(day = %day, "day-file is empty; chain starts empty");
        return Ok(RecoveredTail {
            prev_hash: None,
            unterminated,
        });
    };

    let prev_hash = match serde_json::from_slice::<RecordEnvelope>(&last_line) {
        Ok(record) => {
            debug!(day = %day, tail = %record.record_hash, "recovered chain tail");
            Some(record.record_hash)
        }
        Err(e) => match policy {
            RecoveryPolicy::Lenient => {
                warn!(
                    day = %day,
                    path = %path.display(),
                    error = %e,
                    "last line of day-file is not a valid record; starting a fresh chain"
                );
                None
            }
            RecoveryPolicy::Strict => {
                return Err(EvidenceError::CorruptTail {
                    day: day.to_string(),
                    reason: e.to_string(),
                })
            }
        },
    };

    if unterminated {
        warn!(day = %day, "day-file does not end with a newline; next record starts a new line");
    }
    Ok(RecoveredTail {
        prev_hash,
        unterminated,
    })
}

/// True for an empty file or one whose last byte is `\n`.
fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    let len = file.seek(SeekFrom::End(0))?;
    if len == 0 {
        return Ok(true);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Return the bytes of the last line containing non-whitespace, without its
/// line terminator and trailing whitespace.
fn read_last_line(file: &mut File) -> io::Result<Option<Vec<u8>>> {
    let len = file.seek(SeekFrom::End(0))?;

    let Some(last) = rfind_byte(file, len, |b| !b.is_ascii_whitespace())? else {
        return Ok(None);
    };
    let end = last + 1;
    let start = rfind_byte(file, end, |b| b == b'\n')?.map_or(0, |nl| nl + 1);

    let mut line = vec![0u8; (end - start) as usize];
    file.seek(SeekFrom::Start(start))?;
    file.read_exact(&mut line)?;
    Ok(Some(line))
}

/// Offset of the last byte before `before` that satisfies `pred`.
fn rfind_byte(file: &mut File, before: u64, pred: impl Fn(u8) -> bool) -> io::Result<Option<u64>> {
    let mut chunk = [0u8; CHUNK_SIZE];
    let mut end = before;
    while end > 0 {
        let start = end.saturating_sub(CHUNK_SIZE as u64);
        let len = (end - start) as usize;
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(&mut chunk[..len])?;
        if let Some(i) = chunk[..len].iter().rposition(|b| pred(*b)) {
            return Ok(Some(start + i as u64));
        }
        end = start;
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::chain::seal;

    fn day() -> DayId {
        DayId::parse("2025-12-24").unwrap()
    }

    fn write_day_file(dir: &Path, contents: &[u8]) {
        let mut f = File::create(path_for_day(dir, day())).unwrap();
        f.write_all(contents).unwrap();
    }

    fn record_line(seq: u64, prev: Option<String>) -> (String, String) {
        let env = seal(
            json!({"sequence": seq}),
            prev,
            "2025-12-24T00:00:00.000000Z".to_string(),
        )
        .unwrap();
        (serde_json::to_string(&env).unwrap(), env.record_hash)
    }

    #[test]
    fn missing_file_yields_empty_sentinel() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(recover_tail(tmp.path(), day(), RecoveryPolicy::Strict).unwrap(), None);
    }

    #[test]
    fn whitespace_only_file_yields_empty_sentinel() {
        let tmp = TempDir::new().unwrap();
        write_day_file(tmp.path(), b"\n\n  \r\n");
        assert_eq!(recover_tail(tmp.path(), day(), RecoveryPolicy::Strict).unwrap(), None);
    }

    #[test]
    fn recovers_last_record_hash() {
        let tmp = TempDir::new().unwrap();
        let (l1, h1) = record_line(1, None);
        let (l2, h2) = record_line(2, Some(h1));
        write_day_file(tmp.path(), format!("{l1}\n{l2}\n").as_bytes());

        assert_eq!(
            recover_tail(tmp.path(), day(), RecoveryPolicy::Strict).unwrap(),
            Some(h2)
        );
    }

    #[test]
    fn tolerates_trailing_blank_lines_and_missing_terminator() {
        let tmp = TempDir::new().unwrap();
        let (l1, h1) = record_line(1, None);
        let (l2, h2) = record_line(2, Some(h1.clone()));

        write_day_file(tmp.path(), format!("{l1}\n{l2}\n\n\r\n   \n").as_bytes());
        assert_eq!(
            recover_tail(tmp.path(), day(), RecoveryPolicy::Strict).unwrap(),
            Some(h2)
        );

        // A single record with no newline anywhere in the file.
        write_day_file(tmp.path(), l1.as_bytes());
        assert_eq!(
            recover_tail(tmp.path(), day(), RecoveryPolicy::Strict).unwrap(),
            Some(h1)
        );
    }

    #[test]
    fn finds_lines_spanning_chunk_boundaries() {
        let tmp = TempDir::new().unwrap();
        let big = "x".repeat(CHUNK_SIZE * 2 + 17);
        let first = seal(json!({"blob": big}), None, "t1".to_string()).unwrap();
        let second = seal(
            json!({"blob": "y".repeat(CHUNK_SIZE + 3)}),
            Some(first.record_hash.clone()),
            "t2".to_string(),
        )
        .unwrap();
        let contents = format!(
            "{}\n{}\n{}",
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap(),
            "\n".repeat(CHUNK_SIZE + 1)
        );
        write_day_file(tmp.path(), contents.as_bytes());

        assert_eq!(
            recover_tail(tmp.path(), day(), RecoveryPolicy::Strict).unwrap(),
            Some(second.record_hash)
        );
    }

    #[test]
    fn corrupt_last_line_is_lenient_by_default() {
        let tmp = TempDir::new().unwrap();
        let (l1, _) = record_line(1, None);
        write_day_file(tmp.path(), format!("{l1}\n{{\"timestamp\":\"trunc").as_bytes());

        assert_eq!(
            recover_tail(tmp.path(), day(), RecoveryPolicy::default()).unwrap(),
            None,
            "lenient recovery must fall back to the empty sentinel"
        );
    }

    #[test]
    fn corrupt_last_line_fails_under_strict_policy() {
        let tmp = TempDir::new().unwrap();
        write_day_file(tmp.path(), b"not json at all\n");

        match recover_tail(tmp.path(), day(), RecoveryPolicy::Strict) {
            Err(EvidenceError::CorruptTail { day: d, .. }) => assert_eq!(d, "2025-12-24"),
            other => panic!("expected CorruptTail, got {:?}", other),
        }
    }

    #[test]
    fn reports_whether_file_ends_mid_line() {
        let tmp = TempDir::new().unwrap();
        let (l1, h1) = record_line(1, None);

        write_day_file(tmp.path(), format!("{l1}\n").as_bytes());
        let rec = recover_day(tmp.path(), day(), RecoveryPolicy::Strict).unwrap();
        assert_eq!(rec.prev_hash, Some(h1.clone()));
        assert!(!rec.unterminated);

        // Complete record, torn before its newline.
        write_day_file(tmp.path(), l1.as_bytes());
        let rec = recover_day(tmp.path(), day(), RecoveryPolicy::Strict).unwrap();
        assert_eq!(rec.prev_hash, Some(h1));
        assert!(rec.unterminated);

        // Torn record after a good one.
        let torn = format!("{l1}\n{{\"timestamp\":\"2025-12-24T00:00:0");
        write_day_file(tmp.path(), torn.as_bytes());
        let rec = recover_day(tmp.path(), day(), RecoveryPolicy::Lenient).unwrap();
        assert_eq!(rec.prev_hash, None);
        assert!(rec.unterminated);

        write_day_file(tmp.path(), b"");
        let rec = recover_day(tmp.path(), day(), RecoveryPolicy::Strict).unwrap();
        assert_eq!(rec, RecoveredTail::default());
    }

    #[test]
    fn policy_deserializes_from_lowercase() {
        let p: RecoveryPolicy = serde_json::from_value(json!("strict")).unwrap();
        assert_eq!(p, RecoveryPolicy::Strict);
    }
}
