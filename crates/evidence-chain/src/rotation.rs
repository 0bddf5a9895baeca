//! Day-based rotation: which file a timestamp belongs to.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use evidence_contracts::day::DayId;

/// The day-file identifier for `ts`.  Pure function of its UTC date.
pub fn day_for(ts: DateTime<Utc>) -> DayId {
    DayId::from_timestamp(ts)
}

/// Full path of the day-file for `day` inside `dir`.
pub fn path_for_day(dir: &Path, day: DayId) -> PathBuf {
    dir.join(day.file_name())
}

/// Full path of the day-file `ts` is appended to.
pub fn file_for(dir: &Path, ts: DateTime<Utc>) -> PathBuf {
    path_for_day(dir, day_for(ts))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    #[test]
    fn same_utc_day_shares_a_file() {
        let dir = Path::new("/var/evidence");
        let morning = Utc.with_ymd_and_hms(2025, 12, 24, 0, 0, 0).unwrap();
        let night = Utc.with_ymd_and_hms(2025, 12, 24, 23, 59, 59).unwrap()
            + Duration::microseconds(999_999);

        assert_eq!(file_for(dir, morning), file_for(dir, night));
        assert_eq!(
            file_for(dir, morning),
            PathBuf::from("/var/evidence/evidence-2025-12-24.jsonl")
        );
    }

    #[test]
    fn midnight_starts_a_new_file() {
        let dir = Path::new("logs");
        let before = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap();
        let after = before + Duration::seconds(1);

        assert_ne!(file_for(dir, before), file_for(dir, after));
        assert_eq!(day_for(after).to_string(), "2026-01-01");
    }
}
