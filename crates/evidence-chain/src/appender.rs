//! File-backed appender with per-day chain state.
//!
//! `EvidenceLog` owns the chain tail of every day it has touched.  Each day
//! has its own `Mutex`, held for the whole recover → hash → write → advance
//! sequence, so two appends to the same day can never claim the same
//! `prev_hash`.  Appends to different days do not contend.
//!
//! Only the newest day and the one before it are kept in memory once idle;
//! older days are dropped and recovered from disk again if written to.
//!
//! The lock is process-local.  Two processes writing the same day-file will
//! corrupt its chain.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use evidence_contracts::{
    day::DayId,
    envelope::{format_timestamp, EventPayload},
    error::{EvidenceError, EvidenceResult},
    report::{AppendReceipt, BatchFailure, BatchOutcome, VerifyReport},
};

use crate::{
    chain::seal,
    recover::{recover_day, RecoveryPolicy},
    rotation::{day_for, path_for_day},
    verifier::verify_file,
};

// ── Storage seam ──────────────────────────────────────────────────────────────

/// Where serialized record lines end up.
///
/// `append_line` receives one complete line including its terminator and must
/// write it with a single append.  An `Err` means the record may not be on
/// disk; the appender leaves the chain tail untouched.
pub trait LineSink: Send + Sync {
    fn append_line(&self, path: &Path, line: &[u8]) -> io::Result<()>;
}

/// The production sink: open-for-append, one `write_all`, flush.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSink {
    /// Call `sync_data` after every record.
    pub fsync: bool,
}

impl LineSink for FileSink {
    fn append_line(&self, path: &Path, line: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(line)?;
        file.flush()?;
        if self.fsync {
            file.sync_data()?;
        }
        Ok(())
    }
}

// ── Options ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct AppendOptions {
    pub recovery: RecoveryPolicy,
    pub fsync: bool,
}

// ── Per-day state ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum TailState {
    /// The day-file has not been read by this process yet.
    Unrecovered,
    /// Hash of the last record written, `None` before the first record.
    Known(Option<String>),
}

#[derive(Debug)]
struct DayChain {
    tail: TailState,
    /// The file ended mid-line at recovery; the next write must start with
    /// `\n`.
    needs_separator: bool,
}

impl DayChain {
    fn unrecovered() -> Self {
        Self {
            tail: TailState::Unrecovered,
            needs_separator: false,
        }
    }
}

// ── Public handle ─────────────────────────────────────────────────────────────

/// A hash-chained, day-rotated evidence log rooted at one directory.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct EvidenceLog {
    dir: PathBuf,
    recovery: RecoveryPolicy,
    sink: Box<dyn LineSink>,
    days: Mutex<HashMap<DayId, Arc<Mutex<DayChain>>>>,
}

impl EvidenceLog {
    /// Open (creating if necessary) the log directory `dir`.
    pub fn open(dir: impl Into<PathBuf>, options: AppendOptions) -> EvidenceResult<Self> {
        let sink = FileSink {
            fsync: options.fsync,
        };
        Self::with_sink(dir, options.recovery, Box::new(sink))
    }

    /// Open `dir` writing through a caller-supplied sink.
    pub fn with_sink(
        dir: impl Into<PathBuf>,
        recovery: RecoveryPolicy,
        sink: Box<dyn LineSink>,
    ) -> EvidenceResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| EvidenceError::Io {
            reason: format!("cannot create log directory '{}': {}", dir.display(), e),
        })?;
        Ok(Self {
            dir,
            recovery,
            sink,
            days: Mutex::new(HashMap::new()),
        })
    }

    pub fn path_for(&self, day: DayId) -> PathBuf {
        path_for_day(&self.dir, day)
    }

    /// Append one event stamped with `ts` to the day-file `ts` falls on.
    pub fn append(&self, event: &EventPayload, ts: DateTime<Utc>) -> EvidenceResult<AppendReceipt> {
        self.append_formatted(event, day_for(ts), format_timestamp(ts))
    }

    /// Append `events` in order, all stamped with the same `ts`.
    ///
    /// A failed event does not stop the batch: later events are still
    /// attempted and link to the last event that did reach disk.  Once
    /// `deadline` has passed, the remaining events are not attempted and are
    /// reported as failed.
    pub fn append_batch(
        &self,
        events: &[EventPayload],
        ts: DateTime<Utc>,
        deadline: Option<Instant>,
    ) -> EvidenceResult<BatchOutcome> {
        if events.is_empty() {
            return Err(EvidenceError::EmptyBatch);
        }

        let day = day_for(ts);
        let timestamp = format_timestamp(ts);
        let mut outcome = BatchOutcome::default();

        for (index, event) in events.iter().enumerate() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                outcome.failed.push(BatchFailure {
                    index,
                    detail: "batch deadline exceeded before this event was attempted".to_string(),
                });
                continue;
            }
            match self.append_formatted(event, day, timestamp.clone()) {
                Ok(receipt) => outcome.appended.push(receipt),
                Err(e) => {
                    warn!(day = %day, index, error = %e, "event in batch was not appended");
                    outcome.failed.push(BatchFailure {
                        index,
                        detail: e.to_string(),
                    });
                }
            }
        }

        info!(
            day = %day,
            appended = outcome.appended_count(),
            failed = outcome.failed.len(),
            "evidence batch processed"
        );
        Ok(outcome)
    }

    /// Forget the cached chain tail of `day`.
    ///
    /// The next append to that day reads the file's last line again.  Use
    /// after a write failure whose extent on disk is unknown.
    pub fn resync(&self, day: DayId) -> EvidenceResult<()> {
        let chain = self.day_chain(day)?;
        let mut state = lock(&chain)?;
        *state = DayChain::unrecovered();
        debug!(day = %day, "chain tail cache dropped");
        Ok(())
    }

    /// The chain tail this process holds for `day`, if it has touched it.
    ///
    /// Outer `None`: not recovered yet.  Inner `None`: empty sentinel.
    pub fn cached_tail(&self, day: DayId) -> EvidenceResult<Option<Option<String>>> {
        let days = self.days.lock().map_err(poisoned)?;
        let Some(chain) = days.get(&day) else {
            return Ok(None);
        };
        let state = lock(chain)?;
        Ok(match &state.tail {
            TailState::Unrecovered => None,
            TailState::Known(h) => Some(h.clone()),
        })
    }

    /// Verify `day`'s file.  Takes no lock; see `verifier::verify_file`.
    pub fn verify(&self, day: DayId) -> EvidenceResult<VerifyReport> {
        verify_file(&self.path_for(day), day)
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    fn day_chain(&self, day: DayId) -> EvidenceResult<Arc<Mutex<DayChain>>> {
        let mut days = self.days.lock().map_err(poisoned)?;
        if !days.contains_key(&day) {
            evict_stale_days(&mut days, day);
        }
        let chain = days
            .entry(day)
            .or_insert_with(|| Arc::new(Mutex::new(DayChain::unrecovered())));
        Ok(Arc::clone(chain))
    }

    fn append_formatted(
        &self,
        event: &EventPayload,
        day: DayId,
        timestamp: String,
    ) -> EvidenceResult<AppendReceipt> {
        let chain = self.day_chain(day)?;
        let mut state = lock(&chain)?;

        let cached = match &state.tail {
            TailState::Known(h) => Some(h.clone()),
            TailState::Unrecovered => None,
        };
        let prev_hash = match cached {
            Some(h) => h,
            None => {
                let recovered = recover_day(&self.dir, day, self.recovery)?;
                state.tail = TailState::Known(recovered.prev_hash.clone());
                state.needs_separator = recovered.unterminated;
                recovered.prev_hash
            }
        };

        let envelope = seal(event.clone(), prev_hash, timestamp)?;
        let mut line = Vec::new();
        if state.needs_separator {
            line.push(b'\n');
        }
        serde_json::to_writer(&mut line, &envelope).map_err(|e| EvidenceError::Serialization {
            reason: format!("cannot encode record envelope: {}", e),
        })?;
        line.push(b'\n');

        self.sink.append_line(&self.path_for(day), &line)?;
        state.tail = TailState::Known(Some(envelope.record_hash.clone()));
        state.needs_separator = false;

        debug!(
            day = %day,
            record_hash = %envelope.record_hash,
            genesis = envelope.is_genesis(),
            "record appended"
        );

        Ok(AppendReceipt {
            day,
            timestamp: envelope.timestamp,
            prev_hash: envelope.prev_hash,
            record_hash: envelope.record_hash,
        })
    }
}

/// Drop idle chain state for days older than the day before the newest one.
///
/// Runs under the registry lock.  Handles to a `DayChain` are only cloned
/// under that lock, so a strong count of 1 means no append is using it.
fn evict_stale_days(days: &mut HashMap<DayId, Arc<Mutex<DayChain>>>, incoming: DayId) {
    let newest = days.keys().copied().fold(incoming, DayId::max);
    let Some(keep_from) = newest.date().pred_opt().map(DayId::from_date) else {
        return;
    };
    days.retain(|day, chain| *day >= keep_from || Arc::strong_count(chain) > 1);
}

fn lock(chain: &Mutex<DayChain>) -> EvidenceResult<std::sync::MutexGuard<'_, DayChain>> {
    chain.lock().map_err(poisoned)
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> EvidenceError {
    EvidenceError::LockPoisoned {
        reason: e.to_string(),
    }
}
