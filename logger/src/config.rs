//! Service configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `EVIDENCE_*` environment variables, then command-line flags (applied by
//! `main`).
//!
//! ```toml
//! log_dir = "data/logs"
//! listen = "0.0.0.0:8000"
//! max_body_bytes = 1048576
//! batch_timeout_ms = 10000
//! recovery = "lenient"   # or "strict"
//! fsync = false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use evidence_chain::{AppendOptions, RecoveryPolicy};
use evidence_contracts::error::{EvidenceError, EvidenceResult};

pub const ENV_LOG_DIR: &str = "EVIDENCE_LOG_DIR";
pub const ENV_LISTEN_ADDR: &str = "EVIDENCE_LISTEN_ADDR";
pub const ENV_MAX_BODY_BYTES: &str = "EVIDENCE_MAX_BODY_BYTES";
pub const ENV_BATCH_TIMEOUT_MS: &str = "EVIDENCE_BATCH_TIMEOUT_MS";
pub const ENV_RECOVERY_POLICY: &str = "EVIDENCE_RECOVERY_POLICY";
pub const ENV_FSYNC: &str = "EVIDENCE_FSYNC";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggerConfig {
    /// Directory holding the day-files.
    pub log_dir: PathBuf,

    /// Socket address the HTTP server binds.
    pub listen: String,

    /// Largest accepted request body.
    pub max_body_bytes: usize,

    /// Upper bound on the time spent appending one batch.  `0` disables it.
    pub batch_timeout_ms: u64,

    /// Behaviour when a day-file's last line is unreadable at recovery time.
    pub recovery: RecoveryPolicy,

    /// `sync_data` after every record.
    pub fsync: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("data/logs"),
            listen: "0.0.0.0:8000".to_string(),
            max_body_bytes: 1024 * 1024,
            batch_timeout_ms: 10_000,
            recovery: RecoveryPolicy::Lenient,
            fsync: false,
        }
    }
}

impl LoggerConfig {
    /// Parse `s` as a TOML configuration document.
    ///
    /// Missing keys take their defaults; unknown keys are rejected.
    pub fn from_toml_str(s: &str) -> EvidenceResult<Self> {
        toml::from_str(s).map_err(|e| EvidenceError::ConfigError {
            reason: format!("failed to parse logger config TOML: {}", e),
        })
    }

    pub fn from_file(path: &Path) -> EvidenceResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| EvidenceError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Defaults or `path`, then the process environment.
    pub fn load(path: Option<&Path>) -> EvidenceResult<Self> {
        let base = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `EVIDENCE_*` overrides looked up through `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> EvidenceResult<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_LOG_DIR) {
            self.log_dir = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_LISTEN_ADDR) {
            self.listen = v;
        }
        if let Some(v) = get(ENV_MAX_BODY_BYTES) {
            self.max_body_bytes = parse_env(ENV_MAX_BODY_BYTES, &v)?;
        }
        if let Some(v) = get(ENV_BATCH_TIMEOUT_MS) {
            self.batch_timeout_ms = parse_env(ENV_BATCH_TIMEOUT_MS, &v)?;
        }
        if let Some(v) = get(ENV_RECOVERY_POLICY) {
            self.recovery = match v.trim().to_ascii_lowercase().as_str() {
                "lenient" => RecoveryPolicy::Lenient,
                "strict" => RecoveryPolicy::Strict,
                other => {
                    return Err(EvidenceError::ConfigError {
                        reason: format!(
                            "{} must be 'lenient' or 'strict', got '{}'",
                            ENV_RECOVERY_POLICY, other
                        ),
                    })
                }
            };
        }
        if let Some(v) = get(ENV_FSYNC) {
            self.fsync = parse_env(ENV_FSYNC, &v)?;
        }
        Ok(self)
    }

    pub fn append_options(&self) -> AppendOptions {
        AppendOptions {
            recovery: self.recovery,
            fsync: self.fsync,
        }
    }

    pub fn batch_timeout(&self) -> Option<Duration> {
        (self.batch_timeout_ms > 0).then(|| Duration::from_millis(self.batch_timeout_ms))
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> EvidenceResult<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| EvidenceError::ConfigError {
        reason: format!("{} has invalid value '{}': {}", key, raw, e),
    })
}
