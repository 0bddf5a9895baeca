//! # evidence-logger
//!
//! HTTP front end and command-line tool for the evidence log.
//!
//! - [`config`] — `LoggerConfig`: defaults, TOML file, `EVIDENCE_*` env vars
//! - [`clock`]  — the source of batch timestamps
//! - [`http`]   — axum router for `/events`, `/verify`, `/healthz`

pub mod clock;
pub mod config;
pub mod http;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::LoggerConfig;
pub use http::{router, serve, AppState};
