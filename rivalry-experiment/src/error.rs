//! Error types for scheduling, scoring and analysis.

use std::path::PathBuf;

use rivalry_core::SteadyState;
use thiserror::Error;

/// Parameters that cannot produce a valid schedule. Raised before playback.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("block count must be at least 1")]
    NoBlocks,

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("{field} must be a finite number, got {value}")]
    NonFinite { field: &'static str, value: f64 },

    #[error("{field} spans {ticks} ticks, more than the schedulable {max}")]
    TooLong {
        field: &'static str,
        ticks: f64,
        max: u64,
    },

    #[error("jitter bound {jitter} leaves no positive phase around mean {mean} (ticks)")]
    JitterExceedsMean { mean: f64, jitter: f64 },

    #[error("target of {target} ticks cannot hold a switch, need at least {required}")]
    TargetTooShort { target: u64, required: u64 },

    #[error("transition of {transition} ticks leaves no room in a phase of {shortest} ticks")]
    TransitionTooLong { transition: u64, shortest: u64 },

    #[error("no fade exists from {from:?} to {to:?}")]
    NoFade { from: SteadyState, to: SteadyState },

    #[error("fixed durations sum to {actual} ticks but the block needs {target}")]
    FixedListMismatch { target: u64, actual: u64 },

    #[error("fixed duration list is empty or contains a zero-length entry")]
    InvalidFixedList,

    #[error("response interval is inverted: min {min} > max {max}")]
    InvertedResponseInterval { min: f64, max: f64 },

    #[error("no {0} configured")]
    EmptyKeySet(&'static str),

    #[error("key `{0}` is bound to more than one action")]
    KeyConflict(String),
}

/// Raised when the response log would stop being chronological.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("event at {onset:.4}s precedes the previous log row at {previous:.4}s")]
    OutOfOrder { onset: f64, previous: f64 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("no rivalry block has two or more responses ({responses} rivalry responses logged)")]
    InsufficientData { responses: usize },
}

#[derive(Debug, Error)]
pub enum MarkerError {
    #[error("marker channel closed")]
    Closed,

    #[error("marker channel I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}
