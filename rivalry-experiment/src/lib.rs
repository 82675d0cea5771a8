pub mod config;
pub mod error;
pub mod fading;
pub mod jitter;
pub mod log;
pub mod marker;
pub mod palette;
pub mod runner;
pub mod schedule;
pub mod scorer;
pub mod stats;
pub mod summary;

pub use config::ExperimentConfig;
pub use error::{AnalysisError, ConfigError, MarkerError, OutputError, ScoringError};
pub use fading::{BlockSegment, FadingParams, SteadyPhase, splice_transitions};
pub use jitter::{FixedDurations, JitterParams, generate_phase_durations};
pub use log::{EventKind, EventLog, Hand, LogEvent};
pub use marker::{MarkerSink, TracingMarker, WriterMarker};
pub use palette::ColorBag;
pub use runner::{DrawCommand, RunnerEvent, RunnerSettings, TrialRunner};
pub use schedule::{ScheduleParams, block_sequence, build_schedule};
pub use scorer::{
    KeyBindings, KeyOutcome, ResponseButtons, ResponseWindow, SessionCounters, SessionState,
};
pub use stats::{SwitchStatistics, compute_switch_statistics, switch_intervals};
pub use summary::{ExpectedResponses, SessionSummary, write_json};
