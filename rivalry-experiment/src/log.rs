//! Append-only session log.
//!
//! Rows are read back by position (`row[i - 1]`), so insertion order must
//! be chronological; `EventLog::push` refuses rows that go back in time.

use rivalry_core::{BlockType, ColorCombination, Key, TrialSpec, TrialType};
use serde::{Deserialize, Serialize};

use crate::error::ScoringError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A phase started; written by the runner.
    PhaseOnset,
    /// A key press accepted by the scorer.
    Response,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hand {
    Left,
    #[default]
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub kind: EventKind,
    /// Trial type shown when the row was written.
    pub event_type: TrialType,
    pub trial_nr: usize,
    /// Seconds since session start.
    pub onset: f64,
    pub phase: usize,
    pub response: Option<Key>,
    pub block_type: BlockType,
    pub block_id: usize,
    pub color_comb: ColorCombination,
    pub response_hand: Hand,
    /// Only set for responses in unambiguous blocks.
    pub is_correct: Option<bool>,
}

impl LogEvent {
    pub fn phase_onset(trial: &TrialSpec, phase: usize, onset: f64, hand: Hand) -> Self {
        Self {
            kind: EventKind::PhaseOnset,
            event_type: trial.trial_type,
            trial_nr: trial.trial_id,
            onset,
            phase,
            response: None,
            block_type: trial.block_type,
            block_id: trial.block_id,
            color_comb: trial.color_combination,
            response_hand: hand,
            is_correct: None,
        }
    }

    pub fn response(trial: &TrialSpec, phase: usize, onset: f64, key: Key, hand: Hand) -> Self {
        Self {
            kind: EventKind::Response,
            response: Some(key),
            ..Self::phase_onset(trial, phase, onset, hand)
        }
    }

    pub fn is_response(&self) -> bool {
        self.kind == EventKind::Response
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog {
    rows: Vec<LogEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row and returns its index.
    pub fn push(&mut self, event: LogEvent) -> Result<usize, ScoringError> {
        if let Some(previous) = self.last_onset() {
            if event.onset < previous {
                return Err(ScoringError::OutOfOrder {
                    onset: event.onset,
                    previous,
                });
            }
        }
        self.rows.push(event);
        Ok(self.rows.len() - 1)
    }

    pub fn last_onset(&self) -> Option<f64> {
        self.rows.last().map(|row| row.onset)
    }

    pub fn rows(&self) -> &[LogEvent] {
        &self.rows
    }

    pub fn responses(&self) -> impl Iterator<Item = &LogEvent> {
        self.rows.iter().filter(|row| row.is_response())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl From<Vec<LogEvent>> for EventLog {
    fn from(rows: Vec<LogEvent>) -> Self {
        Self { rows }
    }
}
