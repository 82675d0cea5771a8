//! Keyboard response classification and scoring.

use rivalry_core::{BlockType, Key, Percept, TrialSpec};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ScoringError;
use crate::log::{EventLog, Hand, LogEvent};
use crate::marker::MarkerSink;

/// Accepted delay between a stimulus change and its response, in seconds.
/// Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResponseWindow {
    pub min: f64,
    pub max: f64,
}

impl ResponseWindow {
    pub fn contains(&self, delay: f64) -> bool {
        self.min <= delay && delay <= self.max
    }
}

/// Which key reports which percept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseButtons {
    pub house: Key,
    pub face: Key,
}

impl ResponseButtons {
    pub fn percept(&self, key: &Key) -> Option<Percept> {
        if *key == self.house {
            Some(Percept::House)
        } else if *key == self.face {
            Some(Percept::Face)
        } else {
            None
        }
    }

    pub fn key_for(&self, percept: Percept) -> &Key {
        match percept {
            Percept::House => &self.house,
            Percept::Face => &self.face,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBindings {
    pub exit: Key,
    pub break_buttons: Vec<Key>,
    pub response: ResponseButtons,
}

/// Response tallies. Only ever incremented during a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCounters {
    pub unambiguous_responses: usize,
    pub rivalry_responses: usize,
    pub total_responses: usize,
    pub correct_responses: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Exit key: abandon the current phase and end the session.
    Exit,
    /// Break key during a break: skip the rest of the current phase.
    AdvancePhase,
    /// Logged response. `is_correct` is only judged in unambiguous blocks.
    Response { is_correct: Option<bool> },
    Ignored,
}

/// Counters plus the log, owned by the single playback thread.
pub struct SessionState {
    counters: SessionCounters,
    log: EventLog,
    window: ResponseWindow,
    keys: KeyBindings,
    hand: Hand,
    marker: Option<Box<dyn MarkerSink>>,
}

impl SessionState {
    pub fn new(window: ResponseWindow, keys: KeyBindings, hand: Hand) -> Self {
        Self {
            counters: SessionCounters::default(),
            log: EventLog::new(),
            window,
            keys,
            hand,
            marker: None,
        }
    }

    pub fn with_marker(mut self, marker: Box<dyn MarkerSink>) -> Self {
        self.marker = Some(marker);
        self
    }

    pub fn counters(&self) -> &SessionCounters {
        &self.counters
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn keys(&self) -> &KeyBindings {
        &self.keys
    }

    pub fn hand(&self) -> Hand {
        self.hand
    }

    pub fn log_phase_onset(
        &mut self,
        trial: &TrialSpec,
        phase: usize,
        onset: f64,
    ) -> Result<(), ScoringError> {
        self.log
            .push(LogEvent::phase_onset(trial, phase, onset, self.hand))?;
        Ok(())
    }

    /// Handles one key press at `timestamp` seconds into the session.
    pub fn on_key_event(
        &mut self,
        key: &Key,
        timestamp: f64,
        trial: &TrialSpec,
        phase: usize,
    ) -> Result<KeyOutcome, ScoringError> {
        if *key == self.keys.exit {
            debug!(%key, timestamp, "exit key pressed");
            return Ok(KeyOutcome::Exit);
        }

        match trial.block_type {
            BlockType::Break => {
                if !self.keys.break_buttons.contains(key) {
                    return Ok(KeyOutcome::Ignored);
                }
                self.log.push(LogEvent::response(
                    trial,
                    phase,
                    timestamp,
                    key.clone(),
                    self.hand,
                ))?;
                Ok(KeyOutcome::AdvancePhase)
            }
            BlockType::Unambiguous | BlockType::Rivalry => {
                if self.keys.response.percept(key).is_none() {
                    return Ok(KeyOutcome::Ignored);
                }

                let is_correct = (trial.block_type == BlockType::Unambiguous).then(|| {
                    self.log
                        .last_onset()
                        .is_some_and(|previous| self.window.contains(timestamp - previous))
                });

                let mut event = LogEvent::response(trial, phase, timestamp, key.clone(), self.hand);
                event.is_correct = is_correct;
                self.log.push(event)?;

                self.count(trial.block_type, is_correct);
                self.send_marker(key, timestamp, trial);
                Ok(KeyOutcome::Response { is_correct })
            }
        }
    }

    fn count(&mut self, block_type: BlockType, is_correct: Option<bool>) {
        match block_type {
            BlockType::Unambiguous => self.counters.unambiguous_responses += 1,
            BlockType::Rivalry => self.counters.rivalry_responses += 1,
            BlockType::Break => return,
        }
        self.counters.total_responses += 1;
        if is_correct == Some(true) {
            self.counters.correct_responses += 1;
        }
    }

    fn send_marker(&mut self, key: &Key, timestamp: f64, trial: &TrialSpec) {
        let Some(marker) = self.marker.as_mut() else {
            return;
        };
        let message = format!(
            "response key={} trial={} block={} type={} t={:.4}",
            key,
            trial.trial_id,
            trial.block_type.as_str(),
            trial.trial_type.as_str(),
            timestamp
        );
        if let Err(err) = marker.send(&message) {
            warn!(error = %err, "eyetracker marker dropped");
        }
    }
}
