//! Scripted participant for headless sessions.

use rand::Rng;
use rivalry_core::{BlockType, ColorCombination, Key, Percept, TrialSpec};
use rivalry_experiment::ResponseButtons;

/// Reaction times in seconds after a steady image appears.
const REACTION: (f64, f64) = (0.3, 0.8);
/// Occasional slow reactions that miss the response window.
const SLOW_REACTION: (f64, f64) = (1.6, 2.4);
const SLOW_RATE: f64 = 0.1;
/// How long the participant waits before skipping a break countdown.
const BREAK_WAIT: (f64, f64) = (1.0, 2.0);

#[derive(Debug, Clone)]
struct Pending {
    due: f64,
    key: Key,
}

/// Presses keys the way a mostly attentive participant would: the matching
/// button shortly after each steady image, alternating buttons at roughly
/// the mean percept duration during rivalry, and the break key partway
/// through each countdown.
pub struct SimulatedParticipant<R: Rng> {
    rng: R,
    buttons: ResponseButtons,
    break_key: Key,
    /// Mean and half-width of rivalry percept durations, in seconds.
    percept: (f64, f64),
    rivalry_percept: Percept,
    pending: Option<Pending>,
}

impl<R: Rng> SimulatedParticipant<R> {
    pub fn new(
        rng: R,
        buttons: ResponseButtons,
        break_key: Key,
        percept_mean: f64,
        percept_jitter: f64,
    ) -> Self {
        Self {
            rng,
            buttons,
            break_key,
            percept: (percept_mean, percept_jitter.min(percept_mean * 0.9)),
            rivalry_percept: Percept::House,
            pending: None,
        }
    }

    /// Plans the reaction to a phase that started at `onset` seconds.
    pub fn on_phase_start(&mut self, trial: &TrialSpec, phase: usize, onset: f64) {
        self.pending = match (trial.block_type, trial.color_combination) {
            (BlockType::Break, _) if phase == 0 => Some(Pending {
                due: onset + self.rng.random_range(BREAK_WAIT.0..=BREAK_WAIT.1),
                key: self.break_key.clone(),
            }),
            (BlockType::Unambiguous, ColorCombination::Steady(state)) => {
                let (lo, hi) = if self.rng.random_bool(SLOW_RATE) {
                    SLOW_REACTION
                } else {
                    REACTION
                };
                Some(Pending {
                    due: onset + self.rng.random_range(lo..=hi),
                    key: self.buttons.key_for(state.percept()).clone(),
                })
            }
            (BlockType::Rivalry, _) => {
                self.rivalry_percept = if self.rng.random_bool(0.5) {
                    Percept::House
                } else {
                    Percept::Face
                };
                Some(Pending {
                    due: onset + self.rng.random_range(REACTION.0..=REACTION.1),
                    key: self.buttons.key_for(self.rivalry_percept).clone(),
                })
            }
            _ => None,
        };
    }

    /// Key to press at `now` seconds, if one is due.
    pub fn poll(&mut self, trial: &TrialSpec, now: f64) -> Option<Key> {
        let pending = self.pending.take_if(|pending| pending.due <= now)?;
        if trial.block_type == BlockType::Rivalry {
            let (mean, jitter) = self.percept;
            self.rivalry_percept = self.rivalry_percept.other();
            self.pending = Some(Pending {
                due: pending.due + self.rng.random_range(mean - jitter..=mean + jitter),
                key: self.buttons.key_for(self.rivalry_percept).clone(),
            });
        }
        Some(pending.key)
    }
}
