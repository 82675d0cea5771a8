//! Phase durations for unambiguous blocks.
//!
//! All durations are integer ticks (display refreshes or milliseconds), so
//! the exact-sum guarantee holds without tolerance.

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::error::ConfigError;

/// Reference durations replayed in shuffled order instead of jittered draws.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedDurations {
    pub reference: Vec<u64>,
    pub scale: f64,
}

impl FixedDurations {
    pub fn scaled(&self) -> Vec<u64> {
        self.reference
            .iter()
            .map(|&d| (d as f64 * self.scale).round() as u64)
            .collect()
    }

    pub fn total(&self) -> Result<u64, ConfigError> {
        let scaled = self.scaled();
        scaled
            .iter()
            .try_fold(0u64, |total, &d| total.checked_add(d))
            .ok_or_else(|| ConfigError::TooLong {
                field: "scaled reference total",
                ticks: scaled.iter().map(|&d| d as f64).sum(),
                max: u64::MAX,
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JitterParams {
    /// Mean percept duration, in ticks.
    pub mean: f64,
    /// Half-width of the uniform jitter, in ticks.
    pub bound: f64,
    /// Shortest trailing remainder kept as its own phase. Shorter remainders
    /// are folded into the phase before.
    pub min_phase: u64,
    pub fixed: Option<FixedDurations>,
}

impl JitterParams {
    pub fn shortest_draw(&self) -> u64 {
        (self.mean - self.bound).max(0.0) as u64
    }

    pub fn longest_draw(&self) -> u64 {
        (self.mean + self.bound) as u64
    }

    /// Shortest phase this configuration can produce for any target.
    pub fn shortest_phase(&self) -> u64 {
        match &self.fixed {
            Some(fixed) => fixed.scaled().into_iter().min().unwrap_or(0),
            None => self.shortest_draw(),
        }
    }

    pub fn validate(&self, target: u64) -> Result<(), ConfigError> {
        if let Some(fixed) = &self.fixed {
            let scaled = fixed.scaled();
            if scaled.is_empty() || scaled.contains(&0) {
                return Err(ConfigError::InvalidFixedList);
            }
            let actual = fixed.total()?;
            if actual != target {
                return Err(ConfigError::FixedListMismatch { target, actual });
            }
            return Ok(());
        }

        if self.mean <= 0.0 {
            return Err(ConfigError::NonPositive {
                field: "mean_percept_duration",
                value: self.mean,
            });
        }
        if self.bound < 0.0 {
            return Err(ConfigError::Negative {
                field: "jitter_bound",
                value: self.bound,
            });
        }
        if self.shortest_draw() < 1 {
            return Err(ConfigError::JitterExceedsMean {
                mean: self.mean,
                jitter: self.bound,
            });
        }
        let required = self
            .longest_draw()
            .checked_add(self.min_phase.max(1))
            .ok_or(ConfigError::TooLong {
                field: "mean_percept_duration",
                ticks: self.mean + self.bound,
                max: u64::MAX,
            })?;
        if target < required {
            return Err(ConfigError::TargetTooShort { target, required });
        }
        Ok(())
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        let offset = if self.bound > 0.0 {
            rng.random_range(-self.bound..=self.bound)
        } else {
            0.0
        };
        (self.mean + offset) as u64
    }
}

/// Durations summing exactly to `target`.
///
/// With a fixed list the scaled reference durations come back in random
/// order. Otherwise durations of `mean ± bound` are drawn until the next
/// one would overshoot, and the remainder becomes the final phase.
pub fn generate_phase_durations<R: Rng + ?Sized>(
    target: u64,
    params: &JitterParams,
    rng: &mut R,
) -> Result<Vec<u64>, ConfigError> {
    params.validate(target)?;

    if let Some(fixed) = &params.fixed {
        let mut durations = fixed.scaled();
        durations.shuffle(rng);
        return Ok(durations);
    }

    let min_phase = params.min_phase.max(1);
    let mut durations = Vec::new();
    let mut total = 0u64;
    loop {
        let next = params.draw(rng);
        match total.checked_add(next) {
            Some(sum) if sum <= target => total = sum,
            _ => break,
        }
        durations.push(next);
    }

    let remainder = target - total;
    if remainder >= min_phase {
        durations.push(remainder);
    } else if remainder > 0 {
        // validate() guarantees at least one full draw fits
        if let Some(last) = durations.last_mut() {
            *last += remainder;
        }
        debug!(remainder, "folded short remainder into previous phase");
    }

    Ok(durations)
}
