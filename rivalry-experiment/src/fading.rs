//! Fading transitions between consecutive steady phases of a block.

use rivalry_core::{FadeDirection, SteadyState};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FadingParams {
    /// Number of intermediate images per transition. 0 disables fading.
    pub transition_steps: usize,
    /// Ticks each intermediate image stays on screen.
    pub step_ticks: u64,
}

impl FadingParams {
    pub fn is_enabled(&self) -> bool {
        self.transition_length() > 0
    }

    pub fn transition_length(&self) -> u64 {
        self.transition_steps as u64 * self.step_ticks
    }

    /// Ticks taken from the outgoing and from the incoming phase.
    pub fn borrow_split(&self) -> (u64, u64) {
        let length = self.transition_length();
        (length / 2, length - length / 2)
    }

    /// Shortest final phase that survives lending its share to a transition.
    pub fn min_trailing_phase(&self) -> u64 {
        self.borrow_split().1 + 1
    }

    /// Interior phases lend to both neighbours and must outlast a whole
    /// transition.
    pub fn validate(&self, shortest_phase: u64) -> Result<(), ConfigError> {
        if self.is_enabled() && shortest_phase <= self.transition_length() {
            return Err(ConfigError::TransitionTooLong {
                transition: self.transition_length(),
                shortest: shortest_phase,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SteadyPhase {
    pub state: SteadyState,
    pub duration: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockSegment {
    Steady(SteadyPhase),
    Transition {
        direction: FadeDirection,
        steps: Vec<u64>,
    },
}

impl BlockSegment {
    pub fn duration(&self) -> u64 {
        match self {
            BlockSegment::Steady(phase) => phase.duration,
            BlockSegment::Transition { steps, .. } => steps.iter().sum(),
        }
    }
}

/// Inserts a transition between every pair of neighbouring phases.
///
/// Each transition borrows half its length from either side, so the block
/// total is unchanged; the first and last phase only lend half a transition.
pub fn splice_transitions(
    phases: &[SteadyPhase],
    fading: &FadingParams,
) -> Result<Vec<BlockSegment>, ConfigError> {
    if !fading.is_enabled() {
        return Ok(phases.iter().copied().map(BlockSegment::Steady).collect());
    }

    let (head, tail) = fading.borrow_split();
    let last = phases.len().saturating_sub(1);
    let mut segments = Vec::with_capacity(phases.len() * 2);

    for (i, phase) in phases.iter().enumerate() {
        let lent_before = if i > 0 { tail } else { 0 };
        let lent_after = if i < last { head } else { 0 };
        let remaining = phase
            .duration
            .checked_sub(lent_before + lent_after)
            .filter(|&d| d > 0)
            .ok_or(ConfigError::TransitionTooLong {
                transition: fading.transition_length(),
                shortest: phase.duration,
            })?;

        segments.push(BlockSegment::Steady(SteadyPhase {
            state: phase.state,
            duration: remaining,
        }));

        if let Some(next) = phases.get(i + 1) {
            let direction = FadeDirection::between(phase.state, next.state).ok_or(
                ConfigError::NoFade {
                    from: phase.state,
                    to: next.state,
                },
            )?;
            segments.push(BlockSegment::Transition {
                direction,
                steps: vec![fading.step_ticks; fading.transition_steps],
            });
        }
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivalry_core::{ColorScheme, Percept};

    fn alternating(durations: &[u64], scheme: ColorScheme) -> Vec<SteadyPhase> {
        durations
            .iter()
            .enumerate()
            .map(|(i, &duration)| SteadyPhase {
                state: scheme.steady(if i % 2 == 0 { Percept::House } else { Percept::Face }),
                duration,
            })
            .collect()
    }

    #[test]
    fn splicing_preserves_block_total() {
        let phases = alternating(&[150, 120, 180, 140, 95], ColorScheme::BlueHouseRedFace);
        let fading = FadingParams {
            transition_steps: 5,
            step_ticks: 3,
        };
        let segments = splice_transitions(&phases, &fading).unwrap();

        assert_eq!(segments.len(), 9);
        let before: u64 = phases.iter().map(|p| p.duration).sum();
        let after: u64 = segments.iter().map(BlockSegment::duration).sum();
        assert_eq!(before, after);

        // 15-tick transitions split 7 / 8
        let steady: Vec<u64> = segments
            .iter()
            .filter_map(|s| match s {
                BlockSegment::Steady(p) => Some(p.duration),
                _ => None,
            })
            .collect();
        assert_eq!(steady, vec![143, 105, 165, 125, 87]);
    }

    #[test]
    fn transitions_follow_the_percept_order() {
        let phases = alternating(&[100, 100, 100], ColorScheme::RedHouseBlueFace);
        let fading = FadingParams {
            transition_steps: 4,
            step_ticks: 2,
        };
        let segments = splice_transitions(&phases, &fading).unwrap();
        let directions: Vec<_> = segments
            .iter()
            .filter_map(|s| match s {
                BlockSegment::Transition { direction, steps } => {
                    assert_eq!(steps, &vec![2, 2, 2, 2]);
                    Some(*direction)
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            directions,
            vec![
                FadeDirection::RedHouseToBlueFace,
                FadeDirection::BlueFaceToRedHouse
            ]
        );
    }

    #[test]
    fn disabled_fading_passes_phases_through() {
        let phases = alternating(&[10, 20], ColorScheme::BlueHouseRedFace);
        let segments = splice_transitions(&phases, &FadingParams::default()).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].duration(), 20);
    }

    #[test]
    fn same_percept_neighbours_have_no_fade() {
        let phases = [
            SteadyPhase {
                state: SteadyState::BlueHouse,
                duration: 100,
            },
            SteadyPhase {
                state: SteadyState::RedHouse,
                duration: 100,
            },
        ];
        let fading = FadingParams {
            transition_steps: 2,
            step_ticks: 2,
        };
        assert!(matches!(
            splice_transitions(&phases, &fading),
            Err(ConfigError::NoFade { .. })
        ));
    }

    #[test]
    fn phase_consumed_by_transitions_is_rejected() {
        let phases = alternating(&[100, 10, 100], ColorScheme::BlueHouseRedFace);
        let fading = FadingParams {
            transition_steps: 5,
            step_ticks: 2,
        };
        assert!(matches!(
            splice_transitions(&phases, &fading),
            Err(ConfigError::TransitionTooLong {
                transition: 10,
                shortest: 10
            })
        ));
        assert!(fading.validate(10).is_err());
        assert!(fading.validate(11).is_ok());
    }
}
