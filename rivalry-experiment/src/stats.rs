use std::collections::BTreeMap;

use rivalry_core::BlockType;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::log::LogEvent;

/// Perceptual switch durations pooled over all rivalry blocks, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwitchStatistics {
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub intervals: usize,
}

/// Time between consecutive rivalry responses within each rivalry trial.
pub fn switch_intervals(log: &[LogEvent]) -> Vec<f64> {
    let mut by_trial: BTreeMap<usize, Vec<f64>> = BTreeMap::new();
    for row in log
        .iter()
        .filter(|row| row.is_response() && row.block_type == BlockType::Rivalry)
    {
        by_trial.entry(row.trial_nr).or_default().push(row.onset);
    }

    by_trial
        .values()
        .flat_map(|onsets| onsets.windows(2).map(|pair| pair[1] - pair[0]))
        .collect()
}

pub fn compute_switch_statistics(log: &[LogEvent]) -> Result<SwitchStatistics, AnalysisError> {
    let intervals = switch_intervals(log);
    if intervals.is_empty() {
        let responses = log
            .iter()
            .filter(|row| row.is_response() && row.block_type == BlockType::Rivalry)
            .count();
        return Err(AnalysisError::InsufficientData { responses });
    }

    let n = intervals.len() as f64;
    let mean = intervals.iter().sum::<f64>() / n;
    let var = intervals.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    Ok(SwitchStatistics {
        mean,
        std_dev: var.sqrt(),
        intervals: intervals.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::Hand;
    use rivalry_core::{ColorCombination, ColorScheme, DurationUnit, Key, TrialSpec, TrialType};

    fn rivalry_trial(trial_id: usize) -> TrialSpec {
        TrialSpec {
            trial_id,
            block_id: trial_id,
            block_type: BlockType::Rivalry,
            trial_type: TrialType::HouseFace,
            color_combination: ColorCombination::Rivalry(ColorScheme::BlueHouseRedFace),
            phase_durations: vec![7200],
            duration_unit: DurationUnit::Frames,
        }
    }

    fn press(trial: &TrialSpec, onset: f64) -> LogEvent {
        LogEvent::response(trial, 0, onset, Key::new("j"), Hand::Right)
    }

    #[test]
    fn pools_consecutive_differences() {
        let trial = rivalry_trial(1);
        let mut log = vec![LogEvent::phase_onset(&trial, 0, 0.0, Hand::Right)];
        log.extend([0.0, 1.2, 2.5, 4.0].into_iter().map(|t| press(&trial, t)));

        let intervals = switch_intervals(&log);
        let expected = [1.2, 1.3, 1.5];
        assert_eq!(intervals.len(), 3);
        for (got, want) in intervals.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9);
        }

        let stats = compute_switch_statistics(&log).unwrap();
        assert!((stats.mean - 1.3333).abs() < 1e-3);
        assert!((stats.std_dev - 0.125).abs() < 1e-3);
        assert_eq!(stats.intervals, 3);
    }

    #[test]
    fn differences_never_span_two_blocks() {
        let first = rivalry_trial(1);
        let second = rivalry_trial(5);
        let log = vec![
            press(&first, 1.0),
            press(&first, 3.0),
            press(&second, 100.0),
            press(&second, 101.0),
        ];
        assert_eq!(switch_intervals(&log), vec![2.0, 1.0]);
    }

    #[test]
    fn ignores_unambiguous_and_onset_rows() {
        let rivalry = rivalry_trial(1);
        let mut unambiguous = rivalry_trial(2);
        unambiguous.block_type = BlockType::Unambiguous;
        let log = vec![
            LogEvent::phase_onset(&rivalry, 0, 0.0, Hand::Right),
            press(&rivalry, 2.0),
            press(&unambiguous, 3.0),
            press(&rivalry, 5.0),
        ];
        assert_eq!(switch_intervals(&log), vec![3.0]);
    }

    #[test]
    fn single_response_per_block_is_insufficient() {
        let log = vec![press(&rivalry_trial(1), 1.0), press(&rivalry_trial(3), 9.0)];
        assert_eq!(
            compute_switch_statistics(&log),
            Err(AnalysisError::InsufficientData { responses: 2 })
        );
        assert_eq!(
            compute_switch_statistics(&[]),
            Err(AnalysisError::InsufficientData { responses: 0 })
        );
    }
}
