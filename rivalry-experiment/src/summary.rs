use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rivalry_core::{BlockType, ColorCombination, TrialSpec};
use serde::{Deserialize, Serialize};

use crate::error::OutputError;
use crate::log::Hand;
use crate::scorer::{ResponseButtons, SessionCounters};
use crate::stats::SwitchStatistics;

/// Responses a perfectly attentive participant would give.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedResponses {
    /// One per steady unambiguous image.
    pub unambiguous: usize,
    /// Rivalry duration over mean percept duration, per rivalry block.
    pub rivalry: usize,
}

impl ExpectedResponses {
    pub fn from_schedule(schedule: &[TrialSpec], mean_percept_ticks: f64) -> Self {
        let mut expected = Self::default();
        for trial in schedule {
            match (trial.block_type, trial.color_combination) {
                (BlockType::Unambiguous, ColorCombination::Steady(_)) => expected.unambiguous += 1,
                (BlockType::Rivalry, _) if mean_percept_ticks > 0.0 => {
                    expected.rivalry +=
                        (trial.total_duration() as f64 / mean_percept_ticks).round() as usize
                }
                _ => {}
            }
        }
        expected
    }
}

/// Per-session report. Identical in shape whether the session ran to the
/// end or was cut short by the exit key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub subject_id: u32,
    pub response_hand: Hand,
    pub response_buttons: ResponseButtons,
    pub expected_responses: ExpectedResponses,
    #[serde(flatten)]
    pub counters: SessionCounters,
    /// Absent when no rivalry block collected two responses.
    pub switch_statistics: Option<SwitchStatistics>,
    pub aborted: bool,
}

impl SessionSummary {
    pub fn write_json(&self, path: &Path) -> Result<(), OutputError> {
        write_json(self, path)
    }
}

/// Pretty-printed JSON artifact.
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<(), OutputError> {
    let file = File::create(path).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush().map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivalry_core::{ColorScheme, DurationUnit, FadeDirection, Key, SteadyState, TrialType};

    fn trial(
        block_type: BlockType,
        color_combination: ColorCombination,
        duration: u64,
    ) -> TrialSpec {
        TrialSpec {
            trial_id: 1,
            block_id: 1,
            block_type,
            trial_type: TrialType::House,
            color_combination,
            phase_durations: vec![duration],
            duration_unit: DurationUnit::Frames,
        }
    }

    #[test]
    fn expectations_skip_fades_and_breaks() {
        let schedule = vec![
            TrialSpec::break_trial(10, 10, DurationUnit::Frames),
            trial(
                BlockType::Rivalry,
                ColorCombination::Rivalry(ColorScheme::BlueHouseRedFace),
                1500,
            ),
            trial(BlockType::Unambiguous, ColorCombination::Steady(SteadyState::BlueHouse), 140),
            trial(
                BlockType::Unambiguous,
                ColorCombination::Fade(FadeDirection::BlueHouseToRedFace),
                10,
            ),
            trial(BlockType::Unambiguous, ColorCombination::Steady(SteadyState::RedFace), 160),
        ];
        let expected = ExpectedResponses::from_schedule(&schedule, 150.0);
        assert_eq!(expected, ExpectedResponses { unambiguous: 2, rivalry: 10 });
    }

    #[test]
    fn counters_are_flattened_into_the_report() {
        let summary = SessionSummary {
            subject_id: 4,
            response_hand: Hand::Left,
            response_buttons: ResponseButtons {
                house: Key::new("j"),
                face: Key::new("k"),
            },
            expected_responses: ExpectedResponses::default(),
            counters: SessionCounters {
                unambiguous_responses: 3,
                rivalry_responses: 5,
                total_responses: 8,
                correct_responses: 2,
            },
            switch_statistics: None,
            aborted: true,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["rivalry_responses"], 5);
        assert_eq!(json["response_buttons"]["house"], "j");
        assert!(json["switch_statistics"].is_null());

        let path =
            std::env::temp_dir().join(format!("rivalry_summary_{}.json", std::process::id()));
        summary.write_json(&path).unwrap();
        let back: SessionSummary =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, summary);
        let _ = std::fs::remove_file(&path);
    }
}
