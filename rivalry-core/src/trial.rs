use serde::{Deserialize, Serialize};

use crate::stimulus::{ColorCombination, Percept};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Rivalry,
    Unambiguous,
    Break,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialType {
    HouseFace,
    House,
    Face,
    Break,
}

impl BlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Rivalry => "rivalry",
            BlockType::Unambiguous => "unambiguous",
            BlockType::Break => "break",
        }
    }
}

impl TrialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrialType::HouseFace => "house_face",
            TrialType::House => "house",
            TrialType::Face => "face",
            TrialType::Break => "break",
        }
    }
}

impl From<Percept> for TrialType {
    fn from(percept: Percept) -> Self {
        match percept {
            Percept::House => TrialType::House,
            Percept::Face => TrialType::Face,
        }
    }
}

/// Unit of `TrialSpec::phase_durations`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationUnit {
    /// Wall-clock time, counted in whole milliseconds.
    Time,
    /// Display refreshes (grouped by the screentick factor).
    #[default]
    Frames,
}

/// One scheduled unit of stimulus presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSpec {
    /// 0 for breaks, otherwise strictly increasing from 1.
    pub trial_id: usize,
    /// Numbered separately per block type, 0 for breaks.
    pub block_id: usize,
    pub block_type: BlockType,
    pub trial_type: TrialType,
    pub color_combination: ColorCombination,
    pub phase_durations: Vec<u64>,
    pub duration_unit: DurationUnit,
}

impl TrialSpec {
    /// Countdown followed by a "ready" screen.
    pub fn break_trial(countdown: u64, ready: u64, duration_unit: DurationUnit) -> Self {
        Self {
            trial_id: 0,
            block_id: 0,
            block_type: BlockType::Break,
            trial_type: TrialType::Break,
            color_combination: ColorCombination::Break,
            phase_durations: vec![countdown, ready],
            duration_unit,
        }
    }

    pub fn is_break(&self) -> bool {
        self.block_type == BlockType::Break
    }

    pub fn phase_count(&self) -> usize {
        self.phase_durations.len()
    }

    pub fn total_duration(&self) -> u64 {
        self.phase_durations.iter().sum()
    }
}
