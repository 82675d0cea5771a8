use std::fs;
use std::path::Path;

use rivalry_core::{DurationUnit, Key};
use rivalry_timing::FrameClock;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::fading::FadingParams;
use crate::jitter::{FixedDurations, JitterParams};
use crate::log::Hand;
use crate::schedule::ScheduleParams;
use crate::scorer::{KeyBindings, ResponseButtons, ResponseWindow};

/// Longest single duration a schedule may hold, in ticks. About 49 days
/// in milliseconds; sums of such phases stay far from `u64::MAX`.
pub const MAX_TICKS: u64 = u32::MAX as u64;

/// Session settings. All durations are in seconds; they become ticks in
/// `schedule_params`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub task: TaskConfig,
    pub jitter: JitterConfig,
    pub fading: FadingConfig,
    pub response: ResponseConfig,
    pub breaks: BreakConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub blocks: usize,
    pub stim_duration_rivalry: f64,
    /// Defaults to the rivalry duration.
    pub stim_duration_unambiguous: Option<f64>,
    pub screenshot: bool,
    pub eyetracker: bool,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            blocks: 4,
            stim_duration_rivalry: 120.0,
            stim_duration_unambiguous: None,
            screenshot: false,
            eyetracker: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JitterConfig {
    pub mean_percept_duration: f64,
    pub jitter_bound: f64,
    /// Shortest final phase kept on its own.
    pub min_phase_duration: f64,
    /// Replaces jittered draws with these durations, shuffled.
    pub reference_durations: Option<Vec<f64>>,
    pub reference_scale: f64,
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self {
            mean_percept_duration: 2.5,
            jitter_bound: 1.0,
            min_phase_duration: 0.0,
            reference_durations: None,
            reference_scale: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FadingConfig {
    /// 0 disables fading.
    pub transition_steps: usize,
    pub step_duration: f64,
}

impl Default for FadingConfig {
    fn default() -> Self {
        Self {
            transition_steps: 0,
            step_duration: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    pub interval_min: f64,
    pub interval_max: f64,
    pub exit_key: Key,
    pub start_key: Key,
    pub buttons: ResponseButtons,
    pub hand: Hand,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            interval_min: 0.2,
            interval_max: 1.5,
            exit_key: Key::new("q"),
            start_key: Key::new("space"),
            buttons: ResponseButtons {
                house: Key::new("j"),
                face: Key::new("k"),
            },
            hand: Hand::Right,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakConfig {
    pub countdown: f64,
    pub ready: f64,
    pub buttons: Vec<Key>,
}

impl Default for BreakConfig {
    fn default() -> Self {
        Self {
            countdown: 10.0,
            ready: 2.0,
            buttons: vec![Key::new("space")],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub refresh_rate_hz: f64,
    pub screentick_factor: u32,
    pub duration_unit: DurationUnit,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            refresh_rate_hz: 60.0,
            screentick_factor: 1,
            duration_unit: DurationUnit::Frames,
        }
    }
}

impl ExperimentConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn frame_clock(&self) -> FrameClock {
        FrameClock::new(self.display.refresh_rate_hz, self.display.screentick_factor)
    }

    pub fn ticks(&self, seconds: f64) -> u64 {
        match self.display.duration_unit {
            DurationUnit::Frames => self.frame_clock().ticks_for(seconds),
            DurationUnit::Time => (seconds * 1000.0).round() as u64,
        }
    }

    /// Unrounded tick count, for values that are drawn from before rounding.
    pub fn ticks_exact(&self, seconds: f64) -> f64 {
        match self.display.duration_unit {
            DurationUnit::Frames => self.frame_clock().ticks_for_exact(seconds),
            DurationUnit::Time => seconds * 1000.0,
        }
    }

    pub fn seconds(&self, ticks: u64) -> f64 {
        match self.display.duration_unit {
            DurationUnit::Frames => self.frame_clock().seconds_for(ticks),
            DurationUnit::Time => ticks as f64 / 1000.0,
        }
    }

    pub fn response_window(&self) -> ResponseWindow {
        ResponseWindow {
            min: self.response.interval_min,
            max: self.response.interval_max,
        }
    }

    pub fn key_bindings(&self) -> KeyBindings {
        KeyBindings {
            exit: self.response.exit_key.clone(),
            break_buttons: self.breaks.buttons.clone(),
            response: self.response.buttons.clone(),
        }
    }

    /// Checks everything that does not depend on scheduling.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_numbers()?;
        if self.task.stim_duration_rivalry <= 0.0 {
            return Err(ConfigError::NonPositive {
                field: "stim_duration_rivalry",
                value: self.task.stim_duration_rivalry,
            });
        }
        if self.response.interval_min < 0.0 {
            return Err(ConfigError::Negative {
                field: "interval_min",
                value: self.response.interval_min,
            });
        }
        if self.response.interval_min > self.response.interval_max {
            return Err(ConfigError::InvertedResponseInterval {
                min: self.response.interval_min,
                max: self.response.interval_max,
            });
        }
        self.validate_keys()
    }

    /// Every float setting must be finite and every duration must fit in
    /// `MAX_TICKS`, so tick arithmetic downstream cannot overflow.
    fn validate_numbers(&self) -> Result<(), ConfigError> {
        let mut values = vec![
            ("refresh_rate_hz", self.display.refresh_rate_hz),
            ("reference_scale", self.jitter.reference_scale),
            ("interval_min", self.response.interval_min),
            ("interval_max", self.response.interval_max),
        ];
        let mut durations = vec![
            ("stim_duration_rivalry", self.task.stim_duration_rivalry),
            ("mean_percept_duration", self.jitter.mean_percept_duration),
            ("jitter_bound", self.jitter.jitter_bound),
            ("min_phase_duration", self.jitter.min_phase_duration),
            ("step_duration", self.fading.step_duration),
            (
                "fading transition",
                self.fading.transition_steps as f64 * self.fading.step_duration,
            ),
            ("countdown", self.breaks.countdown),
            ("ready", self.breaks.ready),
        ];
        if let Some(seconds) = self.task.stim_duration_unambiguous {
            durations.push(("stim_duration_unambiguous", seconds));
        }
        if let Some(reference) = &self.jitter.reference_durations {
            let scaled = reference.iter().sum::<f64>() * self.jitter.reference_scale;
            durations.extend(reference.iter().map(|&s| ("reference_durations", s)));
            durations.push(("scaled reference total", scaled));
        }
        values.extend(durations.iter().copied());

        if let Some(&(field, value)) = values.iter().find(|(_, value)| !value.is_finite()) {
            return Err(ConfigError::NonFinite { field, value });
        }
        if let Some(&(field, value)) = durations.iter().find(|(_, value)| *value < 0.0) {
            return Err(ConfigError::Negative { field, value });
        }
        if self.display.refresh_rate_hz <= 0.0 {
            return Err(ConfigError::NonPositive {
                field: "refresh_rate_hz",
                value: self.display.refresh_rate_hz,
            });
        }
        for (field, seconds) in durations {
            let ticks = self.ticks_exact(seconds);
            if ticks > MAX_TICKS as f64 {
                return Err(ConfigError::TooLong {
                    field,
                    ticks,
                    max: MAX_TICKS,
                });
            }
        }
        Ok(())
    }

    fn validate_keys(&self) -> Result<(), ConfigError> {
        let exit = &self.response.exit_key;
        let buttons = &self.response.buttons;
        if exit.as_str().is_empty() {
            return Err(ConfigError::EmptyKeySet("exit key"));
        }
        if buttons.house.as_str().is_empty() || buttons.face.as_str().is_empty() {
            return Err(ConfigError::EmptyKeySet("response buttons"));
        }
        if self.breaks.buttons.is_empty() {
            return Err(ConfigError::EmptyKeySet("break buttons"));
        }
        if buttons.house == buttons.face {
            return Err(ConfigError::KeyConflict(buttons.house.to_string()));
        }
        let exit_clashes = *exit == buttons.house
            || *exit == buttons.face
            || *exit == self.response.start_key
            || self.breaks.buttons.contains(exit);
        if exit_clashes {
            return Err(ConfigError::KeyConflict(exit.to_string()));
        }
        Ok(())
    }

    /// Converts to ticks and validates the result, so impossible settings
    /// fail here rather than mid-session.
    pub fn schedule_params(&self, subject_id: u32) -> Result<ScheduleParams, ConfigError> {
        self.validate()?;

        let fixed = match &self.jitter.reference_durations {
            Some(reference) => Some(FixedDurations {
                reference: reference.iter().map(|&s| self.ticks(s)).collect(),
                scale: self.jitter.reference_scale,
            }),
            None => None,
        };

        let (rivalry_duration, unambiguous_target) = match &fixed {
            // a fixed list defines the block length for both conditions
            Some(fixed) => {
                let total = fixed.total()?;
                (total, total)
            }
            None => {
                let rivalry = self.ticks(self.task.stim_duration_rivalry);
                let unambiguous = self
                    .task
                    .stim_duration_unambiguous
                    .map(|s| self.ticks(s))
                    .unwrap_or(rivalry);
                (rivalry, unambiguous)
            }
        };

        let params = ScheduleParams {
            subject_id,
            n_blocks: self.task.blocks,
            rivalry_duration,
            unambiguous_target,
            jitter: JitterParams {
                mean: self.ticks_exact(self.jitter.mean_percept_duration),
                bound: self.ticks_exact(self.jitter.jitter_bound),
                min_phase: self.ticks(self.jitter.min_phase_duration).max(1),
                fixed,
            },
            fading: FadingParams {
                transition_steps: self.fading.transition_steps,
                step_ticks: self.ticks(self.fading.step_duration),
            },
            break_phases: (self.ticks(self.breaks.countdown), self.ticks(self.breaks.ready)),
            unit: self.display.duration_unit,
        };
        params.validate()?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_produce_valid_frame_params() {
        let config = ExperimentConfig::default();
        let params = config.schedule_params(2).unwrap();
        assert_eq!(params.rivalry_duration, 7200);
        assert_eq!(params.unambiguous_target, 7200);
        assert_eq!(params.jitter.mean, 150.0);
        assert_eq!(params.jitter.bound, 60.0);
        assert_eq!(params.break_phases, (600, 120));
        assert_eq!(params.unit, DurationUnit::Frames);
    }

    #[test]
    fn time_unit_schedules_in_milliseconds() {
        let config = ExperimentConfig::from_toml_str(
            r#"
            [task]
            blocks = 2
            stim_duration_rivalry = 30.0

            [display]
            duration_unit = "time"
            "#,
        )
        .unwrap();
        let params = config.schedule_params(1).unwrap();
        assert_eq!(params.rivalry_duration, 30_000);
        assert_eq!(params.jitter.mean, 2500.0);
        assert_eq!(params.n_blocks, 2);
    }

    #[test]
    fn screentick_factor_coarsens_every_conversion() {
        let config =
            ExperimentConfig::from_toml_str("[display]\nscreentick_factor = 2\n").unwrap();
        assert_eq!(config.ticks(2.3), 69);
        assert_eq!(config.ticks_exact(2.5), 75.0);
        assert!((config.seconds(75) - 2.5).abs() < 1e-12);
        let params = config.schedule_params(2).unwrap();
        assert_eq!(params.rivalry_duration, 3600);
        assert_eq!(params.jitter.mean, 75.0);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ExperimentConfig::from_toml_str(
            r#"
            [response]
            exit_key = "Escape"
            hand = "left"

            [response.buttons]
            house = "f"
            face = "g"

            [fading]
            transition_steps = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.response.exit_key, Key::new("escape"));
        assert_eq!(config.response.hand, Hand::Left);
        assert_eq!(config.response.buttons.face, Key::new("g"));
        assert_eq!(config.fading.step_duration, 0.05);
        assert_eq!(config.task.blocks, 4);

        let params = config.schedule_params(0).unwrap();
        assert_eq!(params.fading.transition_length(), 24);
    }

    #[test]
    fn shipped_settings_match_defaults() {
        let config = ExperimentConfig::from_toml_str(include_str!("../../settings.toml")).unwrap();
        assert_eq!(config, ExperimentConfig::default());
    }

    #[test]
    fn fixed_reference_defines_block_length() {
        let mut config = ExperimentConfig::default();
        config.jitter.reference_durations = Some(vec![1.0, 2.0, 1.5]);
        let params = config.schedule_params(0).unwrap();
        // 60 + 120 + 90 ticks, doubled
        assert_eq!(params.unambiguous_target, 540);
        assert_eq!(params.rivalry_duration, 540);
    }

    #[test]
    fn invalid_settings_are_rejected_before_scheduling() {
        let mut config = ExperimentConfig::default();
        config.response.interval_min = 2.0;
        assert!(matches!(
            config.schedule_params(0),
            Err(ConfigError::InvertedResponseInterval { .. })
        ));

        let mut config = ExperimentConfig::default();
        config.response.exit_key = Key::new("space");
        assert!(matches!(config.schedule_params(0), Err(ConfigError::KeyConflict(_))));

        let mut config = ExperimentConfig::default();
        config.breaks.buttons.clear();
        assert!(matches!(
            config.schedule_params(0),
            Err(ConfigError::EmptyKeySet("break buttons"))
        ));

        let mut config = ExperimentConfig::default();
        config.task.blocks = 0;
        assert!(matches!(config.schedule_params(0), Err(ConfigError::NoBlocks)));

        let mut config = ExperimentConfig::default();
        config.fading.transition_steps = 40;
        assert!(matches!(
            config.schedule_params(0),
            Err(ConfigError::TransitionTooLong { .. })
        ));
    }

    #[test]
    fn huge_durations_are_rejected_without_overflow() {
        let mut config = ExperimentConfig::default();
        config.jitter.mean_percept_duration = 1e18;
        assert!(matches!(
            config.schedule_params(0),
            Err(ConfigError::TooLong {
                field: "mean_percept_duration",
                ..
            })
        ));

        let mut config = ExperimentConfig::default();
        config.jitter.reference_durations = Some(vec![3e7; 4]);
        assert!(matches!(
            config.schedule_params(0),
            Err(ConfigError::TooLong {
                field: "scaled reference total",
                ..
            })
        ));

        let mut config = ExperimentConfig::default();
        config.breaks.countdown = -1.0;
        assert!(matches!(
            config.schedule_params(0),
            Err(ConfigError::Negative {
                field: "countdown",
                ..
            })
        ));
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        let config = ExperimentConfig::from_toml_str("[response]\ninterval_max = nan\n").unwrap();
        assert!(matches!(
            config.schedule_params(0),
            Err(ConfigError::NonFinite {
                field: "interval_max",
                ..
            })
        ));

        let config = ExperimentConfig::from_toml_str("[display]\nrefresh_rate_hz = inf\n").unwrap();
        assert!(matches!(
            config.schedule_params(0),
            Err(ConfigError::NonFinite {
                field: "refresh_rate_hz",
                ..
            })
        ));

        let mut config = ExperimentConfig::default();
        config.jitter.reference_durations = Some(vec![1.0, f64::NAN]);
        assert!(matches!(
            config.schedule_params(0),
            Err(ConfigError::NonFinite { .. })
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            ExperimentConfig::from_toml_str("[task]\nblocks = \"four\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        assert!(matches!(
            ExperimentConfig::load("/definitely/not/here.toml"),
            Err(ConfigError::Read { .. })
        ));
    }
}
