//! Block order and trial list construction.

use rand::Rng;
use rivalry_core::{BlockType, ColorCombination, DurationUnit, Percept, TrialSpec, TrialType};
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::fading::{BlockSegment, FadingParams, SteadyPhase, splice_transitions};
use crate::jitter::{JitterParams, generate_phase_durations};
use crate::palette::ColorBag;

/// Everything the builder needs, already converted to ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleParams {
    pub subject_id: u32,
    pub n_blocks: usize,
    pub rivalry_duration: u64,
    /// Total of one unambiguous block. Matches `rivalry_duration` unless
    /// configured otherwise, so time on task is balanced.
    pub unambiguous_target: u64,
    pub jitter: JitterParams,
    pub fading: FadingParams,
    /// Countdown and "ready" phases of a break.
    pub break_phases: (u64, u64),
    pub unit: DurationUnit,
}

impl ScheduleParams {
    /// 0 for even subjects (rivalry first), 1 for odd ones.
    pub fn start_condition(&self) -> usize {
        (self.subject_id % 2) as usize
    }

    /// Jitter settings with the trailing-phase floor raised far enough for
    /// the final phase to lend its share of a transition.
    pub fn effective_jitter(&self) -> JitterParams {
        let mut jitter = self.jitter.clone();
        if self.fading.is_enabled() {
            jitter.min_phase = jitter.min_phase.max(self.fading.min_trailing_phase());
        }
        jitter
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_blocks == 0 {
            return Err(ConfigError::NoBlocks);
        }
        if self.rivalry_duration == 0 {
            return Err(ConfigError::NonPositive {
                field: "stim_duration_rivalry",
                value: 0.0,
            });
        }
        if self.break_phases.0 == 0 || self.break_phases.1 == 0 {
            return Err(ConfigError::NonPositive {
                field: "break phase duration",
                value: 0.0,
            });
        }
        let jitter = self.effective_jitter();
        jitter.validate(self.unambiguous_target)?;
        self.fading.validate(jitter.shortest_phase())
    }
}

/// Block types in presentation order. Deterministic per subject.
pub fn block_sequence(subject_id: u32, n_blocks: usize) -> Vec<BlockType> {
    let start_condition = (subject_id % 2) as usize;
    (0..n_blocks)
        .map(|block| {
            if (block + start_condition) % 2 == 0 {
                BlockType::Rivalry
            } else {
                BlockType::Unambiguous
            }
        })
        .collect()
}

/// Builds the full trial list: a break before every block and one after
/// the last.
pub fn build_schedule<R: Rng + ?Sized>(
    params: &ScheduleParams,
    rng: &mut R,
) -> Result<Vec<TrialSpec>, ConfigError> {
    params.validate()?;

    let mut builder = ScheduleBuilder::new(params);
    for block_type in block_sequence(params.subject_id, params.n_blocks) {
        builder.push_break();
        match block_type {
            BlockType::Rivalry => builder.push_rivalry_block(rng),
            _ => builder.push_unambiguous_block(rng)?,
        }
    }
    builder.push_break();

    info!(
        subject = params.subject_id,
        blocks = params.n_blocks,
        trials = builder.trials.len(),
        "schedule built"
    );
    Ok(builder.trials)
}

struct ScheduleBuilder<'a> {
    params: &'a ScheduleParams,
    jitter: JitterParams,
    trials: Vec<TrialSpec>,
    next_trial_id: usize,
    rivalry_blocks: usize,
    unambiguous_blocks: usize,
    steady_index: usize,
    rivalry_colors: ColorBag,
    unambiguous_colors: ColorBag,
}

impl<'a> ScheduleBuilder<'a> {
    fn new(params: &'a ScheduleParams) -> Self {
        Self {
            params,
            jitter: params.effective_jitter(),
            trials: Vec::new(),
            next_trial_id: 1,
            rivalry_blocks: 0,
            unambiguous_blocks: 0,
            steady_index: 0,
            rivalry_colors: ColorBag::new(),
            unambiguous_colors: ColorBag::new(),
        }
    }

    fn push_break(&mut self) {
        let (countdown, ready) = self.params.break_phases;
        self.trials
            .push(TrialSpec::break_trial(countdown, ready, self.params.unit));
    }

    fn push_trial(
        &mut self,
        block_id: usize,
        block_type: BlockType,
        trial_type: TrialType,
        color_combination: ColorCombination,
        phase_durations: Vec<u64>,
    ) {
        self.trials.push(TrialSpec {
            trial_id: self.next_trial_id,
            block_id,
            block_type,
            trial_type,
            color_combination,
            phase_durations,
            duration_unit: self.params.unit,
        });
        self.next_trial_id += 1;
    }

    fn push_rivalry_block<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.rivalry_blocks += 1;
        let scheme = self.rivalry_colors.draw(rng);
        debug!(block = self.rivalry_blocks, ?scheme, "rivalry block");
        self.push_trial(
            self.rivalry_blocks,
            BlockType::Rivalry,
            TrialType::HouseFace,
            ColorCombination::Rivalry(scheme),
            vec![self.params.rivalry_duration],
        );
    }

    fn push_unambiguous_block<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), ConfigError> {
        self.unambiguous_blocks += 1;
        let block_id = self.unambiguous_blocks;
        let scheme = self.unambiguous_colors.draw(rng);
        let durations =
            generate_phase_durations(self.params.unambiguous_target, &self.jitter, rng)?;

        let phases: Vec<SteadyPhase> = durations
            .into_iter()
            .map(|duration| {
                let percept = if self.steady_index % 2 == 0 {
                    Percept::House
                } else {
                    Percept::Face
                };
                self.steady_index += 1;
                SteadyPhase {
                    state: scheme.steady(percept),
                    duration,
                }
            })
            .collect();
        debug!(block = block_id, ?scheme, phases = phases.len(), "unambiguous block");

        for segment in splice_transitions(&phases, &self.params.fading)? {
            match segment {
                BlockSegment::Steady(phase) => self.push_trial(
                    block_id,
                    BlockType::Unambiguous,
                    phase.state.percept().into(),
                    ColorCombination::Steady(phase.state),
                    vec![phase.duration],
                ),
                BlockSegment::Transition { direction, steps } => self.push_trial(
                    block_id,
                    BlockType::Unambiguous,
                    direction.to_state().percept().into(),
                    ColorCombination::Fade(direction),
                    steps,
                ),
            }
        }
        Ok(())
    }
}
