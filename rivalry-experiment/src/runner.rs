//! Replays a schedule under the control of an external presentation loop.
//!
//! The loop owns the window and the refresh cadence. It calls `on_frame`
//! once per refresh, `draw` to learn what to present and `on_key` for each
//! key press; the runner keeps the cursor, the scorer and the log.

use rivalry_core::{
    ColorCombination, DurationUnit, Key, SessionStage, Stimulus, TrialSpec, TrialType,
};
use rivalry_timing::{FrameClock, Timer};
use tracing::{debug, info, warn};

use crate::error::ScoringError;
use crate::log::EventLog;
use crate::scorer::{KeyOutcome, SessionCounters, SessionState};
use crate::stats::compute_switch_statistics;
use crate::summary::{ExpectedResponses, SessionSummary};

#[derive(Debug, Clone, PartialEq)]
pub enum RunnerEvent {
    SessionStarted,
    PhaseStarted { trial_index: usize, phase: usize },
    ScheduleComplete,
}

/// What the presentation loop should put on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCommand {
    pub stimulus: ColorCombination,
    pub trial_type: TrialType,
    pub phase: usize,
    pub phase_count: usize,
}

impl DrawCommand {
    /// Opacity of the incoming image during a fade, in `(0, 1)`.
    pub fn fade_progress(&self) -> Option<f64> {
        self.stimulus
            .is_transition()
            .then(|| (self.phase + 1) as f64 / (self.phase_count + 1) as f64)
    }
}

#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub subject_id: u32,
    pub start_key: Key,
    /// Groups refreshes into scheduling ticks in frame mode.
    pub clock: FrameClock,
    pub expected: ExpectedResponses,
    pub screenshot: bool,
}

pub struct TrialRunner<T>
where
    T: Timer<Timestamp = u64>,
{
    pub timer: T,
    stage: SessionStage,
    schedule: Vec<TrialSpec>,
    state: SessionState,
    settings: RunnerSettings,
    trial_index: usize,
    phase_index: usize,
    phase_onset_ns: u64,
    frames_in_phase: u64,
    session_start_ns: u64,
    aborted: bool,
    summary: Option<SessionSummary>,
}

impl<T> TrialRunner<T>
where
    T: Timer<Timestamp = u64>,
{
    pub fn new(
        schedule: Vec<TrialSpec>,
        state: SessionState,
        timer: T,
        settings: RunnerSettings,
    ) -> Self {
        Self {
            timer,
            stage: SessionStage::default(),
            schedule,
            state,
            settings,
            trial_index: 0,
            phase_index: 0,
            phase_onset_ns: 0,
            frames_in_phase: 0,
            session_start_ns: 0,
            aborted: false,
            summary: None,
        }
    }

    /// Starts the session clock and logs the first phase onset.
    pub fn start(&mut self) -> Result<Vec<RunnerEvent>, ScoringError> {
        match self.stage.next() {
            Some(next @ SessionStage::Running) => self.stage = next,
            _ => return Ok(Vec::new()),
        }
        self.session_start_ns = self.timer.now();
        info!(subject = self.settings.subject_id, trials = self.schedule.len(), "session started");

        let mut events = vec![RunnerEvent::SessionStarted];
        if self.schedule.is_empty() {
            self.finish();
            events.push(RunnerEvent::ScheduleComplete);
            return Ok(events);
        }
        self.begin_phase()?;
        events.push(self.phase_event());
        Ok(events)
    }

    /// Counts one display refresh and advances when the phase has run out.
    pub fn on_frame(&mut self) -> Result<Vec<RunnerEvent>, ScoringError> {
        let mut events = Vec::new();
        if !self.stage.allows_responses() {
            return Ok(events);
        }
        self.frames_in_phase += 1;
        if self.phase_elapsed() {
            self.advance(&mut events)?;
        }
        Ok(events)
    }

    /// Moves to the next phase, or the next trial after the last phase.
    /// Returns `false` once the schedule is exhausted.
    pub fn advance_phase(&mut self) -> Result<bool, ScoringError> {
        if self.stage.is_finished() {
            return Ok(false);
        }
        let mut events = Vec::new();
        self.advance(&mut events)?;
        Ok(!events.contains(&RunnerEvent::ScheduleComplete))
    }

    pub fn on_key(&mut self, key: &Key, timestamp_ns: u64) -> Result<KeyOutcome, ScoringError> {
        match self.stage {
            SessionStage::Finished => return Ok(KeyOutcome::Ignored),
            SessionStage::Welcome => {
                if *key == self.state.keys().exit {
                    self.abort();
                    return Ok(KeyOutcome::Exit);
                }
                if *key == self.settings.start_key {
                    self.start()?;
                }
                return Ok(KeyOutcome::Ignored);
            }
            SessionStage::Running => {}
        }

        let onset = self.session_seconds(timestamp_ns);
        let trial = &self.schedule[self.trial_index];
        let outcome = self.state.on_key_event(key, onset, trial, self.phase_index)?;
        match outcome {
            KeyOutcome::Exit => self.abort(),
            KeyOutcome::AdvancePhase => {
                debug!(trial = self.trial_index, phase = self.phase_index, "phase skipped");
                self.advance_phase()?;
            }
            KeyOutcome::Response { .. } | KeyOutcome::Ignored => {}
        }
        Ok(outcome)
    }

    /// Key press stamped with the runner's own clock.
    pub fn on_key_now(&mut self, key: &Key) -> Result<KeyOutcome, ScoringError> {
        let now = self.timer.now();
        self.on_key(key, now)
    }

    pub fn draw(&self, phase_index: usize) -> Option<DrawCommand> {
        if !self.stage.allows_responses() {
            return None;
        }
        let trial = self.current_trial()?;
        (phase_index < trial.phase_count()).then(|| DrawCommand {
            stimulus: trial.color_combination,
            trial_type: trial.trial_type,
            phase: phase_index,
            phase_count: trial.phase_count(),
        })
    }

    /// Builds the summary once; later calls return the same report.
    pub fn finish(&mut self) -> &SessionSummary {
        self.stage = SessionStage::Finished;
        let (state, settings, aborted) = (&self.state, &self.settings, self.aborted);
        self.summary
            .get_or_insert_with(|| summarize(state, settings, aborted))
    }

    pub fn stage(&self) -> SessionStage {
        self.stage
    }

    pub fn is_finished(&self) -> bool {
        self.stage.is_finished()
    }

    pub fn was_aborted(&self) -> bool {
        self.aborted
    }

    /// A screenshot is due when the exit key ended the session and the
    /// config asks for one.
    pub fn wants_screenshot(&self) -> bool {
        self.aborted && self.settings.screenshot
    }

    pub fn current_trial(&self) -> Option<&TrialSpec> {
        if self.stage.is_finished() {
            return None;
        }
        self.schedule.get(self.trial_index)
    }

    pub fn trial_index(&self) -> usize {
        self.trial_index
    }

    pub fn phase_index(&self) -> usize {
        self.phase_index
    }

    pub fn schedule(&self) -> &[TrialSpec] {
        &self.schedule
    }

    pub fn log(&self) -> &EventLog {
        self.state.log()
    }

    pub fn counters(&self) -> &SessionCounters {
        self.state.counters()
    }

    /// Seconds since `start`.
    pub fn session_seconds(&self, timestamp_ns: u64) -> f64 {
        timestamp_ns.saturating_sub(self.session_start_ns) as f64 / 1e9
    }

    pub fn progress(&self) -> (usize, usize) {
        (self.trial_index + 1, self.schedule.len())
    }

    fn abort(&mut self) {
        info!(trial = self.trial_index, phase = self.phase_index, "exit key, ending session");
        self.aborted = true;
        self.finish();
    }

    fn phase_elapsed(&self) -> bool {
        let trial = &self.schedule[self.trial_index];
        let ticks = trial.phase_durations[self.phase_index];
        match trial.duration_unit {
            DurationUnit::Frames => {
                self.frames_in_phase >= self.settings.clock.frames_for_ticks(ticks)
            }
            DurationUnit::Time => {
                self.timer.elapsed(self.phase_onset_ns).as_millis() as u64 >= ticks
            }
        }
    }

    fn advance(&mut self, events: &mut Vec<RunnerEvent>) -> Result<(), ScoringError> {
        if !self.stage.allows_responses() {
            return Ok(());
        }
        self.phase_index += 1;
        if self.phase_index >= self.schedule[self.trial_index].phase_count() {
            self.phase_index = 0;
            self.trial_index += 1;
        }
        if self.trial_index >= self.schedule.len() {
            self.trial_index = self.schedule.len() - 1;
            self.finish();
            events.push(RunnerEvent::ScheduleComplete);
            return Ok(());
        }
        self.begin_phase()?;
        events.push(self.phase_event());
        Ok(())
    }

    fn begin_phase(&mut self) -> Result<(), ScoringError> {
        self.phase_onset_ns = self.timer.now();
        self.frames_in_phase = 0;
        let onset = self.session_seconds(self.phase_onset_ns);
        let trial = &self.schedule[self.trial_index];
        debug!(
            trial = trial.trial_id,
            block = trial.block_type.as_str(),
            stimulus = %trial.color_combination,
            phase = self.phase_index,
            onset,
            "phase onset"
        );
        self.state.log_phase_onset(trial, self.phase_index, onset)
    }

    fn phase_event(&self) -> RunnerEvent {
        RunnerEvent::PhaseStarted {
            trial_index: self.trial_index,
            phase: self.phase_index,
        }
    }
}

fn summarize(state: &SessionState, settings: &RunnerSettings, aborted: bool) -> SessionSummary {
    let switch_statistics = match compute_switch_statistics(state.log().rows()) {
        Ok(stats) => Some(stats),
        Err(err) => {
            warn!(error = %err, "switch statistics unavailable");
            None
        }
    };
    let summary = SessionSummary {
        subject_id: settings.subject_id,
        response_hand: state.hand(),
        response_buttons: state.keys().response.clone(),
        expected_responses: settings.expected,
        counters: state.counters().clone(),
        switch_statistics,
        aborted,
    };
    info!(
        total = summary.counters.total_responses,
        correct = summary.counters.correct_responses,
        aborted,
        "session finished"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{EventKind, Hand};
    use crate::scorer::{KeyBindings, ResponseButtons, ResponseWindow};
    use rivalry_core::{BlockType, ColorScheme, SteadyState};
    use rivalry_timing::ManualTimer;
    use std::time::Duration;

    fn state() -> SessionState {
        SessionState::new(
            ResponseWindow { min: 0.25, max: 1.5 },
            KeyBindings {
                exit: Key::new("q"),
                break_buttons: vec![Key::new("space")],
                response: ResponseButtons {
                    house: Key::new("j"),
                    face: Key::new("k"),
                },
            },
            Hand::Right,
        )
    }

    fn settings() -> RunnerSettings {
        RunnerSettings {
            subject_id: 2,
            start_key: Key::new("return"),
            clock: FrameClock::default(),
            expected: ExpectedResponses::default(),
            screenshot: true,
        }
    }

    fn schedule(unit: DurationUnit) -> Vec<TrialSpec> {
        vec![
            TrialSpec::break_trial(3, 2, unit),
            TrialSpec {
                trial_id: 1,
                block_id: 1,
                block_type: BlockType::Rivalry,
                trial_type: TrialType::HouseFace,
                color_combination: ColorCombination::Rivalry(ColorScheme::BlueHouseRedFace),
                phase_durations: vec![4],
                duration_unit: unit,
            },
            TrialSpec {
                trial_id: 2,
                block_id: 1,
                block_type: BlockType::Unambiguous,
                trial_type: TrialType::House,
                color_combination: ColorCombination::Steady(SteadyState::BlueHouse),
                phase_durations: vec![2],
                duration_unit: unit,
            },
        ]
    }

    fn runner(unit: DurationUnit) -> (TrialRunner<ManualTimer>, ManualTimer) {
        let timer = ManualTimer::new();
        let runner = TrialRunner::new(schedule(unit), state(), timer.clone(), settings());
        (runner, timer)
    }

    #[test]
    fn frames_drive_the_schedule_to_completion() {
        let (mut runner, _timer) = runner(DurationUnit::Frames);
        let events = runner.start().unwrap();
        assert_eq!(
            events,
            vec![
                RunnerEvent::SessionStarted,
                RunnerEvent::PhaseStarted { trial_index: 0, phase: 0 }
            ]
        );

        let mut frames = 0;
        while !runner.is_finished() {
            runner.on_frame().unwrap();
            frames += 1;
        }
        assert_eq!(frames, 3 + 2 + 4 + 2);
        let onsets = runner
            .log()
            .rows()
            .iter()
            .filter(|row| row.kind == EventKind::PhaseOnset)
            .count();
        assert_eq!(onsets, 4);
        assert!(!runner.was_aborted());
    }

    #[test]
    fn screentick_factor_stretches_frame_phases() {
        let timer = ManualTimer::new();
        let settings = RunnerSettings {
            clock: FrameClock::new(60.0, 2),
            ..settings()
        };
        let mut runner =
            TrialRunner::new(schedule(DurationUnit::Frames), state(), timer, settings);
        runner.start().unwrap();
        let mut frames = 0;
        while !runner.is_finished() {
            runner.on_frame().unwrap();
            frames += 1;
        }
        assert_eq!(frames, 2 * (3 + 2 + 4 + 2));
    }

    #[test]
    fn start_only_leaves_the_welcome_stage_once() {
        let (mut runner, _timer) = runner(DurationUnit::Frames);
        assert_eq!(runner.start().unwrap().len(), 2);
        assert_eq!(runner.stage(), SessionStage::Running);
        assert!(runner.start().unwrap().is_empty());
        runner.finish();
        assert!(runner.start().unwrap().is_empty());
        assert_eq!(runner.stage(), SessionStage::Finished);
    }

    #[test]
    fn time_unit_uses_elapsed_milliseconds() {
        let (mut runner, timer) = runner(DurationUnit::Time);
        runner.start().unwrap();
        timer.advance(Duration::from_millis(2));
        assert!(runner.on_frame().unwrap().is_empty());
        timer.advance(Duration::from_millis(1));
        assert_eq!(
            runner.on_frame().unwrap(),
            vec![RunnerEvent::PhaseStarted { trial_index: 0, phase: 1 }]
        );
    }

    #[test]
    fn start_key_leaves_the_welcome_screen() {
        let (mut runner, _timer) = runner(DurationUnit::Frames);
        assert_eq!(runner.draw(0), None);
        runner.on_key_now(&Key::new("j")).unwrap();
        assert_eq!(runner.stage(), SessionStage::Welcome);
        runner.on_key_now(&Key::new("return")).unwrap();
        assert_eq!(runner.stage(), SessionStage::Running);
        let command = runner.draw(0).unwrap();
        assert_eq!(command.stimulus, ColorCombination::Break);
        assert_eq!(command.fade_progress(), None);
        assert_eq!(runner.draw(2), None);
    }

    #[test]
    fn fade_progress_steps_towards_the_incoming_image() {
        let command = DrawCommand {
            stimulus: ColorCombination::Fade(rivalry_core::FadeDirection::BlueHouseToRedFace),
            trial_type: TrialType::Face,
            phase: 1,
            phase_count: 4,
        };
        assert_eq!(command.fade_progress(), Some(0.4));
    }

    #[test]
    fn break_key_skips_the_countdown() {
        let (mut runner, timer) = runner(DurationUnit::Frames);
        runner.start().unwrap();
        timer.advance(Duration::from_millis(500));
        let outcome = runner.on_key_now(&Key::new("space")).unwrap();
        assert_eq!(outcome, KeyOutcome::AdvancePhase);
        assert_eq!((runner.trial_index(), runner.phase_index()), (0, 1));
    }

    #[test]
    fn responses_are_timestamped_against_session_start() {
        let (mut runner, timer) = runner(DurationUnit::Frames);
        timer.set(5_000_000_000);
        runner.start().unwrap();
        runner.advance_phase().unwrap();
        runner.advance_phase().unwrap();
        assert_eq!(runner.current_trial().unwrap().block_type, BlockType::Rivalry);

        timer.advance(Duration::from_millis(1250));
        runner.on_key_now(&Key::new("k")).unwrap();
        let last = runner.log().rows().last().unwrap();
        assert_eq!(last.kind, EventKind::Response);
        assert!((last.onset - 1.25).abs() < 1e-9);
        assert_eq!(runner.counters().rivalry_responses, 1);
    }

    #[test]
    fn exit_key_aborts_and_summary_is_stable() {
        let (mut runner, timer) = runner(DurationUnit::Frames);
        runner.start().unwrap();
        runner.advance_phase().unwrap();
        runner.advance_phase().unwrap();
        for _ in 0..3 {
            timer.advance(Duration::from_millis(900));
            runner.on_key_now(&Key::new("j")).unwrap();
        }
        assert_eq!(runner.on_key_now(&Key::new("q")).unwrap(), KeyOutcome::Exit);
        assert!(runner.is_finished());
        assert!(runner.wants_screenshot());
        assert_eq!(runner.on_key_now(&Key::new("j")).unwrap(), KeyOutcome::Ignored);
        assert_eq!(runner.on_frame().unwrap(), vec![]);

        let first = runner.finish().clone();
        assert!(first.aborted);
        assert_eq!(first.counters.rivalry_responses, 3);
        let stats = first.switch_statistics.unwrap();
        assert!((stats.mean - 0.9).abs() < 1e-9);
        assert_eq!(runner.finish(), &first);
    }

    #[test]
    fn advance_phase_reports_exhaustion() {
        let (mut runner, _timer) = runner(DurationUnit::Frames);
        runner.start().unwrap();
        assert!(runner.advance_phase().unwrap());
        assert!(runner.advance_phase().unwrap());
        assert!(runner.advance_phase().unwrap());
        assert!(!runner.advance_phase().unwrap());
        assert!(runner.is_finished());
        assert!(runner.finish().switch_statistics.is_none());
    }
}
