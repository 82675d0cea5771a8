use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rivalry_core::{Key, Stimulus, TrialSpec};
use rivalry_experiment::{
    ExpectedResponses, ExperimentConfig, KeyOutcome, LogEvent, RunnerEvent, RunnerSettings,
    ScheduleParams, SessionState, SessionSummary, SwitchStatistics, TracingMarker, TrialRunner,
    build_schedule, compute_switch_statistics, write_json,
};
use rivalry_timing::{HighPrecisionTimer, ManualTimer, Timer};
use tracing::{debug, info, warn};

use crate::cli::SessionArgs;
use crate::simulate::SimulatedParticipant;

struct SessionKeys {
    start: Key,
    exit: Key,
}

/// One session: settings, subject and the seeded RNG everything draws from.
pub struct App {
    config: ExperimentConfig,
    session: SessionArgs,
    subject_id: u32,
    rng: StdRng,
}

impl App {
    pub fn new(session: SessionArgs) -> Result<Self> {
        let config = load_config(&session.config)?;
        let subject_id = session.subject_id()?;
        let rng = match session.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        info!(subject = %session.subject, subject_id, seed = ?session.seed, "session configured");
        Ok(Self {
            config,
            session,
            subject_id,
            rng,
        })
    }

    fn schedule_params(&self) -> Result<ScheduleParams> {
        self.config
            .schedule_params(self.subject_id)
            .context("invalid experiment settings")
    }

    pub fn build_schedule(&mut self) -> Result<(ScheduleParams, Vec<TrialSpec>)> {
        let params = self.schedule_params()?;
        let schedule = build_schedule(&params, &mut self.rng).context("building schedule")?;
        let ticks: u64 = schedule.iter().map(TrialSpec::total_duration).sum();
        info!(
            minutes = self.config.seconds(ticks) / 60.0,
            "nominal session length"
        );
        Ok((params, schedule))
    }

    /// Writes the trial list only.
    pub fn export_schedule(mut self) -> Result<PathBuf> {
        let (_, schedule) = self.build_schedule()?;
        let out = prepare_output_dir(&self.session.output_dir)?;
        let path = out.join(format!("{}_schedule.json", self.session.file_stem()));
        write_json(&schedule, &path).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), trials = schedule.len(), "schedule written");
        Ok(path)
    }

    /// Plays the whole schedule with a simulated participant and writes the
    /// schedule, event log and summary.
    pub fn simulate(
        mut self,
        abort_after: Option<usize>,
        realtime: bool,
    ) -> Result<SessionSummary> {
        let (params, schedule) = self.build_schedule()?;
        let out = prepare_output_dir(&self.session.output_dir)?;
        let stem = self.session.file_stem();
        let schedule_path = out.join(format!("{stem}_schedule.json"));
        write_json(&schedule, &schedule_path)
            .with_context(|| format!("writing {}", schedule_path.display()))?;

        let participant = SimulatedParticipant::new(
            StdRng::seed_from_u64(self.rng.random()),
            self.config.response.buttons.clone(),
            self.config.breaks.buttons.first().cloned().unwrap_or_else(|| "space".into()),
            self.config.jitter.mean_percept_duration,
            self.config.jitter.jitter_bound,
        );
        let keys = SessionKeys {
            start: self.config.response.start_key.clone(),
            exit: self.config.response.exit_key.clone(),
        };
        let period = self.config.frame_clock().refresh_period();
        let expected = ExpectedResponses::from_schedule(&schedule, params.jitter.mean);

        let (summary, log) = if realtime {
            let runner = self.runner(schedule, HighPrecisionTimer::new(), expected);
            play(runner, participant, &keys, period, abort_after)?
        } else {
            let runner = self.runner(schedule, ManualTimer::new(), expected);
            play(runner, participant, &keys, period, abort_after)?
        };

        let events_path = out.join(format!("{stem}_events.json"));
        write_json(&log, &events_path)
            .with_context(|| format!("writing {}", events_path.display()))?;
        let summary_path = out.join(format!("{stem}_summary.json"));
        summary
            .write_json(&summary_path)
            .with_context(|| format!("writing {}", summary_path.display()))?;
        info!(dir = %out.display(), "session artifacts written");
        Ok(summary)
    }

    fn runner<T>(
        &self,
        schedule: Vec<TrialSpec>,
        timer: T,
        expected: ExpectedResponses,
    ) -> TrialRunner<T>
    where
        T: Timer<Timestamp = u64>,
    {
        let mut state = SessionState::new(
            self.config.response_window(),
            self.config.key_bindings(),
            self.config.response.hand,
        );
        if self.config.task.eyetracker {
            state = state.with_marker(Box::new(TracingMarker));
        }
        TrialRunner::new(
            schedule,
            state,
            timer,
            RunnerSettings {
                subject_id: self.subject_id,
                start_key: self.config.response.start_key.clone(),
                clock: self.config.frame_clock(),
                expected,
                screenshot: self.config.task.screenshot,
            },
        )
    }
}

/// Frame loop: one `on_frame` per refresh, participant keys in between.
fn play<T, R>(
    mut runner: TrialRunner<T>,
    mut participant: SimulatedParticipant<R>,
    keys: &SessionKeys,
    period: Duration,
    abort_after: Option<usize>,
) -> Result<(SessionSummary, Vec<LogEvent>)>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    runner.on_key_now(&keys.start)?;
    let mut phase_started = vec![RunnerEvent::PhaseStarted {
        trial_index: runner.trial_index(),
        phase: runner.phase_index(),
    }];
    let mut responses = 0;

    while !runner.is_finished() {
        for event in phase_started.drain(..) {
            if let RunnerEvent::PhaseStarted { phase, .. } = event {
                let onset = runner.session_seconds(runner.timer.now());
                if let Some(command) = runner.draw(phase) {
                    debug!(
                        asset = command.stimulus.asset_name(),
                        cache_id = command.stimulus.cache_id(),
                        phase = command.phase,
                        of = command.phase_count,
                        opacity = ?command.fade_progress(),
                        "present"
                    );
                }
                if let Some(trial) = runner.current_trial() {
                    participant.on_phase_start(trial, phase, onset);
                }
            }
        }

        runner.timer.sleep(period);
        phase_started = runner.on_frame()?;

        if !phase_started.is_empty() {
            continue;
        }
        let now = runner.session_seconds(runner.timer.now());
        let Some(key) = runner.current_trial().and_then(|trial| participant.poll(trial, now)) else {
            continue;
        };
        match runner.on_key_now(&key)? {
            KeyOutcome::Response { .. } => {
                responses += 1;
                if abort_after == Some(responses) {
                    runner.on_key_now(&keys.exit)?;
                }
            }
            KeyOutcome::AdvancePhase if !runner.is_finished() => {
                phase_started.push(RunnerEvent::PhaseStarted {
                    trial_index: runner.trial_index(),
                    phase: runner.phase_index(),
                });
            }
            _ => {}
        }
    }

    if runner.wants_screenshot() {
        warn!("screenshot requested but a headless session has no frame to capture");
    }
    let (done, total) = runner.progress();
    info!(trial = done, of = total, aborted = runner.was_aborted(), "playback ended");
    let log = runner.log().rows().to_vec();
    Ok((runner.finish().clone(), log))
}

fn load_config(path: &Path) -> Result<ExperimentConfig> {
    if !path.exists() {
        warn!(path = %path.display(), "settings file not found, using defaults");
        return Ok(ExperimentConfig::default());
    }
    let config = ExperimentConfig::load(path)
        .with_context(|| format!("loading settings from {}", path.display()))?;
    info!(path = %path.display(), "settings loaded");
    Ok(config)
}

/// Creates `dir`, or a timestamped sibling when `dir` already holds files.
fn prepare_output_dir(dir: &Path) -> Result<PathBuf> {
    let occupied = fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false);
    let dir = if occupied {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let mut name = dir.as_os_str().to_owned();
        name.push(format!("_{stamp}"));
        let renamed = PathBuf::from(name);
        warn!(existing = %dir.display(), using = %renamed.display(), "output directory not empty");
        renamed
    } else {
        dir.to_path_buf()
    };
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    Ok(dir)
}

/// Switch statistics from an events file written by `simulate` or a live
/// session.
pub fn analyze(path: &Path) -> Result<SwitchStatistics> {
    let contents = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let log: Vec<LogEvent> =
        serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
    let stats = compute_switch_statistics(&log)?;
    info!(
        intervals = stats.intervals,
        mean = stats.mean,
        std_dev = stats.std_dev,
        "switch statistics"
    );
    Ok(stats)
}
