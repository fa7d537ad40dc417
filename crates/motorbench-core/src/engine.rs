//! Test run engine — orchestrates profile, sampler, and aggregator into one
//! timed run and produces an immutable Test Record.
//!
//! The engine executes a single fixed-period cooperative tick loop per run
//! (reference: 10 ms / 100 Hz). Each tick issues the profile setpoint,
//! samples telemetry, and appends the sample. A hardware fault aborts the run
//! without producing a record; repeated tick overruns abort with a
//! timing fault instead of silently drifting the sample clock.
//!
//! Sample timestamps are nominal (`tick × period`): the schedule, not the
//! wall clock, defines `t`, which keeps the stream strictly increasing at a
//! fixed period by construction.

use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::controller::MotorController;
use crate::error::RunError;
use crate::metrics::{threshold_power, ThresholdConfig};
use crate::profile::{VelocityProfile, DEFAULT_RAMP, DEFAULT_RUN_DURATION};
use crate::record::{now_iso8601, ProfileParameters, TelemetrySample, TestRecord, UploadState, RECORD_VERSION};
use crate::sampler::TelemetrySampler;

/// Observer callbacks fire every Nth tick so a live display never slows the
/// loop (the reference station updates its graph at 5 Hz from a 100 Hz loop).
pub const OBSERVER_DECIMATION: u64 = 20;

/// Consecutive tick overruns tolerated before the run aborts.
pub const DEFAULT_MAX_CONSECUTIVE_OVERRUNS: u32 = 4;

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// Everything that parameterizes one test run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub profile: ProfileParameters,
    /// Fixed tick period of the sampling/control loop.
    pub tick_period: Duration,
    /// Total run duration.
    pub run_duration: Duration,
    /// Ramp window of the velocity profile.
    pub ramp: Duration,
    /// Threshold-average power extraction settings.
    pub thresholds: ThresholdConfig,
    pub max_consecutive_overruns: u32,
}

impl RunConfig {
    /// Reference-deployment defaults: 10 ms tick, 10 s run, 2 s ramp.
    pub fn new(profile: ProfileParameters) -> Self {
        Self {
            profile,
            tick_period: Duration::from_millis(10),
            run_duration: DEFAULT_RUN_DURATION,
            ramp: DEFAULT_RAMP,
            thresholds: ThresholdConfig::default(),
            max_consecutive_overruns: DEFAULT_MAX_CONSECUTIVE_OVERRUNS,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Lifecycle of the engine's current/most recent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Aborted,
}

/// Drives one run at a time against an exclusively owned controller.
pub struct TestRunEngine<C: MotorController> {
    controller: C,
    state: RunState,
}

impl<C: MotorController> TestRunEngine<C> {
    pub fn new(controller: C) -> Self {
        Self {
            controller,
            state: RunState::Idle,
        }
    }

    /// Lifecycle state of the most recent run.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Release the controller capability.
    pub fn into_controller(self) -> C {
        self.controller
    }

    /// Execute one timed run to completion.
    ///
    /// On success the returned record is frozen: samples immutable, derived
    /// metrics computed, `upload_state` initialized to `Unsent`. On any abort
    /// the accumulated samples are discarded and never become a record.
    pub fn run(
        &mut self,
        config: &RunConfig,
        mut observer: Option<&mut dyn FnMut(&TelemetrySample)>,
    ) -> Result<TestRecord, RunError> {
        config
            .profile
            .validate()
            .map_err(RunError::InvalidProfile)?;

        // record_id is generated exactly once per physical run, here, and
        // never regenerated by any retry path.
        let record_id = Uuid::new_v4();
        let run_started_at = now_iso8601();

        let profile = VelocityProfile::new(&config.profile, config.ramp, config.run_duration);
        let mut sampler = TelemetrySampler::new(&config.profile);
        let tick_secs = config.tick_period.as_secs_f64();

        self.state = RunState::Running;
        log::info!(
            "run {record_id} started: target {} rev/s, {} A limit, {:.1} s",
            config.profile.target_max_speed,
            config.profile.target_max_current,
            profile.duration_secs(),
        );

        let mut samples: Vec<TelemetrySample> = Vec::with_capacity(
            (profile.duration_secs() / tick_secs).ceil() as usize,
        );
        let mut max_speed: f64 = 0.0;
        let mut consecutive_overruns: u32 = 0;
        let mut tick: u64 = 0;

        let started = Instant::now();
        let mut next_tick = started;

        loop {
            // Nominal elapsed time for this tick.
            let t = tick as f64 * tick_secs;
            if profile.is_complete(t) {
                break;
            }

            let tick_started = Instant::now();

            if let Err(fault) = self.controller.set_velocity_command(profile.setpoint(t)) {
                self.abort(&format!("hardware fault issuing setpoint: {fault}"));
                return Err(fault.into());
            }

            let sample = match sampler.sample(&mut self.controller, t) {
                Ok(sample) => sample,
                Err(fault) => {
                    // Samples accumulated so far are discarded: an aborted
                    // run never becomes a Test Record.
                    self.abort(&format!("hardware fault at tick {tick}: {fault}"));
                    return Err(fault.into());
                }
            };

            max_speed = max_speed.max(sample.speed.abs());
            samples.push(sample);

            if tick % OBSERVER_DECIMATION == 0 {
                if let Some(observer) = observer.as_deref_mut() {
                    observer(&sample);
                }
            }

            // Overrun detection: one late tick is logged and forgiven, a
            // consecutive streak aborts before the sample clock drifts.
            let work = tick_started.elapsed();
            if work > config.tick_period {
                consecutive_overruns += 1;
                log::warn!(
                    "tick {tick} took {:.2} ms (budget {:.2} ms), {consecutive_overruns} in a row",
                    work.as_secs_f64() * 1e3,
                    tick_secs * 1e3,
                );
                if consecutive_overruns >= config.max_consecutive_overruns {
                    self.abort("timing overrun streak");
                    return Err(RunError::TimingOverrun {
                        tick,
                        budget_ms: config.tick_period.as_millis() as u64,
                        consecutive: consecutive_overruns,
                    });
                }
            } else {
                consecutive_overruns = 0;
            }

            tick += 1;
            next_tick += config.tick_period;
            let now = Instant::now();
            if next_tick > now {
                std::thread::sleep(next_tick - now);
            }
        }

        // Run complete: stop the motor, freeze the samples, derive metrics.
        self.controller.stop();
        self.state = RunState::Completed;

        let metrics = threshold_power(&samples, &config.thresholds);
        let duration_seconds = started.elapsed().as_secs_f64();
        log::info!(
            "run {record_id} completed: {} samples in {:.2} s, max {:.1} rev/s",
            samples.len(),
            duration_seconds,
            max_speed,
        );

        Ok(TestRecord {
            version: RECORD_VERSION,
            record_id,
            run_started_at,
            profile: config.profile.clone(),
            duration_seconds,
            max_speed_achieved: max_speed,
            samples,
            metrics,
            upload_state: UploadState::Unsent,
        })
    }

    fn abort(&mut self, reason: &str) {
        self.controller.stop();
        self.state = RunState::Aborted;
        log::error!("run aborted: {reason}");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
