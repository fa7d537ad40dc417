//! Commanded-velocity profile for a test run.
//!
//! A profile is a deterministic pure function of elapsed run time and the
//! static profile parameters: ramp linearly to the target speed over the ramp
//! window, then hold until the fixed run duration elapses. Calls never block
//! and complete well under the tick period.

use std::time::Duration;

use crate::record::ProfileParameters;

/// Default total run duration (matches the reference deployment's 10 s test).
pub const DEFAULT_RUN_DURATION: Duration = Duration::from_secs(10);

/// Default ramp window from standstill to target speed.
pub const DEFAULT_RAMP: Duration = Duration::from_secs(2);

/// Ramp-and-hold velocity profile.
#[derive(Debug, Clone)]
pub struct VelocityProfile {
    target_speed: f64,
    ramp_secs: f64,
    duration_secs: f64,
}

impl VelocityProfile {
    /// Build a profile from run parameters and timing.
    ///
    /// A zero ramp degenerates to an immediate step to target speed.
    pub fn new(params: &ProfileParameters, ramp: Duration, duration: Duration) -> Self {
        Self {
            target_speed: params.target_max_speed,
            ramp_secs: ramp.as_secs_f64(),
            duration_secs: duration.as_secs_f64(),
        }
    }

    /// Commanded speed setpoint (rev/s) for elapsed run time `t` seconds.
    pub fn setpoint(&self, t: f64) -> f64 {
        if t <= 0.0 {
            return 0.0;
        }
        if self.ramp_secs <= 0.0 || t >= self.ramp_secs {
            return self.target_speed;
        }
        self.target_speed * (t / self.ramp_secs)
    }

    /// Whether the run is complete at elapsed time `t` seconds.
    pub fn is_complete(&self, t: f64) -> bool {
        t >= self.duration_secs
    }

    /// Total run duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(target: f64) -> ProfileParameters {
        ProfileParameters {
            gear_ratio: 1.0,
            flywheel_inertia: 0.05,
            target_max_speed: target,
            target_max_current: 40.0,
            hardware_description: String::new(),
        }
    }

    #[test]
    fn test_setpoint_zero_at_start() {
        let p = VelocityProfile::new(&params(80.0), DEFAULT_RAMP, DEFAULT_RUN_DURATION);
        assert_eq!(p.setpoint(0.0), 0.0);
    }

    #[test]
    fn test_setpoint_linear_during_ramp() {
        let p = VelocityProfile::new(&params(80.0), Duration::from_secs(2), DEFAULT_RUN_DURATION);
        assert!((p.setpoint(1.0) - 40.0).abs() < 1e-9);
        assert!((p.setpoint(0.5) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_setpoint_holds_after_ramp() {
        let p = VelocityProfile::new(&params(80.0), Duration::from_secs(2), DEFAULT_RUN_DURATION);
        assert_eq!(p.setpoint(2.0), 80.0);
        assert_eq!(p.setpoint(9.9), 80.0);
    }

    #[test]
    fn test_zero_ramp_steps_immediately() {
        let p = VelocityProfile::new(&params(80.0), Duration::ZERO, DEFAULT_RUN_DURATION);
        assert_eq!(p.setpoint(0.001), 80.0);
    }

    #[test]
    fn test_completion_boundary() {
        let p = VelocityProfile::new(&params(80.0), DEFAULT_RAMP, Duration::from_secs(10));
        assert!(!p.is_complete(9.999));
        assert!(p.is_complete(10.0));
        assert!(p.is_complete(11.0));
    }

    #[test]
    fn test_setpoint_is_deterministic() {
        let p = VelocityProfile::new(&params(60.0), DEFAULT_RAMP, DEFAULT_RUN_DURATION);
        assert_eq!(p.setpoint(1.234), p.setpoint(1.234));
    }
}
