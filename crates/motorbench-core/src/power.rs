//! Power calculations for the telemetry pipeline.
//!
//! Input power is electrical: bus voltage × stator current. Output power is
//! mechanical, derived from the flywheel torque-equivalent: the flywheel
//! absorbs P = J·ω·α, with angular acceleration differentiated across ticks.

use std::f64::consts::TAU;

use crate::record::ProfileParameters;

/// Electrical input power in watts. Magnitudes, direction-independent.
pub fn input_power(bus_voltage: f64, current: f64) -> f64 {
    (bus_voltage * current).abs()
}

/// Flywheel torque-equivalent output power model.
///
/// Keeps the previous tick's flywheel angular velocity so acceleration can be
/// differentiated across fixed-period samples. Regenerative (decelerating)
/// intervals report zero output power.
#[derive(Debug, Clone)]
pub struct FlywheelModel {
    inertia: f64,
    gear_ratio: f64,
    last: Option<(f64, f64)>, // (t seconds, flywheel rad/s)
}

impl FlywheelModel {
    pub fn new(params: &ProfileParameters) -> Self {
        Self {
            inertia: params.flywheel_inertia,
            gear_ratio: params.gear_ratio,
            last: None,
        }
    }

    /// Output power in watts at time `t` given the motor speed in rev/s.
    ///
    /// The first sample of a run has no previous velocity to differentiate
    /// against and reports zero.
    pub fn output_power(&mut self, t: f64, motor_speed_rps: f64) -> f64 {
        let omega = motor_speed_rps / self.gear_ratio * TAU;
        let power = match self.last {
            Some((t0, omega0)) if t > t0 => {
                let alpha = (omega - omega0) / (t - t0);
                (self.inertia * omega * alpha).max(0.0)
            }
            _ => 0.0,
        };
        self.last = Some((t, omega));
        power
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ProfileParameters {
        ProfileParameters {
            gear_ratio: 2.0,
            flywheel_inertia: 0.1,
            target_max_speed: 80.0,
            target_max_current: 40.0,
            hardware_description: String::new(),
        }
    }

    #[test]
    fn test_input_power_product() {
        assert_eq!(input_power(12.0, 10.0), 120.0);
    }

    #[test]
    fn test_input_power_direction_independent() {
        assert_eq!(input_power(12.0, -10.0), 120.0);
    }

    #[test]
    fn test_first_sample_reports_zero() {
        let mut model = FlywheelModel::new(&params());
        assert_eq!(model.output_power(0.0, 10.0), 0.0);
    }

    #[test]
    fn test_acceleration_power() {
        let mut model = FlywheelModel::new(&params());
        model.output_power(0.0, 0.0);
        // Motor 0 → 20 rev/s over 1 s at gear ratio 2: flywheel ω goes
        // 0 → 10·τ rad/s, α = 10·τ rad/s². P = J·ω·α = 0.1 · 10τ · 10τ.
        let p = model.output_power(1.0, 20.0);
        let expected = 0.1 * (10.0 * TAU) * (10.0 * TAU);
        assert!((p - expected).abs() < 1e-9, "got {p}, expected {expected}");
    }

    #[test]
    fn test_constant_speed_reports_zero() {
        let mut model = FlywheelModel::new(&params());
        model.output_power(0.0, 50.0);
        assert_eq!(model.output_power(0.01, 50.0), 0.0);
    }

    #[test]
    fn test_deceleration_clamped_to_zero() {
        let mut model = FlywheelModel::new(&params());
        model.output_power(0.0, 50.0);
        assert_eq!(model.output_power(0.01, 40.0), 0.0);
    }
}
