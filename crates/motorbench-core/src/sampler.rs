//! Telemetry sampler — one capability read per tick, one sample out.
//!
//! The sampler owns the power model state (speed differentiation across
//! ticks) but not the controller: the engine passes the controller in per
//! call so it can keep issuing setpoints between samples. A hardware fault
//! propagates untouched; the sampler never substitutes a stale value.

use crate::controller::MotorController;
use crate::error::HardwareFault;
use crate::power::{input_power, FlywheelModel};
use crate::record::{ProfileParameters, TelemetrySample};

pub struct TelemetrySampler {
    model: FlywheelModel,
}

impl TelemetrySampler {
    pub fn new(params: &ProfileParameters) -> Self {
        Self {
            model: FlywheelModel::new(params),
        }
    }

    /// Take one sample at elapsed run time `t` seconds.
    pub fn sample<C: MotorController + ?Sized>(
        &mut self,
        controller: &mut C,
        t: f64,
    ) -> Result<TelemetrySample, HardwareFault> {
        let state = controller.read_state()?;
        Ok(TelemetrySample {
            t,
            voltage: state.voltage,
            bus_voltage: state.bus_voltage,
            current: state.current.abs(),
            speed: state.speed,
            input_power: input_power(state.bus_voltage, state.current),
            output_power: self.model.output_power(t, state.speed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::MotorState;

    fn params() -> ProfileParameters {
        ProfileParameters {
            gear_ratio: 1.0,
            flywheel_inertia: 0.05,
            target_max_speed: 80.0,
            target_max_current: 40.0,
            hardware_description: String::new(),
        }
    }

    /// Replays a fixed state on every read.
    struct FixedController(MotorState);

    impl MotorController for FixedController {
        fn set_velocity_command(&mut self, _rps: f64) -> Result<(), HardwareFault> {
            Ok(())
        }
        fn read_state(&mut self) -> Result<MotorState, HardwareFault> {
            Ok(self.0)
        }
        fn stop(&mut self) {}
    }

    /// Fails every read.
    struct DeadController;

    impl MotorController for DeadController {
        fn set_velocity_command(&mut self, _rps: f64) -> Result<(), HardwareFault> {
            Err(HardwareFault::new("dead", "no response"))
        }
        fn read_state(&mut self) -> Result<MotorState, HardwareFault> {
            Err(HardwareFault::new("dead", "no response"))
        }
        fn stop(&mut self) {}
    }

    #[test]
    fn test_sample_carries_state_and_powers() {
        let mut controller = FixedController(MotorState {
            speed: 30.0,
            current: -15.0,
            bus_voltage: 12.0,
            voltage: 3.6,
        });
        let mut sampler = TelemetrySampler::new(&params());
        let s = sampler.sample(&mut controller, 0.01).unwrap();
        assert_eq!(s.t, 0.01);
        assert_eq!(s.speed, 30.0);
        assert_eq!(s.current, 15.0, "current is reported as a magnitude");
        assert_eq!(s.input_power, 180.0);
        assert_eq!(s.output_power, 0.0, "first sample has no speed history");
    }

    #[test]
    fn test_second_sample_sees_acceleration() {
        let mut controller = FixedController(MotorState {
            speed: 10.0,
            current: 5.0,
            bus_voltage: 12.0,
            voltage: 1.2,
        });
        let mut sampler = TelemetrySampler::new(&params());
        sampler.sample(&mut controller, 0.0).unwrap();
        controller.0.speed = 20.0;
        let s = sampler.sample(&mut controller, 0.01).unwrap();
        assert!(s.output_power > 0.0);
    }

    #[test]
    fn test_fault_propagates() {
        let mut sampler = TelemetrySampler::new(&params());
        let err = sampler.sample(&mut DeadController, 0.0).unwrap_err();
        assert_eq!(err.device, "dead");
    }
}
