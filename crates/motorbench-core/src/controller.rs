//! Motor controller capability interface.
//!
//! The test engine drives the motor through this narrow trait and nothing
//! else. CAN bus wiring, device enumeration, and PID configuration belong to
//! the driver layer behind an implementation; the core only commands a
//! velocity and reads instantaneous state. Both operations fail with
//! [`HardwareFault`] on communication loss.

use crate::error::HardwareFault;

/// Instantaneous electrical and mechanical state of the motor under test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorState {
    /// Motor speed in revolutions per second.
    pub speed: f64,
    /// Stator current in amps.
    pub current: f64,
    /// Supply/bus voltage in volts.
    pub bus_voltage: f64,
    /// Motor output voltage in volts.
    pub voltage: f64,
}

/// Capability interface consumed by the test run engine.
///
/// Exclusively owned by the active run; at most one run drives a controller
/// at a time.
pub trait MotorController: Send {
    /// Command a closed-loop velocity setpoint in revolutions per second.
    fn set_velocity_command(&mut self, rps: f64) -> Result<(), HardwareFault>;

    /// Read the instantaneous motor state. Never substitutes stale values:
    /// a communication loss is reported as a fault.
    fn read_state(&mut self) -> Result<MotorState, HardwareFault>;

    /// Best-effort neutral-out. Called at run end and on abort paths, so it
    /// must not fail; implementations swallow errors here.
    fn stop(&mut self);
}

// ---------------------------------------------------------------------------
// Simulated controller
// ---------------------------------------------------------------------------

/// First-order simulated motor on a 12 V bus for bench-less operation.
///
/// Each `read_state` advances the model one step: speed converges toward the
/// commanded setpoint with a fixed smoothing factor, and current follows the
/// speed error (a motor accelerating a flywheel draws current roughly in
/// proportion to the torque demanded). Deterministic given the same command
/// sequence.
pub struct SimulatedController {
    command: f64,
    speed: f64,
    bus_voltage: f64,
    /// Fraction of the remaining speed error closed per step.
    response: f64,
    /// Amps drawn per rev/s of speed error.
    current_gain: f64,
    /// Quiescent draw in amps.
    idle_current: f64,
    stopped: bool,
}

impl SimulatedController {
    pub fn new() -> Self {
        Self {
            command: 0.0,
            speed: 0.0,
            bus_voltage: 12.0,
            response: 0.05,
            current_gain: 1.5,
            idle_current: 0.8,
            stopped: false,
        }
    }

    /// Override the simulated bus voltage.
    pub fn with_bus_voltage(mut self, volts: f64) -> Self {
        self.bus_voltage = volts;
        self
    }

    /// Whether `stop` has been called.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

impl Default for SimulatedController {
    fn default() -> Self {
        Self::new()
    }
}

impl MotorController for SimulatedController {
    fn set_velocity_command(&mut self, rps: f64) -> Result<(), HardwareFault> {
        self.command = rps;
        self.stopped = false;
        Ok(())
    }

    fn read_state(&mut self) -> Result<MotorState, HardwareFault> {
        let error = self.command - self.speed;
        self.speed += error * self.response;

        let current = self.idle_current + error.abs() * self.current_gain;
        // Back-EMF dominates output voltage; clamp to the bus.
        let voltage = (self.speed * 0.12).abs().min(self.bus_voltage);

        Ok(MotorState {
            speed: self.speed,
            current,
            bus_voltage: self.bus_voltage,
            voltage,
        })
    }

    fn stop(&mut self) {
        self.command = 0.0;
        self.stopped = true;
    }
}
