//! Error taxonomy for the test runner and the upload protocol.
//!
//! Hardware faults are run-fatal and abort the current run only. Transport
//! failures are retryable and leave the record `Unsent`. A duplicate at
//! ingest is deliberately *not* represented here — the central store already
//! holding a record is a success outcome, see [`crate::upload`].

use thiserror::Error;

/// Communication loss with the motor controller capability.
///
/// Raised by [`crate::controller::MotorController`] reads and writes. Never
/// silently retried mid-run: the engine aborts the run and surfaces it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("hardware fault on {device}: {reason}")]
pub struct HardwareFault {
    /// Device identifier (e.g. controller name / CAN id label).
    pub device: String,
    /// Human-readable fault description.
    pub reason: String,
}

impl HardwareFault {
    pub fn new(device: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            reason: reason.into(),
        }
    }
}

/// Why a test run failed to produce a record.
#[derive(Debug, Error)]
pub enum RunError {
    /// The controller capability reported a communication loss mid-run.
    #[error(transparent)]
    Hardware(#[from] HardwareFault),

    /// Tick work repeatedly exceeded the tick budget. Aborting beats silently
    /// drifting the sample clock.
    #[error(
        "tick {tick} overran the {budget_ms} ms tick budget \
         ({consecutive} consecutive overruns)"
    )]
    TimingOverrun {
        tick: u64,
        budget_ms: u64,
        consecutive: u32,
    },

    /// Profile parameters failed validation before the run started.
    #[error("invalid profile parameters: {0}")]
    InvalidProfile(String),
}

/// Retryable transport-level failure between the upload client and the
/// central store. The record stays `Unsent`.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    /// A status class the ingest protocol does not define (e.g. 5xx from a
    /// proxy). Treated as retryable like any other transport failure.
    #[error("unexpected http status {0}")]
    Http(u16),
}

/// Why an upload attempt did not reach `Uploaded`.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Retryable: the record remains `Unsent` and may be re-sent later.
    #[error("transport failure (retryable): {0}")]
    Transport(#[from] TransportError),

    /// Non-retryable validation failure from the central store. The record
    /// is `Rejected` and surfaced for manual inspection.
    #[error("record rejected by central store: {reason}")]
    Rejected { reason: String },

    /// Local serialization or ledger I/O failed.
    #[error("local i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hardware_fault_display() {
        let fault = HardwareFault::new("talon-1", "CAN bus silent");
        assert_eq!(
            fault.to_string(),
            "hardware fault on talon-1: CAN bus silent"
        );
    }

    #[test]
    fn test_run_error_from_hardware_fault() {
        let err: RunError = HardwareFault::new("talon-1", "lost").into();
        assert!(matches!(err, RunError::Hardware(_)));
    }

    #[test]
    fn test_timing_overrun_display_names_budget() {
        let err = RunError::TimingOverrun {
            tick: 42,
            budget_ms: 10,
            consecutive: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("tick 42"));
        assert!(msg.contains("10 ms"));
    }

    #[test]
    fn test_transport_error_is_retryable_upload_error() {
        let err: UploadError = TransportError::Timeout.into();
        assert!(matches!(err, UploadError::Transport(_)));
    }
}
