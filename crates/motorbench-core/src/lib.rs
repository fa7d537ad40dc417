//! # motorbench-core
//!
//! Closed-loop motor test engine, telemetry pipeline, and exactly-once record
//! upload.
//!
//! A test run drives a motor controller through a commanded-velocity profile,
//! samples multi-channel telemetry at a fixed rate, derives threshold-average
//! power metrics, and produces an immutable [`TestRecord`]. The record then
//! travels to a central store through a dedup-protected upload protocol:
//! the local [`UploadLedger`] and the store's uniqueness constraint are two
//! independent duplicate guards, so delivery is at-least-once on the wire but
//! exactly-once in storage.
//!
//! ## Quick start
//!
//! ```no_run
//! use motorbench_core::{
//!     ProfileParameters, RunConfig, SimulatedController, TestRunEngine,
//! };
//!
//! let profile = ProfileParameters {
//!     gear_ratio: 2.0,
//!     flywheel_inertia: 0.05,
//!     target_max_speed: 80.0,
//!     target_max_current: 40.0,
//!     hardware_description: "bench rig A".to_string(),
//! };
//!
//! let mut engine = TestRunEngine::new(SimulatedController::new());
//! let record = engine.run(&RunConfig::new(profile), None).expect("run failed");
//! println!("{} samples, id {}", record.samples.len(), record.record_id);
//! ```
//!
//! ## Architecture
//!
//! Profile → Engine tick loop → Sampler → Aggregator → Test Record
//! → Outbox → Ledger gate → Upload Client → Ingest Guard (central store)

pub mod controller;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod outbox;
pub mod power;
pub mod profile;
pub mod record;
pub mod sampler;
pub mod upload;

pub use controller::{MotorController, MotorState, SimulatedController};
pub use engine::{RunConfig, RunState, TestRunEngine, OBSERVER_DECIMATION};
pub use error::{HardwareFault, RunError, TransportError, UploadError};
pub use ledger::UploadLedger;
pub use metrics::{threshold_power, ThresholdConfig};
pub use outbox::Outbox;
pub use profile::{VelocityProfile, DEFAULT_RAMP, DEFAULT_RUN_DURATION};
pub use record::{
    decode_payload, encode_payload, now_iso8601, ProfileParameters, TelemetrySample, TestRecord,
    ThresholdPower, UploadState, DEFAULT_CURRENT_THRESHOLDS, RECORD_VERSION,
};
pub use sampler::TelemetrySampler;
pub use upload::{
    HttpTransport, IngestResponse, RecordTransport, UploadClient, INGEST_PATH, RECORD_ID_HEADER,
};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
