//! The Test Record — the unit of work and the unit of transport.
//!
//! A record is created when a run starts, frozen when the run completes, and
//! then moves through its upload lifecycle until the central store holds
//! exactly one copy. `record_id` is assigned once per physical run and is the
//! sole deduplication key; it is never regenerated on retry.
//!
//! # Wire format
//!
//! [`encode_payload`] serializes the whole record (metadata + samples +
//! derived metrics) as JSON and gzip-compresses it. The sample stream is
//! highly repetitive, so the payload compresses well.

use std::io::{Read, Write};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current wire/storage format version.
pub const RECORD_VERSION: u32 = 1;

/// Current thresholds the reference deployment reports power averages at.
pub const DEFAULT_CURRENT_THRESHOLDS: [f64; 3] = [10.0, 20.0, 40.0];

// ---------------------------------------------------------------------------
// Profile parameters
// ---------------------------------------------------------------------------

/// Static parameters of the commanded-velocity profile and the rig.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileParameters {
    /// Gear ratio motor:flywheel. Must be > 0.
    pub gear_ratio: f64,
    /// Flywheel moment of inertia in kg·m². Must be > 0.
    pub flywheel_inertia: f64,
    /// Commanded plateau speed in motor revolutions per second.
    pub target_max_speed: f64,
    /// Stator current limit for the run, in amps.
    pub target_max_current: f64,
    /// Free-text description of the rig (spool, couplings, supply).
    pub hardware_description: String,
}

impl ProfileParameters {
    /// Validate physical constraints before a run starts.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.gear_ratio > 0.0) {
            return Err(format!("gear_ratio must be > 0 (got {})", self.gear_ratio));
        }
        if !(self.flywheel_inertia > 0.0) {
            return Err(format!(
                "flywheel_inertia must be > 0 (got {})",
                self.flywheel_inertia
            ));
        }
        if !(self.target_max_speed > 0.0) {
            return Err(format!(
                "target_max_speed must be > 0 (got {})",
                self.target_max_speed
            ));
        }
        if !(self.target_max_current > 0.0) {
            return Err(format!(
                "target_max_current must be > 0 (got {})",
                self.target_max_current
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Samples and derived metrics
// ---------------------------------------------------------------------------

/// One telemetry sample taken on one tick of the sampling loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TelemetrySample {
    /// Seconds since run start. Strictly increasing, fixed nominal period.
    pub t: f64,
    /// Motor output voltage in volts.
    pub voltage: f64,
    /// Supply/bus voltage in volts.
    pub bus_voltage: f64,
    /// Stator current in amps (magnitude).
    pub current: f64,
    /// Motor speed in revolutions per second.
    pub speed: f64,
    /// Electrical input power in watts (bus_voltage × current).
    pub input_power: f64,
    /// Mechanical output power in watts (flywheel torque-equivalent).
    pub output_power: f64,
}

/// Average output power near one configured current threshold.
///
/// `avg_output_power` is `None` when no sample fell within tolerance of the
/// threshold — an explicit "no data for threshold" outcome, never a guess
/// from distant samples.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThresholdPower {
    pub threshold_amps: f64,
    pub avg_output_power: Option<f64>,
    /// Number of samples averaged (0 when no data).
    pub sample_count: usize,
}

// ---------------------------------------------------------------------------
// Upload state
// ---------------------------------------------------------------------------

/// Upload lifecycle of a completed record.
///
/// Transitions only in the direction Unsent → Uploading → {Uploaded |
/// Unsent}. `Uploaded` is terminal: a record already uploaded must never
/// re-enter `Uploading`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UploadState {
    #[default]
    Unsent,
    Uploading,
    Uploaded,
    Rejected,
}

impl UploadState {
    /// Terminal states never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Uploaded | Self::Rejected)
    }
}

impl std::fmt::Display for UploadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsent => write!(f, "unsent"),
            Self::Uploading => write!(f, "uploading"),
            Self::Uploaded => write!(f, "uploaded"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

// ---------------------------------------------------------------------------
// Test record
// ---------------------------------------------------------------------------

/// Immutable result of one timed test run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRecord {
    pub version: u32,
    /// Globally unique, generated once at run start. Sole dedup key.
    pub record_id: Uuid,
    /// ISO-8601 UTC timestamp of run start.
    pub run_started_at: String,
    pub profile: ProfileParameters,
    /// Wall-clock run duration in seconds.
    pub duration_seconds: f64,
    /// Highest motor speed observed during the run, rev/s.
    pub max_speed_achieved: f64,
    /// Ordered sample stream, frozen at run completion.
    pub samples: Vec<TelemetrySample>,
    /// Threshold-average power metrics, computed only after completion.
    pub metrics: Vec<ThresholdPower>,
    /// Local upload lifecycle. The central store ignores this field.
    #[serde(default)]
    pub upload_state: UploadState,
}

impl TestRecord {
    /// Look up the derived metric for one threshold, if configured.
    pub fn metric_at(&self, threshold_amps: f64) -> Option<&ThresholdPower> {
        self.metrics
            .iter()
            .find(|m| (m.threshold_amps - threshold_amps).abs() < f64::EPSILON)
    }
}

// ---------------------------------------------------------------------------
// Payload codec
// ---------------------------------------------------------------------------

/// Serialize and gzip-compress a record for transport or storage.
pub fn encode_payload(record: &TestRecord) -> std::io::Result<Vec<u8>> {
    let json = serde_json::to_vec(record).map_err(std::io::Error::other)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    encoder.finish()
}

/// Decompress and deserialize a record payload.
pub fn decode_payload(payload: &[u8]) -> std::io::Result<TestRecord> {
    let mut decoder = GzDecoder::new(payload);
    let mut json = Vec::new();
    decoder.read_to_end(&mut json)?;
    serde_json::from_slice(&json).map_err(std::io::Error::other)
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Current wall-clock time as an ISO-8601 UTC string.
pub fn now_iso8601() -> String {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format_iso8601(since_epoch)
}

/// Format a duration-since-epoch as a full ISO-8601 timestamp.
/// Example: `2026-02-15T01:30:00Z`
pub fn format_iso8601(since_epoch: Duration) -> String {
    let secs = since_epoch.as_secs();
    let (year, month, day, hour, min, sec) = secs_to_utc(secs);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year, month, day, hour, min, sec
    )
}

/// Convert seconds since Unix epoch to (year, month, day, hour, minute, second) UTC.
/// Simple implementation — no leap second handling.
fn secs_to_utc(secs: u64) -> (u64, u64, u64, u64, u64, u64) {
    let sec = secs % 60;
    let min = (secs / 60) % 60;
    let hour = (secs / 3600) % 24;

    let mut days = secs / 86400;
    let mut year = 1970u64;

    loop {
        let days_in_year = if is_leap(year) { 366 } else { 365 };
        if days < days_in_year {
            break;
        }
        days -= days_in_year;
        year += 1;
    }

    let months_days: [u64; 12] = if is_leap(year) {
        [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    } else {
        [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    };

    let mut month = 0u64;
    for (i, &md) in months_days.iter().enumerate() {
        if days < md {
            month = i as u64 + 1;
            break;
        }
        days -= md;
    }
    let day = days + 1;

    (year, month, day, hour, min, sec)
}

fn is_leap(year: u64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_profile() -> ProfileParameters {
        ProfileParameters {
            gear_ratio: 2.0,
            flywheel_inertia: 0.05,
            target_max_speed: 80.0,
            target_max_current: 40.0,
            hardware_description: "bench rig A".to_string(),
        }
    }

    fn test_record() -> TestRecord {
        TestRecord {
            version: RECORD_VERSION,
            record_id: Uuid::new_v4(),
            run_started_at: "2026-02-15T01:30:00Z".to_string(),
            profile: test_profile(),
            duration_seconds: 10.0,
            max_speed_achieved: 79.4,
            samples: (0..100)
                .map(|i| TelemetrySample {
                    t: i as f64 * 0.01,
                    voltage: 11.8,
                    bus_voltage: 12.1,
                    current: 20.0 + i as f64 * 0.1,
                    speed: i as f64 * 0.8,
                    input_power: 242.0,
                    output_power: 150.0,
                })
                .collect(),
            metrics: vec![ThresholdPower {
                threshold_amps: 20.0,
                avg_output_power: Some(150.0),
                sample_count: 51,
            }],
            upload_state: UploadState::Unsent,
        }
    }

    // -----------------------------------------------------------------------
    // Profile validation tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_profile_validates() {
        assert!(test_profile().validate().is_ok());
    }

    #[test]
    fn test_profile_rejects_nonpositive_gear_ratio() {
        let mut p = test_profile();
        p.gear_ratio = 0.0;
        assert!(p.validate().is_err());
        p.gear_ratio = -1.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_profile_rejects_nonpositive_inertia() {
        let mut p = test_profile();
        p.flywheel_inertia = 0.0;
        assert!(p.validate().unwrap_err().contains("flywheel_inertia"));
    }

    #[test]
    fn test_profile_rejects_nan() {
        let mut p = test_profile();
        p.gear_ratio = f64::NAN;
        assert!(p.validate().is_err());
    }

    // -----------------------------------------------------------------------
    // Upload state tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_upload_state_default_is_unsent() {
        assert_eq!(UploadState::default(), UploadState::Unsent);
    }

    #[test]
    fn test_upload_state_terminal() {
        assert!(UploadState::Uploaded.is_terminal());
        assert!(UploadState::Rejected.is_terminal());
        assert!(!UploadState::Unsent.is_terminal());
        assert!(!UploadState::Uploading.is_terminal());
    }

    #[test]
    fn test_upload_state_serde_snake_case() {
        let json = serde_json::to_string(&UploadState::Uploaded).unwrap();
        assert_eq!(json, "\"uploaded\"");
    }

    // -----------------------------------------------------------------------
    // Payload codec tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_payload_roundtrip() {
        let record = test_record();
        let payload = encode_payload(&record).unwrap();
        let decoded = decode_payload(&payload).unwrap();
        assert_eq!(decoded.record_id, record.record_id);
        assert_eq!(decoded.samples.len(), record.samples.len());
        assert_eq!(decoded.samples[3], record.samples[3]);
        assert_eq!(decoded.metrics, record.metrics);
    }

    #[test]
    fn test_payload_is_compressed() {
        let record = test_record();
        let json_len = serde_json::to_vec(&record).unwrap().len();
        let payload = encode_payload(&record).unwrap();
        assert!(
            payload.len() < json_len,
            "gzip payload ({}) should be smaller than JSON ({})",
            payload.len(),
            json_len
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_payload(b"not gzip at all").is_err());
    }

    #[test]
    fn test_metric_at() {
        let record = test_record();
        assert!(record.metric_at(20.0).is_some());
        assert!(record.metric_at(40.0).is_none());
    }

    // -----------------------------------------------------------------------
    // Timestamp tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_format_iso8601_epoch() {
        assert_eq!(format_iso8601(Duration::from_secs(0)), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_secs_to_utc_known_date() {
        // 2000-01-01 00:00:00 UTC = 946684800
        let (y, m, d, h, mi, s) = secs_to_utc(946684800);
        assert_eq!((y, m, d, h, mi, s), (2000, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_is_leap() {
        assert!(is_leap(2000));
        assert!(is_leap(2024));
        assert!(!is_leap(1900));
        assert!(!is_leap(2023));
    }
}
