//! Record store with a physical uniqueness constraint per record id.
//!
//! Layout under the store root:
//! - `records/{record_id}/record.json` — metadata + derived metrics
//! - `records/{record_id}/samples.json.gz` — the compressed payload blob
//! - `staging/` — per-attempt scratch directories
//!
//! Both files are written into a staging directory first and moved into place
//! with one atomic `rename`. The rename is the uniqueness constraint: moving
//! a directory onto an existing, populated record directory fails, so two
//! concurrent ingests of the same record id resolve to exactly one Accepted
//! and one Duplicate at the filesystem layer — not an application-level
//! check-then-write. It is also the atomicity guarantee: metadata and blob
//! land together or not at all.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use motorbench_core::record::{decode_payload, now_iso8601, ProfileParameters, TestRecord, ThresholdPower};

/// Result of presenting a payload to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// First arrival: metadata and blob persisted atomically.
    Accepted,
    /// The store already holds this record id. Nothing was rewritten.
    Duplicate,
}

/// Why an ingest failed.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Non-retryable validation failure — malformed payload, id mismatch, or
    /// invariant-violating record contents.
    #[error("invalid record payload: {0}")]
    Invalid(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Metadata row persisted alongside the sample blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordMeta {
    pub record_id: Uuid,
    pub run_started_at: String,
    pub received_at: String,
    pub profile: ProfileParameters,
    pub duration_seconds: f64,
    pub max_speed_achieved: f64,
    pub sample_count: usize,
    pub metrics: Vec<ThresholdPower>,
}

impl RecordMeta {
    fn from_record(record: &TestRecord) -> Self {
        Self {
            record_id: record.record_id,
            run_started_at: record.run_started_at.clone(),
            received_at: now_iso8601(),
            profile: record.profile.clone(),
            duration_seconds: record.duration_seconds,
            max_speed_achieved: record.max_speed_achieved,
            sample_count: record.samples.len(),
            metrics: record.metrics.clone(),
        }
    }
}

/// Filesystem-backed store enforcing single-copy persistence.
#[derive(Debug, Clone)]
pub struct RecordStore {
    records_dir: PathBuf,
    staging_dir: PathBuf,
}

impl RecordStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        let records_dir = root.join("records");
        let staging_dir = root.join("staging");
        fs::create_dir_all(&records_dir)?;
        fs::create_dir_all(&staging_dir)?;
        Ok(Self {
            records_dir,
            staging_dir,
        })
    }

    /// Ingest one uploaded payload under the uniqueness constraint.
    pub fn ingest(&self, record_id: Uuid, payload: &[u8]) -> Result<IngestOutcome, StoreError> {
        let final_dir = self.record_dir(&record_id);
        // Fast-path duplicate answer; the rename below remains authoritative.
        if final_dir.exists() {
            log::info!("ingest {record_id}: duplicate (already stored)");
            return Ok(IngestOutcome::Duplicate);
        }

        let record = decode_payload(payload)
            .map_err(|e| StoreError::Invalid(format!("payload does not decode: {e}")))?;
        validate(&record, record_id)?;

        // Stage metadata + blob, then move into place atomically.
        let staging = self.staging_dir.join(format!("{record_id}-{}", attempt_nonce()));
        fs::create_dir_all(&staging)?;
        let meta = RecordMeta::from_record(&record);
        let meta_json = serde_json::to_vec_pretty(&meta).map_err(std::io::Error::other)?;
        fs::write(staging.join("record.json"), meta_json)?;
        fs::write(staging.join("samples.json.gz"), payload)?;

        match fs::rename(&staging, &final_dir) {
            Ok(()) => {
                log::info!(
                    "ingest {record_id}: accepted ({} samples, {} bytes blob)",
                    meta.sample_count,
                    payload.len(),
                );
                Ok(IngestOutcome::Accepted)
            }
            Err(e) => {
                let _ = fs::remove_dir_all(&staging);
                if final_dir.exists() {
                    // Lost the rename race to a concurrent ingest of the same
                    // record id.
                    log::info!("ingest {record_id}: duplicate (concurrent ingest won)");
                    Ok(IngestOutcome::Duplicate)
                } else {
                    Err(e.into())
                }
            }
        }
    }

    /// Whether a record id is persisted.
    pub fn contains(&self, record_id: &Uuid) -> bool {
        self.record_dir(record_id).join("record.json").exists()
    }

    /// Load the metadata row for a stored record.
    pub fn load_meta(&self, record_id: &Uuid) -> Result<RecordMeta, StoreError> {
        let raw = fs::read(self.record_dir(record_id).join("record.json"))?;
        serde_json::from_slice(&raw)
            .map_err(|e| StoreError::Invalid(format!("stored metadata unreadable: {e}")))
    }

    /// Metadata for every stored record, sorted by record id.
    pub fn list(&self) -> Result<Vec<RecordMeta>, StoreError> {
        let mut metas = Vec::new();
        for entry in fs::read_dir(&self.records_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Ok(id) = name.parse::<Uuid>() {
                metas.push(self.load_meta(&id)?);
            }
        }
        metas.sort_by_key(|m| m.record_id);
        Ok(metas)
    }

    fn record_dir(&self, record_id: &Uuid) -> PathBuf {
        self.records_dir.join(record_id.to_string())
    }

    /// Store root's records directory (for diagnostics).
    pub fn records_dir(&self) -> &Path {
        &self.records_dir
    }
}

/// Reject invariant-violating records before anything touches disk.
fn validate(record: &TestRecord, claimed_id: Uuid) -> Result<(), StoreError> {
    if record.record_id != claimed_id {
        return Err(StoreError::Invalid(format!(
            "record id {} does not match claimed id {claimed_id}",
            record.record_id
        )));
    }
    if record.samples.is_empty() {
        return Err(StoreError::Invalid("empty sample stream".to_string()));
    }
    for pair in record.samples.windows(2) {
        if pair[1].t <= pair[0].t {
            return Err(StoreError::Invalid(format!(
                "sample timestamps not strictly increasing at t={}",
                pair[1].t
            )));
        }
    }
    record.profile.validate().map_err(StoreError::Invalid)?;
    Ok(())
}

/// Unique suffix so concurrent attempts for the same id stage separately.
fn attempt_nonce() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{nanos}-{}", COUNTER.fetch_add(1, Ordering::Relaxed))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
