//! Outbox — local persistence for completed records awaiting upload.
//!
//! Completed records are written here before any upload attempt so a
//! pending-Unsent record survives process restart. One gzip payload file per
//! record, named by record id, written atomically (temp + rename). Records
//! are never deleted by this subsystem — a rejected or uploaded record stays
//! on disk with its state; deletion is an inventory-management concern.

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::ledger::UploadLedger;
use crate::record::{decode_payload, encode_payload, TestRecord};

const RECORD_EXT: &str = "json.gz";

/// Directory of completed records keyed by record id.
pub struct Outbox {
    dir: PathBuf,
}

impl Outbox {
    /// Open (creating if needed) an outbox directory.
    pub fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Persist a record, atomically replacing any previous version (used both
    /// for the initial save and for upload-state updates).
    pub fn store(&self, record: &TestRecord) -> std::io::Result<PathBuf> {
        let payload = encode_payload(record)?;
        let tmp = self.dir.join(format!(".{}.tmp", record.record_id));
        fs::write(&tmp, &payload)?;
        let path = self.path_for(&record.record_id);
        fs::rename(&tmp, &path)?;
        log::debug!(
            "outbox: stored {} ({} bytes, {})",
            record.record_id,
            payload.len(),
            record.upload_state,
        );
        Ok(path)
    }

    /// Load a record by id.
    pub fn load(&self, record_id: &Uuid) -> std::io::Result<TestRecord> {
        let payload = fs::read(self.path_for(record_id))?;
        decode_payload(&payload)
    }

    /// All record ids present in the outbox, sorted for stable listings.
    pub fn list(&self) -> std::io::Result<Vec<Uuid>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name.strip_suffix(&format!(".{RECORD_EXT}")) else {
                continue;
            };
            if let Ok(id) = stem.parse::<Uuid>() {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Record ids not yet acknowledged by the central store per the ledger.
    pub fn pending(&self, ledger: &UploadLedger) -> std::io::Result<Vec<Uuid>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|id| !ledger.has(id))
            .collect())
    }

    /// Path of the payload file for a record id.
    pub fn path_for(&self, record_id: &Uuid) -> PathBuf {
        self.dir.join(format!("{record_id}.{RECORD_EXT}"))
    }

    /// Outbox directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
