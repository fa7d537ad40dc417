//! Local dedup ledger — durable record of which record ids the central store
//! has already accepted.
//!
//! The ledger is the client-side half of the duplicate protection (the
//! server-side uniqueness constraint is the other): consulted before every
//! upload attempt and appended to only after a definitive server response.
//! Writes are durable before `mark_uploaded` returns — a crash after the call
//! returns must never lose the mark.
//!
//! # File format
//!
//! One line per accepted record: `record_id<TAB>uploaded_at`, append-only.
//! A torn trailing line from a crash mid-append fails to parse and is ignored
//! on load; the affected record simply re-uploads, which the ingest guard
//! answers with Duplicate.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::record::now_iso8601;

/// Append-only, durable set of uploaded record ids.
///
/// Single writer per file: serialize access per process (and per device —
/// the ledger is the only mutable state shared across runs).
pub struct UploadLedger {
    path: PathBuf,
    uploaded: HashSet<Uuid>,
}

impl UploadLedger {
    /// Open a ledger file, loading any persisted entries. The file is created
    /// lazily on the first `mark_uploaded`.
    pub fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let uploaded = match File::open(&path) {
            Ok(file) => Self::load_entries(file),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => return Err(e),
        };
        Ok(Self { path, uploaded })
    }

    fn load_entries(file: File) -> HashSet<Uuid> {
        let mut uploaded = HashSet::new();
        for line in BufReader::new(file).lines() {
            let Ok(line) = line else { break };
            let id_field = line.split('\t').next().unwrap_or("");
            match id_field.parse::<Uuid>() {
                Ok(id) => {
                    uploaded.insert(id);
                }
                Err(_) => {
                    if !line.trim().is_empty() {
                        log::warn!("ignoring unparseable ledger line: {line:?}");
                    }
                }
            }
        }
        uploaded
    }

    /// Whether the central store has already accepted this record id.
    pub fn has(&self, record_id: &Uuid) -> bool {
        self.uploaded.contains(record_id)
    }

    /// Number of recorded uploads.
    pub fn len(&self) -> usize {
        self.uploaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uploaded.is_empty()
    }

    /// Record that the central store accepted `record_id`. Idempotent; the
    /// entry is on disk (fsynced) before this returns.
    pub fn mark_uploaded(&mut self, record_id: &Uuid) -> std::io::Result<()> {
        if self.uploaded.contains(record_id) {
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{record_id}\t{}", now_iso8601())?;
        file.sync_all()?;

        self.uploaded.insert(*record_id);
        log::debug!("ledger: marked {record_id} uploaded");
        Ok(())
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
