//! Upload client — at-least-once delivery with exactly-once persistence.
//!
//! The client never needs at-most-once transport: the local ledger gate and
//! the central store's uniqueness constraint are two independent duplicate
//! guards, so retrying after a lost acknowledgment is always safe. A
//! `Duplicate` answer from the store is success — the central copy already
//! exists and the client just closes its local gap.

use std::time::Duration;

use uuid::Uuid;

use crate::error::{TransportError, UploadError};
use crate::ledger::UploadLedger;
use crate::record::{encode_payload, TestRecord, UploadState};

/// Header carrying the dedup key alongside the compressed payload.
pub const RECORD_ID_HEADER: &str = "x-record-id";

/// Ingest endpoint path on the central store.
pub const INGEST_PATH: &str = "/api/v1/test-records";

/// Definitive answers from the ingest guard. Anything else is a transport
/// failure and retryable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestResponse {
    /// First arrival: persisted.
    Accepted,
    /// The store already holds this record id. Treated as success.
    Duplicate,
    /// Non-retryable validation failure.
    Invalid { reason: String },
}

/// Transport seam between the upload client and the central store.
pub trait RecordTransport {
    fn send(&self, record_id: &Uuid, payload: &[u8]) -> Result<IngestResponse, TransportError>;
}

// ---------------------------------------------------------------------------
// HTTP transport
// ---------------------------------------------------------------------------

/// Blocking HTTP transport to the ingest guard service.
pub struct HttpTransport {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Point at a central store, e.g. `http://bench-store:8080`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }
}

impl RecordTransport for HttpTransport {
    fn send(&self, record_id: &Uuid, payload: &[u8]) -> Result<IngestResponse, TransportError> {
        let url = format!("{}{INGEST_PATH}", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("content-type", "application/octet-stream")
            .header(RECORD_ID_HEADER, record_id.to_string())
            .body(payload.to_vec())
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Connection(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        match status {
            200..=299 => Ok(IngestResponse::Accepted),
            409 => Ok(IngestResponse::Duplicate),
            400..=499 => Ok(IngestResponse::Invalid {
                reason: response.text().unwrap_or_else(|_| format!("http {status}")),
            }),
            _ => Err(TransportError::Http(status)),
        }
    }
}

// ---------------------------------------------------------------------------
// Upload client
// ---------------------------------------------------------------------------

/// Ledger-gated upload of completed records.
pub struct UploadClient<T: RecordTransport> {
    transport: T,
}

impl<T: RecordTransport> UploadClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Upload one completed record.
    ///
    /// State machine per attempt:
    /// - ledger already has the id → confirm `Uploaded` without sending;
    /// - `Accepted` or `Duplicate` → mark the ledger, then `Uploaded`;
    /// - transport failure → back to `Unsent` (caller may retry);
    /// - `Invalid` → `Rejected`, surfaced, never retried automatically.
    ///
    /// `mark_uploaded` happens only after a definitive server response, so an
    /// abandoned in-flight upload leaves the record `Unsent` and a later
    /// retry is safe.
    pub fn upload(
        &self,
        record: &mut TestRecord,
        ledger: &mut UploadLedger,
    ) -> Result<UploadState, UploadError> {
        let record_id = record.record_id;

        if record.upload_state == UploadState::Uploaded || ledger.has(&record_id) {
            // Already accepted centrally; never re-enter Uploading.
            record.upload_state = UploadState::Uploaded;
            log::debug!("upload {record_id}: already in ledger, not resending");
            return Ok(UploadState::Uploaded);
        }

        let payload = encode_payload(record)?;
        record.upload_state = UploadState::Uploading;
        log::info!(
            "upload {record_id}: sending {} samples ({} bytes compressed)",
            record.samples.len(),
            payload.len(),
        );

        match self.transport.send(&record_id, &payload) {
            Ok(IngestResponse::Accepted) => {
                ledger.mark_uploaded(&record_id)?;
                record.upload_state = UploadState::Uploaded;
                log::info!("upload {record_id}: accepted");
                Ok(UploadState::Uploaded)
            }
            Ok(IngestResponse::Duplicate) => {
                // The store already holds this record (e.g. a retry after a
                // lost acknowledgment). Close the local gap without resending.
                ledger.mark_uploaded(&record_id)?;
                record.upload_state = UploadState::Uploaded;
                log::info!("upload {record_id}: duplicate at ingest, treated as success");
                Ok(UploadState::Uploaded)
            }
            Ok(IngestResponse::Invalid { reason }) => {
                record.upload_state = UploadState::Rejected;
                log::error!("upload {record_id}: rejected: {reason}");
                Err(UploadError::Rejected { reason })
            }
            Err(e) => {
                record.upload_state = UploadState::Unsent;
                log::warn!("upload {record_id}: transport failure, will retry: {e}");
                Err(e.into())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
