pub mod pending;
pub mod run;
pub mod serve;
pub mod show;
pub mod upload;

use std::path::{Path, PathBuf};

use uuid::Uuid;

use motorbench_core::{Outbox, ThresholdPower, UploadLedger};

/// Subdirectory of the data dir holding completed records.
const OUTBOX_SUBDIR: &str = "outbox";

/// Ledger file inside the data dir.
const LEDGER_FILE: &str = "uploaded.tsv";

/// Open the outbox under a bench data directory, exiting on failure.
pub fn open_outbox(data_dir: &str) -> Outbox {
    match Outbox::open(Path::new(data_dir).join(OUTBOX_SUBDIR)) {
        Ok(outbox) => outbox,
        Err(e) => {
            eprintln!("Error opening outbox under {data_dir}: {e}");
            std::process::exit(1);
        }
    }
}

/// Open the upload ledger under a bench data directory, exiting on failure.
pub fn open_ledger(data_dir: &str) -> UploadLedger {
    match UploadLedger::open(ledger_path(data_dir)) {
        Ok(ledger) => ledger,
        Err(e) => {
            eprintln!("Error opening upload ledger under {data_dir}: {e}");
            std::process::exit(1);
        }
    }
}

fn ledger_path(data_dir: &str) -> PathBuf {
    Path::new(data_dir).join(LEDGER_FILE)
}

/// Parse a record id argument, exiting with a hint on malformed input.
pub fn parse_record_id(s: &str) -> Uuid {
    match s.parse::<Uuid>() {
        Ok(id) => id,
        Err(_) => {
            eprintln!("Invalid record id '{s}' (expected a UUID)");
            std::process::exit(1);
        }
    }
}

/// One display line for a threshold-average power metric.
pub fn format_metric(metric: &ThresholdPower) -> String {
    match metric.avg_output_power {
        Some(watts) => format!(
            "  {:>5.1} A  {:>8.2} W  ({} samples)",
            metric.threshold_amps, watts, metric.sample_count,
        ),
        None => format!("  {:>5.1} A  no data near threshold", metric.threshold_amps),
    }
}
