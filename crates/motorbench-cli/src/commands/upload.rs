//! `motorbench upload` — push pending records to the central store.

use motorbench_core::{HttpTransport, UploadClient, UploadError};

/// Run the upload command.
pub fn run(server: &str, id: Option<&str>, data_dir: &str) {
    let outbox = super::open_outbox(data_dir);
    let mut ledger = super::open_ledger(data_dir);

    let ids = match id {
        Some(id) => vec![super::parse_record_id(id)],
        None => match outbox.pending(&ledger) {
            Ok(ids) => ids,
            Err(e) => {
                eprintln!("Error listing outbox: {e}");
                std::process::exit(1);
            }
        },
    };

    if ids.is_empty() {
        println!("Nothing to upload.");
        return;
    }

    let transport = match HttpTransport::new(server) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error building upload transport: {e}");
            std::process::exit(1);
        }
    };
    let client = UploadClient::new(transport);

    println!("Uploading {} record(s) to {server}", ids.len());

    let mut uploaded = 0usize;
    let mut rejected = 0usize;

    for record_id in &ids {
        let mut record = match outbox.load(record_id) {
            Ok(record) => record,
            Err(e) => {
                eprintln!("  {record_id}  unreadable: {e}");
                rejected += 1;
                continue;
            }
        };

        match client.upload(&mut record, &mut ledger) {
            Ok(state) => {
                if let Err(e) = outbox.store(&record) {
                    eprintln!("  {record_id}  uploaded but state not saved: {e}");
                } else {
                    println!("  {record_id}  {state}");
                }
                uploaded += 1;
            }
            Err(UploadError::Rejected { reason }) => {
                // Not retryable. Persist the Rejected state and move on.
                let _ = outbox.store(&record);
                eprintln!("  {record_id}  rejected: {reason}");
                rejected += 1;
            }
            Err(e) => {
                // Transport trouble affects every remaining record too.
                let _ = outbox.store(&record);
                eprintln!("  {record_id}  {e}");
                eprintln!("Stopping; pending records are safe to retry.");
                std::process::exit(1);
            }
        }
    }

    println!();
    println!("{uploaded} uploaded, {rejected} rejected.");
    if rejected > 0 {
        std::process::exit(1);
    }
}
