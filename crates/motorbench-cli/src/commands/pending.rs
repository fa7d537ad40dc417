//! `motorbench pending` — list records awaiting central acknowledgment.

/// Run the pending command.
pub fn run(data_dir: &str) {
    let outbox = super::open_outbox(data_dir);
    let ledger = super::open_ledger(data_dir);

    let pending = match outbox.pending(&ledger) {
        Ok(ids) => ids,
        Err(e) => {
            eprintln!("Error listing outbox: {e}");
            std::process::exit(1);
        }
    };

    if pending.is_empty() {
        println!("No pending records in {data_dir}/");
        println!("Record a run first: motorbench run");
        return;
    }

    println!(
        "{:<38} {:<22} {:>8} {:>10}",
        "Record", "Started", "Samples", "State"
    );
    println!("{}", "-".repeat(82));

    for id in &pending {
        match outbox.load(id) {
            Ok(record) => println!(
                "{:<38} {:<22} {:>8} {:>10}",
                id,
                record.run_started_at,
                record.samples.len(),
                record.upload_state,
            ),
            Err(e) => println!("{id:<38} <unreadable: {e}>"),
        }
    }
    println!();
    println!("{} pending. Upload with: motorbench upload <server>", pending.len());
}
