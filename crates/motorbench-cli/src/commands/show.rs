//! `motorbench show` — display a saved test record.

/// Run the show command.
pub fn run(id: &str, json: bool, data_dir: &str) {
    let record_id = super::parse_record_id(id);
    let outbox = super::open_outbox(data_dir);

    let record = match outbox.load(&record_id) {
        Ok(record) => record,
        Err(e) => {
            eprintln!("Error loading record {record_id}: {e}");
            eprintln!("List saved records with: motorbench pending");
            std::process::exit(1);
        }
    };

    if json {
        match serde_json::to_string_pretty(&record) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("Error serializing record: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    println!("Record {}", record.record_id);
    println!("  Started:   {}", record.run_started_at);
    println!("  Hardware:  {}", record.profile.hardware_description);
    println!(
        "  Profile:   {} rev/s plateau, gear {:.2}:1, inertia {:.4} kg·m²",
        record.profile.target_max_speed, record.profile.gear_ratio, record.profile.flywheel_inertia,
    );
    println!(
        "  Samples:   {} in {:.2} s",
        record.samples.len(),
        record.duration_seconds
    );
    println!("  Max speed: {:.1} rev/s", record.max_speed_achieved);
    println!("  State:     {}", record.upload_state);
    println!("  Avg output power near current thresholds:");
    for metric in &record.metrics {
        println!("{}", super::format_metric(metric));
    }
}
