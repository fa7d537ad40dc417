//! `motorbench run` — execute one closed-loop test run.

use std::io::Write;
use std::time::Duration;

use motorbench_core::{
    HttpTransport, ProfileParameters, RunConfig, SimulatedController, TelemetrySample,
    TestRunEngine, UploadClient,
};

pub struct RunCommandConfig<'a> {
    pub gear_ratio: f64,
    pub inertia: f64,
    pub max_speed: f64,
    pub max_current: f64,
    pub hardware: &'a str,
    pub duration: f64,
    pub ramp: f64,
    pub sample_hz: f64,
    pub thresholds: &'a str,
    pub data_dir: &'a str,
    pub upload_to: Option<&'a str>,
}

/// Parse a comma-separated threshold list like "10,20,40".
fn parse_thresholds(s: &str) -> Option<Vec<f64>> {
    let values: Vec<f64> = s
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    if values.is_empty() || values.iter().any(|v| !(*v > 0.0)) {
        return None;
    }
    Some(values)
}

/// Run the run command.
pub fn run(cmd: RunCommandConfig<'_>) {
    if !(cmd.sample_hz > 0.0) {
        eprintln!("Error: --sample-hz must be positive");
        std::process::exit(1);
    }
    if !(cmd.duration > 0.0) {
        eprintln!("Error: --duration must be positive");
        std::process::exit(1);
    }

    let profile = ProfileParameters {
        gear_ratio: cmd.gear_ratio,
        flywheel_inertia: cmd.inertia,
        target_max_speed: cmd.max_speed,
        target_max_current: cmd.max_current,
        hardware_description: cmd.hardware.to_string(),
    };

    let mut config = RunConfig::new(profile);
    config.tick_period = Duration::from_secs_f64(1.0 / cmd.sample_hz);
    config.run_duration = Duration::from_secs_f64(cmd.duration);
    config.ramp = Duration::from_secs_f64(cmd.ramp);
    config.thresholds.thresholds = match parse_thresholds(cmd.thresholds) {
        Some(values) => values,
        None => {
            eprintln!("Error: --thresholds must be comma-separated positive amps, e.g. 10,20,40");
            std::process::exit(1);
        }
    };

    let outbox = super::open_outbox(cmd.data_dir);

    println!("Test run");
    println!("  Hardware:  {}", cmd.hardware);
    println!(
        "  Profile:   {} rev/s plateau, {:.1} s ramp, {:.1} s total",
        cmd.max_speed, cmd.ramp, cmd.duration
    );
    println!("  Sampling:  {:.0} Hz", cmd.sample_hz);
    println!();

    let mut progress = |sample: &TelemetrySample| {
        print!(
            "\r  t={:>5.2}s  speed={:>6.1} rev/s  current={:>5.2} A  out={:>7.2} W",
            sample.t, sample.speed, sample.current, sample.output_power,
        );
        let _ = std::io::stdout().flush();
    };

    let mut engine = TestRunEngine::new(SimulatedController::new());
    let record = match engine.run(&config, Some(&mut progress)) {
        Ok(record) => record,
        Err(e) => {
            println!();
            eprintln!("Run aborted: {e}");
            std::process::exit(1);
        }
    };
    println!();
    println!();

    println!("Run complete");
    println!("  Record:    {}", record.record_id);
    println!(
        "  Samples:   {} in {:.2} s",
        record.samples.len(),
        record.duration_seconds
    );
    println!("  Max speed: {:.1} rev/s", record.max_speed_achieved);
    println!("  Avg output power near current thresholds:");
    for metric in &record.metrics {
        println!("{}", super::format_metric(metric));
    }

    let path = match outbox.store(&record) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error saving record to outbox: {e}");
            std::process::exit(1);
        }
    };
    println!("  Saved:     {}", path.display());

    if let Some(server) = cmd.upload_to {
        println!();
        let mut ledger = super::open_ledger(cmd.data_dir);
        let transport = match HttpTransport::new(server) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("Error building upload transport: {e}");
                std::process::exit(1);
            }
        };
        let client = UploadClient::new(transport);
        let mut record = record;
        match client.upload(&mut record, &mut ledger) {
            Ok(state) => {
                // Persist the new upload state alongside the samples.
                if let Err(e) = outbox.store(&record) {
                    eprintln!("Warning: record uploaded but state not saved: {e}");
                }
                println!("Upload: {state}");
            }
            Err(e) => {
                let _ = outbox.store(&record);
                eprintln!("Upload failed: {e}");
                eprintln!("The record stays in the outbox; retry with `motorbench upload`.");
                std::process::exit(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_thresholds() {
        assert_eq!(parse_thresholds("10,20,40"), Some(vec![10.0, 20.0, 40.0]));
        assert_eq!(parse_thresholds("15.5"), Some(vec![15.5]));
        assert_eq!(parse_thresholds(" 10 , 20 "), Some(vec![10.0, 20.0]));
    }

    #[test]
    fn test_parse_thresholds_rejects_bad_input() {
        assert_eq!(parse_thresholds(""), None);
        assert_eq!(parse_thresholds("10,abc"), None);
        assert_eq!(parse_thresholds("0"), None);
        assert_eq!(parse_thresholds("-5,10"), None);
    }
}
