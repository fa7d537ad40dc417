//! CLI for motorbench — bench-side motor test runs and record upload.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "motorbench")]
#[command(about = "motorbench — closed-loop motor test runner with exactly-once upload")]
#[command(version = motorbench_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one closed-loop test run and save the record to the outbox
    Run {
        /// Gearbox reduction ratio (motor revs per output rev)
        #[arg(long, default_value = "2.0")]
        gear_ratio: f64,

        /// Flywheel moment of inertia in kg·m²
        #[arg(long, default_value = "0.05")]
        inertia: f64,

        /// Commanded velocity plateau in motor rev/s
        #[arg(long, default_value = "80.0")]
        max_speed: f64,

        /// Current ceiling the rig is rated for, in amps
        #[arg(long, default_value = "40.0")]
        max_current: f64,

        /// Free-text description of the unit under test
        #[arg(long, default_value = "simulated rig")]
        hardware: String,

        /// Total run duration in seconds
        #[arg(long, default_value = "10.0")]
        duration: f64,

        /// Velocity ramp window in seconds
        #[arg(long, default_value = "2.0")]
        ramp: f64,

        /// Telemetry sample rate in Hz
        #[arg(long, default_value = "100.0")]
        sample_hz: f64,

        /// Comma-separated current thresholds (amps) for power averaging
        #[arg(long, default_value = "10,20,40")]
        thresholds: String,

        /// Bench data directory (outbox + upload ledger)
        #[arg(long, default_value = "bench-data")]
        data_dir: String,

        /// Upload the record to this central store right after the run
        #[arg(long)]
        upload: Option<String>,
    },

    /// List outbox records not yet acknowledged by the central store
    Pending {
        /// Bench data directory (outbox + upload ledger)
        #[arg(long, default_value = "bench-data")]
        data_dir: String,
    },

    /// Upload pending records (or one specific record) to the central store
    Upload {
        /// Base URL of the central store, e.g. http://bench-store:8080
        server: String,

        /// Upload only this record id instead of everything pending
        #[arg(long)]
        id: Option<String>,

        /// Bench data directory (outbox + upload ledger)
        #[arg(long, default_value = "bench-data")]
        data_dir: String,
    },

    /// Display a saved test record
    Show {
        /// Record id
        id: String,

        /// Dump the full record as JSON instead of a summary
        #[arg(long)]
        json: bool,

        /// Bench data directory (outbox + upload ledger)
        #[arg(long, default_value = "bench-data")]
        data_dir: String,
    },

    /// Start the central ingest guard service
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,

        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Directory holding the central record store
        #[arg(long, default_value = "store-data")]
        data_dir: String,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            gear_ratio,
            inertia,
            max_speed,
            max_current,
            hardware,
            duration,
            ramp,
            sample_hz,
            thresholds,
            data_dir,
            upload,
        } => commands::run::run(commands::run::RunCommandConfig {
            gear_ratio,
            inertia,
            max_speed,
            max_current,
            hardware: &hardware,
            duration,
            ramp,
            sample_hz,
            thresholds: &thresholds,
            data_dir: &data_dir,
            upload_to: upload.as_deref(),
        }),
        Commands::Pending { data_dir } => commands::pending::run(&data_dir),
        Commands::Upload {
            server,
            id,
            data_dir,
        } => commands::upload::run(&server, id.as_deref(), &data_dir),
        Commands::Show { id, json, data_dir } => commands::show::run(&id, json, &data_dir),
        Commands::Serve {
            port,
            host,
            data_dir,
        } => commands::serve::run(&host, port, &data_dir),
    }
}
