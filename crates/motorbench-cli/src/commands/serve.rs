//! `motorbench serve` — central ingest guard service.

use motorbench_core::upload::INGEST_PATH;
use motorbench_server::store::RecordStore;

/// Run the serve command.
pub fn run(host: &str, port: u16, data_dir: &str) {
    let store = match RecordStore::open(data_dir) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error opening record store at {data_dir}: {e}");
            std::process::exit(1);
        }
    };

    let base = format!("http://{host}:{port}");
    let stored = store.list().map(|r| r.len()).unwrap_or(0);

    println!("motorbench store v{}", motorbench_core::VERSION);
    println!("   {base}");
    println!("   {stored} records on disk at {data_dir}/");
    println!();
    println!("   Endpoints:");
    println!("     POST {INGEST_PATH}   Ingest a record (x-record-id header, gzip body)");
    println!("     GET  {INGEST_PATH}   List stored record metadata");
    println!("     GET  /health                   Service health");
    println!();
    println!("   Duplicate record ids answer 409; uploaders treat that as success.");
    println!();

    let rt = tokio::runtime::Runtime::new().unwrap();
    if let Err(e) = rt.block_on(motorbench_server::run_server(store, host, port)) {
        eprintln!("Server error: {e}");
        std::process::exit(1);
    }
}
