//! End-to-end ingest protocol tests: a real listener, the blocking upload
//! client, and the filesystem store behind it.

use std::net::SocketAddr;
use std::time::Duration;

use motorbench_core::{
    encode_payload, HttpTransport, IngestResponse, ProfileParameters, RecordTransport, RunConfig,
    SimulatedController, TestRecord, TestRunEngine, UploadClient, UploadError, UploadLedger,
    UploadState,
};
use motorbench_server::build_router;
use motorbench_server::store::RecordStore;

fn profile() -> ProfileParameters {
    ProfileParameters {
        gear_ratio: 2.0,
        flywheel_inertia: 0.05,
        target_max_speed: 60.0,
        target_max_current: 40.0,
        hardware_description: "integration rig".to_string(),
    }
}

/// Produce a real completed record quickly.
fn completed_record() -> TestRecord {
    let mut config = RunConfig::new(profile());
    config.tick_period = Duration::from_millis(1);
    config.run_duration = Duration::from_millis(30);
    config.ramp = Duration::from_millis(10);

    let mut engine = TestRunEngine::new(SimulatedController::new());
    engine.run(&config, None).expect("simulated run failed")
}

async fn start_server(store: RecordStore) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(store)).await.unwrap();
    });
    addr
}

#[tokio::test(flavor = "multi_thread")]
async fn repeated_uploads_converge_to_one_stored_copy() {
    let tmp = tempfile::tempdir().unwrap();
    let store = RecordStore::open(tmp.path().join("store")).unwrap();
    let addr = start_server(store.clone()).await;
    let ledger_path = tmp.path().join("ledger.tsv");

    let record_id = tokio::task::spawn_blocking(move || {
        let mut ledger = UploadLedger::open(&ledger_path).unwrap();
        let mut record = completed_record();
        let client = UploadClient::new(HttpTransport::new(format!("http://{addr}")).unwrap());

        // N upload calls simulating operator/automatic retries.
        for _ in 0..4 {
            let state = client.upload(&mut record, &mut ledger).unwrap();
            assert_eq!(state, UploadState::Uploaded);
        }
        assert!(ledger.has(&record.record_id));
        record.record_id
    })
    .await
    .unwrap();

    let metas = store.list().unwrap();
    assert_eq!(metas.len(), 1, "exactly one durable copy");
    assert_eq!(metas[0].record_id, record_id);
}

#[tokio::test(flavor = "multi_thread")]
async fn lost_ack_retry_hits_duplicate_and_reaches_uploaded() {
    let tmp = tempfile::tempdir().unwrap();
    let store = RecordStore::open(tmp.path().join("store")).unwrap();
    let addr = start_server(store.clone()).await;
    let ledger_path = tmp.path().join("ledger.tsv");

    let record_id = tokio::task::spawn_blocking(move || {
        let mut record = completed_record();
        let transport = HttpTransport::new(format!("http://{addr}")).unwrap();

        // First send succeeds server-side, but the acknowledgment is "lost":
        // the ledger is never marked.
        let payload = encode_payload(&record).unwrap();
        assert_eq!(
            transport.send(&record.record_id, &payload).unwrap(),
            IngestResponse::Accepted
        );

        // The retry goes through the full client: the server answers 409 and
        // the client must reach Uploaded without a second blob write.
        let mut ledger = UploadLedger::open(&ledger_path).unwrap();
        let client = UploadClient::new(transport);
        let state = client.upload(&mut record, &mut ledger).unwrap();
        assert_eq!(state, UploadState::Uploaded);
        assert!(ledger.has(&record.record_id));
        record.record_id
    })
    .await
    .unwrap();

    assert_eq!(store.list().unwrap().len(), 1);
    assert!(store.contains(&record_id));
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_record_rejected_not_stored() {
    let tmp = tempfile::tempdir().unwrap();
    let store = RecordStore::open(tmp.path().join("store")).unwrap();
    let addr = start_server(store.clone()).await;
    let ledger_path = tmp.path().join("ledger.tsv");

    tokio::task::spawn_blocking(move || {
        let mut record = completed_record();
        record.samples.clear(); // violates the non-empty invariant
        let mut ledger = UploadLedger::open(&ledger_path).unwrap();
        let client = UploadClient::new(HttpTransport::new(format!("http://{addr}")).unwrap());

        let err = client.upload(&mut record, &mut ledger).unwrap_err();
        assert!(matches!(err, UploadError::Rejected { .. }));
        assert_eq!(record.upload_state, UploadState::Rejected);
        assert!(!ledger.has(&record.record_id));
    })
    .await
    .unwrap();

    assert!(store.list().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_clients_same_record_one_accept_one_duplicate() {
    let tmp = tempfile::tempdir().unwrap();
    let store = RecordStore::open(tmp.path().join("store")).unwrap();
    let addr = start_server(store.clone()).await;

    let record = completed_record();
    let payload = encode_payload(&record).unwrap();
    let record_id = record.record_id;

    let mut tasks = Vec::new();
    for _ in 0..6 {
        let payload = payload.clone();
        tasks.push(tokio::task::spawn_blocking(move || {
            let transport = HttpTransport::new(format!("http://{addr}")).unwrap();
            transport.send(&record_id, &payload).unwrap()
        }));
    }

    let mut accepted = 0;
    let mut duplicate = 0;
    for task in tasks {
        match task.await.unwrap() {
            IngestResponse::Accepted => accepted += 1,
            IngestResponse::Duplicate => duplicate += 1,
            IngestResponse::Invalid { reason } => panic!("unexpected invalid: {reason}"),
        }
    }
    assert_eq!(accepted, 1);
    assert_eq!(duplicate, 5);
    assert_eq!(store.list().unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn health_reports_stored_count() {
    let tmp = tempfile::tempdir().unwrap();
    let store = RecordStore::open(tmp.path().join("store")).unwrap();
    let addr = start_server(store.clone()).await;

    let record = completed_record();
    store
        .ingest(record.record_id, &encode_payload(&record).unwrap())
        .unwrap();

    let body: serde_json::Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["records_stored"], 1);
}
