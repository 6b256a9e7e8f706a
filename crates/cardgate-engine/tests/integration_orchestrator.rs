//! End-to-end tests of the orchestrator with the mock reader.
//!
//! Run with: cargo test --package cardgate-engine --test integration_orchestrator

use cardgate_core::{CanonicalUid, OperatingMode, RetryPolicy};
use cardgate_engine::{
    AbsencePolicy, EngineError, KeyProvisioning, Orchestrator, OrchestratorConfig, ScanEvent,
    ScannerConfig, ToolConfig, provision_key,
};
use cardgate_hardware::mock::{MockOperation, MockReader, MockReaderHandle};
use cardgate_hardware::{AnyCardReader, BlockData, MifareKey};
use cardgate_storage::{AnyRegistry, Database, MemoryRegistry, Registry, SqliteRegistry};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

const ALICE: [u8; 4] = [0x04, 0xAB, 0xCD, 0xEF];
const BOB: [u8; 4] = [0x88, 0x04, 0x1D, 0xC9];

fn uid(raw: &[u8]) -> CanonicalUid {
    CanonicalUid::from_bytes(raw).unwrap()
}

fn scanner_config() -> ScannerConfig {
    ScannerConfig::default().retry(RetryPolicy::new(0, Duration::from_millis(10)))
}

fn orchestrator<G: Registry + 'static>(
    registry: G,
) -> (
    Orchestrator<MockReader, G>,
    MockReaderHandle,
    mpsc::Sender<String>,
) {
    let (reader, handle) = MockReader::new();
    let (lines_tx, lines_rx) = mpsc::channel(16);
    let orchestrator = Orchestrator::new(reader, registry, lines_rx)
        .config(OrchestratorConfig::default().command_pause(Duration::from_millis(10)))
        .scanner_config(scanner_config());
    (orchestrator, handle, lines_tx)
}

fn decisions(rx: &mut broadcast::Receiver<ScanEvent>) -> Vec<ScanEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if !matches!(event, ScanEvent::PollFailed { .. }) {
            out.push(event);
        }
    }
    out
}

async fn say(lines: &mpsc::Sender<String>, line: &str) {
    lines.send(line.to_string()).await.unwrap();
    sleep(Duration::from_millis(500)).await;
}

#[tokio::test(start_paused = true)]
async fn test_operator_enrolls_tag_then_access_is_allowed() {
    let (orchestrator, handle, lines) = orchestrator(MemoryRegistry::new());
    let registry = orchestrator.registry();
    let mut events = orchestrator.subscribe();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let script = async {
        say(&lines, "enrollmode").await;
        handle.present_tag(BOB.to_vec());
        sleep(Duration::from_secs(1)).await;
        say(&lines, "Bob").await;

        say(&lines, "admode").await;
        handle.present_tag(ALICE.to_vec());
        sleep(Duration::from_secs(1)).await;
        handle.present_tag(BOB.to_vec());
        sleep(Duration::from_secs(1)).await;

        stop_tx.send(()).unwrap();
    };

    let (result, ()) = tokio::join!(
        orchestrator.run(async {
            let _ = stop_rx.await;
        }),
        script
    );
    result.unwrap();

    assert_eq!(
        decisions(&mut events),
        vec![
            ScanEvent::Enrolled {
                uid: uid(&BOB),
                label: "Bob".to_string()
            },
            ScanEvent::AccessDenied { uid: uid(&ALICE) },
            ScanEvent::AccessAllowed {
                uid: uid(&BOB),
                label: "Bob".to_string()
            },
        ]
    );
    assert_eq!(handle.block(&BOB, 8), Some(BlockData::marker()));
    assert_eq!(handle.call_count(MockOperation::Cleanup), 1);
    assert!(registry.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_mid_backoff_releases_everything_once() {
    let (orchestrator, handle, _lines) = orchestrator(MemoryRegistry::new());
    let orchestrator = orchestrator
        .scanner_config(scanner_config().retry(RetryPolicy::new(5, Duration::from_secs(10))));
    let registry = orchestrator.registry();

    // No tag: the scanner sits in a long backoff when shutdown arrives
    let result = orchestrator.run(sleep(Duration::from_secs(3))).await;

    assert!(result.is_ok());
    assert_eq!(handle.call_count(MockOperation::Cleanup), 1);
    assert!(handle.call_count(MockOperation::Request) <= 2);
    assert!(registry.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_while_waiting_for_label() {
    let (orchestrator, handle, _lines) = orchestrator(MemoryRegistry::new());
    let orchestrator = orchestrator.initial_mode(OperatingMode::Enroll);
    let registry = orchestrator.registry();
    handle.present_tag(ALICE.to_vec());

    let result = orchestrator.run(sleep(Duration::from_secs(2))).await;

    assert!(result.is_ok());
    assert_eq!(handle.call_count(MockOperation::Write), 0);
    assert_eq!(handle.call_count(MockOperation::Cleanup), 1);
    assert!(registry.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_reader_init_failure_stops_gate_with_error() {
    let (orchestrator, handle, _lines) = orchestrator(MemoryRegistry::new());
    let registry = orchestrator.registry();
    handle.fail_next(MockOperation::Initialize, 1);

    let result = orchestrator.run(std::future::pending::<()>()).await;

    assert!(matches!(result, Err(EngineError::ReaderInit(_))));
    assert_eq!(handle.call_count(MockOperation::Cleanup), 1);
    assert!(registry.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_closed_operator_input_keeps_scanner_running() {
    let (orchestrator, handle, lines) = orchestrator(MemoryRegistry::new());
    let orchestrator = orchestrator.initial_mode(OperatingMode::Enroll);
    let mut events = orchestrator.subscribe();
    drop(lines);

    let script = async {
        sleep(Duration::from_secs(1)).await;
        handle.present_tag(ALICE.to_vec());
        sleep(Duration::from_secs(1)).await;
    };

    orchestrator.run(script).await.unwrap();

    assert!(matches!(
        decisions(&mut events).as_slice(),
        [ScanEvent::EnrollmentAbandoned { .. }]
    ));
    assert_eq!(handle.call_count(MockOperation::Write), 0);
}

#[tokio::test(start_paused = true)]
async fn test_absence_reset_through_orchestrator() {
    let registry = MemoryRegistry::new();
    registry.insert(&uid(&ALICE), "Alice").await.unwrap();
    let (orchestrator, handle, _lines) = orchestrator(registry);
    let orchestrator = orchestrator.scanner_config(
        scanner_config().absence(AbsencePolicy::ResetAfter(Duration::from_secs(1))),
    );
    let mut events = orchestrator.subscribe();

    let script = async {
        handle.present_tag(ALICE.to_vec());
        sleep(Duration::from_secs(1)).await;
        handle.remove_tag();
        sleep(Duration::from_secs(3)).await;
        handle.present_tag(ALICE.to_vec());
        sleep(Duration::from_secs(1)).await;
    };

    orchestrator.run(script).await.unwrap();

    let allowed = decisions(&mut events)
        .into_iter()
        .filter(|event| matches!(event, ScanEvent::AccessAllowed { .. }))
        .count();
    assert_eq!(allowed, 2);
}

// Real time: the SQLite driver works on its own thread, so paused-time
// auto-advance would fire pool timeouts while it runs
#[tokio::test]
async fn test_sqlite_backend_with_enum_dispatch() {
    let db = Database::in_memory().await.unwrap();
    let sqlite = SqliteRegistry::new(db);
    sqlite.init().await.unwrap();
    sqlite.insert(&uid(&ALICE), "Alice").await.unwrap();

    let (reader, handle) = MockReader::new();
    let (_lines_tx, lines_rx) = mpsc::channel(4);
    let orchestrator = Orchestrator::new(
        AnyCardReader::Mock(reader),
        AnyRegistry::from(sqlite),
        lines_rx,
    )
    .scanner_config(scanner_config());
    let registry = orchestrator.registry();
    let mut events = orchestrator.subscribe();

    let script = async {
        handle.present_tag(ALICE.to_vec());
        sleep(Duration::from_millis(600)).await;
    };

    orchestrator.run(script).await.unwrap();

    assert_eq!(
        decisions(&mut events),
        vec![ScanEvent::AccessAllowed {
            uid: uid(&ALICE),
            label: "Alice".to_string()
        }]
    );
    assert!(registry.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_enrollment_with_provisioned_key() {
    let new_key = MifareKey::new([0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5]);
    let (orchestrator, handle, lines) = orchestrator(MemoryRegistry::new());
    let orchestrator = orchestrator
        .initial_mode(OperatingMode::Enroll)
        .scanner_config(scanner_config().auth_key(new_key));
    let registry = orchestrator.registry();

    // Re-key sector 2, which holds the marker block
    handle.present_tag(ALICE.to_vec());
    let tool = ToolConfig::default().retry(RetryPolicy::new(0, Duration::from_millis(10)));
    let provisioned = provision_key(
        handle.reader(),
        &tool,
        &KeyProvisioning::new(new_key).trailer_block(11),
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(provisioned, uid(&ALICE));
    handle.remove_tag();

    let script = async {
        sleep(Duration::from_secs(1)).await;
        handle.present_tag(ALICE.to_vec());
        sleep(Duration::from_secs(1)).await;
        say(&lines, "Alice").await;
    };

    orchestrator.run(script).await.unwrap();

    let tag = registry.lookup(&uid(&ALICE)).await.unwrap().unwrap();
    assert_eq!(tag.label, "Alice");
    assert_eq!(handle.block(&ALICE, 8), Some(BlockData::marker()));
    assert_eq!(
        handle.sector_trailer(&ALICE, 2).map(|trailer| trailer.key_a),
        Some(new_key)
    );
}
