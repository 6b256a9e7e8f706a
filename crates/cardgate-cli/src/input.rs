//! Operator input and the simulated tag field.

use cardgate_core::CanonicalUid;
use cardgate_engine::ScanEvent;
use cardgate_hardware::mock::MockReaderHandle;
use std::io::BufRead;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Forward stdin lines into a channel from a dedicated thread.
///
/// The channel closes when stdin reaches end of file.
pub fn stdin_lines(capacity: usize) -> std::io::Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(capacity);

    std::thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to read operator input: {}", e);
                        break;
                    }
                }
            }
            debug!("Stdin reader finished");
        })?;

    Ok(rx)
}

/// Present each tag in turn for `dwell`, with an empty field in between.
///
/// Runs forever; returns at once when there is nothing to present.
pub async fn present_tags(
    handle: MockReaderHandle,
    tags: Vec<(CanonicalUid, Vec<u8>)>,
    dwell: Duration,
) {
    if tags.is_empty() {
        return;
    }

    loop {
        for (uid, raw) in &tags {
            info!(uid = %uid, "Simulated tag entered the field");
            handle.present_tag(raw.clone());
            tokio::time::sleep(dwell).await;

            handle.remove_tag();
            debug!(uid = %uid, "Simulated tag left the field");
            tokio::time::sleep(dwell).await;
        }
    }
}

/// Print every scan event as one JSON line on stdout.
pub async fn print_events(mut events: broadcast::Receiver<ScanEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!("Failed to serialize scan event: {}", e),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Event output fell behind, {} events skipped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

