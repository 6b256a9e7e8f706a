//! Tag scanner: poll, de-duplicate, dispatch by mode.
//!
//! The scanner owns the reader. Each cycle it asks the reader for a tag
//! (request + anti-collision, through the retry policy), canonicalizes the
//! UID and compares it with the last UID it saw. A repeated read of a tag
//! still resting on the reader does nothing; a different UID is a new
//! presentation and is dispatched on the current [`OperatingMode`]:
//!
//! - `ReadCheck`: look the UID up and report access allowed (with the
//!   stored label) or denied. Nothing is mutated.
//! - `Enroll`: skip tags already enrolled, otherwise ask the operator for a
//!   label, write the marker block to the card and store `(uid, label)`.
//!
//! Failures inside a cycle are logged and the loop moves on. The loop ends
//! only on cancellation or when the reader cannot be initialized, and the
//! reader's cleanup runs exactly once on every exit path.
//!
//! # Absence
//!
//! By default the last seen UID is kept until a different tag is read, so
//! removing a card and presenting it again is not a new presentation.
//! [`AbsencePolicy::ResetAfter`] forgets the UID once no tag has been read
//! for the given duration.

use crate::error::{EngineError, Result};
use crate::events::{AbandonReason, ScanEvent};
use crate::operator::LabelRequester;
use crate::provision::write_authenticated;
use cardgate_core::constants::{DEFAULT_MARKER_BLOCK, DEFAULT_POLL_INTERVAL_MS, MARKER_TEXT};
use cardgate_core::{CanonicalUid, ModeController, OperatingMode, RetryPolicy};
use cardgate_hardware::types::is_sector_trailer;
use cardgate_hardware::{BlockData, CardReader, KeyType, MifareKey};
use cardgate_storage::{Registry, StorageError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Capacity of the scan event channel when none is supplied.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// What to do with the last seen UID when no tag answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AbsencePolicy {
    /// Keep it until a different tag is read.
    #[default]
    Retain,

    /// Forget it once no tag has been read for this long.
    ResetAfter(Duration),
}

/// Scanner configuration.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Pause between poll cycles.
    pub poll_interval: Duration,

    /// Data block that receives the enrollment marker.
    pub marker_block: u8,

    /// Text written to the marker block.
    pub marker_text: String,

    /// Key used to authenticate the marker block's sector.
    pub auth_key: MifareKey,

    /// Which sector key `auth_key` is.
    pub key_type: KeyType,

    /// Retry policy for every reader primitive.
    pub retry: RetryPolicy,

    /// Whether a tag that went away is forgotten.
    pub absence: AbsencePolicy,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            marker_block: DEFAULT_MARKER_BLOCK,
            marker_text: MARKER_TEXT.to_string(),
            auth_key: MifareKey::DEFAULT,
            key_type: KeyType::KeyA,
            retry: RetryPolicy::default(),
            absence: AbsencePolicy::Retain,
        }
    }
}

impl ScannerConfig {
    /// Set the pause between poll cycles
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the data block that receives the enrollment marker
    pub fn marker_block(mut self, block: u8) -> Self {
        self.marker_block = block;
        self
    }

    /// Set the marker text (padded or truncated to one block)
    pub fn marker_text(mut self, text: impl Into<String>) -> Self {
        self.marker_text = text.into();
        self
    }

    /// Set the key that authenticates the marker block's sector
    pub fn auth_key(mut self, key: MifareKey) -> Self {
        self.auth_key = key;
        self
    }

    /// Set whether `auth_key` is key A or key B
    pub fn key_type(mut self, key_type: KeyType) -> Self {
        self.key_type = key_type;
        self
    }

    /// Set the retry policy applied to each reader primitive
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set what happens to the last seen tag when the field is empty
    pub fn absence(mut self, absence: AbsencePolicy) -> Self {
        self.absence = absence;
        self
    }

    /// Reject marker blocks that would damage the card.
    ///
    /// Block 0 holds the manufacturer data and sector trailers hold keys.
    pub fn validate(&self) -> Result<()> {
        if self.marker_block == 0 {
            return Err(EngineError::config("marker block 0 is the manufacturer block"));
        }
        if is_sector_trailer(self.marker_block) {
            return Err(EngineError::config(format!(
                "marker block {} is a sector trailer",
                self.marker_block
            )));
        }
        Ok(())
    }
}

/// Last seen UID, used only for de-duplication.
#[derive(Debug, Default)]
struct DetectionState {
    last_seen: Option<CanonicalUid>,
    last_read_at: Option<Instant>,
}

impl DetectionState {
    /// Record a successful read. Returns `true` for a new presentation.
    fn observe(&mut self, uid: &CanonicalUid, now: Instant) -> bool {
        self.last_read_at = Some(now);
        if self.last_seen.as_ref() == Some(uid) {
            return false;
        }
        self.last_seen = Some(uid.clone());
        true
    }

    /// Apply the absence policy after a cycle without a tag.
    ///
    /// Returns the forgotten UID when the state was reset.
    fn expire(&mut self, policy: AbsencePolicy, now: Instant) -> Option<CanonicalUid> {
        let AbsencePolicy::ResetAfter(after) = policy else {
            return None;
        };
        let last = self.last_read_at?;
        if now.saturating_duration_since(last) < after {
            return None;
        }
        self.last_read_at = None;
        self.last_seen.take()
    }
}

/// The poll → detect → dispatch loop.
pub struct TagScanner<R, G> {
    reader: R,
    registry: Arc<G>,
    mode: Arc<ModeController>,
    labels: LabelRequester,
    events: broadcast::Sender<ScanEvent>,
    config: ScannerConfig,
    detection: DetectionState,
}

impl<R: CardReader, G: Registry> TagScanner<R, G> {
    /// Create a scanner with the default configuration.
    pub fn new(
        reader: R,
        registry: Arc<G>,
        mode: Arc<ModeController>,
        labels: LabelRequester,
    ) -> Self {
        let (events, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Self {
            reader,
            registry,
            mode,
            labels,
            events,
            config: ScannerConfig::default(),
            detection: DetectionState::default(),
        }
    }

    /// Replace the default configuration.
    pub fn with_config(mut self, config: ScannerConfig) -> Self {
        self.config = config;
        self
    }

    /// Publish events on an existing channel.
    pub fn with_events(mut self, events: broadcast::Sender<ScanEvent>) -> Self {
        self.events = events;
        self
    }

    /// Receive every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.events.subscribe()
    }

    /// Run until `cancel` fires or the reader cannot be initialized.
    ///
    /// The reader's cleanup is called exactly once before returning; a
    /// cleanup failure is logged and does not change the result.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` for an unusable configuration and
    /// `EngineError::ReaderInit` when the reader fails to initialize.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
        let outcome = self.scan(&cancel).await;
        self.release().await;
        outcome
    }

    async fn scan(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.config.validate()?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            init = self.reader.initialize() => init.map_err(EngineError::ReaderInit)?,
        }

        info!("Tag scanner started in {} mode", self.mode.get());

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.cycle() => {}
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        info!("Tag scanner stopping");
        Ok(())
    }

    async fn release(&mut self) {
        match self.reader.cleanup().await {
            Ok(()) => debug!("Reader released"),
            Err(e) => error!("Reader cleanup failed: {}", e),
        }
    }

    /// One poll cycle.
    async fn cycle(&mut self) {
        let retry = self.config.retry;
        let reader = &mut self.reader;

        let polled = retry
            .run("poll_for_tag", async || reader.poll_for_tag().await)
            .await;

        let raw = match polled {
            Ok(raw) => raw,
            Err(e) => {
                debug!("No tag this cycle: {}", e);
                self.publish(ScanEvent::PollFailed {
                    attempts: e.attempts,
                });
                self.apply_absence();
                return;
            }
        };

        let uid = match CanonicalUid::from_bytes(&raw) {
            Ok(uid) => uid,
            Err(e) => {
                warn!("Ignoring unreadable UID: {}", e);
                return;
            }
        };

        if !self.detection.observe(&uid, Instant::now()) {
            trace!(uid = %uid, "Tag still present");
            return;
        }

        let mode = self.mode.get();
        info!(uid = %uid, mode = %mode, "Tag detected");

        let outcome = match mode {
            OperatingMode::ReadCheck => self.check_access(&uid).await,
            OperatingMode::Enroll => self.enroll(&uid, &raw).await,
        };

        if let Err(e) = outcome {
            error!(uid = %uid, "Failed to handle tag: {}", e);
        }
    }

    fn apply_absence(&mut self) {
        if let Some(uid) = self.detection.expire(self.config.absence, Instant::now()) {
            info!(uid = %uid, "Tag absent, detection reset");
            self.publish(ScanEvent::DetectionReset { uid });
        }
    }

    async fn check_access(&mut self, uid: &CanonicalUid) -> Result<()> {
        match self.registry.lookup(uid).await? {
            Some(tag) => {
                info!(uid = %uid, label = %tag.label, "Access allowed");
                self.publish(ScanEvent::AccessAllowed {
                    uid: uid.clone(),
                    label: tag.label,
                });
            }
            None => {
                info!(uid = %uid, "Access denied: tag not enrolled");
                self.publish(ScanEvent::AccessDenied { uid: uid.clone() });
            }
        }
        Ok(())
    }

    async fn enroll(&mut self, uid: &CanonicalUid, raw: &[u8]) -> Result<()> {
        if let Some(tag) = self.registry.lookup(uid).await? {
            info!(uid = %uid, label = %tag.label, "Tag already enrolled");
            self.publish(ScanEvent::AlreadyEnrolled {
                uid: uid.clone(),
                label: tag.label,
            });
            return Ok(());
        }

        let Some(line) = self.labels.request().await else {
            warn!(uid = %uid, "Enrollment abandoned: no operator console");
            self.publish(ScanEvent::EnrollmentAbandoned {
                uid: uid.clone(),
                reason: AbandonReason::OperatorUnavailable,
            });
            return Ok(());
        };

        let label = line.trim();
        if label.is_empty() {
            warn!(uid = %uid, "Enrollment abandoned: empty label");
            self.publish(ScanEvent::EnrollmentAbandoned {
                uid: uid.clone(),
                reason: AbandonReason::EmptyLabel,
            });
            return Ok(());
        }

        if let Err(e) = self.write_marker(raw).await {
            self.publish(ScanEvent::EnrollmentFailed {
                uid: uid.clone(),
                error: e.to_string(),
            });
            return Err(e);
        }

        match self.registry.insert(uid, label).await {
            Ok(tag) => {
                info!(uid = %uid, label = %tag.label, "Tag enrolled");
                self.publish(ScanEvent::Enrolled {
                    uid: uid.clone(),
                    label: tag.label,
                });
            }
            Err(StorageError::AlreadyExists { .. }) => {
                warn!(uid = %uid, "Tag was enrolled concurrently, keeping the existing entry");
                self.publish(ScanEvent::EnrollmentConflict { uid: uid.clone() });
            }
            Err(e) => return Err(e.into()),
        }

        Ok(())
    }

    async fn write_marker(&mut self, raw: &[u8]) -> Result<()> {
        let data = BlockData::from_text(&self.config.marker_text);
        write_authenticated(
            &mut self.reader,
            self.config.retry,
            self.config.key_type,
            &self.config.auth_key,
            raw,
            self.config.marker_block,
            &data,
        )
        .await
    }

    fn publish(&self, event: ScanEvent) {
        let _ = self.events.send(event);
    }
}
