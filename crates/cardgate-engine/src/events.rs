//! Outcomes published by the scanner.
//!
//! Every detection produces exactly one [`ScanEvent`] on a
//! `tokio::sync::broadcast` channel. Logging stays the primary record; events
//! let embedders and tests observe decisions without scraping logs. Sending
//! never blocks the scanner: with no subscribers the event is dropped, and a
//! slow subscriber sees `RecvError::Lagged` rather than stalling the loop.

use cardgate_core::CanonicalUid;
use serde::Serialize;

/// Why an enrollment stopped before anything was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbandonReason {
    /// The operator entered an empty or all-whitespace label.
    EmptyLabel,
    /// No operator console is attached to answer the label prompt.
    OperatorUnavailable,
}

/// A decision taken by the scanner for one presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScanEvent {
    AccessAllowed { uid: CanonicalUid, label: String },
    AccessDenied { uid: CanonicalUid },
    AlreadyEnrolled { uid: CanonicalUid, label: String },
    Enrolled { uid: CanonicalUid, label: String },
    EnrollmentAbandoned { uid: CanonicalUid, reason: AbandonReason },
    /// Writing the marker to the card failed; nothing was stored.
    EnrollmentFailed { uid: CanonicalUid, error: String },
    /// Another insert of the same uid won the race.
    EnrollmentConflict { uid: CanonicalUid },
    /// A poll cycle exhausted its retries; treated as "no tag".
    PollFailed { attempts: u32 },
    /// The remembered tag was forgotten after being absent long enough.
    DetectionReset { uid: CanonicalUid },
}
