use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An enrolled credential as stored in the registry.
///
/// Maps to the `rfid_tags` table:
/// - `uid` is the canonical uid string and is unique
/// - `label` is the operator-supplied name given at enrollment
/// - `created_at` is the enrollment time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EnrolledTag {
    /// Auto-increment primary key
    pub id: i64,

    /// Canonical uid (e.g. `"4-171-205-239"`)
    pub uid: String,

    /// Operator-supplied label
    pub label: String,

    /// Enrollment timestamp
    pub created_at: DateTime<Utc>,
}
