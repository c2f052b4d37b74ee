use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    HelpRequest,
    FieldReport,
    Communication,
}

impl SubmissionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionKind::HelpRequest => "help_request",
            SubmissionKind::FieldReport => "field_report",
            SubmissionKind::Communication => "communication",
        }
    }
}

impl fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A submission parked in the offline queue.
///
/// Fields are only readable; an entry stays exactly as enqueued until it is
/// delivered and removed, or the queue is cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSubmission {
    local_id: i64,
    kind: SubmissionKind,
    payload: Value,
    enqueued_at: DateTime<Utc>,
}

impl PendingSubmission {
    pub(crate) fn new(
        local_id: i64,
        kind: SubmissionKind,
        payload: Value,
        enqueued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            local_id,
            kind,
            payload,
            enqueued_at,
        }
    }

    pub fn local_id(&self) -> i64 {
        self.local_id
    }

    pub fn kind(&self) -> SubmissionKind {
        self.kind
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }
}

/// Result of handing a payload to the submission gateway.
///
/// `Queued` is a normal outcome: the payload is saved locally and will be
/// synced once the backend is reachable again.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Delivered(Value),
    Queued { local_id: i64 },
    Rejected { reason: String },
}

impl SubmissionOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, SubmissionOutcome::Queued { .. })
    }
}
