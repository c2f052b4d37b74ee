pub mod classification;
pub mod submission;
pub mod types;

pub use classification::{
    ClassificationVerdict, EmergencyAnalysis, EmergencyProbabilities, EmergencyRequest,
    UrgencyAnalysis, UrgencyLevel, UrgencyProbabilities, OFFLINE_MODE_TAG,
};
pub use submission::{PendingSubmission, SubmissionKind, SubmissionOutcome};
pub use types::{ComponentHealth, HealthReport, QueueSnapshot};
