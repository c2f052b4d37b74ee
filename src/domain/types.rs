use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct QueueSnapshot {
    pub pending: usize,
    pub help_requests: usize,
    pub field_reports: usize,
    pub communications: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    pub version: String,
}

/// Aggregated frontend/backend health, for status display only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub timestamp: i64,
    pub frontend: ComponentHealth,
    pub backend: Value,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}
