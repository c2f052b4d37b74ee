use std::fmt;

use serde::{Deserialize, Serialize};

/// Tag carried by verdicts produced locally instead of by the backend model.
pub const OFFLINE_MODE_TAG: &str = "demo_mode_backend_offline";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UrgencyLevel {
    #[serde(rename = "LOW")]
    Low,
    #[serde(rename = "MEDIUM")]
    Medium,
    #[serde(rename = "HIGH")]
    High,
    #[serde(rename = "CRITICAL")]
    Critical,
    /// Sent by the backend when a text is not an emergency at all.
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl UrgencyLevel {
    pub fn requires_immediate_action(&self) -> bool {
        matches!(self, UrgencyLevel::High | UrgencyLevel::Critical)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyLevel::Low => "LOW",
            UrgencyLevel::Medium => "MEDIUM",
            UrgencyLevel::High => "HIGH",
            UrgencyLevel::Critical => "CRITICAL",
            UrgencyLevel::NotApplicable => "N/A",
        }
    }
}

impl fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmergencyRequest {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl EmergencyRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyProbabilities {
    pub emergency: f64,
    pub non_emergency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyAnalysis {
    pub is_emergency: bool,
    pub confidence: f64,
    pub probabilities: EmergencyProbabilities,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrgencyProbabilities {
    #[serde(rename = "LOW")]
    pub low: f64,
    #[serde(rename = "MEDIUM")]
    pub medium: f64,
    #[serde(rename = "HIGH")]
    pub high: f64,
    #[serde(rename = "CRITICAL")]
    pub critical: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrgencyAnalysis {
    pub urgency_level: UrgencyLevel,
    pub confidence: f64,
    pub probabilities: UrgencyProbabilities,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationVerdict {
    pub text: String,
    pub emergency_analysis: EmergencyAnalysis,
    pub urgency_analysis: UrgencyAnalysis,
    pub requires_immediate_action: bool,
    pub processing_time_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

impl ClassificationVerdict {
    pub fn is_heuristic(&self) -> bool {
        self.mode.as_deref() == Some(OFFLINE_MODE_TAG)
    }

    pub fn urgency_level(&self) -> UrgencyLevel {
        self.urgency_analysis.urgency_level
    }

    pub fn is_emergency(&self) -> bool {
        self.emergency_analysis.is_emergency
    }
}
