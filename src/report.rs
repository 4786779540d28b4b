//! Report encoding
//!
//! This module wraps per-session results in a versioned report envelope with
//! producer and provenance metadata.

use crate::clicks::ClickSlipSummary;
use crate::config::AnalysisConfig;
use crate::deviation::{AucRatioMetrics, MadRecord};
use crate::error::ComputeError;
use crate::keyboard::TypingSpeedMetrics;
use crate::metrics::Summary;
use crate::timing::PauseMetrics;
use crate::types::SessionId;
use crate::{PRODUCER_NAME, WIB_VERSION};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Data-quality markers attached to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    /// Two or more events share a timestamp
    DuplicateTimestamps,
    /// At least one timestamp could not be read as a number
    NonNumericTimestamps,
    /// No movement run long enough to form a trace
    NoMovementTraces,
}

/// Keyboard results for one session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyboardReport {
    pub keystroke_traces: usize,
    /// Key-down to key-up durations (ms)
    pub keystroke_durations: Summary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typing: Option<TypingSpeedMetrics>,
    pub backspaces: usize,
}

/// Every metric computed for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: SessionId,
    pub event_count: usize,
    pub trace_count: usize,
    pub execution_time_ms: f64,
    pub movement_time_ms: f64,
    pub velocity: Summary,
    pub acceleration: Summary,
    pub jerkiness: Summary,
    pub deviation: AucRatioMetrics,
    pub mad: MadRecord,
    pub pauses: PauseMetrics,
    pub clicks: usize,
    pub click_slips: ClickSlipSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyboard: Option<KeyboardReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<QualityFlag>,
}

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Where and how the report was computed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProvenance {
    pub computed_at_utc: String,
    pub session_count: usize,
    pub event_count: usize,
    pub config: AnalysisConfig,
}

/// Complete analysis report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub provenance: ReportProvenance,
    pub sessions: Vec<SessionReport>,
}

/// Encoder for analysis reports
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Wrap session reports in a report envelope
    pub fn encode(
        &self,
        sessions: BTreeMap<SessionId, SessionReport>,
        config: &AnalysisConfig,
    ) -> AnalysisReport {
        let event_count = sessions.values().map(|s| s.event_count).sum();
        AnalysisReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: WIB_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            provenance: ReportProvenance {
                computed_at_utc: Utc::now().to_rfc3339(),
                session_count: sessions.len(),
                event_count,
                config: config.clone(),
            },
            sessions: sessions.into_values().collect(),
        }
    }

    /// Encode to a pretty-printed JSON string
    pub fn encode_to_json(
        &self,
        sessions: BTreeMap<SessionId, SessionReport>,
        config: &AnalysisConfig,
    ) -> Result<String, ComputeError> {
        let report = self.encode(sessions, config);
        serde_json::to_string_pretty(&report).map_err(ComputeError::JsonError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn make_session(id: &str, events: usize) -> SessionReport {
        SessionReport {
            session_id: id.to_string(),
            event_count: events,
            trace_count: 1,
            execution_time_ms: 500.0,
            movement_time_ms: 200.0,
            velocity: Summary {
                mean: 0.2,
                max: 0.4,
                min: 0.1,
            },
            acceleration: Summary::default(),
            jerkiness: Summary::default(),
            deviation: AucRatioMetrics::default(),
            mad: MadRecord::default(),
            pauses: PauseMetrics::default(),
            clicks: 2,
            click_slips: ClickSlipSummary::default(),
            keyboard: None,
            flags: vec![QualityFlag::DuplicateTimestamps],
        }
    }

    #[test]
    fn test_encode_report() {
        let mut sessions = BTreeMap::new();
        sessions.insert("B".to_string(), make_session("B", 7));
        sessions.insert("A".to_string(), make_session("A", 3));

        let encoder = ReportEncoder::with_instance_id("test-instance".to_string());
        let report = encoder.encode(sessions, &AnalysisConfig::default());

        assert_eq!(report.report_version, REPORT_VERSION);
        assert_eq!(report.producer.name, PRODUCER_NAME);
        assert_eq!(report.producer.instance_id, "test-instance");
        assert_eq!(report.provenance.session_count, 2);
        assert_eq!(report.provenance.event_count, 10);
        let ids: Vec<&str> = report.sessions.iter().map(|s| s.session_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn test_encode_to_json() {
        let mut sessions = BTreeMap::new();
        sessions.insert("A".to_string(), make_session("A", 3));
        let json = ReportEncoder::new()
            .encode_to_json(sessions, &AnalysisConfig::default())
            .unwrap();

        assert!(json.contains("\"report_version\""));
        assert!(json.contains("\"duplicate_timestamps\""));
        assert!(!json.contains("\"keyboard\""));

        let parsed: AnalysisReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.sessions[0].velocity.max, 0.4);
    }

    #[test]
    fn test_unique_instance_ids() {
        let a = ReportEncoder::new();
        let b = ReportEncoder::new();
        assert_ne!(a.instance_id(), b.instance_id());
    }
}
