//! Movement pattern heuristics
//!
//! Hand-tuned rules over click-bounded traces:
//!
//! - straight: a hesitation at the start followed by a direct movement to the
//!   target, measured by perpendicular deviation from the chord
//! - hesitation: several slow rows plus at least one pause on the way to the
//!   target
//!
//! Both are candidates for later review rather than final classifications.

use crate::config::AnalysisConfig;
use crate::deviation::DeviationAnalyzer;
use crate::error::ComputeError;
use crate::timing::trace_pauses;
use crate::trace::{KinematicColumn, Trace, TraceMap, TraceStage};

/// Applies the pattern rules with thresholds from an `AnalysisConfig`
#[derive(Debug, Clone, PartialEq)]
pub struct PatternDetector {
    deviation: DeviationAnalyzer,
    straight_threshold: f64,
    slow_velocity: f64,
    min_slow_points: usize,
    pause_threshold_ms: f64,
}

impl Default for PatternDetector {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl PatternDetector {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            deviation: DeviationAnalyzer::from_config(config),
            straight_threshold: config.straight_pattern_threshold,
            slow_velocity: config.hesitation_velocity_threshold,
            min_slow_points: config.hesitation_min_slow_points,
            pause_threshold_ms: config.pause_threshold_ms,
        }
    }

    /// Whether a trace stays within the straight-movement corridor
    pub fn is_straight(&self, trace: &Trace) -> Result<bool, ComputeError> {
        let record = self.deviation.analyze(trace)?;
        Ok(record.auc_perp <= self.straight_threshold)
    }

    /// Whether a trace slows down repeatedly and pauses at least once
    pub fn is_hesitation(&self, trace: &Trace) -> bool {
        let with_velocity = trace.advanced(TraceStage::Velocity);
        let slow_rows = with_velocity
            .column(KinematicColumn::Velocity)
            .unwrap_or_default()
            .iter()
            .filter(|v| **v < self.slow_velocity)
            .count();
        slow_rows >= self.min_slow_points && !trace_pauses(trace, self.pause_threshold_ms).is_empty()
    }

    /// Straight patterns among click-bounded traces with an initial pause
    pub fn straight_patterns(&self, traces: &TraceMap) -> Result<TraceMap, ComputeError> {
        traces
            .iter()
            .map(|(session_id, list)| {
                let mut kept = Vec::new();
                for trace in list {
                    if self.is_straight(trace)? {
                        kept.push(trace.clone());
                    }
                }
                Ok((session_id.clone(), kept))
            })
            .collect()
    }

    /// Hesitation patterns among click-bounded traces, with velocity attached
    pub fn hesitation_patterns(&self, traces: &TraceMap) -> TraceMap {
        traces
            .iter()
            .map(|(session_id, list)| {
                let kept = list
                    .iter()
                    .filter(|trace| self.is_hesitation(trace))
                    .map(|trace| trace.advanced(TraceStage::Velocity))
                    .collect();
                (session_id.clone(), kept)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log::EventLog;
    use crate::segmentation::{click_bounded_traces, click_bounded_traces_with_initial_pause};
    use crate::types::{Event, EventType};

    fn ev(event_type: EventType, t: f64, x: f64, y: f64) -> Event {
        Event::new("S", event_type, t, x, y)
    }

    #[test]
    fn test_straight_pattern_after_initial_pause() {
        let log = EventLog::new(vec![
            ev(EventType::MouseMove, 0.0, 0.0, 0.0),
            ev(EventType::MouseMove, 400.0, 10.0, 10.0),
            ev(EventType::MouseMove, 420.0, 20.0, 20.0),
            ev(EventType::MouseMove, 440.0, 30.0, 30.0),
            ev(EventType::Click, 450.0, 30.0, 30.0),
            // wide detour: initial pause but far off the chord
            ev(EventType::MouseMove, 1000.0, 0.0, 0.0),
            ev(EventType::MouseMove, 1300.0, 500.0, 600.0),
            ev(EventType::MouseMove, 1320.0, 1000.0, 0.0),
            ev(EventType::MouseUp, 1330.0, 1000.0, 0.0),
        ]);
        let detector = PatternDetector::default();
        let candidates = click_bounded_traces_with_initial_pause(&log, 100.0);
        assert_eq!(candidates["S"].len(), 2);

        let straight = detector.straight_patterns(&candidates).unwrap();
        assert_eq!(straight["S"].len(), 1);
        assert_eq!(straight["S"][0].timestamps()[0], 0.0);
    }

    #[test]
    fn test_hesitation_pattern() {
        let log = EventLog::new(vec![
            // slow creeping with a pause
            ev(EventType::MouseMove, 0.0, 0.0, 0.0),
            ev(EventType::MouseMove, 200.0, 1.0, 0.0),
            ev(EventType::MouseMove, 250.0, 2.0, 0.0),
            ev(EventType::MouseMove, 300.0, 3.0, 0.0),
            ev(EventType::Click, 310.0, 3.0, 0.0),
            // fast and continuous
            ev(EventType::MouseMove, 400.0, 0.0, 0.0),
            ev(EventType::MouseMove, 410.0, 50.0, 0.0),
            ev(EventType::MouseMove, 420.0, 100.0, 0.0),
            ev(EventType::MouseDown, 430.0, 100.0, 0.0),
        ]);
        let traces = click_bounded_traces(&log);
        let found = PatternDetector::default().hesitation_patterns(&traces);
        assert_eq!(found["S"].len(), 1);
        assert_eq!(found["S"][0].stage(), TraceStage::Velocity);
        assert_eq!(found["S"][0].timestamps()[0], 0.0);
    }
}
