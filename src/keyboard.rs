//! Keystroke analytics
//!
//! Works over keystroke traces. Durations and spans are milliseconds; typing
//! speed is characters (key releases) per minute.

use crate::trace::{KeystrokeTrace, KeystrokeTraceMap};
use crate::types::{EventType, SessionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Typing speed summary for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TypingSpeedMetrics {
    /// Mean characters per minute over measurable traces
    pub average_typing_speed: f64,
    pub total_characters: usize,
    pub total_time_seconds: f64,
}

/// Key-down to key-up durations within one trace.
///
/// Presses and releases are paired per key value in order of occurrence;
/// pairs with a negative duration are dropped.
pub fn trace_typing_durations(trace: &KeystrokeTrace) -> Vec<f64> {
    let mut keys: Vec<Option<&str>> = Vec::new();
    for event in trace.events() {
        let key = event.key_value.as_deref();
        if event.event_type == EventType::KeyDown && !keys.contains(&key) {
            keys.push(key);
        }
    }

    let mut durations = Vec::new();
    for key in keys {
        let times_of = |event_type: EventType| -> Vec<f64> {
            trace
                .events()
                .iter()
                .filter(|e| e.event_type == event_type && e.key_value.as_deref() == key)
                .map(|e| e.time_stamp)
                .collect()
        };
        let downs = times_of(EventType::KeyDown);
        let ups = times_of(EventType::KeyUp);
        durations.extend(
            downs
                .iter()
                .zip(&ups)
                .map(|(down, up)| up - down)
                .filter(|d| *d >= 0.0),
        );
    }
    durations
}

/// Keystroke durations per session, flattened across traces
pub fn typing_durations(traces: &KeystrokeTraceMap) -> BTreeMap<SessionId, Vec<f64>> {
    traces
        .iter()
        .map(|(session_id, list)| {
            let durations = list.iter().flat_map(trace_typing_durations).collect();
            (session_id.clone(), durations)
        })
        .collect()
}

/// Characters per minute for one trace, `None` when it spans no time
pub fn trace_typing_speed(trace: &KeystrokeTrace) -> Option<f64> {
    let strokes: Vec<f64> = trace
        .events()
        .iter()
        .filter(|e| matches!(e.event_type, EventType::KeyDown | EventType::KeyUp))
        .map(|e| e.time_stamp)
        .collect();
    let characters = count_releases(trace);
    let (first, last) = (strokes.first()?, strokes.last()?);
    let seconds = (last - first) / 1000.0;
    if seconds > 0.0 {
        Some(characters as f64 / seconds * 60.0)
    } else {
        None
    }
}

/// Per-trace typing speeds for every session
pub fn typing_speed(traces: &KeystrokeTraceMap) -> BTreeMap<SessionId, Vec<f64>> {
    traces
        .iter()
        .map(|(session_id, list)| {
            let speeds = list.iter().filter_map(trace_typing_speed).collect();
            (session_id.clone(), speeds)
        })
        .collect()
}

/// Session typing summaries. Sessions without a measurable trace are omitted.
pub fn typing_speed_metrics(traces: &KeystrokeTraceMap) -> BTreeMap<SessionId, TypingSpeedMetrics> {
    let speeds = typing_speed(traces);
    traces
        .iter()
        .filter_map(|(session_id, list)| {
            let session_speeds = speeds.get(session_id)?;
            if session_speeds.is_empty() {
                return None;
            }
            let metrics = TypingSpeedMetrics {
                average_typing_speed: session_speeds.iter().sum::<f64>()
                    / session_speeds.len() as f64,
                total_characters: list.iter().map(count_releases).sum(),
                total_time_seconds: list.iter().map(trace_span_ms).sum::<f64>() / 1000.0,
            };
            Some((session_id.clone(), metrics))
        })
        .collect()
}

/// Key-down events whose key code marks a correction
pub fn backspace_usage(
    traces: &KeystrokeTraceMap,
    backspace_key_codes: &[i64],
) -> BTreeMap<SessionId, usize> {
    traces
        .iter()
        .map(|(session_id, list)| {
            let count = list
                .iter()
                .flat_map(|t| t.events())
                .filter(|e| e.event_type == EventType::KeyDown)
                .filter(|e| e.key_code.is_some_and(|c| backspace_key_codes.contains(&c)))
                .count();
            (session_id.clone(), count)
        })
        .collect()
}

fn count_releases(trace: &KeystrokeTrace) -> usize {
    trace
        .events()
        .iter()
        .filter(|e| e.event_type == EventType::KeyUp)
        .count()
}

fn trace_span_ms(trace: &KeystrokeTrace) -> f64 {
    let mut finite = trace
        .events()
        .iter()
        .map(|e| e.time_stamp)
        .filter(|t| t.is_finite());
    match finite.next() {
        Some(first) => finite.last().map_or(0.0, |last| last - first),
        None => 0.0,
    }
}
