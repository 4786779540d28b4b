//! Pauses and session timing
//!
//! A pause is a row inside a trace whose `dt` exceeds the pause threshold
//! (milliseconds). Execution time spans the whole session; movement time only
//! counts the time spent inside traces.

use crate::event_log::EventLog;
use crate::trace::{KinematicColumn, Trace, TraceMap, TraceStage};
use crate::types::SessionId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One detected pause
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PauseRecord {
    /// Row within the trace that ends the gap
    pub row: usize,
    /// Timestamp of that row
    pub time_stamp: f64,
    /// Gap length in milliseconds
    pub duration: f64,
}

/// Pause counts for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PauseCount {
    pub num_pauses: usize,
    pub mean_pauses_per_trace: f64,
}

/// Pause metrics for one session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PauseMetrics {
    pub total_pauses: usize,
    pub mean_pause_duration: f64,
    pub pause_durations: Vec<f64>,
    pub mean_pauses_per_trace: f64,
    pub max_pause: f64,
    pub min_pause: f64,
}

/// Pauses of one trace, in row order
pub fn trace_pauses(trace: &Trace, threshold_ms: f64) -> Vec<PauseRecord> {
    let differenced = trace.advanced(TraceStage::Differenced);
    let dt = differenced.column(KinematicColumn::Dt).unwrap_or_default();
    dt.iter()
        .zip(trace.events())
        .enumerate()
        .filter(|(_, (gap, _))| **gap > threshold_ms)
        .map(|(row, (gap, event))| PauseRecord {
            row,
            time_stamp: event.time_stamp,
            duration: *gap,
        })
        .collect()
}

/// Pause count per session and mean pauses per trace
pub fn num_pauses(traces: &TraceMap, threshold_ms: f64) -> BTreeMap<SessionId, PauseCount> {
    traces
        .iter()
        .map(|(session_id, list)| {
            let total: usize = list.iter().map(|t| trace_pauses(t, threshold_ms).len()).sum();
            let mean_per_trace = if list.is_empty() {
                0.0
            } else {
                total as f64 / list.len() as f64
            };
            (
                session_id.clone(),
                PauseCount {
                    num_pauses: total,
                    mean_pauses_per_trace: mean_per_trace,
                },
            )
        })
        .collect()
}

/// Full pause metrics per session
pub fn pause_metrics(traces: &TraceMap, threshold_ms: f64) -> BTreeMap<SessionId, PauseMetrics> {
    traces
        .iter()
        .map(|(session_id, list)| {
            let durations: Vec<f64> = list
                .iter()
                .flat_map(|t| trace_pauses(t, threshold_ms))
                .map(|p| p.duration)
                .collect();
            (session_id.clone(), metrics_from_durations(durations, list.len()))
        })
        .collect()
}

fn metrics_from_durations(pause_durations: Vec<f64>, traces: usize) -> PauseMetrics {
    let total_pauses = pause_durations.len();
    let mean_pauses_per_trace = if traces == 0 {
        0.0
    } else {
        total_pauses as f64 / traces as f64
    };
    if total_pauses == 0 {
        return PauseMetrics {
            mean_pauses_per_trace,
            ..PauseMetrics::default()
        };
    }
    PauseMetrics {
        total_pauses,
        mean_pause_duration: pause_durations.iter().sum::<f64>() / total_pauses as f64,
        mean_pauses_per_trace,
        max_pause: pause_durations.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        min_pause: pause_durations.iter().copied().fold(f64::INFINITY, f64::min),
        pause_durations,
    }
}

/// Milliseconds from the first to the last event of each session.
/// Non-numeric timestamps are ignored.
pub fn execution_time(log: &EventLog) -> BTreeMap<SessionId, f64> {
    log.sorted_sessions()
        .into_iter()
        .map(|(session_id, events)| {
            let mut finite = events.iter().map(|e| e.time_stamp).filter(|t| t.is_finite());
            let span = match finite.next() {
                Some(first) => finite.last().map(|last| last - first).unwrap_or(0.0),
                None => 0.0,
            };
            (session_id, span)
        })
        .collect()
}

/// Milliseconds spent inside traces (sum of every trace's `dt`)
pub fn movement_time(traces: &TraceMap) -> BTreeMap<SessionId, f64> {
    traces
        .iter()
        .map(|(session_id, list)| {
            let total: f64 = list
                .iter()
                .map(|trace| {
                    let differenced = trace.advanced(TraceStage::Differenced);
                    let dt = differenced.column(KinematicColumn::Dt).unwrap_or_default();
                    dt.iter().filter(|dt| dt.is_finite()).sum::<f64>()
                })
                .sum();
            (session_id.clone(), total)
        })
        .collect()
}
