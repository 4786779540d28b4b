//! Kinematic pipeline
//!
//! distance → velocity → acceleration → jerkiness, each derived from the
//! previous column and the trace's `dt`. Every stage has a single-trace form
//! and a broadcast form over a `TraceMap`; both give identical rows.
//!
//! Division guard: the first row is always 0, and any non-finite quotient
//! (`dt = 0` after tolerated duplicate timestamps, `NaN` timestamps) is
//! recorded as 0, i.e. no instantaneous motion is inferred.

use crate::metrics::{summarize_column, ColumnFilter, Summary};
use crate::trace::{advance_all, KinematicColumn, Trace, TraceMap, TraceStage};
use crate::types::SessionId;
use std::collections::BTreeMap;

/// Row-wise Euclidean norm of `(dx, dy)`
pub fn euclidean(dx: &[f64], dy: &[f64]) -> Vec<f64> {
    dx.iter().zip(dy).map(|(x, y)| x.hypot(*y)).collect()
}

/// Row-wise `values / dt` with the first row and non-finite results set to 0
pub fn divide_by_dt(values: &[f64], dt: &[f64]) -> Vec<f64> {
    values
        .iter()
        .zip(dt)
        .enumerate()
        .map(|(idx, (value, dt))| {
            if idx == 0 {
                return 0.0;
            }
            let rate = value / dt;
            if rate.is_finite() {
                rate
            } else {
                0.0
            }
        })
        .collect()
}

/// Distance column of one trace
pub fn trace_path(trace: &Trace) -> Trace {
    trace.advanced(TraceStage::Distance)
}

pub fn trace_velocity(trace: &Trace) -> Trace {
    trace.advanced(TraceStage::Velocity)
}

pub fn trace_acceleration(trace: &Trace) -> Trace {
    trace.advanced(TraceStage::Acceleration)
}

pub fn trace_jerkiness(trace: &Trace) -> Trace {
    trace.advanced(TraceStage::Jerkiness)
}

/// Distance column for every trace
pub fn path(traces: &TraceMap) -> TraceMap {
    advance_all(traces, TraceStage::Distance)
}

/// Velocity column for every trace
pub fn velocity(traces: &TraceMap) -> TraceMap {
    advance_all(traces, TraceStage::Velocity)
}

/// Acceleration column for every trace
pub fn acceleration(traces: &TraceMap) -> TraceMap {
    advance_all(traces, TraceStage::Acceleration)
}

/// Jerkiness column for every trace
pub fn jerkiness(traces: &TraceMap) -> TraceMap {
    advance_all(traces, TraceStage::Jerkiness)
}

/// Per-session velocity summary over strictly positive rows
pub fn velocity_metrics(traces: &TraceMap) -> BTreeMap<SessionId, Summary> {
    summarize_column(traces, KinematicColumn::Velocity, ColumnFilter::Positive)
}

/// Per-session acceleration summary over non-zero rows
pub fn acceleration_metrics(traces: &TraceMap) -> BTreeMap<SessionId, Summary> {
    summarize_column(traces, KinematicColumn::Acceleration, ColumnFilter::NonZero)
}

/// Per-session jerkiness summary over non-zero rows
pub fn jerkiness_metrics(traces: &TraceMap) -> BTreeMap<SessionId, Summary> {
    summarize_column(traces, KinematicColumn::Jerkiness, ColumnFilter::NonZero)
}
