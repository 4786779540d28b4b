//! Trace model
//!
//! A `Trace` is a contiguous run of movement events cut out of one session.
//! Derived columns are attached in stages; the stage tag records how far a
//! trace has been taken so no stage is ever computed twice.

use crate::differencer::{difference, first_difference};
use crate::kinematics::{divide_by_dt, euclidean};
use crate::types::{Event, Point, SessionId};
use serde::Serialize;
use std::collections::BTreeMap;

/// Traces grouped by session
pub type TraceMap = BTreeMap<SessionId, Vec<Trace>>;

/// Keystroke traces grouped by session
pub type KeystrokeTraceMap = BTreeMap<SessionId, Vec<KeystrokeTrace>>;

/// How far a trace has been taken through the kinematic pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStage {
    Raw,
    Differenced,
    Distance,
    Velocity,
    Acceleration,
    Jerkiness,
}

impl TraceStage {
    pub fn next(self) -> Option<TraceStage> {
        match self {
            TraceStage::Raw => Some(TraceStage::Differenced),
            TraceStage::Differenced => Some(TraceStage::Distance),
            TraceStage::Distance => Some(TraceStage::Velocity),
            TraceStage::Velocity => Some(TraceStage::Acceleration),
            TraceStage::Acceleration => Some(TraceStage::Jerkiness),
            TraceStage::Jerkiness => None,
        }
    }
}

/// Derived per-row columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KinematicColumn {
    Dt,
    Dx,
    Dy,
    Distance,
    Velocity,
    Acceleration,
    Jerkiness,
}

impl KinematicColumn {
    /// Stage a trace must reach before this column exists
    pub fn required_stage(self) -> TraceStage {
        match self {
            KinematicColumn::Dt | KinematicColumn::Dx | KinematicColumn::Dy => {
                TraceStage::Differenced
            }
            KinematicColumn::Distance => TraceStage::Distance,
            KinematicColumn::Velocity => TraceStage::Velocity,
            KinematicColumn::Acceleration => TraceStage::Acceleration,
            KinematicColumn::Jerkiness => TraceStage::Jerkiness,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            KinematicColumn::Dt => "dt",
            KinematicColumn::Dx => "dx",
            KinematicColumn::Dy => "dy",
            KinematicColumn::Distance => "distance",
            KinematicColumn::Velocity => "velocity",
            KinematicColumn::Acceleration => "acceleration",
            KinematicColumn::Jerkiness => "jerkiness",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
struct Columns {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    dt: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    dx: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    dy: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    distance: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    velocity: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    acceleration: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    jerkiness: Vec<f64>,
}

/// A contiguous run of movement events from one session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    session_id: SessionId,
    /// Position of the first event within the sorted session
    start: usize,
    events: Vec<Event>,
    stage: TraceStage,
    #[serde(flatten)]
    columns: Columns,
}

impl Trace {
    /// Build a raw trace. `start` is the position of the first event within
    /// its timestamp-sorted session.
    pub fn new(session_id: impl Into<SessionId>, start: usize, events: Vec<Event>) -> Self {
        Self {
            session_id: session_id.into(),
            start,
            events,
            stage: TraceStage::Raw,
            columns: Columns::default(),
        }
    }

    /// Build a raw trace from events that form their own session
    pub fn from_events(events: Vec<Event>) -> Self {
        let session_id = events
            .first()
            .map(|e| e.session_id.clone())
            .unwrap_or_default();
        Self::new(session_id, 0, events)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn stage(&self) -> TraceStage {
        self.stage
    }

    /// Position of the first event within the sorted session
    pub fn start(&self) -> usize {
        self.start
    }

    /// Position of the event that follows this trace in the sorted session
    pub fn end(&self) -> usize {
        self.start + self.events.len()
    }

    pub fn points(&self) -> Vec<Point> {
        self.events.iter().map(Event::position).collect()
    }

    pub fn first_point(&self) -> Option<Point> {
        self.events.first().map(Event::position)
    }

    pub fn last_point(&self) -> Option<Point> {
        self.events.last().map(Event::position)
    }

    pub fn timestamps(&self) -> Vec<f64> {
        self.events.iter().map(|e| e.time_stamp).collect()
    }

    /// A derived column, or `None` if the trace has not reached its stage
    pub fn column(&self, column: KinematicColumn) -> Option<&[f64]> {
        if self.stage < column.required_stage() {
            return None;
        }
        let values = match column {
            KinematicColumn::Dt => &self.columns.dt,
            KinematicColumn::Dx => &self.columns.dx,
            KinematicColumn::Dy => &self.columns.dy,
            KinematicColumn::Distance => &self.columns.distance,
            KinematicColumn::Velocity => &self.columns.velocity,
            KinematicColumn::Acceleration => &self.columns.acceleration,
            KinematicColumn::Jerkiness => &self.columns.jerkiness,
        };
        Some(values.as_slice())
    }

    /// Take the trace to `target`, computing only the stages it lacks.
    /// A trace already at or past `target` is returned unchanged.
    pub fn advance_to(mut self, target: TraceStage) -> Self {
        while self.stage < target {
            self.step();
        }
        self
    }

    /// Borrowing form of [`Trace::advance_to`]
    pub fn advanced(&self, target: TraceStage) -> Trace {
        self.clone().advance_to(target)
    }

    fn step(&mut self) {
        let columns = &mut self.columns;
        match self.stage {
            TraceStage::Raw => {
                let differences = difference(&self.events);
                columns.dt = differences.dt;
                columns.dx = differences.dx;
                columns.dy = differences.dy;
            }
            TraceStage::Differenced => {
                columns.distance = euclidean(&columns.dx, &columns.dy);
            }
            TraceStage::Distance => {
                columns.velocity = divide_by_dt(&columns.distance, &columns.dt);
            }
            TraceStage::Velocity => {
                columns.acceleration =
                    divide_by_dt(&first_difference(&columns.velocity), &columns.dt);
            }
            TraceStage::Acceleration => {
                columns.jerkiness =
                    divide_by_dt(&first_difference(&columns.acceleration), &columns.dt);
            }
            TraceStage::Jerkiness => return,
        }
        if let Some(next) = self.stage.next() {
            self.stage = next;
        }
    }
}

/// A contiguous run of keyboard events from one session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeystrokeTrace {
    session_id: SessionId,
    start: usize,
    events: Vec<Event>,
}

impl KeystrokeTrace {
    pub fn new(session_id: impl Into<SessionId>, start: usize, events: Vec<Event>) -> Self {
        Self {
            session_id: session_id.into(),
            start,
            events,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Advance every trace of every session to `target`
pub fn advance_all(traces: &TraceMap, target: TraceStage) -> TraceMap {
    traces
        .iter()
        .map(|(session_id, list)| {
            let advanced = list.iter().map(|t| t.advanced(target)).collect();
            (session_id.clone(), advanced)
        })
        .collect()
}

/// Total number of traces across sessions
pub fn trace_count(traces: &TraceMap) -> usize {
    traces.values().map(Vec::len).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventType;
    use pretty_assertions::assert_eq;

    fn line_trace() -> Trace {
        let events = [(0.0, 0.0), (100.0, 10.0), (200.0, 20.0), (300.0, 20.0), (400.0, 30.0)]
            .iter()
            .map(|&(t, x)| Event::new("A", EventType::MouseMove, t, x, 0.0))
            .collect();
        Trace::new("A", 0, events)
    }

    #[test]
    fn test_stage_ordering() {
        assert!(TraceStage::Raw < TraceStage::Differenced);
        assert!(TraceStage::Velocity < TraceStage::Jerkiness);
        assert_eq!(TraceStage::Jerkiness.next(), None);
    }

    #[test]
    fn test_columns_gated_by_stage() {
        let trace = line_trace();
        assert_eq!(trace.column(KinematicColumn::Dt), None);

        let trace = trace.advance_to(TraceStage::Distance);
        assert_eq!(trace.stage(), TraceStage::Distance);
        assert_eq!(
            trace.column(KinematicColumn::Distance),
            Some(&[0.0, 10.0, 10.0, 0.0, 10.0][..])
        );
        assert_eq!(trace.column(KinematicColumn::Velocity), None);
    }

    #[test]
    fn test_advance_is_idempotent() {
        let once = line_trace().advance_to(TraceStage::Jerkiness);
        let twice = once.clone().advance_to(TraceStage::Jerkiness);
        assert_eq!(once, twice);

        let lower = once.clone().advance_to(TraceStage::Velocity);
        assert_eq!(lower.stage(), TraceStage::Jerkiness);
    }

    #[test]
    fn test_first_row_zero_for_every_column() {
        let trace = line_trace().advance_to(TraceStage::Jerkiness);
        for column in [
            KinematicColumn::Dt,
            KinematicColumn::Dx,
            KinematicColumn::Dy,
            KinematicColumn::Distance,
            KinematicColumn::Velocity,
            KinematicColumn::Acceleration,
            KinematicColumn::Jerkiness,
        ] {
            let values = trace.column(column).unwrap();
            assert_eq!(values[0], 0.0, "first row of {}", column.as_str());
        }
    }

    #[test]
    fn test_span_positions() {
        let trace = Trace::new("A", 3, line_trace().into_events());
        assert_eq!(trace.start(), 3);
        assert_eq!(trace.end(), 8);
    }
}
