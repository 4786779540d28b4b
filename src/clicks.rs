//! Click gesture analysis
//!
//! A press/release bracket is tracked by a two-state machine over the raw,
//! timestamp-sorted session (not over movement traces, which never contain
//! the press and release themselves). While the button is held, mouse-move
//! events add their step length to an accumulator; the release adds the final
//! step. A bracket whose accumulated motion reaches the threshold is a click
//! slip. A press that is never released is dropped without a record.

use crate::event_log::EventLog;
use crate::types::{Event, EventType, Point, SessionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Outcome of one completed press/release bracket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClickSlipRecord {
    pub pressed_at: f64,
    pub released_at: f64,
    /// Path length travelled while the button was held
    pub distance: f64,
    pub slip: bool,
}

/// Per-session click slip summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClickSlipSummary {
    pub click_slips: usize,
    /// Completed press/release brackets
    pub gestures: usize,
    /// Accumulated distance of each slip, in order
    pub distances: Vec<f64>,
    pub longest_click_slip: f64,
    pub shortest_click_slip: f64,
    /// Slips per completed gesture
    pub average_click_slip: f64,
    pub average_click_slip_distance: f64,
}

impl ClickSlipSummary {
    pub fn from_records(records: &[ClickSlipRecord]) -> Self {
        let distances: Vec<f64> = records.iter().filter(|r| r.slip).map(|r| r.distance).collect();
        if distances.is_empty() {
            return Self {
                gestures: records.len(),
                ..Self::default()
            };
        }
        let slips = distances.len();
        Self {
            click_slips: slips,
            gestures: records.len(),
            longest_click_slip: distances.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            shortest_click_slip: distances.iter().copied().fold(f64::INFINITY, f64::min),
            average_click_slip: slips as f64 / records.len() as f64,
            average_click_slip_distance: distances.iter().sum::<f64>() / slips as f64,
            distances,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum GestureState {
    Idle,
    Pressed {
        pressed_at: f64,
        last: Point,
        accumulated: f64,
    },
}

/// Press/release state machine for one session
#[derive(Debug, Clone)]
pub struct ClickGestureMachine {
    threshold: f64,
    state: GestureState,
}

impl ClickGestureMachine {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            state: GestureState::Idle,
        }
    }

    pub fn is_pressed(&self) -> bool {
        matches!(self.state, GestureState::Pressed { .. })
    }

    /// Feed the next event; returns a record when a bracket completes
    pub fn feed(&mut self, event: &Event) -> Option<ClickSlipRecord> {
        let position = event.position();
        match (event.event_type, self.state) {
            // a second press re-anchors the bracket
            (EventType::MouseDown, _) => {
                self.state = GestureState::Pressed {
                    pressed_at: event.time_stamp,
                    last: position,
                    accumulated: 0.0,
                };
                None
            }
            (
                EventType::MouseMove,
                GestureState::Pressed {
                    pressed_at,
                    last,
                    accumulated,
                },
            ) => {
                self.state = GestureState::Pressed {
                    pressed_at,
                    last: position,
                    accumulated: accumulated + last.distance_to(&position),
                };
                None
            }
            (
                EventType::MouseUp,
                GestureState::Pressed {
                    pressed_at,
                    last,
                    accumulated,
                },
            ) => {
                self.state = GestureState::Idle;
                let distance = accumulated + last.distance_to(&position);
                Some(ClickSlipRecord {
                    pressed_at,
                    released_at: event.time_stamp,
                    distance,
                    slip: distance >= self.threshold,
                })
            }
            _ => None,
        }
    }
}

/// Completed brackets of one timestamp-sorted session
pub fn click_slip_records(sorted: &[Event], threshold: f64) -> Vec<ClickSlipRecord> {
    let mut machine = ClickGestureMachine::new(threshold);
    let records: Vec<ClickSlipRecord> = sorted.iter().filter_map(|e| machine.feed(e)).collect();
    if machine.is_pressed() {
        debug!("abandoning press without release at end of session");
    }
    records
}

/// Click slip summary for every session
pub fn click_slips(log: &EventLog, threshold: f64) -> BTreeMap<SessionId, ClickSlipSummary> {
    log.sorted_sessions()
        .into_iter()
        .map(|(session_id, events)| {
            let records = click_slip_records(&events, threshold);
            (session_id, ClickSlipSummary::from_records(&records))
        })
        .collect()
}

/// Number of click events per session
pub fn number_of_clicks(log: &EventLog) -> BTreeMap<SessionId, usize> {
    let mut counts: BTreeMap<SessionId, usize> = log
        .session_ids()
        .into_iter()
        .map(|id| (id, 0))
        .collect();
    for event in log.events() {
        if event.event_type == EventType::Click {
            *counts.entry(event.session_id.clone()).or_default() += 1;
        }
    }
    counts
}
