//! First differences of time and position
//!
//! Every session is differenced independently over its timestamp-sorted
//! events. The first row of each session is seeded with 0 so later divisions
//! have a defined value there. Non-numeric timestamps (`NaN`) propagate into
//! `dt` instead of raising.

use crate::event_log::EventLog;
use crate::types::{Event, SessionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-row first differences of one event sequence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Differences {
    pub dt: Vec<f64>,
    pub dx: Vec<f64>,
    pub dy: Vec<f64>,
}

impl Differences {
    pub fn len(&self) -> usize {
        self.dt.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dt.is_empty()
    }
}

/// A session's sorted events together with their differences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifferencedSession {
    pub events: Vec<Event>,
    pub differences: Differences,
}

/// First difference of a column, first row 0
pub fn first_difference(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    if values.is_empty() {
        return out;
    }
    out.push(0.0);
    out.extend(values.windows(2).map(|pair| pair[1] - pair[0]));
    out
}

/// Difference an already sorted event sequence
pub fn difference(events: &[Event]) -> Differences {
    let time: Vec<f64> = events.iter().map(|e| e.time_stamp).collect();
    let x: Vec<f64> = events.iter().map(|e| e.x).collect();
    let y: Vec<f64> = events.iter().map(|e| e.y).collect();
    Differences {
        dt: first_difference(&time),
        dx: first_difference(&x),
        dy: first_difference(&y),
    }
}

/// Difference every session of a log
pub fn difference_sessions(log: &EventLog) -> BTreeMap<SessionId, DifferencedSession> {
    log.sorted_sessions()
        .into_iter()
        .map(|(session_id, events)| {
            let differences = difference(&events);
            (
                session_id,
                DifferencedSession {
                    events,
                    differences,
                },
            )
        })
        .collect()
}
