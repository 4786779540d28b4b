//! Validated event log
//!
//! The event log is the immutable input to every analyzer. It remembers which
//! optional columns the source carried so keyboard flows can fail fast.

use crate::error::ComputeError;
use crate::types::{Event, SessionId};
use std::collections::BTreeMap;
use tracing::warn;

/// An ordered collection of events across one or more sessions
#[derive(Debug, Clone, PartialEq)]
pub struct EventLog {
    events: Vec<Event>,
    missing_keyboard_column: Option<&'static str>,
}

impl EventLog {
    /// Build a log from typed events. Typed events always carry the keyboard
    /// fields, so keyboard flows are available.
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events,
            missing_keyboard_column: None,
        }
    }

    /// Record the first keyboard column the source lacked
    pub fn with_missing_keyboard_column(mut self, column: Option<&'static str>) -> Self {
        self.missing_keyboard_column = column;
        self
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

    pub fn has_keyboard_columns(&self) -> bool {
        self.missing_keyboard_column.is_none()
    }

    /// Fail with a schema error unless keyboard columns are present
    pub fn require_keyboard_columns(&self) -> Result<(), ComputeError> {
        match self.missing_keyboard_column {
            None => Ok(()),
            Some(column) => Err(ComputeError::MissingColumn(column.to_string())),
        }
    }

    /// Distinct session ids in ascending order
    pub fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.events.iter().map(|e| e.session_id.clone()).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Events grouped by session, each group sorted by timestamp.
    ///
    /// The sort is stable, so rows sharing a timestamp keep their input order.
    /// Non-numeric (`NaN`) timestamps sort last.
    pub fn sorted_sessions(&self) -> BTreeMap<SessionId, Vec<Event>> {
        let mut sessions: BTreeMap<SessionId, Vec<Event>> = BTreeMap::new();
        for event in &self.events {
            sessions
                .entry(event.session_id.clone())
                .or_default()
                .push(event.clone());
        }
        for events in sessions.values_mut() {
            sort_by_time(events);
        }
        sessions
    }

    /// Sessions containing at least two events with the same timestamp
    pub fn sessions_with_duplicate_timestamps(&self) -> Vec<SessionId> {
        self.sorted_sessions()
            .into_iter()
            .filter(|(_, events)| has_duplicate_timestamps(events))
            .map(|(session_id, _)| session_id)
            .collect()
    }

    /// Check timestamp integrity.
    ///
    /// Duplicate timestamps within a session are logged as warnings, or
    /// rejected when `strict` is set.
    pub fn validate(&self, strict: bool) -> Result<(), ComputeError> {
        for (session_id, events) in self.sorted_sessions() {
            check_session_timestamps(&session_id, &events, strict)?;
        }
        Ok(())
    }
}

impl From<Vec<Event>> for EventLog {
    fn from(events: Vec<Event>) -> Self {
        EventLog::new(events)
    }
}

/// Stable sort by timestamp, `NaN` last
pub fn sort_by_time(events: &mut [Event]) {
    events.sort_by(|a, b| match (a.time_stamp.is_nan(), b.time_stamp.is_nan()) {
        (false, false) => a.time_stamp.total_cmp(&b.time_stamp),
        (a_nan, b_nan) => a_nan.cmp(&b_nan),
    });
}

/// Timestamp integrity check for one timestamp-sorted session: warns on
/// duplicates, or fails naming the session when `strict` is set.
pub fn check_session_timestamps(
    session_id: &str,
    sorted: &[Event],
    strict: bool,
) -> Result<(), ComputeError> {
    if !has_duplicate_timestamps(sorted) {
        return Ok(());
    }
    if strict {
        return Err(ComputeError::DuplicateTimestamps {
            session_id: session_id.to_string(),
        });
    }
    warn!(session_id, "Duplicate timestamps found in session {}", session_id);
    Ok(())
}

fn has_duplicate_timestamps(sorted: &[Event]) -> bool {
    sorted
        .windows(2)
        .any(|pair| pair[0].time_stamp == pair[1].time_stamp)
}
