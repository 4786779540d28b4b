//! Trace segmentation
//!
//! Each session is sorted by timestamp and cut into maximal runs of events of
//! one class. A run ends at the first event outside the class, so a trace
//! never spans a non-movement boundary. Movement runs shorter than two events
//! cannot carry a derivative and are dropped; keystroke runs keep singletons.
//!
//! The click-bounded variants look at the event that follows a movement run
//! by position in the sorted session, not by time, so duplicate timestamps
//! cannot reorder the boundary check.

use crate::event_log::{sort_by_time, EventLog};
use crate::trace::{KeystrokeTrace, KeystrokeTraceMap, KinematicColumn, Trace, TraceMap, TraceStage};
use crate::types::{Event, EventType};
use std::ops::Range;
use tracing::debug;

/// Maximal runs of events matching `is_member`, as positions into `events`
pub fn runs<F>(events: &[Event], is_member: F) -> Vec<Range<usize>>
where
    F: Fn(EventType) -> bool,
{
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    for (idx, event) in events.iter().enumerate() {
        match (is_member(event.event_type), start) {
            (true, None) => start = Some(idx),
            (false, Some(s)) => {
                out.push(s..idx);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push(s..events.len());
    }
    out
}

/// Movement traces of one timestamp-sorted session
pub fn segment_session(session_id: &str, sorted: &[Event]) -> Vec<Trace> {
    let mut traces = Vec::new();
    for run in runs(sorted, EventType::is_movement) {
        if run.len() < 2 {
            debug!(session_id, position = run.start, "discarding single-event movement run");
            continue;
        }
        traces.push(Trace::new(session_id, run.start, sorted[run].to_vec()));
    }
    traces
}

/// Keystroke traces of one timestamp-sorted session
pub fn segment_keystrokes(session_id: &str, sorted: &[Event]) -> Vec<KeystrokeTrace> {
    runs(sorted, EventType::is_keystroke)
        .into_iter()
        .map(|run| KeystrokeTrace::new(session_id, run.start, sorted[run].to_vec()))
        .collect()
}

/// Movement traces for every session of a log
pub fn movement_traces(log: &EventLog) -> TraceMap {
    log.sorted_sessions()
        .into_iter()
        .map(|(session_id, events)| {
            let traces = segment_session(&session_id, &events);
            debug!(session_id = %session_id, traces = traces.len(), "segmented session");
            (session_id, traces)
        })
        .collect()
}

/// Keystroke traces for every session of a log
pub fn keystroke_traces(log: &EventLog) -> KeystrokeTraceMap {
    log.sorted_sessions()
        .into_iter()
        .map(|(session_id, events)| {
            let traces = segment_keystrokes(&session_id, &events);
            (session_id, traces)
        })
        .collect()
}

/// Whether the event right after `trace` in its sorted session ends a
/// pointing gesture
pub fn is_click_bounded(trace: &Trace, sorted_session: &[Event]) -> bool {
    sorted_session
        .get(trace.end())
        .map(|next| next.event_type.is_click_like())
        .unwrap_or(false)
}

/// Whether the trace pauses exactly once, at its first transition
pub fn has_initial_pause(trace: &Trace, pause_threshold_ms: f64) -> bool {
    let differenced = trace.advanced(TraceStage::Differenced);
    let dt = differenced.column(KinematicColumn::Dt).unwrap_or_default();
    let mut pauses = dt
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, gap)| **gap > pause_threshold_ms)
        .map(|(idx, _)| idx);
    matches!((pauses.next(), pauses.next()), (Some(1), None))
}

/// Movement traces immediately followed by a click, mouse-down or mouse-up
pub fn click_bounded_traces(log: &EventLog) -> TraceMap {
    log.sorted_sessions()
        .into_iter()
        .map(|(session_id, events)| {
            let traces = segment_session(&session_id, &events)
                .into_iter()
                .filter(|trace| is_click_bounded(trace, &events))
                .collect();
            (session_id, traces)
        })
        .collect()
}

/// Click-bounded traces that hesitate once at the start and then move
/// without further pauses
pub fn click_bounded_traces_with_initial_pause(
    log: &EventLog,
    pause_threshold_ms: f64,
) -> TraceMap {
    click_bounded_traces(log)
        .into_iter()
        .map(|(session_id, traces)| {
            let kept = traces
                .into_iter()
                .filter(|trace| has_initial_pause(trace, pause_threshold_ms))
                .collect();
            (session_id, kept)
        })
        .collect()
}

/// Re-segment events that may arrive unsorted (e.g. a trace's own events)
pub fn resegment(events: &[Event]) -> Vec<Trace> {
    let mut sorted = events.to_vec();
    sort_by_time(&mut sorted);
    let session_id = sorted
        .first()
        .map(|e| e.session_id.clone())
        .unwrap_or_default();
    segment_session(&session_id, &sorted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ev(session: &str, event_type: EventType, t: f64, x: f64, y: f64) -> Event {
        Event::new(session, event_type, t, x, y)
    }

    fn mixed_log() -> EventLog {
        use EventType::*;
        EventLog::new(vec![
            ev("A", InitTracking, 0.0, 0.0, 0.0),
            ev("A", MouseMove, 10.0, 1.0, 1.0),
            ev("A", MouseMove, 20.0, 2.0, 2.0),
            ev("A", MouseMove, 30.0, 3.0, 3.0),
            ev("A", MouseDown, 40.0, 3.0, 3.0),
            ev("A", MouseUp, 45.0, 3.0, 3.0),
            ev("A", MouseMove, 50.0, 4.0, 4.0),
            ev("A", WindowScroll, 60.0, 0.0, 0.0),
            ev("A", TouchMove, 70.0, 5.0, 5.0),
            ev("A", TouchMove, 80.0, 6.0, 6.0),
            ev("A", KeyDown, 90.0, 0.0, 0.0),
            ev("A", MouseMove, 100.0, 7.0, 7.0),
            ev("A", MouseMove, 110.0, 8.0, 8.0),
        ])
    }

    #[test]
    fn test_single_uninterrupted_trace() {
        let log = EventLog::new(
            [(0.0, 0.0), (100.0, 10.0), (200.0, 20.0), (300.0, 20.0), (400.0, 30.0)]
                .iter()
                .map(|&(t, x)| ev("A", EventType::MouseMove, t, x, 0.0))
                .collect(),
        );
        let traces = movement_traces(&log);
        assert_eq!(traces["A"].len(), 1);
        assert_eq!(traces["A"][0].len(), 5);
    }

    #[test]
    fn test_traces_split_at_non_movement() {
        let traces = movement_traces(&mixed_log());
        let lengths: Vec<usize> = traces["A"].iter().map(Trace::len).collect();
        // the lone move at t=50 is dropped
        assert_eq!(lengths, vec![3, 2, 2]);
        assert_eq!(traces["A"][0].start(), 1);
        assert_eq!(traces["A"][1].start(), 8);
    }

    #[test]
    fn test_sorting_precedes_segmentation() {
        let log = EventLog::new(vec![
            ev("A", EventType::MouseMove, 30.0, 3.0, 0.0),
            ev("A", EventType::Click, 20.0, 0.0, 0.0),
            ev("A", EventType::MouseMove, 10.0, 1.0, 0.0),
            ev("A", EventType::MouseMove, 40.0, 4.0, 0.0),
        ]);
        let traces = movement_traces(&log);
        assert_eq!(traces["A"].len(), 1);
        assert_eq!(traces["A"][0].timestamps(), vec![30.0, 40.0]);
    }

    #[test]
    fn test_round_trip_reconstructs_movement_subsequence() {
        let log = EventLog::new(vec![
            ev("A", EventType::MouseMove, 0.0, 0.0, 0.0),
            ev("A", EventType::MouseMove, 10.0, 1.0, 0.0),
            ev("A", EventType::Click, 15.0, 1.0, 0.0),
            ev("A", EventType::MouseMove, 20.0, 2.0, 0.0),
            ev("A", EventType::TouchMove, 30.0, 3.0, 0.0),
            ev("A", EventType::KeyUp, 35.0, 0.0, 0.0),
            ev("A", EventType::MouseMove, 40.0, 2.0, 0.0),
            ev("A", EventType::MouseMove, 50.0, 2.0, 1.0),
        ]);
        let traces = movement_traces(&log);
        let mut rebuilt: Vec<Event> = traces["A"]
            .iter()
            .flat_map(|t| t.events().to_vec())
            .collect();
        sort_by_time(&mut rebuilt);

        let expected: Vec<Event> = log.sorted_sessions()["A"]
            .iter()
            .filter(|e| e.event_type.is_movement())
            .cloned()
            .collect();
        assert_eq!(rebuilt, expected);
    }

    #[test]
    fn test_resegmenting_a_trace_is_identity() {
        let traces = movement_traces(&mixed_log());
        for trace in &traces["A"] {
            let again = resegment(trace.events());
            assert_eq!(again.len(), 1);
            assert_eq!(again[0].events(), trace.events());
        }
    }

    #[test]
    fn test_keystroke_runs_keep_singletons() {
        let log = EventLog::new(vec![
            Event::key("K", EventType::KeyDown, 0.0, "a", 65),
            Event::key("K", EventType::KeyUp, 50.0, "a", 65),
            ev("K", EventType::MouseMove, 60.0, 1.0, 1.0),
            Event::key("K", EventType::KeyDown, 70.0, "b", 66),
        ]);
        let traces = keystroke_traces(&log);
        let lengths: Vec<usize> = traces["K"].iter().map(KeystrokeTrace::len).collect();
        assert_eq!(lengths, vec![2, 1]);
    }

    #[test]
    fn test_click_bounded_uses_position() {
        let traces = click_bounded_traces(&mixed_log());
        assert_eq!(traces["A"].len(), 1);
        assert_eq!(traces["A"][0].timestamps(), vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_click_bounded_with_duplicate_timestamp() {
        // the click shares the last move's timestamp and was logged after it
        let log = EventLog::new(vec![
            ev("A", EventType::MouseMove, 0.0, 0.0, 0.0),
            ev("A", EventType::MouseMove, 10.0, 5.0, 0.0),
            ev("A", EventType::Click, 10.0, 5.0, 0.0),
        ]);
        let traces = click_bounded_traces(&log);
        assert_eq!(traces["A"].len(), 1);
    }

    #[test]
    fn test_trace_at_session_end_is_not_click_bounded() {
        let log = EventLog::new(vec![
            ev("A", EventType::MouseMove, 0.0, 0.0, 0.0),
            ev("A", EventType::MouseMove, 10.0, 5.0, 0.0),
        ]);
        assert!(click_bounded_traces(&log)["A"].is_empty());
    }

    #[test]
    fn test_initial_pause_variant() {
        let log = EventLog::new(vec![
            // pause at the first transition only: kept
            ev("A", EventType::MouseMove, 0.0, 0.0, 0.0),
            ev("A", EventType::MouseMove, 300.0, 5.0, 0.0),
            ev("A", EventType::MouseMove, 320.0, 10.0, 0.0),
            ev("A", EventType::Click, 330.0, 10.0, 0.0),
            // pause later in the trace: dropped
            ev("A", EventType::MouseMove, 400.0, 0.0, 0.0),
            ev("A", EventType::MouseMove, 420.0, 5.0, 0.0),
            ev("A", EventType::MouseMove, 900.0, 10.0, 0.0),
            ev("A", EventType::Click, 910.0, 10.0, 0.0),
            // two pauses: dropped
            ev("A", EventType::MouseMove, 1000.0, 0.0, 0.0),
            ev("A", EventType::MouseMove, 1200.0, 5.0, 0.0),
            ev("A", EventType::MouseMove, 1400.0, 10.0, 0.0),
            ev("A", EventType::MouseUp, 1410.0, 10.0, 0.0),
        ]);
        let traces = click_bounded_traces_with_initial_pause(&log, 100.0);
        assert_eq!(traces["A"].len(), 1);
        assert_eq!(traces["A"][0].timestamps(), vec![0.0, 300.0, 320.0]);
    }
}
