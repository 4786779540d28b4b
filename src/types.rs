//! Interaction event types
//!
//! This module defines the closed set of event codes emitted by the web
//! tracker and the immutable `Event` rows that flow through the pipeline.

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};

/// Session identifier as carried in the `sessionId` column
pub type SessionId = String;

/// Interaction event types, stored on the wire as integer codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum EventType {
    MouseMove,
    Click,
    DoubleClick,
    MouseDown,
    MouseUp,
    Wheel,
    ContextMenu,
    TouchMove,
    WindowScroll,
    WindowResize,
    KeyDown,
    KeyPress,
    KeyUp,
    Focus,
    Blur,
    ChangeSelection,
    ClickSelection,
    InitTracking,
    TrackingEnd,
}

impl EventType {
    /// Wire code of this event type
    pub fn code(self) -> i64 {
        match self {
            EventType::MouseMove => 0,
            EventType::Click => 1,
            EventType::DoubleClick => 2,
            EventType::MouseDown => 3,
            EventType::MouseUp => 4,
            EventType::Wheel => 5,
            EventType::ContextMenu => 6,
            EventType::TouchMove => 7,
            EventType::WindowScroll => 11,
            EventType::WindowResize => 12,
            EventType::KeyDown => 13,
            EventType::KeyPress => 14,
            EventType::KeyUp => 15,
            EventType::Focus => 16,
            EventType::Blur => 17,
            EventType::ChangeSelection => 18,
            EventType::ClickSelection => 19,
            EventType::InitTracking => 100,
            EventType::TrackingEnd => 200,
        }
    }

    /// Resolve a wire code
    pub fn from_code(code: i64) -> Option<Self> {
        let event_type = match code {
            0 => EventType::MouseMove,
            1 => EventType::Click,
            2 => EventType::DoubleClick,
            3 => EventType::MouseDown,
            4 => EventType::MouseUp,
            5 => EventType::Wheel,
            6 => EventType::ContextMenu,
            7 => EventType::TouchMove,
            11 => EventType::WindowScroll,
            12 => EventType::WindowResize,
            13 => EventType::KeyDown,
            14 => EventType::KeyPress,
            15 => EventType::KeyUp,
            16 => EventType::Focus,
            17 => EventType::Blur,
            18 => EventType::ChangeSelection,
            19 => EventType::ClickSelection,
            100 => EventType::InitTracking,
            200 => EventType::TrackingEnd,
            _ => return None,
        };
        Some(event_type)
    }

    /// Pointer movement (mouse or touch)
    pub fn is_movement(self) -> bool {
        matches!(self, EventType::MouseMove | EventType::TouchMove)
    }

    /// Keyboard activity
    pub fn is_keystroke(self) -> bool {
        matches!(
            self,
            EventType::KeyDown | EventType::KeyPress | EventType::KeyUp
        )
    }

    /// Events that terminate a pointing gesture toward a target
    pub fn is_click_like(self) -> bool {
        matches!(
            self,
            EventType::Click | EventType::MouseDown | EventType::MouseUp
        )
    }
}

impl TryFrom<i64> for EventType {
    type Error = ComputeError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        EventType::from_code(code)
            .ok_or_else(|| ComputeError::ParseError(format!("Unknown event type code: {}", code)))
    }
}

impl From<EventType> for i64 {
    fn from(event_type: EventType) -> Self {
        event_type.code()
    }
}

/// Whether an analyzer works trace by trace or over a whole session at once
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeMode {
    #[default]
    PerTrace,
    WholeSession,
}

impl ComputeMode {
    /// Only per-trace computation is available
    pub fn ensure_per_trace(self, operation: &str) -> Result<(), ComputeError> {
        match self {
            ComputeMode::PerTrace => Ok(()),
            ComputeMode::WholeSession => Err(ComputeError::NotImplemented(format!(
                "{} without traces",
                operation
            ))),
        }
    }
}

/// A point in screen coordinates (pixels)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// A single interaction event (one row of the event log)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Session this event belongs to
    pub session_id: SessionId,
    /// Event type
    pub event_type: EventType,
    /// Epoch milliseconds. `NaN` when the source value was not numeric.
    pub time_stamp: f64,
    /// Horizontal position (0 for non-pointer events)
    pub x: f64,
    /// Vertical position (0 for non-pointer events)
    pub y: f64,
    /// Target element identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    /// Key value for keyboard events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_value: Option<String>,
    /// Key code for keyboard events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_code: Option<i64>,
}

impl Event {
    /// Create a pointer-style event without keyboard data
    pub fn new(
        session_id: impl Into<SessionId>,
        event_type: EventType,
        time_stamp: f64,
        x: f64,
        y: f64,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            event_type,
            time_stamp,
            x,
            y,
            element_id: None,
            key_value: None,
            key_code: None,
        }
    }

    /// Create a keyboard event
    pub fn key(
        session_id: impl Into<SessionId>,
        event_type: EventType,
        time_stamp: f64,
        key_value: impl Into<String>,
        key_code: i64,
    ) -> Self {
        Self {
            key_value: Some(key_value.into()),
            key_code: Some(key_code),
            ..Self::new(session_id, event_type, time_stamp, 0.0, 0.0)
        }
    }

    /// Attach a target element identifier
    pub fn with_element_id(mut self, element_id: impl Into<String>) -> Self {
        self.element_id = Some(element_id.into());
        self
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_codes_round_trip() {
        for code in [0, 1, 2, 3, 4, 5, 6, 7, 11, 12, 13, 14, 15, 16, 17, 18, 19, 100, 200] {
            let event_type = EventType::from_code(code).unwrap();
            assert_eq!(event_type.code(), code);
        }
        assert!(EventType::from_code(8).is_none());
    }

    #[test]
    fn test_event_type_serializes_as_code() {
        let json = serde_json::to_string(&EventType::TouchMove).unwrap();
        assert_eq!(json, "7");

        let parsed: EventType = serde_json::from_str("13").unwrap();
        assert_eq!(parsed, EventType::KeyDown);

        assert!(serde_json::from_str::<EventType>("42").is_err());
    }

    #[test]
    fn test_classification() {
        assert!(EventType::MouseMove.is_movement());
        assert!(EventType::TouchMove.is_movement());
        assert!(!EventType::Click.is_movement());
        assert!(EventType::KeyPress.is_keystroke());
        assert!(EventType::MouseUp.is_click_like());
        assert!(!EventType::DoubleClick.is_click_like());
    }

    #[test]
    fn test_whole_session_mode_unsupported() {
        assert!(ComputeMode::default().ensure_per_trace("typing_speed").is_ok());
        match ComputeMode::WholeSession.ensure_per_trace("typing_speed") {
            Err(ComputeError::NotImplemented(msg)) => assert!(msg.contains("typing_speed")),
            other => panic!("expected not implemented, got {:?}", other),
        }
    }

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
    }
}
