//! Tracker column layout and raw-record coercion
//!
//! Rows arrive keyed by the tracker's column names. Values are loosely typed
//! (CSV cells are strings, JSON cells may be numbers or strings), so every
//! field goes through a coercion rule before it becomes part of an `Event`:
//!
//! - `timeStamp`: numbers or numeric strings; thousands separators are
//!   stripped; anything else becomes `NaN`
//! - `x` / `y`: numbers or numeric strings; anything else becomes `0.0`
//! - `eventType`: must be one of the known integer codes
//! - keyboard and element fields: optional, blank means absent

use crate::error::ComputeError;
use crate::types::{Event, EventType};
use serde_json::Value;
use std::collections::BTreeMap;

pub const SESSION_ID: &str = "sessionId";
pub const SCENE_ID: &str = "sceneId";
pub const EVENT_TYPE: &str = "eventType";
pub const ELEMENT_ID: &str = "elementId";
pub const TIME_STAMP: &str = "timeStamp";
pub const X: &str = "x";
pub const Y: &str = "y";
pub const KEY_VALUE_EVENT: &str = "keyValueEvent";
pub const KEY_CODE_EVENT: &str = "keyCodeEvent";

/// Columns every event log must carry, in reporting order
pub const REQUIRED_COLUMNS: [&str; 5] = [SESSION_ID, EVENT_TYPE, TIME_STAMP, X, Y];

/// Columns keyboard analytics additionally need
pub const KEYBOARD_COLUMNS: [&str; 2] = [KEY_VALUE_EVENT, KEY_CODE_EVENT];

/// One input row keyed by column name
pub type RawRecord = BTreeMap<String, Value>;

/// First required column absent from `columns`
pub fn first_missing_required<'a, I>(columns: I) -> Option<&'static str>
where
    I: IntoIterator<Item = &'a str> + Clone,
{
    REQUIRED_COLUMNS
        .iter()
        .copied()
        .find(|required| !columns.clone().into_iter().any(|c| c == *required))
}

/// First keyboard column absent from `columns`
pub fn first_missing_keyboard<'a, I>(columns: I) -> Option<&'static str>
where
    I: IntoIterator<Item = &'a str> + Clone,
{
    KEYBOARD_COLUMNS
        .iter()
        .copied()
        .find(|required| !columns.clone().into_iter().any(|c| c == *required))
}

/// Coerce a timestamp cell. Non-numeric input yields `NaN`.
pub fn coerce_time_stamp(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => s
            .replace(',', "")
            .trim()
            .parse::<f64>()
            .unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// Coerce a coordinate cell. Non-numeric input yields the `0.0` sentinel.
pub fn coerce_coordinate(value: Option<&Value>) -> f64 {
    let coerced = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match coerced {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Resolve an event type cell to a known code
pub fn coerce_event_type(value: Option<&Value>) -> Result<EventType, ComputeError> {
    let code = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            trimmed.parse::<i64>().ok().or_else(|| {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        }
        _ => None,
    };
    match code {
        Some(code) => EventType::try_from(code),
        None => Err(ComputeError::ParseError(format!(
            "Invalid {} value: {}",
            EVENT_TYPE,
            value.map(Value::to_string).unwrap_or_default()
        ))),
    }
}

/// Optional text cell. Null and blank cells are absent.
pub fn coerce_text(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    }
}

/// Key value cell. Whitespace is a real key, so only empty cells are absent.
pub fn coerce_key_value(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        other => coerce_text(other),
    }
}

/// Optional integer cell (key codes)
pub fn coerce_key_code(value: Option<&Value>) -> Option<i64> {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Build an event from a raw record.
///
/// `row` is the 1-based position of the record in its source and is only
/// used in error messages.
pub fn event_from_record(record: &RawRecord, row: usize) -> Result<Event, ComputeError> {
    let session_id = coerce_text(record.get(SESSION_ID)).ok_or_else(|| {
        ComputeError::ParseError(format!("Row {}: empty {}", row, SESSION_ID))
    })?;
    let event_type = coerce_event_type(record.get(EVENT_TYPE))
        .map_err(|e| ComputeError::ParseError(format!("Row {}: {}", row, e)))?;

    Ok(Event {
        session_id,
        event_type,
        time_stamp: coerce_time_stamp(record.get(TIME_STAMP)),
        x: coerce_coordinate(record.get(X)),
        y: coerce_coordinate(record.get(Y)),
        element_id: coerce_text(record.get(ELEMENT_ID)),
        key_value: coerce_key_value(record.get(KEY_VALUE_EVENT)),
        key_code: coerce_key_code(record.get(KEY_CODE_EVENT)),
    })
}
