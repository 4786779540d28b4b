//! Adapter for turning tracker exports into an `EventLog`
//!
//! Three encodings are accepted: CSV with a header row, NDJSON (one object
//! per line) and a JSON array of objects. All of them run the same
//! required-column check before any row is coerced.

use crate::error::ComputeError;
use crate::event_log::EventLog;
use crate::schema::record::*;
use crate::types::SessionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

/// Supported input encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputFormat {
    Csv,
    Ndjson,
    Json,
}

/// Adapter for converting tracker exports to an event log
pub struct EventLogAdapter;

impl EventLogAdapter {
    /// Parse input in the given encoding
    pub fn parse(input: &str, format: InputFormat) -> Result<EventLog, ComputeError> {
        match format {
            InputFormat::Csv => Self::parse_csv(input),
            InputFormat::Ndjson => Self::parse_ndjson(input),
            InputFormat::Json => Self::parse_array(input),
        }
    }

    /// Parse CSV text with a header row
    pub fn parse_csv(csv_text: &str) -> Result<EventLog, ComputeError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(false)
            .from_reader(csv_text.as_bytes());

        let headers = reader.headers()?.clone();
        let columns: Vec<&str> = headers.iter().collect();
        if let Some(missing) = first_missing_required(columns.iter().copied()) {
            return Err(ComputeError::MissingColumn(missing.to_string()));
        }
        let missing_keyboard = first_missing_keyboard(columns.iter().copied());

        let mut events = Vec::new();
        for (idx, row) in reader.records().enumerate() {
            let row = row?;
            let record: RawRecord = headers
                .iter()
                .zip(row.iter())
                .map(|(column, cell)| (column.to_string(), Value::String(cell.to_string())))
                .collect();
            events.push(event_from_record(&record, idx + 1)?);
        }

        debug!(events = events.len(), "parsed CSV event log");
        Ok(EventLog::new(events).with_missing_keyboard_column(missing_keyboard))
    }

    /// Parse a JSON string containing an array of row objects
    pub fn parse_array(json: &str) -> Result<EventLog, ComputeError> {
        let records: Vec<RawRecord> = serde_json::from_str(json)?;
        Self::from_records(records)
    }

    /// Parse NDJSON (newline-delimited JSON) containing row objects
    pub fn parse_ndjson(ndjson: &str) -> Result<EventLog, ComputeError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<RawRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Self::from_records(records)
    }

    /// Build an event log from keyed records.
    ///
    /// Every record must carry every required column. Keyboard columns count
    /// as present when any record carries them.
    pub fn from_records(records: Vec<RawRecord>) -> Result<EventLog, ComputeError> {
        for record in &records {
            if let Some(missing) = first_missing_required(record.keys().map(String::as_str)) {
                return Err(ComputeError::MissingColumn(missing.to_string()));
            }
        }

        let seen: BTreeSet<&str> = records
            .iter()
            .flat_map(|r| r.keys().map(String::as_str))
            .collect();
        let missing_keyboard = if records.is_empty() {
            None
        } else {
            first_missing_keyboard(seen.iter().copied())
        };

        let events = records
            .iter()
            .enumerate()
            .map(|(idx, record)| event_from_record(record, idx + 1))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(events = events.len(), "parsed JSON event log");
        Ok(EventLog::new(events).with_missing_keyboard_column(missing_keyboard))
    }

    /// Summarize schema and integrity findings for a parsed log
    pub fn validate(log: &EventLog, strict: bool) -> ValidationReport {
        let duplicate_timestamp_sessions = log.sessions_with_duplicate_timestamps();
        let non_numeric_timestamps = log
            .events()
            .iter()
            .filter(|e| e.time_stamp.is_nan())
            .count();
        let error = log.validate(strict).err().map(|e| e.to_string());

        ValidationReport {
            valid: error.is_none(),
            events: log.len(),
            sessions: log.session_ids().len(),
            keyboard_columns: log.has_keyboard_columns(),
            duplicate_timestamp_sessions,
            non_numeric_timestamps,
            strict,
            error,
        }
    }
}

/// Outcome of validating an event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub events: usize,
    pub sessions: usize,
    pub keyboard_columns: bool,
    pub duplicate_timestamp_sessions: Vec<SessionId>,
    pub non_numeric_timestamps: usize,
    pub strict: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventType;
    use pretty_assertions::assert_eq;

    const CSV_LOG: &str = "\
sessionId,sceneId,eventType,elementId,timeStamp,x,y,keyValueEvent,keyCodeEvent
S1,home,0,,100,10,20,,
S1,home,0,,150,12,22,,
S1,home,1,btn,200,12,22,,
S2,home,13,input,\"1,000\",,,a,65
";

    #[test]
    fn test_parse_csv() {
        let log = EventLogAdapter::parse_csv(CSV_LOG).unwrap();
        assert_eq!(log.len(), 4);
        assert!(log.has_keyboard_columns());

        let events = log.events();
        assert_eq!(events[0].event_type, EventType::MouseMove);
        assert_eq!(events[2].element_id.as_deref(), Some("btn"));
        assert_eq!(events[3].time_stamp, 1000.0);
        assert_eq!(events[3].x, 0.0);
        assert_eq!(events[3].key_code, Some(65));
        assert_eq!(log.session_ids(), vec!["S1".to_string(), "S2".to_string()]);
    }

    #[test]
    fn test_csv_missing_required_column() {
        let csv = "sessionId,eventType,x,y\nS1,0,1,1\n";
        match EventLogAdapter::parse_csv(csv) {
            Err(ComputeError::MissingColumn(col)) => assert_eq!(col, "timeStamp"),
            other => panic!("expected missing column, got {:?}", other),
        }
    }

    #[test]
    fn test_csv_without_keyboard_columns() {
        let csv = "sessionId,eventType,timeStamp,x,y\nS1,0,1,1,1\n";
        let log = EventLogAdapter::parse_csv(csv).unwrap();
        assert!(!log.has_keyboard_columns());
        match log.require_keyboard_columns() {
            Err(ComputeError::MissingColumn(col)) => assert_eq!(col, "keyValueEvent"),
            other => panic!("expected missing column, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_ndjson() {
        let ndjson = r#"{"sessionId":"S1","eventType":0,"timeStamp":0,"x":0,"y":0}

{"sessionId":"S1","eventType":3,"timeStamp":"50","x":1,"y":0}"#;
        let log = EventLogAdapter::parse_ndjson(ndjson).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log.events()[1].event_type, EventType::MouseDown);
        assert!(!log.has_keyboard_columns());
    }

    #[test]
    fn test_ndjson_reports_line_number() {
        let ndjson = "{\"sessionId\":\"S1\",\"eventType\":0,\"timeStamp\":0,\"x\":0,\"y\":0}\nnot json\n";
        match EventLogAdapter::parse_ndjson(ndjson) {
            Err(ComputeError::ParseError(msg)) => assert!(msg.contains("line 2")),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_array_record_missing_key() {
        let json = r#"[
            {"sessionId":"S1","eventType":0,"timeStamp":0,"x":0,"y":0},
            {"sessionId":"S1","eventType":0,"timeStamp":10,"x":0}
        ]"#;
        match EventLogAdapter::parse_array(json) {
            Err(ComputeError::MissingColumn(col)) => assert_eq!(col, "y"),
            other => panic!("expected missing column, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_report() {
        let csv = "sessionId,eventType,timeStamp,x,y\nS1,0,10,1,1\nS1,0,10,2,2\nS1,0,oops,3,3\n";
        let log = EventLogAdapter::parse_csv(csv).unwrap();

        let lenient = EventLogAdapter::validate(&log, false);
        assert!(lenient.valid);
        assert_eq!(lenient.duplicate_timestamp_sessions, vec!["S1".to_string()]);
        assert_eq!(lenient.non_numeric_timestamps, 1);

        let strict = EventLogAdapter::validate(&log, true);
        assert!(!strict.valid);
        assert_eq!(
            strict.error.as_deref(),
            Some("Duplicate timestamps found in session S1")
        );
    }
}
