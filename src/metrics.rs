//! Per-session reductions
//!
//! Reduces any per-trace column to `{mean, max, min}` over the concatenation
//! of a session's traces, after an optional row filter. An empty selection
//! reduces to zeros.

use crate::trace::{KinematicColumn, TraceMap};
use crate::types::SessionId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mean, maximum and minimum of a set of values
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub mean: f64,
    pub max: f64,
    pub min: f64,
}

impl Summary {
    /// Reduce finite values; zeros when nothing remains
    pub fn of<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut max = f64::NEG_INFINITY;
        let mut min = f64::INFINITY;
        for value in values.into_iter().filter(|v| v.is_finite()) {
            count += 1;
            sum += value;
            max = max.max(value);
            min = min.min(value);
        }
        if count == 0 {
            return Summary::default();
        }
        Summary {
            mean: sum / count as f64,
            max,
            min,
        }
    }
}

/// Row filter applied before reduction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnFilter {
    All,
    /// Keep rows `> 0`
    Positive,
    /// Keep rows `!= 0`; drops undefined first-row derivatives
    NonZero,
}

impl ColumnFilter {
    pub fn keep(self, value: f64) -> bool {
        match self {
            ColumnFilter::All => true,
            ColumnFilter::Positive => value > 0.0,
            ColumnFilter::NonZero => value != 0.0,
        }
    }
}

/// Arithmetic mean, 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Summarize one column per session. Traces that have not reached the
/// column's stage are advanced on a copy first.
pub fn summarize_column(
    traces: &TraceMap,
    column: KinematicColumn,
    filter: ColumnFilter,
) -> BTreeMap<SessionId, Summary> {
    traces
        .iter()
        .map(|(session_id, list)| {
            let mut values = Vec::new();
            for trace in list {
                let advanced;
                let rows = match trace.column(column) {
                    Some(rows) => rows,
                    None => {
                        advanced = trace.advanced(column.required_stage());
                        advanced.column(column).unwrap_or_default()
                    }
                };
                values.extend(rows.iter().copied().filter(|v| filter.keep(*v)));
            }
            (session_id.clone(), Summary::of(values))
        })
        .collect()
}

/// Summarize arbitrary per-session values
pub fn summarize_values(
    values: &BTreeMap<SessionId, Vec<f64>>,
    filter: ColumnFilter,
) -> BTreeMap<SessionId, Summary> {
    values
        .iter()
        .map(|(session_id, list)| {
            let kept = list.iter().copied().filter(|v| filter.keep(*v));
            (session_id.clone(), Summary::of(kept))
        })
        .collect()
}
