//! Pipeline orchestration
//!
//! This module provides the public API for WIB Flux. An `Analyzer` holds the
//! configuration plus an event log, pre-extracted traces, or both, and runs
//! every analysis over them:
//!
//! 1. Segmentation - session log into movement / keystroke traces
//! 2. Kinematics - distance, velocity, acceleration, jerkiness per trace
//! 3. Deviation, pauses, click gestures, keyboard and patterns
//! 4. ReportEncoder - per-session results into a report envelope
//!
//! Pre-extracted traces take precedence over segmenting the log. Operations
//! that need raw press/release or keyboard events require the log.

use crate::clicks::{self, ClickSlipSummary};
use crate::config::AnalysisConfig;
use crate::deviation::{self, AucRatioMetrics, DeviationAnalyzer, DeviationRecord, MadRecord};
use crate::differencer::{self, DifferencedSession};
use crate::error::ComputeError;
use crate::event_log::{check_session_timestamps, sort_by_time, EventLog};
use crate::keyboard::{self, TypingSpeedMetrics};
use crate::kinematics;
use crate::metrics::{summarize_column, summarize_values, ColumnFilter, Summary};
use crate::patterns::PatternDetector;
use crate::report::{KeyboardReport, QualityFlag, ReportEncoder, SessionReport};
use crate::schema::{EventLogAdapter, InputFormat};
use crate::segmentation;
use crate::timing::{self, PauseCount, PauseMetrics, PauseRecord};
use crate::trace::{KeystrokeTraceMap, KinematicColumn, TraceMap};
use crate::types::{ComputeMode, Event, SessionId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Parse an export and produce the full JSON report in one call.
///
/// # Example
/// ```ignore
/// let report_json = events_to_report(csv_text, InputFormat::Csv, &AnalysisConfig::default())?;
/// ```
pub fn events_to_report(
    input: &str,
    format: InputFormat,
    config: &AnalysisConfig,
) -> Result<String, ComputeError> {
    let log = EventLogAdapter::parse(input, format)?;
    let analyzer = Analyzer::new(config.clone())?.with_log(log)?;
    analyzer.analyze_to_json(&ReportEncoder::new())
}

/// Runs every analysis over an event log and/or pre-extracted traces
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: AnalysisConfig,
    mode: ComputeMode,
    log: Option<EventLog>,
    traces: Option<TraceMap>,
}

impl Analyzer {
    /// Create an analyzer after validating `config`
    pub fn new(config: AnalysisConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            config,
            mode: ComputeMode::PerTrace,
            log: None,
            traces: None,
        })
    }

    /// Attach an event log. Duplicate timestamps are warned about, or
    /// rejected when `strict_timestamps` is set.
    pub fn with_log(mut self, log: EventLog) -> Result<Self, ComputeError> {
        log.validate(self.config.strict_timestamps)?;
        info!(
            events = log.len(),
            sessions = log.session_ids().len(),
            "event log attached"
        );
        self.log = Some(log);
        Ok(self)
    }

    /// Attach pre-extracted movement traces. Each session's trace events
    /// get the same duplicate-timestamp check as a log.
    pub fn with_traces(mut self, traces: TraceMap) -> Result<Self, ComputeError> {
        for (session_id, list) in &traces {
            let mut events: Vec<Event> = list.iter().flat_map(|t| t.events().to_vec()).collect();
            sort_by_time(&mut events);
            check_session_timestamps(session_id, &events, self.config.strict_timestamps)?;
        }
        debug!(sessions = traces.len(), "traces attached");
        self.traces = Some(traces);
        Ok(self)
    }

    pub fn with_mode(mut self, mode: ComputeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn mode(&self) -> ComputeMode {
        self.mode
    }

    fn log(&self) -> Result<&EventLog, ComputeError> {
        self.log.as_ref().ok_or(ComputeError::MissingInput)
    }

    // ---------------------------------------------------------------------
    // Segmentation
    // ---------------------------------------------------------------------

    /// Movement traces: the attached ones, or segmented from the log
    pub fn traces(&self) -> Result<TraceMap, ComputeError> {
        match (&self.traces, &self.log) {
            (Some(traces), _) => Ok(traces.clone()),
            (None, Some(log)) => Ok(segmentation::movement_traces(log)),
            (None, None) => Err(ComputeError::MissingInput),
        }
    }

    /// Traces that end in a click, mouse-down or mouse-up. Attached traces
    /// are taken to be click-bounded already.
    pub fn click_bounded_traces(&self) -> Result<TraceMap, ComputeError> {
        match (&self.traces, &self.log) {
            (Some(traces), _) => Ok(traces.clone()),
            (None, Some(log)) => Ok(segmentation::click_bounded_traces(log)),
            (None, None) => Err(ComputeError::MissingInput),
        }
    }

    /// Click-bounded traces with a single pause at their first transition
    pub fn click_bounded_traces_with_initial_pause(&self) -> Result<TraceMap, ComputeError> {
        let threshold = self.config.pause_threshold_ms;
        match (&self.traces, &self.log) {
            (Some(traces), _) => Ok(traces
                .iter()
                .map(|(session_id, list)| {
                    let kept = list
                        .iter()
                        .filter(|t| segmentation::has_initial_pause(t, threshold))
                        .cloned()
                        .collect();
                    (session_id.clone(), kept)
                })
                .collect()),
            (None, Some(log)) => Ok(segmentation::click_bounded_traces_with_initial_pause(
                log, threshold,
            )),
            (None, None) => Err(ComputeError::MissingInput),
        }
    }

    /// Keystroke traces; needs a log with keyboard columns
    pub fn keystroke_traces(&self) -> Result<KeystrokeTraceMap, ComputeError> {
        let log = self.log()?;
        log.require_keyboard_columns()?;
        Ok(segmentation::keystroke_traces(log))
    }

    /// Per-session first differences over the whole sorted session
    pub fn differences(&self) -> Result<BTreeMap<SessionId, DifferencedSession>, ComputeError> {
        Ok(differencer::difference_sessions(self.log()?))
    }

    // ---------------------------------------------------------------------
    // Kinematics
    // ---------------------------------------------------------------------

    pub fn path(&self) -> Result<TraceMap, ComputeError> {
        Ok(kinematics::path(&self.traces()?))
    }

    pub fn velocity(&self) -> Result<TraceMap, ComputeError> {
        Ok(kinematics::velocity(&self.traces()?))
    }

    pub fn acceleration(&self) -> Result<TraceMap, ComputeError> {
        Ok(kinematics::acceleration(&self.traces()?))
    }

    pub fn jerkiness(&self) -> Result<TraceMap, ComputeError> {
        Ok(kinematics::jerkiness(&self.traces()?))
    }

    pub fn velocity_metrics(&self) -> Result<BTreeMap<SessionId, Summary>, ComputeError> {
        Ok(kinematics::velocity_metrics(&self.traces()?))
    }

    pub fn acceleration_metrics(&self) -> Result<BTreeMap<SessionId, Summary>, ComputeError> {
        Ok(kinematics::acceleration_metrics(&self.traces()?))
    }

    pub fn jerkiness_metrics(&self) -> Result<BTreeMap<SessionId, Summary>, ComputeError> {
        Ok(kinematics::jerkiness_metrics(&self.traces()?))
    }

    /// Reduce any derived column per session
    pub fn summarize(
        &self,
        column: KinematicColumn,
        filter: ColumnFilter,
    ) -> Result<BTreeMap<SessionId, Summary>, ComputeError> {
        Ok(summarize_column(&self.traces()?, column, filter))
    }

    // ---------------------------------------------------------------------
    // Deviation
    // ---------------------------------------------------------------------

    pub fn deviation(&self) -> Result<BTreeMap<SessionId, Vec<DeviationRecord>>, ComputeError> {
        DeviationAnalyzer::from_config(&self.config).analyze_all(&self.traces()?)
    }

    pub fn auc_ratio_metrics(&self) -> Result<BTreeMap<SessionId, AucRatioMetrics>, ComputeError> {
        Ok(deviation::auc_ratio_metrics(&self.deviation()?))
    }

    pub fn mad(&self) -> Result<BTreeMap<SessionId, MadRecord>, ComputeError> {
        Ok(deviation::mad(&self.traces()?))
    }

    // ---------------------------------------------------------------------
    // Clicks
    // ---------------------------------------------------------------------

    pub fn click_slips(&self) -> Result<BTreeMap<SessionId, ClickSlipSummary>, ComputeError> {
        Ok(clicks::click_slips(self.log()?, self.config.click_slip_threshold))
    }

    pub fn number_of_clicks(&self) -> Result<BTreeMap<SessionId, usize>, ComputeError> {
        Ok(clicks::number_of_clicks(self.log()?))
    }

    // ---------------------------------------------------------------------
    // Timing
    // ---------------------------------------------------------------------

    /// Pause records per trace, per session
    pub fn pauses(&self) -> Result<BTreeMap<SessionId, Vec<Vec<PauseRecord>>>, ComputeError> {
        let threshold = self.config.pause_threshold_ms;
        Ok(self
            .traces()?
            .iter()
            .map(|(session_id, list)| {
                let per_trace = list
                    .iter()
                    .map(|t| timing::trace_pauses(t, threshold))
                    .collect();
                (session_id.clone(), per_trace)
            })
            .collect())
    }

    pub fn num_pauses(&self) -> Result<BTreeMap<SessionId, PauseCount>, ComputeError> {
        Ok(timing::num_pauses(&self.traces()?, self.config.pause_threshold_ms))
    }

    pub fn pause_metrics(&self) -> Result<BTreeMap<SessionId, PauseMetrics>, ComputeError> {
        Ok(timing::pause_metrics(&self.traces()?, self.config.pause_threshold_ms))
    }

    pub fn execution_time(&self) -> Result<BTreeMap<SessionId, f64>, ComputeError> {
        Ok(timing::execution_time(self.log()?))
    }

    pub fn movement_time(&self) -> Result<BTreeMap<SessionId, f64>, ComputeError> {
        Ok(timing::movement_time(&self.traces()?))
    }

    // ---------------------------------------------------------------------
    // Keyboard
    // ---------------------------------------------------------------------

    pub fn typing_durations(&self) -> Result<BTreeMap<SessionId, Vec<f64>>, ComputeError> {
        self.mode.ensure_per_trace("typing_durations")?;
        Ok(keyboard::typing_durations(&self.keystroke_traces()?))
    }

    pub fn typing_speed(&self) -> Result<BTreeMap<SessionId, Vec<f64>>, ComputeError> {
        self.mode.ensure_per_trace("typing_speed")?;
        Ok(keyboard::typing_speed(&self.keystroke_traces()?))
    }

    pub fn typing_speed_metrics(
        &self,
    ) -> Result<BTreeMap<SessionId, TypingSpeedMetrics>, ComputeError> {
        self.mode.ensure_per_trace("typing_speed_metrics")?;
        Ok(keyboard::typing_speed_metrics(&self.keystroke_traces()?))
    }

    pub fn backspace_usage(&self) -> Result<BTreeMap<SessionId, usize>, ComputeError> {
        self.mode.ensure_per_trace("backspace_usage")?;
        Ok(keyboard::backspace_usage(
            &self.keystroke_traces()?,
            &self.config.backspace_key_codes,
        ))
    }

    // ---------------------------------------------------------------------
    // Patterns
    // ---------------------------------------------------------------------

    pub fn straight_patterns(&self) -> Result<TraceMap, ComputeError> {
        self.mode.ensure_per_trace("straight_patterns")?;
        PatternDetector::from_config(&self.config)
            .straight_patterns(&self.click_bounded_traces_with_initial_pause()?)
    }

    pub fn hesitation_patterns(&self) -> Result<TraceMap, ComputeError> {
        self.mode.ensure_per_trace("hesitation_patterns")?;
        Ok(PatternDetector::from_config(&self.config)
            .hesitation_patterns(&self.click_bounded_traces()?))
    }

    // ---------------------------------------------------------------------
    // Full report
    // ---------------------------------------------------------------------

    /// Every metric for every session.
    ///
    /// Without a log, session-wide figures (execution time, clicks) are
    /// taken from the events inside the attached traces.
    pub fn analyze(&self) -> Result<BTreeMap<SessionId, SessionReport>, ComputeError> {
        let traces = self.traces()?;
        let log = match &self.log {
            Some(log) => log.clone(),
            None => EventLog::new(
                traces
                    .values()
                    .flatten()
                    .flat_map(|t| t.events().to_vec())
                    .collect(),
            ),
        };

        let threshold = self.config.pause_threshold_ms;
        let jerk_traces = kinematics::jerkiness(&traces);
        let velocity = summarize_column(&jerk_traces, KinematicColumn::Velocity, ColumnFilter::Positive);
        let acceleration =
            summarize_column(&jerk_traces, KinematicColumn::Acceleration, ColumnFilter::NonZero);
        let jerkiness =
            summarize_column(&jerk_traces, KinematicColumn::Jerkiness, ColumnFilter::NonZero);
        let deviation = deviation::auc_ratio_metrics(
            &DeviationAnalyzer::from_config(&self.config).analyze_all(&traces)?,
        );
        let mad = deviation::mad(&traces);
        let pauses = timing::pause_metrics(&traces, threshold);
        let movement_time = timing::movement_time(&traces);
        let execution_time = timing::execution_time(&log);
        let click_counts = clicks::number_of_clicks(&log);
        let slips = clicks::click_slips(&log, self.config.click_slip_threshold);
        let keyboard = self.keyboard_reports(&log)?;
        let duplicates: BTreeSet<SessionId> =
            log.sessions_with_duplicate_timestamps().into_iter().collect();
        let sorted = log.sorted_sessions();

        let session_ids: BTreeSet<SessionId> =
            sorted.keys().chain(traces.keys()).cloned().collect();

        let mut reports = BTreeMap::new();
        for session_id in session_ids {
            let events = sorted.get(&session_id).map(Vec::as_slice).unwrap_or_default();
            let trace_count = traces.get(&session_id).map_or(0, Vec::len);

            let mut flags = Vec::new();
            if duplicates.contains(&session_id) {
                flags.push(QualityFlag::DuplicateTimestamps);
            }
            if events.iter().any(|e| e.time_stamp.is_nan()) {
                flags.push(QualityFlag::NonNumericTimestamps);
            }
            if trace_count == 0 {
                flags.push(QualityFlag::NoMovementTraces);
            }

            debug!(session_id = %session_id, traces = trace_count, "session analyzed");
            let report = SessionReport {
                session_id: session_id.clone(),
                event_count: events.len(),
                trace_count,
                execution_time_ms: execution_time.get(&session_id).copied().unwrap_or(0.0),
                movement_time_ms: movement_time.get(&session_id).copied().unwrap_or(0.0),
                velocity: velocity.get(&session_id).copied().unwrap_or_default(),
                acceleration: acceleration.get(&session_id).copied().unwrap_or_default(),
                jerkiness: jerkiness.get(&session_id).copied().unwrap_or_default(),
                deviation: deviation.get(&session_id).copied().unwrap_or_default(),
                mad: mad.get(&session_id).copied().unwrap_or_default(),
                pauses: pauses.get(&session_id).cloned().unwrap_or_default(),
                clicks: click_counts.get(&session_id).copied().unwrap_or(0),
                click_slips: slips.get(&session_id).cloned().unwrap_or_default(),
                keyboard: keyboard.get(&session_id).cloned(),
                flags,
            };
            reports.insert(session_id, report);
        }

        info!(sessions = reports.len(), "analysis complete");
        Ok(reports)
    }

    /// Full report as pretty-printed JSON
    pub fn analyze_to_json(&self, encoder: &ReportEncoder) -> Result<String, ComputeError> {
        let sessions = self.analyze()?;
        encoder.encode_to_json(sessions, &self.config)
    }

    fn keyboard_reports(
        &self,
        log: &EventLog,
    ) -> Result<BTreeMap<SessionId, KeyboardReport>, ComputeError> {
        if self.log.is_none() || !log.has_keyboard_columns() {
            return Ok(BTreeMap::new());
        }
        self.mode.ensure_per_trace("keyboard analysis")?;

        let keystrokes = segmentation::keystroke_traces(log);
        let durations = summarize_values(&keyboard::typing_durations(&keystrokes), ColumnFilter::All);
        let typing = keyboard::typing_speed_metrics(&keystrokes);
        let backspaces = keyboard::backspace_usage(&keystrokes, &self.config.backspace_key_codes);

        Ok(keystrokes
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(session_id, list)| {
                let report = KeyboardReport {
                    keystroke_traces: list.len(),
                    keystroke_durations: durations.get(session_id).copied().unwrap_or_default(),
                    typing: typing.get(session_id).copied(),
                    backspaces: backspaces.get(session_id).copied().unwrap_or(0),
                };
                (session_id.clone(), report)
            })
            .collect())
    }
}
