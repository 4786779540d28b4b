//! WIB Flux - Web interaction analysis for HCI research
//!
//! Flux turns raw browser interaction logs (mouse, touch and keyboard events
//! recorded per session) into behavioral metrics through a deterministic
//! pipeline: parsing → differencing → trace segmentation → kinematics →
//! deviation, pause, click and keyboard analysis → report encoding.
//!
//! ## Modules
//!
//! - **Segmentation**: Split sessions into movement and keystroke traces
//! - **Analysis**: Kinematics, deviation, timing, click gestures, keyboard and patterns
//! - **Pipeline**: `Analyzer` runs everything and produces per-session reports

pub mod clicks;
pub mod config;
pub mod deviation;
pub mod differencer;
pub mod error;
pub mod event_log;
pub mod keyboard;
pub mod kinematics;
pub mod metrics;
pub mod patterns;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod segmentation;
pub mod timing;
pub mod trace;
pub mod types;

pub use config::AnalysisConfig;
pub use error::ComputeError;
pub use event_log::EventLog;
pub use pipeline::{events_to_report, Analyzer};
pub use report::{AnalysisReport, ReportEncoder, SessionReport};
pub use trace::{KeystrokeTrace, KeystrokeTraceMap, Trace, TraceMap, TraceStage};
pub use types::{ComputeMode, Event, EventType, SessionId};

// Schema exports
pub use schema::{EventLogAdapter, InputFormat};

/// Flux version embedded in all reports
pub const WIB_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "wib-flux";
