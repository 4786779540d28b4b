//! Tracker event-log schema
//!
//! This module defines the column layout emitted by the web interaction
//! tracker and the adapters that ingest CSV, NDJSON and JSON exports into a
//! typed `EventLog`.

mod adapter;
mod record;

pub use adapter::*;
pub use record::*;
