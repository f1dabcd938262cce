//! # Telemetry Module
//!
//! Handles telemetry reports and logging to JSONL files with rotation.
//!
//! This module handles:
//! - Fixed-schema ECU and tracker reports for the host's messaging layer
//! - Formatting as JSONL (JSON Lines)
//! - Writing to rotating log files (max N records per file)
//! - Retaining only last M files

pub mod logger;
pub mod types;

pub use logger::TelemetryLogger;
pub use types::{EcuReport, TelemetryRecord, TrackerReport};
