//! # FC Serial Links Library
//!
//! Serial link drivers for a flight controller's auxiliary devices.
//!
//! This library provides polling decoders for an engine control unit's
//! realtime data block (with fuel consumption estimation) and a companion
//! computer's target tracker, plus a watchdog that turns tracker confidence
//! into debounced flight mode change requests.

pub mod config;
pub mod error;
pub mod ecu;
pub mod tracker;
pub mod watchdog;
pub mod drivers;
pub mod serial;
pub mod telemetry;
