//! # Telemetry Record Types
//!
//! Fixed-schema snapshots handed to the host's messaging layer and written
//! to the telemetry log.

use serde::Serialize;

use crate::ecu::fuel::FuelState;
use crate::ecu::protocol::EcuTelemetrySample;
use crate::tracker::protocol::TrackerFeedback;
use crate::watchdog::{FlightMode, ModeChangeRequest};

/// Engine telemetry message
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EcuReport {
    /// Coolant temperature, 0.1 deg F
    pub coolant: i16,
    pub rpm: u16,
    /// Barometric pressure, 0.1 kPa
    pub barometer: i16,
    /// Throttle position, 0.1 %
    pub tps: i16,
    /// Battery voltage, 0.1 V
    pub battery_voltage: i16,
    /// Litres per hour
    pub fuel_instant: f32,
    /// Litres
    pub fuel_consumed: f32,
    /// Litres, negative once the ledger is overdrawn
    pub fuel_remaining: f32,
    pub healthy: bool,
}

impl EcuReport {
    pub fn new(sample: &EcuTelemetrySample, fuel: &FuelState, healthy: bool) -> Self {
        Self {
            coolant: sample.coolant,
            rpm: sample.rpm,
            barometer: sample.barometer,
            tps: sample.tps,
            battery_voltage: sample.battery_voltage,
            fuel_instant: fuel.instantaneous_rate,
            fuel_consumed: fuel.consumed,
            fuel_remaining: fuel.remaining,
            healthy,
        }
    }
}

/// Tracker status message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrackerReport {
    pub confidence: u8,
    pub x0: u16,
    pub x1: u16,
    pub y0: u16,
    pub y1: u16,
}

impl TrackerReport {
    pub fn new(confidence: u8, feedback: &TrackerFeedback) -> Self {
        Self {
            confidence,
            x0: feedback.x0,
            x1: feedback.x1,
            y0: feedback.y0,
            y1: feedback.y1,
        }
    }
}

/// One telemetry log entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryRecord {
    Ecu(EcuReport),
    Tracker(TrackerReport),
    ModeChange(ModeChangeRequest<FlightMode>),
}
