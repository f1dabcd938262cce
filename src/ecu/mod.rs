//! # ECU Link Module
//!
//! Driver for the engine control unit's realtime data link.
//!
//! This module handles:
//! - Requesting and decoding the fixed 112-byte big-endian realtime block
//! - Link health from the size of each reply
//! - Fuel rate and consumption estimation from injector pulse width and RPM

pub mod protocol;
pub mod decoder;
pub mod fuel;

use crate::serial::port_trait::ByteSource;
use crate::telemetry::types::EcuReport;
use decoder::EcuDecoder;
use fuel::{FuelEstimator, FuelState};
use protocol::EcuTelemetrySample;

/// ECU decoder and the fuel estimator it feeds
#[derive(Debug)]
pub struct EcuDriver {
    decoder: EcuDecoder,
    fuel: FuelEstimator,
}

impl EcuDriver {
    /// Creates a driver around a fresh decoder
    #[must_use]
    pub fn new(fuel: FuelEstimator) -> Self {
        Self {
            decoder: EcuDecoder::new(),
            fuel,
        }
    }

    /// Poll the link, then advance the fuel estimate to `now_us`
    ///
    /// The estimate integrates the most recent sample even when this poll
    /// brought no new block.
    pub fn update<S: ByteSource + ?Sized>(
        &mut self,
        link: &mut S,
        now_us: u32,
    ) -> Option<EcuTelemetrySample> {
        let decoded = self.decoder.poll(link);
        self.fuel.update(self.decoder.sample(), now_us);
        decoded
    }

    /// Whether the ECU link is healthy
    pub fn healthy(&self) -> bool {
        self.decoder.healthy()
    }

    /// Most recent decoded sample
    pub fn sample(&self) -> &EcuTelemetrySample {
        self.decoder.sample()
    }

    /// Current fuel estimate
    pub fn fuel(&self) -> &FuelState {
        self.fuel.state()
    }

    /// Seed the remaining-fuel ledger, litres
    pub fn set_remaining_fuel(&mut self, litres: f32) {
        self.fuel.set_remaining(litres);
    }

    /// Snapshot for the outbound engine telemetry message
    pub fn report(&self) -> EcuReport {
        EcuReport::new(self.decoder.sample(), self.fuel.state(), self.decoder.healthy())
    }
}
