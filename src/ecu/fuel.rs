//! # Fuel Consumption Estimator
//!
//! Turns injector pulse width and engine speed into an instantaneous fuel
//! rate and integrates it into consumed / remaining totals.
//!
//! ## Models
//!
//! Two estimates are available and they do not agree on absolute values for
//! the same inputs:
//!
//! - [`FuelModel::Empirical`]: one calibration constant,
//!   `rate = k * pulse_width(s) * rpm / 60` in ml/s.
//! - [`FuelModel::InjectorFlow`]: injector duty times static flow rate and
//!   fuel density, scaled by a density correction,
//!   `rate = (pulse_width(ms) * rpm / 60) * flow * density / density_k`.
//!
//! Both report the rate in litres per hour and integrate in litres.
//!
//! The remaining-fuel figure is a ledger. It is debited on every update and
//! goes negative once more fuel has been burnt than it was seeded with.

use super::protocol::EcuTelemetrySample;
use tracing::debug;

/// Largest sample gap, in microseconds, that is still integrated
pub const MAX_INTEGRATION_GAP_US: u32 = 2_000_000;

/// Default constant for the empirical model
pub const DEFAULT_FUEL_K: f32 = 1.05833;

const US_PER_HOUR: f32 = 3_600_000_000.0;

/// Fuel rate model
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FuelModel {
    /// Single empirical constant
    Empirical {
        /// Calibration constant (ml/s per unit injector duty)
        k: f32,
    },
    /// Static injector flow rate and fuel density
    InjectorFlow {
        /// Static flow rate of the injector
        static_flow_rate: f32,
        /// Density of the fuel in use
        density: f32,
        /// Density / unit correction divisor
        density_k: f32,
    },
}

impl Default for FuelModel {
    fn default() -> Self {
        Self::Empirical { k: DEFAULT_FUEL_K }
    }
}

impl FuelModel {
    /// Instantaneous fuel rate in litres per hour
    ///
    /// # Arguments
    ///
    /// * `pulse_width_us` - Injector 1 pulse width, microseconds
    /// * `rpm` - Engine speed
    pub fn rate_lph(&self, pulse_width_us: u16, rpm: u16) -> f32 {
        match *self {
            Self::Empirical { k } => {
                let pulse_width_s = pulse_width_us as f32 * 0.000_001;
                let rps = rpm as f32 / 60.0;
                // ml/s -> l/h
                k * pulse_width_s * rps * 3.6
            }
            Self::InjectorFlow {
                static_flow_rate,
                density,
                density_k,
            } => {
                let pulse_width_ms = pulse_width_us as f32 / 1000.0;
                let injector_duty = pulse_width_ms * rpm as f32 / 60.0;
                injector_duty * static_flow_rate * density / density_k
            }
        }
    }
}

/// Snapshot of the estimator output
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FuelState {
    /// Current fuel rate, litres per hour
    pub instantaneous_rate: f32,
    /// Fuel burnt since start, litres
    pub consumed: f32,
    /// Fuel left in the ledger, litres (may be negative)
    pub remaining: f32,
    /// Time of the last update, microseconds (wrapping clock)
    pub last_sample_time: Option<u32>,
}

/// Integrates the selected [`FuelModel`] over time
#[derive(Debug, Clone)]
pub struct FuelEstimator {
    model: FuelModel,
    state: FuelState,
}

impl FuelEstimator {
    /// Creates an estimator with an empty ledger
    #[must_use]
    pub fn new(model: FuelModel) -> Self {
        Self {
            model,
            state: FuelState::default(),
        }
    }

    /// Feed the latest sample taken at `now_us`
    ///
    /// The first call only records the time. Later calls integrate the rate
    /// over the elapsed time, unless the gap (computed with wrapping
    /// subtraction) is [`MAX_INTEGRATION_GAP_US`] or more.
    pub fn update(&mut self, sample: &EcuTelemetrySample, now_us: u32) -> FuelState {
        let rate = self.model.rate_lph(sample.pulse_width_1, sample.rpm);
        self.state.instantaneous_rate = rate;

        if let Some(last) = self.state.last_sample_time {
            let dt = now_us.wrapping_sub(last);
            if dt < MAX_INTEGRATION_GAP_US {
                let used = rate * dt as f32 / US_PER_HOUR;
                self.state.consumed += used;
                self.state.remaining -= used;
            } else {
                debug!("Skipping fuel integration over {} us gap", dt);
            }
        }

        self.state.last_sample_time = Some(now_us);
        self.state
    }

    /// Seed the remaining-fuel ledger, litres
    pub fn set_remaining(&mut self, litres: f32) {
        self.state.remaining = litres;
    }

    /// Current estimator output
    pub fn state(&self) -> &FuelState {
        &self.state
    }

    /// Model in use
    pub fn model(&self) -> FuelModel {
        self.model
    }
}
