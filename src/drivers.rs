//! # Driver Registry
//!
//! One explicitly owned instance of each link driver and the mode watchdog.
//! Attaching a second instance of the same driver is an error.

use tracing::info;

use crate::config::Config;
use crate::ecu::fuel::FuelEstimator;
use crate::ecu::EcuDriver;
use crate::error::{LinkError, Result};
use crate::telemetry::types::{EcuReport, TrackerReport};
use crate::tracker::TrackerDriver;
use crate::watchdog::{FlightMode, ModeSwitchWatchdog};

/// Owner of the attached drivers
#[derive(Debug, Default)]
pub struct Drivers {
    ecu: Option<EcuDriver>,
    tracker: Option<TrackerDriver>,
    watchdog: Option<ModeSwitchWatchdog<FlightMode>>,
}

impl Drivers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach every driver the configuration enables
    ///
    /// The watchdog is always attached; its configured enable flag is
    /// applied and the runtime switch starts on.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut drivers = Self::new();

        if config.ecu.enabled {
            let mut fuel = FuelEstimator::new(config.ecu.fuel_model());
            fuel.set_remaining(config.ecu.initial_fuel_l);
            drivers.attach_ecu(EcuDriver::new(fuel))?;
        }

        if config.tracker.enabled {
            drivers.attach_tracker(TrackerDriver::new(
                config.tracker.failure_threshold,
                config.tracker.request_feedback,
            ))?;
        }

        let mut watchdog = ModeSwitchWatchdog::new(
            config.watchdog.primary_mode,
            config.watchdog.fallback_mode,
            config.watchdog.time_to_fallback_ms,
            config.watchdog.time_to_recover_ms,
        );
        watchdog.set_enabled(config.watchdog.enabled);
        watchdog.set_switch(true);
        drivers.attach_watchdog(watchdog)?;

        Ok(drivers)
    }

    pub fn attach_ecu(&mut self, driver: EcuDriver) -> Result<&mut EcuDriver> {
        attach(&mut self.ecu, driver, "ecu")
    }

    pub fn attach_tracker(&mut self, driver: TrackerDriver) -> Result<&mut TrackerDriver> {
        attach(&mut self.tracker, driver, "tracker")
    }

    pub fn attach_watchdog(
        &mut self,
        watchdog: ModeSwitchWatchdog<FlightMode>,
    ) -> Result<&mut ModeSwitchWatchdog<FlightMode>> {
        attach(&mut self.watchdog, watchdog, "watchdog")
    }

    pub fn ecu(&self) -> Option<&EcuDriver> {
        self.ecu.as_ref()
    }

    pub fn ecu_mut(&mut self) -> Option<&mut EcuDriver> {
        self.ecu.as_mut()
    }

    pub fn tracker(&self) -> Option<&TrackerDriver> {
        self.tracker.as_ref()
    }

    pub fn tracker_mut(&mut self) -> Option<&mut TrackerDriver> {
        self.tracker.as_mut()
    }

    pub fn watchdog_mut(&mut self) -> Option<&mut ModeSwitchWatchdog<FlightMode>> {
        self.watchdog.as_mut()
    }

    /// Engine report, if the ECU driver is attached
    pub fn ecu_report(&self) -> Option<EcuReport> {
        self.ecu.as_ref().map(EcuDriver::report)
    }

    /// Tracker report, if the tracker driver is attached
    pub fn tracker_report(&self) -> Option<TrackerReport> {
        self.tracker.as_ref().map(TrackerDriver::report)
    }

    /// Confidence signal for the watchdog
    ///
    /// False when no tracker is attached.
    pub fn confidence_ok(&self, min_confidence: u8) -> bool {
        self.tracker
            .as_ref()
            .is_some_and(|t| t.confidence() >= min_confidence)
    }
}

fn attach<'a, T>(slot: &'a mut Option<T>, value: T, name: &'static str) -> Result<&'a mut T> {
    if slot.is_some() {
        return Err(LinkError::AlreadyAttached(name));
    }
    info!("{} driver attached", name);
    Ok(slot.insert(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecu::fuel::FuelModel;
    use crate::ecu::protocol::{EcuTelemetrySample, ECU_POLL_COMMAND};
    use crate::serial::port_trait::QueuedLink;
    use crate::tracker::encoder::encode_feedback_frame;
    use crate::tracker::protocol::TrackerFeedback;

    fn config(toml: &str) -> Config {
        Config::from_toml_str(toml).unwrap()
    }

    #[test]
    fn test_duplicate_attach_is_an_error() {
        let mut drivers = Drivers::new();
        drivers.attach_tracker(TrackerDriver::new(37, false)).unwrap();

        let err = drivers.attach_tracker(TrackerDriver::new(37, false)).unwrap_err();
        assert!(matches!(err, LinkError::AlreadyAttached("tracker")));
    }

    #[test]
    fn test_duplicate_ecu_attach_keeps_first() {
        let mut drivers = Drivers::new();
        let mut fuel = FuelEstimator::new(FuelModel::default());
        fuel.set_remaining(5.0);
        drivers.attach_ecu(EcuDriver::new(fuel)).unwrap();

        assert!(drivers.attach_ecu(EcuDriver::new(FuelEstimator::new(FuelModel::default()))).is_err());
        assert_eq!(drivers.ecu().unwrap().fuel().remaining, 5.0);
    }

    #[test]
    fn test_from_config_attaches_enabled_links() {
        let config = config(
            r#"
[ecu]
initial_fuel_l = 20.0

[tracker]
enabled = false

[telemetry]
"#,
        );
        let drivers = Drivers::from_config(&config).unwrap();

        assert!(drivers.ecu().is_some());
        assert!(drivers.tracker().is_none());
        assert!(drivers.tracker_report().is_none());
        assert_eq!(drivers.ecu_report().unwrap().fuel_remaining, 20.0);
    }

    #[test]
    fn test_confidence_ok() {
        let mut drivers = Drivers::new();
        assert!(!drivers.confidence_ok(1));

        let tracker = drivers.attach_tracker(TrackerDriver::new(37, false)).unwrap();
        let mut link = QueuedLink::default();
        link.push_inbound(&encode_feedback_frame(&TrackerFeedback {
            confidence: 60,
            ..Default::default()
        }));
        tracker.update(&mut link);

        assert!(drivers.confidence_ok(60));
        assert!(!drivers.confidence_ok(61));
    }

    #[test]
    fn test_ecu_pipeline_through_queued_link() {
        let config = config(
            r#"
[ecu]
initial_fuel_l = 10.0

[tracker]
enabled = false

[telemetry]
"#,
        );
        let mut drivers = Drivers::from_config(&config).unwrap();
        let ecu = drivers.ecu_mut().unwrap();

        let sample = EcuTelemetrySample {
            pulse_width_1: 2000,
            rpm: 6000,
            coolant: 1805,
            ..Default::default()
        };
        let mut link = QueuedLink::default();

        link.push_inbound(&sample.to_bytes());
        assert_eq!(ecu.update(&mut link, 0), Some(sample));
        assert_eq!(&link.take_outbound()[..], &ECU_POLL_COMMAND);

        link.push_inbound(&sample.to_bytes());
        ecu.update(&mut link, 1_000_000);

        let report = drivers.ecu_report().unwrap();
        let rate = 1.05833 * 0.002 * 100.0 * 3.6;
        assert!(report.healthy);
        assert_eq!(report.coolant, 1805);
        assert!((report.fuel_instant - rate).abs() < 1e-4);
        assert!((report.fuel_consumed - rate / 3600.0).abs() < 1e-6);
        assert!((report.fuel_remaining - (10.0 - rate / 3600.0)).abs() < 1e-5);
    }

    #[test]
    fn test_watchdog_follows_config_enable() {
        let config = config(
            r#"
[ecu]
enabled = false

[tracker]

[watchdog]
enabled = false

[telemetry]
"#,
        );
        let mut drivers = Drivers::from_config(&config).unwrap();
        let watchdog = drivers.watchdog_mut().unwrap();

        watchdog.update(0, FlightMode::Loiter, false);
        assert!(watchdog.update(60_000, FlightMode::Loiter, false).is_none());
    }
}
