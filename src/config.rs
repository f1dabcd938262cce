//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::ecu::fuel::{FuelModel, DEFAULT_FUEL_K};
use crate::error::{LinkError, Result};
use crate::tracker::protocol::DEFAULT_FAILURE_THRESHOLD;
use crate::watchdog::FlightMode;

/// Baud rates accepted for either link
pub const SUPPORTED_BAUD_RATES: [u32; 8] = [9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub ecu: EcuConfig,
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub watchdog: WatchdogConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Fuel rate model selection
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FuelModelKind {
    Empirical,
    InjectorFlow,
}

/// ECU link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct EcuConfig {
    #[serde(default = "default_link_enabled")]
    pub enabled: bool,

    #[serde(default = "default_ecu_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_fuel_model")]
    pub fuel_model: FuelModelKind,

    #[serde(default = "default_fuel_k")]
    pub fuel_k: f32,

    #[serde(default)]
    pub static_inj_flow_rate: f32,

    #[serde(default = "default_fuel_density")]
    pub fuel_density: f32,

    #[serde(default = "default_fuel_density_k")]
    pub fuel_density_k: f32,

    #[serde(default)]
    pub initial_fuel_l: f32,
}

impl EcuConfig {
    /// Fuel rate model built from the configured constants
    pub fn fuel_model(&self) -> FuelModel {
        match self.fuel_model {
            FuelModelKind::Empirical => FuelModel::Empirical { k: self.fuel_k },
            FuelModelKind::InjectorFlow => FuelModel::InjectorFlow {
                static_flow_rate: self.static_inj_flow_rate,
                density: self.fuel_density,
                density_k: self.fuel_density_k,
            },
        }
    }
}

/// Tracker link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TrackerConfig {
    #[serde(default = "default_link_enabled")]
    pub enabled: bool,

    #[serde(default = "default_tracker_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    #[serde(default = "default_request_feedback")]
    pub request_feedback: bool,
}

/// Mode switch watchdog configuration
#[derive(Debug, Deserialize, Clone)]
pub struct WatchdogConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_primary_mode")]
    pub primary_mode: FlightMode,

    #[serde(default = "default_fallback_mode")]
    pub fallback_mode: FlightMode,

    #[serde(default = "default_time_to_fallback_ms")]
    pub time_to_fallback_ms: u32,

    #[serde(default = "default_time_to_recover_ms")]
    pub time_to_recover_ms: u32,

    #[serde(default = "default_min_confidence")]
    pub min_confidence: u8,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            primary_mode: default_primary_mode(),
            fallback_mode: default_fallback_mode(),
            time_to_fallback_ms: default_time_to_fallback_ms(),
            time_to_recover_ms: default_time_to_recover_ms(),
            min_confidence: default_min_confidence(),
        }
    }
}

/// Polling rates
#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    #[serde(default = "default_rate_hz")]
    pub link_rate_hz: u32,

    #[serde(default = "default_rate_hz")]
    pub watchdog_rate_hz: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            link_rate_hz: default_rate_hz(),
            watchdog_rate_hz: default_rate_hz(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_interval_ms")]
    pub log_interval_ms: u64,

    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Application log output
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default)]
    pub file_enabled: bool,

    #[serde(default = "default_logging_dir")]
    pub dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file_enabled: false,
            dir: default_logging_dir(),
        }
    }
}

// Default value functions
fn default_link_enabled() -> bool { true }
fn default_ecu_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_tracker_port() -> String { "/dev/ttyUSB1".to_string() }
fn default_baud_rate() -> u32 { 115200 }

fn default_fuel_model() -> FuelModelKind { FuelModelKind::Empirical }
fn default_fuel_k() -> f32 { DEFAULT_FUEL_K }
fn default_fuel_density() -> f32 { 0.74 }
fn default_fuel_density_k() -> f32 { 600000.0 }

fn default_failure_threshold() -> u32 { DEFAULT_FAILURE_THRESHOLD }
fn default_request_feedback() -> bool { true }

fn default_primary_mode() -> FlightMode { FlightMode::Loiter }
fn default_fallback_mode() -> FlightMode { FlightMode::AltHold }
fn default_time_to_fallback_ms() -> u32 { 1000 }
fn default_time_to_recover_ms() -> u32 { 3000 }
fn default_min_confidence() -> u8 { 50 }

fn default_rate_hz() -> u32 { 10 }

fn default_telemetry_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs/telemetry".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_interval_ms() -> u64 { 1000 }
fn default_log_format() -> String { "jsonl".to_string() }

fn default_logging_dir() -> String { "./logs".to_string() }

fn invalid(msg: impl std::fmt::Display) -> LinkError {
    LinkError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fc_serial_links::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        for (name, enabled, port, baud_rate) in [
            ("ecu", self.ecu.enabled, &self.ecu.port, self.ecu.baud_rate),
            ("tracker", self.tracker.enabled, &self.tracker.port, self.tracker.baud_rate),
        ] {
            if !enabled {
                continue;
            }
            if port.is_empty() {
                return Err(invalid(format!("{} port cannot be empty when enabled", name)));
            }
            if !SUPPORTED_BAUD_RATES.contains(&baud_rate) {
                return Err(invalid(format!(
                    "{} baud_rate must be one of: {:?}",
                    name, SUPPORTED_BAUD_RATES
                )));
            }
        }

        // Fuel constants only matter for the selected model
        match self.ecu.fuel_model {
            FuelModelKind::Empirical => {
                if !(self.ecu.fuel_k > 0.0) {
                    return Err(invalid("fuel_k must be greater than 0"));
                }
            }
            FuelModelKind::InjectorFlow => {
                for (name, value) in [
                    ("static_inj_flow_rate", self.ecu.static_inj_flow_rate),
                    ("fuel_density", self.ecu.fuel_density),
                    ("fuel_density_k", self.ecu.fuel_density_k),
                ] {
                    if !(value > 0.0) {
                        return Err(invalid(format!("{} must be greater than 0", name)));
                    }
                }
            }
        }

        if !self.ecu.initial_fuel_l.is_finite() {
            return Err(invalid("initial_fuel_l must be a finite number"));
        }

        if self.tracker.failure_threshold == 0 {
            return Err(invalid("failure_threshold must be greater than 0"));
        }

        if self.watchdog.primary_mode == self.watchdog.fallback_mode {
            return Err(invalid("watchdog primary_mode and fallback_mode must differ"));
        }

        if self.watchdog.time_to_fallback_ms == 0 || self.watchdog.time_to_recover_ms == 0 {
            return Err(invalid("watchdog dwell times must be greater than 0"));
        }

        if self.watchdog.min_confidence == 0 {
            return Err(invalid("min_confidence must be greater than 0"));
        }

        for (name, rate) in [
            ("link_rate_hz", self.scheduler.link_rate_hz),
            ("watchdog_rate_hz", self.scheduler.watchdog_rate_hz),
        ] {
            if rate == 0 || rate > 1000 {
                return Err(invalid(format!("{} must be between 1 and 1000", name)));
            }
        }

        // Validate telemetry configuration
        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.log_interval_ms == 0 || self.telemetry.log_interval_ms > 60000 {
            return Err(invalid("log_interval_ms must be between 1 and 60000"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        if self.telemetry.format != "jsonl" {
            return Err(invalid("log format must be 'jsonl' (only supported format)"));
        }

        if self.logging.file_enabled && self.logging.dir.is_empty() {
            return Err(invalid("logging dir cannot be empty when file logging is enabled"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config {
            ecu: EcuConfig {
                enabled: default_link_enabled(),
                port: default_ecu_port(),
                baud_rate: default_baud_rate(),
                fuel_model: default_fuel_model(),
                fuel_k: default_fuel_k(),
                static_inj_flow_rate: 0.0,
                fuel_density: default_fuel_density(),
                fuel_density_k: default_fuel_density_k(),
                initial_fuel_l: 0.0,
            },
            tracker: TrackerConfig {
                enabled: default_link_enabled(),
                port: default_tracker_port(),
                baud_rate: default_baud_rate(),
                failure_threshold: default_failure_threshold(),
                request_feedback: default_request_feedback(),
            },
            watchdog: WatchdogConfig::default(),
            scheduler: SchedulerConfig::default(),
            telemetry: TelemetryConfig {
                enabled: default_telemetry_enabled(),
                log_dir: default_log_dir(),
                max_records_per_file: default_max_records_per_file(),
                max_files_to_keep: default_max_files_to_keep(),
                log_interval_ms: default_log_interval_ms(),
                format: default_log_format(),
            },
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_default_config() {
        assert!(create_valid_config().validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[ecu]
port = "/dev/ttyS1"
initial_fuel_l = 12.5

[tracker]
enabled = false

[watchdog]
enabled = true
time_to_fallback_ms = 1500

[telemetry]
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.ecu.port, "/dev/ttyS1");
        assert_eq!(config.ecu.initial_fuel_l, 12.5);
        assert!(!config.tracker.enabled);
        assert!(config.watchdog.enabled);
        assert_eq!(config.watchdog.time_to_fallback_ms, 1500);
        assert_eq!(config.watchdog.time_to_recover_ms, 3000);
        assert_eq!(config.scheduler.link_rate_hz, 10);
        assert!(!config.logging.file_enabled);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Config::load("/nonexistent/fc-serial-links.toml").is_err());
    }

    #[test]
    fn test_parse_injector_flow_model() {
        let config = Config::from_toml_str(
            r#"
[ecu]
fuel_model = "injector_flow"
static_inj_flow_rate = 240.0

[tracker]

[telemetry]
"#,
        )
        .unwrap();

        assert_eq!(
            config.ecu.fuel_model(),
            FuelModel::InjectorFlow {
                static_flow_rate: 240.0,
                density: 0.74,
                density_k: 600000.0,
            }
        );
    }

    #[test]
    fn test_unknown_fuel_model_rejected() {
        let result = Config::from_toml_str(
            r#"
[ecu]
fuel_model = "magic"

[tracker]

[telemetry]
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_empirical_model_uses_fuel_k() {
        let mut config = create_valid_config();
        config.ecu.fuel_k = 2.0;
        assert_eq!(config.ecu.fuel_model(), FuelModel::Empirical { k: 2.0 });
    }

    #[test]
    fn test_empty_ecu_port() {
        let mut config = create_valid_config();
        config.ecu.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_port_when_link_disabled() {
        let mut config = create_valid_config();
        config.tracker.enabled = false;
        config.tracker.port = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = create_valid_config();
        config.tracker.baud_rate = 420000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in &SUPPORTED_BAUD_RATES {
            let mut config = create_valid_config();
            config.ecu.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_fuel_k_not_positive() {
        let mut config = create_valid_config();
        config.ecu.fuel_k = 0.0;
        assert!(config.validate().is_err());
        config.ecu.fuel_k = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_injector_flow_needs_flow_rate() {
        let mut config = create_valid_config();
        config.ecu.fuel_model = FuelModelKind::InjectorFlow;
        assert!(config.validate().is_err());

        config.ecu.static_inj_flow_rate = 180.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_injector_constants_ignored_for_empirical() {
        let mut config = create_valid_config();
        config.ecu.fuel_density_k = -1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_failure_threshold_zero() {
        let mut config = create_valid_config();
        config.tracker.failure_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_min_confidence_zero() {
        let mut config = create_valid_config();
        config.watchdog.min_confidence = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_watchdog_modes_must_differ() {
        let mut config = create_valid_config();
        config.watchdog.fallback_mode = FlightMode::Loiter;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_watchdog_dwell_zero() {
        let mut config = create_valid_config();
        config.watchdog.time_to_recover_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_scheduler_rate_zero() {
        let mut config = create_valid_config();
        config.scheduler.link_rate_hz = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_scheduler_rate_too_high() {
        let mut config = create_valid_config();
        config.scheduler.watchdog_rate_hz = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_enabled() {
        let mut config = create_valid_config();
        config.telemetry.enabled = true;
        config.telemetry.log_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_disabled() {
        let mut config = create_valid_config();
        config.telemetry.enabled = false;
        config.telemetry.log_dir = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_interval_zero() {
        let mut config = create_valid_config();
        config.telemetry.log_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_records_per_file_zero() {
        let mut config = create_valid_config();
        config.telemetry.max_records_per_file = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_files_to_keep_zero() {
        let mut config = create_valid_config();
        config.telemetry.max_files_to_keep = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_format() {
        let mut config = create_valid_config();
        config.telemetry.format = "csv".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_logging_needs_dir() {
        let mut config = create_valid_config();
        config.logging.file_enabled = true;
        config.logging.dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_ecu_port(), "/dev/ttyUSB0");
        assert_eq!(default_tracker_port(), "/dev/ttyUSB1");
        assert_eq!(default_baud_rate(), 115200);
        assert_eq!(default_fuel_k(), 1.05833);
        assert_eq!(default_fuel_density_k(), 600000.0);
        assert_eq!(default_failure_threshold(), 37);
        assert_eq!(default_primary_mode(), FlightMode::Loiter);
        assert_eq!(default_fallback_mode(), FlightMode::AltHold);
        assert_eq!(default_rate_hz(), 10);
        assert_eq!(default_log_format(), "jsonl");
        assert_eq!(default_max_files_to_keep(), 10);
    }
}
