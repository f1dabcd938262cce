//! # FC Serial Links
//!
//! Host process for the ECU and companion tracker serial links.
//!
//! Pumps bytes between the serial ports and the link drivers, polls the
//! drivers at a fixed rate, runs the mode watchdog on tracker confidence and
//! logs telemetry as JSON lines.

use std::time::Instant;

use anyhow::{Context, Result};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use fc_serial_links::config::{Config, LoggingConfig};
use fc_serial_links::drivers::Drivers;
use fc_serial_links::serial::{LinkSerial, QueuedLink, READ_CHUNK_SIZE};
use fc_serial_links::telemetry::{TelemetryLogger, TelemetryRecord};

/// Configuration file used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// File name prefix for the daily application log
const LOG_FILE_PREFIX: &str = "fc-serial-links.log";

/// Port plus the queue its driver polls
struct Link {
    name: &'static str,
    serial: Option<LinkSerial>,
    queue: QueuedLink,
}

impl Link {
    fn open(name: &'static str, enabled: bool, port: &str, baud_rate: u32) -> Result<Self> {
        let serial = if enabled {
            let serial = LinkSerial::open(port, baud_rate)
                .with_context(|| format!("opening {} link", name))?;
            Some(serial)
        } else {
            info!("{} link disabled", name);
            None
        };

        Ok(Self {
            name,
            serial,
            queue: QueuedLink::default(),
        })
    }

    fn lost(&mut self, reason: impl std::fmt::Display) {
        warn!("{} link lost: {}", self.name, reason);
        self.serial = None;
    }

    async fn flush(&mut self) {
        let result = match self.serial.as_mut() {
            Some(serial) => serial.flush_outbound(&mut self.queue).await,
            None => {
                self.queue.take_outbound();
                return;
            }
        };
        if let Err(e) = result {
            self.lost(e);
        }
    }
}

/// Wait for bytes on an optional port; never resolves without one
async fn read_port(serial: &mut Option<LinkSerial>, buf: &mut [u8]) -> fc_serial_links::error::Result<usize> {
    match serial.as_mut() {
        Some(serial) => serial.read_chunk(buf).await,
        None => std::future::pending().await,
    }
}

/// Tick period for a rate in Hz
fn period_from_hz(rate_hz: u32) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(rate_hz.max(1)))
}

/// Install the stdout subscriber and, if configured, a daily log file
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if config.file_enabled {
        let appender = tracing_appender::rolling::daily(&config.dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .with(fmt::layer().with_ansi(false).with_writer(writer))
            .init();
        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
        None
    }
}

fn log_record(logger: &mut Option<TelemetryLogger>, record: &TelemetryRecord) {
    if let Some(log) = logger.as_mut() {
        if let Err(e) = log.log(record) {
            warn!("Telemetry logging failed, disabling: {}", e);
            *logger = None;
        }
    }
}

/// Main entry point
///
/// # Control Flow
///
/// 1. Load configuration (first argument, or `config/default.toml`)
/// 2. Set up logging, attach drivers, open the enabled serial links
/// 3. Loop until Ctrl+C:
///    - move received bytes into each link's queue
///    - poll the drivers at `link_rate_hz` and flush their commands
///    - run the watchdog at `watchdog_rate_hz`
///    - log ECU and tracker reports every `log_interval_ms`
///
/// # Errors
///
/// Returns error if the configuration is invalid or an enabled serial port
/// cannot be opened.
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path))?;

    let _log_guard = init_logging(&config.logging);

    info!("FC Serial Links v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {}", config_path);

    let mut drivers = Drivers::from_config(&config)?;

    let mut ecu = Link::open("ECU", config.ecu.enabled, &config.ecu.port, config.ecu.baud_rate)?;
    let mut tracker = Link::open(
        "Tracker",
        config.tracker.enabled,
        &config.tracker.port,
        config.tracker.baud_rate,
    )?;

    let mut logger = if config.telemetry.enabled {
        Some(TelemetryLogger::new(
            &config.telemetry.log_dir,
            config.telemetry.max_records_per_file,
            config.telemetry.max_files_to_keep,
        )?)
    } else {
        None
    };

    let mut link_interval = interval(period_from_hz(config.scheduler.link_rate_hz));
    let mut watchdog_interval = interval(period_from_hz(config.scheduler.watchdog_rate_hz));
    let mut telemetry_interval = interval(Duration::from_millis(config.telemetry.log_interval_ms));
    for timer in [&mut link_interval, &mut watchdog_interval, &mut telemetry_interval] {
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    }

    let mut ecu_buf = [0u8; READ_CHUNK_SIZE];
    let mut tracker_buf = [0u8; READ_CHUNK_SIZE];

    let started = Instant::now();
    let mut flight_mode = config.watchdog.primary_mode;
    let min_confidence = config.watchdog.min_confidence;

    info!(
        "Polling links at {}Hz, watchdog at {}Hz",
        config.scheduler.link_rate_hz, config.scheduler.watchdog_rate_hz
    );
    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            result = read_port(&mut ecu.serial, &mut ecu_buf) => match result {
                Ok(n) => ecu.queue.push_inbound(&ecu_buf[..n]),
                Err(e) => ecu.lost(e),
            },

            result = read_port(&mut tracker.serial, &mut tracker_buf) => match result {
                Ok(n) => tracker.queue.push_inbound(&tracker_buf[..n]),
                Err(e) => tracker.lost(e),
            },

            _ = link_interval.tick() => {
                // Microsecond clock wraps like the vehicle's
                let now_us = started.elapsed().as_micros() as u32;

                if let Some(driver) = drivers.ecu_mut() {
                    if driver.update(&mut ecu.queue, now_us).is_some() {
                        debug!("ECU sample at {} us", now_us);
                    }
                }
                if let Some(driver) = drivers.tracker_mut() {
                    driver.update(&mut tracker.queue);
                }

                ecu.flush().await;
                tracker.flush().await;
            }

            _ = watchdog_interval.tick() => {
                let now_ms = started.elapsed().as_millis() as u32;
                let confidence_ok = drivers.confidence_ok(min_confidence);

                let request = drivers
                    .watchdog_mut()
                    .and_then(|w| w.update(now_ms, flight_mode, confidence_ok));

                if let Some(request) = request {
                    info!("Switching flight mode {:?} -> {:?}", request.from, request.to);
                    flight_mode = request.to;
                    log_record(&mut logger, &TelemetryRecord::ModeChange(request));
                }
            }

            _ = telemetry_interval.tick(), if logger.is_some() => {
                if let Some(report) = drivers.ecu_report() {
                    log_record(&mut logger, &TelemetryRecord::Ecu(report));
                }
                if let Some(report) = drivers.tracker_report() {
                    log_record(&mut logger, &TelemetryRecord::Tracker(report));
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    if let Some(log) = logger.as_mut() {
        if let Err(e) = log.flush() {
            warn!("Failed to flush telemetry log: {}", e);
        }
    }

    Ok(())
}
