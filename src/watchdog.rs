//! # Mode Switch Watchdog
//!
//! Debounces a confidence signal into flight mode change requests.
//!
//! The watchdog supervises one pair of modes:
//!
//! | Current mode | Signal held for the dwell time | Request |
//! |--------------|--------------------------------|---------|
//! | primary      | confidence lost                | fallback |
//! | fallback     | confidence regained            | primary  |
//!
//! The opposite signal cancels the dwell timer. In any other mode, or while
//! disabled, the timer is cleared and nothing is requested.
//!
//! ## Usage
//!
//! ```
//! use fc_serial_links::watchdog::{FlightMode, ModeSwitchWatchdog};
//!
//! let mut watchdog = ModeSwitchWatchdog::new(FlightMode::Loiter, FlightMode::AltHold, 1000, 3000);
//! watchdog.set_switch(true);
//!
//! assert!(watchdog.update(0, FlightMode::Loiter, false).is_none());
//! let request = watchdog.update(1000, FlightMode::Loiter, false).unwrap();
//! assert_eq!(request.to, FlightMode::AltHold);
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Flight modes the host may report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightMode {
    Stabilize,
    AltHold,
    Loiter,
    Auto,
    Rtl,
    Land,
}

/// Request for the host to change flight mode
///
/// The host decides whether to act on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModeChangeRequest<M> {
    /// Mode the vehicle was in
    pub from: M,
    /// Requested mode
    pub to: M,
    /// How long the condition held, milliseconds
    pub held_ms: u32,
}

/// Running dwell timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogState<M> {
    /// Mode the timer was started in
    pub mode: M,
    /// Start of the dwell, milliseconds (wrapping clock)
    pub engaged_since: u32,
}

/// Confidence-debounced switch between a primary and a fallback mode
#[derive(Debug, Clone)]
pub struct ModeSwitchWatchdog<M> {
    primary: M,
    fallback: M,
    time_to_fallback_ms: u32,
    time_to_recover_ms: u32,
    enabled: bool,
    switch: bool,
    engaged: Option<WatchdogState<M>>,
}

impl<M: Copy + PartialEq + std::fmt::Debug> ModeSwitchWatchdog<M> {
    /// Creates an enabled watchdog with its runtime switch off
    ///
    /// # Arguments
    ///
    /// * `primary` - Mode left when confidence is lost
    /// * `fallback` - Mode left when confidence returns
    /// * `time_to_fallback_ms` - Dwell before requesting `fallback`
    /// * `time_to_recover_ms` - Dwell before requesting `primary`
    #[must_use]
    pub fn new(primary: M, fallback: M, time_to_fallback_ms: u32, time_to_recover_ms: u32) -> Self {
        Self {
            primary,
            fallback,
            time_to_fallback_ms,
            time_to_recover_ms,
            enabled: true,
            switch: false,
            engaged: None,
        }
    }

    /// Configured enable flag
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.engaged = None;
        }
    }

    /// Runtime switch (e.g. a pilot's aux switch)
    pub fn set_switch(&mut self, on: bool) {
        self.switch = on;
        if !on {
            self.engaged = None;
        }
    }

    /// Evaluate one tick
    ///
    /// # Arguments
    ///
    /// * `now_ms` - Current time, milliseconds (wrapping clock)
    /// * `current` - Active flight mode
    /// * `confidence_ok` - Confidence signal
    ///
    /// # Returns
    ///
    /// * `Option<ModeChangeRequest<M>>` - Fired once when a dwell completes
    pub fn update(&mut self, now_ms: u32, current: M, confidence_ok: bool) -> Option<ModeChangeRequest<M>> {
        if !self.enabled || !self.switch {
            self.engaged = None;
            return None;
        }

        let (dwell_ms, target) = if current == self.primary && !confidence_ok {
            (self.time_to_fallback_ms, self.fallback)
        } else if current == self.fallback && confidence_ok {
            (self.time_to_recover_ms, self.primary)
        } else {
            self.engaged = None;
            return None;
        };

        let since = match self.engaged {
            Some(state) if state.mode == current => state.engaged_since,
            _ => {
                debug!("Mode watchdog engaged in {:?}", current);
                self.engaged = Some(WatchdogState {
                    mode: current,
                    engaged_since: now_ms,
                });
                now_ms
            }
        };

        let held_ms = now_ms.wrapping_sub(since);
        if held_ms < dwell_ms {
            return None;
        }

        self.engaged = None;
        info!(
            "Mode watchdog requesting {:?} -> {:?} after {} ms",
            current, target, held_ms
        );
        Some(ModeChangeRequest {
            from: current,
            to: target,
            held_ms,
        })
    }

    /// Running dwell timer, if any
    pub fn state(&self) -> Option<&WatchdogState<M>> {
        self.engaged.as_ref()
    }

    /// Whether a dwell timer is running
    pub fn engaged(&self) -> bool {
        self.engaged.is_some()
    }
}
