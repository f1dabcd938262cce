//! # Tracker Link Module
//!
//! Driver for the companion computer that tracks a target in the camera
//! image and reports its bounding box with a confidence score.
//!
//! This module handles:
//! - Feedback frame parsing with an additive checksum
//! - Confidence tracking with a consecutive-failure trip
//! - Start / stop / feedback-request commands, written whole or not at all

pub mod protocol;
pub mod checksum;
pub mod encoder;
pub mod decoder;

use crate::serial::port_trait::{write_frame, ByteSource};
use crate::telemetry::types::TrackerReport;
use decoder::TrackerDecoder;
use protocol::{BoundingBox, TrackerFeedback};
use tracing::{debug, info};

/// Tracker decoder plus the outbound command side
#[derive(Debug)]
pub struct TrackerDriver {
    decoder: TrackerDecoder,
    request_feedback: bool,
}

impl TrackerDriver {
    /// Creates a driver
    ///
    /// # Arguments
    ///
    /// * `failure_threshold` - Consecutive failures tolerated before confidence drops
    /// * `request_feedback` - Send a feedback request after every poll
    #[must_use]
    pub fn new(failure_threshold: u32, request_feedback: bool) -> Self {
        Self {
            decoder: TrackerDecoder::with_failure_threshold(failure_threshold),
            request_feedback,
        }
    }

    /// Poll the link, then ask for the next feedback frame
    pub fn update<S: ByteSource + ?Sized>(&mut self, link: &mut S) -> Option<TrackerFeedback> {
        let feedback = self.decoder.poll(link);

        if self.request_feedback && !write_frame(link, &encoder::encode_request_feedback()) {
            debug!("Tracker feedback request dropped, no tx space");
        }
        feedback
    }

    /// Ask the companion to start tracking `bbox`
    ///
    /// Returns `false` if the link lacked space for the whole command.
    pub fn start_tracking<S: ByteSource + ?Sized>(&mut self, link: &mut S, bbox: BoundingBox) -> bool {
        let sent = write_frame(link, &encoder::encode_start_tracking(&bbox));
        if sent {
            info!(
                "Start tracking x {}..{} y {}..{}",
                bbox.x0, bbox.x1, bbox.y0, bbox.y1
            );
        } else {
            debug!("Start tracking command dropped, no tx space");
        }
        sent
    }

    /// Ask the companion to stop tracking
    ///
    /// Confidence drops to zero whether or not the command fit.
    pub fn stop_tracking<S: ByteSource + ?Sized>(&mut self, link: &mut S) -> bool {
        let sent = write_frame(link, &encoder::encode_stop_tracking());
        if sent {
            info!("Stop tracking");
        } else {
            debug!("Stop tracking command dropped, no tx space");
        }
        self.decoder.clear_confidence();
        sent
    }

    /// Current tracking confidence
    pub fn confidence(&self) -> u8 {
        self.decoder.confidence()
    }

    /// Last valid feedback frame
    pub fn feedback(&self) -> &TrackerFeedback {
        self.decoder.feedback()
    }

    /// Snapshot for the outbound tracker message
    pub fn report(&self) -> TrackerReport {
        TrackerReport::new(self.decoder.confidence(), self.decoder.feedback())
    }
}
