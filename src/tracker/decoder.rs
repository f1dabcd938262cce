//! # Tracker Frame Decoder
//!
//! Byte-at-a-time state machine for the companion's feedback frames.
//!
//! ```text
//! WaitSync --0x0E--> WaitCmd --0x05--> Payload(0..9) --9 bytes--> Checksum
//!    ^                  |                                            |
//!    +---- mismatch ----+-------------- match or mismatch -----------+
//! ```
//!
//! Parser state survives between polls, so a frame may arrive split across
//! two reads. Every rejected byte or frame counts as one consecutive
//! failure; a valid frame clears the count. When a poll ends with the count
//! above the threshold the link is treated as dead: confidence drops to zero
//! and the count starts again.

use super::checksum::Checksum8;
use super::protocol::*;
use crate::error::{LinkError, Result};
use crate::serial::port_trait::ByteSource;
use tracing::{debug, warn};

/// Parser position within a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Looking for the sync byte
    WaitSync,
    /// Sync seen, expecting the feedback command byte
    WaitCmd,
    /// Collecting payload, `received` bytes so far
    Payload { received: usize },
    /// Payload complete, next byte is the checksum
    Checksum,
}

/// Decode a tracking feedback payload
///
/// # Arguments
///
/// * `payload` - Feedback payload (9 bytes)
///
/// # Returns
///
/// * `Result<TrackerFeedback>` - Confidence and little-endian pixel bounds
pub fn decode_feedback(payload: &[u8]) -> Result<TrackerFeedback> {
    if payload.len() < TRACKER_FEEDBACK_PAYLOAD_SIZE {
        return Err(LinkError::Protocol(format!(
            "Tracker feedback payload too short: {} bytes",
            payload.len()
        )));
    }

    Ok(TrackerFeedback {
        confidence: payload[0],
        x0: u16::from_le_bytes([payload[1], payload[2]]),
        x1: u16::from_le_bytes([payload[3], payload[4]]),
        y0: u16::from_le_bytes([payload[5], payload[6]]),
        y1: u16::from_le_bytes([payload[7], payload[8]]),
    })
}

/// Polling decoder for the tracker link
#[derive(Debug)]
pub struct TrackerDecoder {
    state: DecoderState,
    checksum: Checksum8,
    payload: [u8; TRACKER_FEEDBACK_PAYLOAD_SIZE],
    failure_count: u32,
    failure_threshold: u32,
    confidence: u8,
    feedback: TrackerFeedback,
}

impl Default for TrackerDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackerDecoder {
    /// Creates a decoder with the default failure threshold
    #[must_use]
    pub fn new() -> Self {
        Self::with_failure_threshold(DEFAULT_FAILURE_THRESHOLD)
    }

    /// Creates a decoder that trips once the failure count exceeds `threshold`
    #[must_use]
    pub fn with_failure_threshold(threshold: u32) -> Self {
        Self {
            state: DecoderState::WaitSync,
            checksum: Checksum8::default(),
            payload: [0u8; TRACKER_FEEDBACK_PAYLOAD_SIZE],
            failure_count: 0,
            failure_threshold: threshold,
            confidence: 0,
            feedback: TrackerFeedback::default(),
        }
    }

    /// Run every buffered byte through the parser
    ///
    /// An empty link drops confidence to zero at once.
    ///
    /// # Returns
    ///
    /// * `Option<TrackerFeedback>` - The last valid frame completed during this poll
    pub fn poll<S: ByteSource + ?Sized>(&mut self, link: &mut S) -> Option<TrackerFeedback> {
        let count = link.available();
        if count == 0 {
            if self.confidence != 0 {
                debug!("Tracker link idle, confidence reset");
            }
            self.confidence = 0;
            return None;
        }

        let mut latest = None;
        for _ in 0..count {
            let Some(byte) = link.read() else { break };
            if let Some(feedback) = self.push_byte(byte) {
                latest = Some(feedback);
            }
        }

        if self.failure_count > self.failure_threshold {
            warn!(
                "Tracker link: {} consecutive failures, confidence dropped",
                self.failure_count
            );
            self.failure_count = 0;
            self.confidence = 0;
        }

        latest
    }

    /// Advance the parser by one byte
    ///
    /// Returns the decoded feedback when `byte` completes a valid frame.
    pub fn push_byte(&mut self, byte: u8) -> Option<TrackerFeedback> {
        match self.state {
            DecoderState::WaitSync => {
                if byte == TRACKER_SYNC_BYTE {
                    self.checksum = Checksum8::seeded(byte);
                    self.state = DecoderState::WaitCmd;
                } else {
                    self.failure_count += 1;
                }
                None
            }
            DecoderState::WaitCmd => {
                if byte == TRACKER_CMD_FEEDBACK {
                    self.checksum.push(byte);
                    self.state = DecoderState::Payload { received: 0 };
                } else {
                    self.state = DecoderState::WaitSync;
                    self.failure_count += 1;
                }
                None
            }
            DecoderState::Payload { received } => {
                self.checksum.push(byte);
                self.payload[received] = byte;

                let received = received + 1;
                self.state = if received == TRACKER_FEEDBACK_PAYLOAD_SIZE {
                    DecoderState::Checksum
                } else {
                    DecoderState::Payload { received }
                };
                None
            }
            DecoderState::Checksum => {
                self.state = DecoderState::WaitSync;

                if byte != self.checksum.value() {
                    debug!(
                        "Tracker checksum mismatch: expected 0x{:02X}, got 0x{:02X}",
                        self.checksum.value(),
                        byte
                    );
                    self.failure_count += 1;
                    return None;
                }

                let feedback = decode_feedback(&self.payload).ok()?;
                self.feedback = feedback;
                self.confidence = feedback.confidence;
                self.failure_count = 0;
                Some(feedback)
            }
        }
    }

    /// Force confidence to zero (e.g. after tracking was stopped)
    pub fn clear_confidence(&mut self) {
        self.confidence = 0;
    }

    /// Current tracking confidence
    pub fn confidence(&self) -> u8 {
        self.confidence
    }

    /// Last valid feedback frame
    pub fn feedback(&self) -> &TrackerFeedback {
        &self.feedback
    }

    /// Consecutive failures since the last valid frame or trip
    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    /// Current parser state
    pub fn state(&self) -> DecoderState {
        self.state
    }
}
