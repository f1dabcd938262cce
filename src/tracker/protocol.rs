//! # Tracker Protocol Constants and Types
//!
//! Framing used on the companion computer link:
//!
//! ```text
//! inbound:  [0x0E][0x05][payload: 9 bytes][checksum]
//! outbound: [0x0E][command id][data...][checksum]
//! ```
//!
//! Inbound checksums cover every preceding byte of the frame including the
//! header. Outbound checksums cover the command id and data, not the sync.
//! All sums are modulo 256.

/// Frame sync byte (always 0x0E)
pub const TRACKER_SYNC_BYTE: u8 = 0x0E;

/// Command byte of an inbound tracking feedback frame
pub const TRACKER_CMD_FEEDBACK: u8 = 0x05;

/// Start tracking a bounding box
pub const TRACKER_CMD_START_TRACKING: u8 = 0x01;

/// Stop tracking
pub const TRACKER_CMD_STOP_TRACKING: u8 = 0x02;

/// Ask the companion for a feedback frame
pub const TRACKER_CMD_REQUEST_FEEDBACK: u8 = 0x04;

/// Feedback payload size: confidence(1) + 4 x u16 bounds
pub const TRACKER_FEEDBACK_PAYLOAD_SIZE: usize = 9;

/// Start-tracking data size: 4 x u16 bounds
pub const TRACKER_START_PAYLOAD_SIZE: usize = 8;

/// Consecutive failures tolerated before confidence is dropped to zero
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 37;

/// Tracking feedback reported by the companion computer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerFeedback {
    /// Tracking confidence score (0-255)
    pub confidence: u8,
    /// Left pixel bound
    pub x0: u16,
    /// Right pixel bound
    pub x1: u16,
    /// Top pixel bound
    pub y0: u16,
    /// Bottom pixel bound
    pub y1: u16,
}

impl TrackerFeedback {
    /// Serialize into the inbound payload layout (bounds little-endian)
    pub fn to_payload(&self) -> [u8; TRACKER_FEEDBACK_PAYLOAD_SIZE] {
        let mut payload = [0u8; TRACKER_FEEDBACK_PAYLOAD_SIZE];
        payload[0] = self.confidence;
        payload[1..3].copy_from_slice(&self.x0.to_le_bytes());
        payload[3..5].copy_from_slice(&self.x1.to_le_bytes());
        payload[5..7].copy_from_slice(&self.y0.to_le_bytes());
        payload[7..9].copy_from_slice(&self.y1.to_le_bytes());
        payload
    }
}

/// Pixel bounding box sent with a start-tracking command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundingBox {
    pub x0: u16,
    pub x1: u16,
    pub y0: u16,
    pub y1: u16,
}

impl BoundingBox {
    /// Data bytes of the start-tracking command (little-endian)
    pub fn to_bytes(&self) -> [u8; TRACKER_START_PAYLOAD_SIZE] {
        let mut data = [0u8; TRACKER_START_PAYLOAD_SIZE];
        data[0..2].copy_from_slice(&self.x0.to_le_bytes());
        data[2..4].copy_from_slice(&self.x1.to_le_bytes());
        data[4..6].copy_from_slice(&self.y0.to_le_bytes());
        data[6..8].copy_from_slice(&self.y1.to_le_bytes());
        data
    }
}
