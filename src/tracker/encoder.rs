//! # Tracker Frame Encoder
//!
//! Builds command frames for the companion computer, plus the feedback frame
//! layout the companion sends back.

use super::checksum::checksum8;
use super::protocol::*;

/// Encode a command frame
///
/// # Arguments
///
/// * `command` - Command id
/// * `data` - Command data bytes
///
/// # Returns
///
/// * `Vec<u8>` - `[sync][command][data...][checksum]`, checksum over command and data
///
/// # Examples
///
/// ```
/// use fc_serial_links::tracker::encoder::encode_command;
///
/// assert_eq!(encode_command(0x02, &[]), vec![0x0E, 0x02, 0x02]);
/// ```
pub fn encode_command(command: u8, data: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(data.len() + 3);
    frame.push(TRACKER_SYNC_BYTE);
    frame.push(command);
    frame.extend_from_slice(data);

    // Sync byte is not covered
    let checksum = checksum8(&frame[1..]);
    frame.push(checksum);
    frame
}

/// Encode a start-tracking command for `bbox` (11 bytes)
pub fn encode_start_tracking(bbox: &BoundingBox) -> Vec<u8> {
    encode_command(TRACKER_CMD_START_TRACKING, &bbox.to_bytes())
}

/// Encode a stop-tracking command
pub fn encode_stop_tracking() -> Vec<u8> {
    encode_command(TRACKER_CMD_STOP_TRACKING, &[])
}

/// Encode a feedback request
pub fn encode_request_feedback() -> Vec<u8> {
    encode_command(TRACKER_CMD_REQUEST_FEEDBACK, &[])
}

/// Encode a feedback frame as the companion sends it
///
/// The checksum covers every preceding byte, sync included.
pub fn encode_feedback_frame(feedback: &TrackerFeedback) -> Vec<u8> {
    let mut frame = Vec::with_capacity(TRACKER_FEEDBACK_PAYLOAD_SIZE + 3);
    frame.push(TRACKER_SYNC_BYTE);
    frame.push(TRACKER_CMD_FEEDBACK);
    frame.extend_from_slice(&feedback.to_payload());

    let checksum = checksum8(&frame);
    frame.push(checksum);
    frame
}
