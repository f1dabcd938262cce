//! # Additive Checksum
//!
//! Checksum used by the tracker link: the low byte of the sum of all
//! covered bytes.

/// Sum `data` modulo 256
///
/// # Examples
///
/// ```
/// use fc_serial_links::tracker::checksum::checksum8;
///
/// assert_eq!(checksum8(&[0x0E, 0x05]), 0x13);
/// assert_eq!(checksum8(&[0xFF, 0x02]), 0x01);
/// ```
pub fn checksum8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |sum, &byte| sum.wrapping_add(byte))
}

/// Running checksum for byte-at-a-time parsing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Checksum8(u8);

impl Checksum8 {
    /// Start a checksum seeded with `byte`
    pub fn seeded(byte: u8) -> Self {
        Self(byte)
    }

    /// Add one byte
    pub fn push(&mut self, byte: u8) {
        self.0 = self.0.wrapping_add(byte);
    }

    /// Current value
    pub fn value(&self) -> u8 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_empty() {
        assert_eq!(checksum8(&[]), 0x00);
    }

    #[test]
    fn test_checksum_wraps() {
        assert_eq!(checksum8(&[0x80, 0x80]), 0x00);
        assert_eq!(checksum8(&[0xFF; 3]), 0xFD);
    }

    #[test]
    fn test_running_matches_slice() {
        let data = [0x0E, 0x05, 0x5A, 0x40, 0x01, 0x80, 0x02, 0xB4, 0x00, 0x68, 0x01];
        let mut running = Checksum8::seeded(data[0]);
        for &byte in &data[1..] {
            running.push(byte);
        }
        assert_eq!(running.value(), checksum8(&data));
    }

    #[test]
    fn test_changes_with_data() {
        assert_ne!(checksum8(&[0x0E, 0x05, 0x00]), checksum8(&[0x0E, 0x05, 0x01]));
    }
}
