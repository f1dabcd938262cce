//! Trait abstraction for non-blocking serial byte I/O to enable testing

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Default transmit buffer size for [`QueuedLink`]
pub const DEFAULT_TX_CAPACITY: usize = 512;

/// Non-blocking byte link as seen by the protocol drivers
///
/// Every call returns immediately. Reads only drain bytes that are already
/// buffered and writes only queue bytes when the transmit buffer has room.
#[cfg_attr(test, mockall::automock)]
pub trait ByteSource {
    /// Number of received bytes ready to be read
    fn available(&self) -> usize;

    /// Read one buffered byte, `None` if the receive buffer is empty
    fn read(&mut self) -> Option<u8>;

    /// Free space in the transmit buffer, in bytes
    fn txspace(&self) -> usize;

    /// Queue one byte for transmission
    fn write(&mut self, byte: u8);
}

/// Write `frame` only if the whole message fits in the transmit buffer
///
/// Returns `true` if the frame was queued. Nothing is written otherwise.
pub fn write_frame<S: ByteSource + ?Sized>(link: &mut S, frame: &[u8]) -> bool {
    if link.txspace() < frame.len() {
        return false;
    }

    for &byte in frame {
        link.write(byte);
    }
    true
}

/// Write `bytes` one at a time, dropping each byte that finds no space
///
/// Returns the number of bytes queued.
pub fn write_each<S: ByteSource + ?Sized>(link: &mut S, bytes: &[u8]) -> usize {
    let mut written = 0;
    for &byte in bytes {
        if link.txspace() < 1 {
            continue;
        }
        link.write(byte);
        written += 1;
    }
    written
}

/// Buffered link filled and drained by the host's serial pump
///
/// Inbound bytes are appended with [`QueuedLink::push_inbound`] and consumed by
/// a driver through [`ByteSource`]. Bytes the driver writes accumulate until the
/// host collects them with [`QueuedLink::take_outbound`].
#[derive(Debug)]
pub struct QueuedLink {
    rx: BytesMut,
    tx: BytesMut,
    tx_capacity: usize,
}

impl Default for QueuedLink {
    fn default() -> Self {
        Self::new(DEFAULT_TX_CAPACITY)
    }
}

impl QueuedLink {
    /// Create a link whose transmit buffer holds at most `tx_capacity` bytes
    pub fn new(tx_capacity: usize) -> Self {
        Self {
            rx: BytesMut::with_capacity(256),
            tx: BytesMut::with_capacity(tx_capacity),
            tx_capacity,
        }
    }

    /// Append bytes received from the port
    pub fn push_inbound(&mut self, data: &[u8]) {
        self.rx.extend_from_slice(data);
    }

    /// Take every byte queued for transmission, leaving the buffer empty
    pub fn take_outbound(&mut self) -> Bytes {
        self.tx.split().freeze()
    }

    /// Number of bytes waiting to be transmitted
    pub fn pending_outbound(&self) -> usize {
        self.tx.len()
    }
}

impl ByteSource for QueuedLink {
    fn available(&self) -> usize {
        self.rx.len()
    }

    fn read(&mut self) -> Option<u8> {
        if self.rx.has_remaining() {
            Some(self.rx.get_u8())
        } else {
            None
        }
    }

    fn txspace(&self) -> usize {
        self.tx_capacity.saturating_sub(self.tx.len())
    }

    fn write(&mut self, byte: u8) {
        if self.tx.len() < self.tx_capacity {
            self.tx.put_u8(byte);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queued_link_reads_in_order() {
        let mut link = QueuedLink::default();
        link.push_inbound(&[1, 2, 3]);

        assert_eq!(link.available(), 3);
        assert_eq!(link.read(), Some(1));
        assert_eq!(link.read(), Some(2));
        assert_eq!(link.read(), Some(3));
        assert_eq!(link.read(), None);
        assert_eq!(link.available(), 0);
    }

    #[test]
    fn test_queued_link_txspace_shrinks_and_recovers() {
        let mut link = QueuedLink::new(4);
        assert_eq!(link.txspace(), 4);

        link.write(0xAA);
        link.write(0xBB);
        assert_eq!(link.txspace(), 2);
        assert_eq!(link.pending_outbound(), 2);

        let sent = link.take_outbound();
        assert_eq!(&sent[..], &[0xAA, 0xBB]);
        assert_eq!(link.txspace(), 4);
    }

    #[test]
    fn test_queued_link_drops_writes_when_full() {
        let mut link = QueuedLink::new(1);
        link.write(1);
        link.write(2);
        assert_eq!(&link.take_outbound()[..], &[1]);
    }

    #[test]
    fn test_write_frame_is_all_or_nothing() {
        let mut link = QueuedLink::new(3);
        assert!(!write_frame(&mut link, &[1, 2, 3, 4]));
        assert_eq!(link.pending_outbound(), 0);

        assert!(write_frame(&mut link, &[1, 2, 3]));
        assert_eq!(&link.take_outbound()[..], &[1, 2, 3]);
    }

    #[test]
    fn test_write_each_drops_bytes_without_space() {
        let mut mock = MockByteSource::new();
        mock.expect_txspace().times(3).return_const(0usize);
        mock.expect_write().never();

        assert_eq!(write_each(&mut mock, &[0x61, 0x00, 0x06]), 0);
    }

    #[test]
    fn test_write_each_writes_every_byte_with_space() {
        let mut link = QueuedLink::new(8);
        assert_eq!(write_each(&mut link, &[0x61, 0x00, 0x06]), 3);
        assert_eq!(&link.take_outbound()[..], &[0x61, 0x00, 0x06]);
    }
}
