//! Pairing identifiers for the wireless link.
//!
//! Each node's transmit id is the CRC-32 of its chip unique id, so it is
//! stable across resets and needs no provisioning. The receive id is the
//! peer's transmit id, stored in the configuration when the two are paired.

use crc::{Crc, CRC_32_ISO_HDLC};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Derive a node's transmit id from its unique chip id.
#[inline]
#[must_use]
pub fn derive_id(unique_id: &[u8]) -> u32 {
    CRC32.checksum(unique_id)
}

/// The address pair a node uses on air.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pairing {
    /// Our own id; incoming packets must be addressed to it.
    pub tx_id: u32,
    /// The peer's id; outgoing packets are addressed to it.
    pub rx_id: u32,
}

impl Pairing {
    #[must_use]
    pub const fn new(tx_id: u32, rx_id: u32) -> Self {
        Self { tx_id, rx_id }
    }

    /// Pairing for a node with `unique_id` talking to `peer_id`.
    #[must_use]
    pub fn from_unique_id(unique_id: &[u8], peer_id: u32) -> Self {
        Self::new(derive_id(unique_id), peer_id)
    }

    /// The same link seen from the other end.
    #[must_use]
    pub const fn reversed(self) -> Self {
        Self::new(self.rx_id, self.tx_id)
    }
}
