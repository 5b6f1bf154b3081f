//! Over-the-air packet format for the wireless link.
//!
//! ```text
//! <tx_id: u32 LE> <rx_id: u32 LE> <payload: 0..=26 bytes>
//! ```
//!
//! A data packet carries `[report id, report bytes...]`. The receiver's
//! acknowledgement carries `[cmd, is_read, data...]`, which is how the control
//! channel rides back to the controller without a separate exchange.

use heapless::Vec;

use crate::frame::{ControlFrame, ControlKind, MAX_CONTROL_PAYLOAD};

/// Largest payload one RF packet can carry (32-byte radio FIFO minus header
/// and framing overhead).
pub const MAX_RF_PAYLOAD: usize = 26;

/// Address header: two little-endian `u32` ids.
pub const RF_HEADER_LEN: usize = 8;

/// Largest encoded RF packet.
pub const MAX_RF_PACKET: usize = RF_HEADER_LEN + MAX_RF_PAYLOAD;

/// Largest command data that fits in an acknowledgement.
pub const MAX_ACK_DATA: usize = MAX_RF_PAYLOAD - 2;

/// Error type for RF packet handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RfError {
    /// Fewer bytes than the address header.
    Truncated,
    /// Payload exceeds [`MAX_RF_PAYLOAD`].
    PayloadTooLong,
    /// The output buffer cannot hold the packet.
    BufferTooSmall,
}

impl core::fmt::Display for RfError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Truncated => write!(f, "packet truncated"),
            Self::PayloadTooLong => write!(f, "payload too long"),
            Self::BufferTooSmall => write!(f, "buffer too small"),
        }
    }
}

/// One addressed radio packet.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RfPacket {
    pub tx_id: u32,
    pub rx_id: u32,
    pub payload: Vec<u8, MAX_RF_PAYLOAD>,
}

impl RfPacket {
    /// Packet with an empty payload.
    #[must_use]
    pub const fn empty(tx_id: u32, rx_id: u32) -> Self {
        Self {
            tx_id,
            rx_id,
            payload: Vec::new(),
        }
    }

    /// Data packet carrying `[id, report...]`.
    ///
    /// # Errors
    ///
    /// [`RfError::PayloadTooLong`] if the report does not fit.
    pub fn report(tx_id: u32, rx_id: u32, id: u8, report: &[u8]) -> Result<Self, RfError> {
        let mut packet = Self::empty(tx_id, rx_id);
        packet.payload.push(id).map_err(|_| RfError::PayloadTooLong)?;
        packet
            .payload
            .extend_from_slice(report)
            .map_err(|_| RfError::PayloadTooLong)?;
        Ok(packet)
    }

    /// Acknowledgement carrying a pending command as `[cmd, is_read, data...]`.
    ///
    /// # Errors
    ///
    /// [`RfError::PayloadTooLong`] if the command data exceeds
    /// [`MAX_ACK_DATA`].
    pub fn ack(tx_id: u32, rx_id: u32, frame: &ControlFrame) -> Result<Self, RfError> {
        if frame.payload.len() > MAX_ACK_DATA {
            return Err(RfError::PayloadTooLong);
        }
        let mut packet = Self::empty(tx_id, rx_id);
        let is_read = u8::from(frame.kind == ControlKind::Read);
        // Capacity checked above.
        let _ = packet.payload.push(frame.cmd);
        let _ = packet.payload.push(is_read);
        let _ = packet.payload.extend_from_slice(&frame.payload);
        Ok(packet)
    }

    /// Whether this packet is addressed to the node whose own id is `local_tx_id`.
    #[inline]
    #[must_use]
    pub fn is_for(&self, local_tx_id: u32) -> bool {
        self.rx_id == local_tx_id
    }

    /// Interpret the payload as an acknowledgement command.
    ///
    /// Returns `None` for an empty ack (nothing pending on the peer).
    #[must_use]
    pub fn ack_command(&self) -> Option<ControlFrame> {
        let (&cmd, rest) = self.payload.split_first()?;
        let (&is_read, data) = rest.split_first()?;
        let kind = if is_read != 0 {
            ControlKind::Read
        } else {
            ControlKind::Write
        };
        let data = &data[..data.len().min(MAX_CONTROL_PAYLOAD)];
        ControlFrame::with_payload(kind, cmd, data)
    }

    /// Encode into `buf`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// [`RfError::BufferTooSmall`] if `buf` cannot hold the packet.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, RfError> {
        let total = RF_HEADER_LEN + self.payload.len();
        if buf.len() < total {
            return Err(RfError::BufferTooSmall);
        }
        buf[0..4].copy_from_slice(&self.tx_id.to_le_bytes());
        buf[4..8].copy_from_slice(&self.rx_id.to_le_bytes());
        buf[RF_HEADER_LEN..total].copy_from_slice(&self.payload);
        Ok(total)
    }

    /// Decode a received packet.
    ///
    /// # Errors
    ///
    /// [`RfError::Truncated`] if the header is incomplete,
    /// [`RfError::PayloadTooLong`] if the payload is oversized.
    pub fn decode(bytes: &[u8]) -> Result<Self, RfError> {
        if bytes.len() < RF_HEADER_LEN {
            return Err(RfError::Truncated);
        }
        let tx_id = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let rx_id = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let payload =
            Vec::from_slice(&bytes[RF_HEADER_LEN..]).map_err(|_| RfError::PayloadTooLong)?;
        Ok(Self {
            tx_id,
            rx_id,
            payload,
        })
    }
}
