//! Send-side link framing.
//!
//! All encoders write `marker, length, id, payload` into a caller buffer and
//! return the number of bytes written. With the `embedded-io` feature the
//! `write_*` variants write straight into a UART or any other
//! [`embedded_io::Write`].
//!
//! # Example
//!
//! ```
//! use link_proto::{encode_report, ReportId, MAX_FRAME_LEN};
//!
//! let mut buf = [0u8; MAX_FRAME_LEN];
//! let len = encode_report(ReportId::XInput, &[0x00, 0x14], &mut buf).unwrap();
//! assert_eq!(&buf[..len], &[0x7E, 3, 1, 0x00, 0x14]);
//! ```

use crate::frame::{
    ControlFrame, FrameMarker, ReportId, FRAME_HEADER_LEN, MAX_CONTROL_PAYLOAD, MAX_REPORT_PAYLOAD,
};
#[cfg(feature = "embedded-io")]
use crate::frame::MAX_FRAME_LEN;

/// Error type for frame encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// The output buffer cannot hold the frame.
    BufferTooSmall,
    /// The payload is larger than the frame kind allows.
    PayloadTooLong,
    /// A write operation failed (for I/O adapters).
    WriteError,
}

impl core::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BufferTooSmall => write!(f, "buffer too small"),
            Self::PayloadTooLong => write!(f, "payload too long"),
            Self::WriteError => write!(f, "write error"),
        }
    }
}

/// Encode a frame with an arbitrary marker.
///
/// `Done` is encoded as the bare marker byte; `id` and `payload` are ignored.
///
/// # Errors
///
/// [`EncodeError::PayloadTooLong`] if `payload` exceeds
/// [`MAX_REPORT_PAYLOAD`], [`EncodeError::BufferTooSmall`] if `buf` cannot
/// hold the frame.
pub fn encode_frame(
    marker: FrameMarker,
    id: u8,
    payload: &[u8],
    buf: &mut [u8],
) -> Result<usize, EncodeError> {
    if marker == FrameMarker::Done {
        return encode_done(buf);
    }
    if payload.len() > MAX_REPORT_PAYLOAD {
        return Err(EncodeError::PayloadTooLong);
    }
    let total = FRAME_HEADER_LEN + payload.len();
    if buf.len() < total {
        return Err(EncodeError::BufferTooSmall);
    }
    buf[0] = marker.byte();
    // Bounded by MAX_REPORT_PAYLOAD above, fits in a byte.
    buf[1] = (payload.len() + 1) as u8;
    buf[2] = id;
    buf[FRAME_HEADER_LEN..total].copy_from_slice(payload);
    Ok(total)
}

/// Encode a report frame.
///
/// # Errors
///
/// See [`encode_frame`].
#[inline]
pub fn encode_report(id: ReportId, payload: &[u8], buf: &mut [u8]) -> Result<usize, EncodeError> {
    encode_frame(FrameMarker::Report, id.byte(), payload, buf)
}

/// Encode a feature read/write frame.
///
/// # Errors
///
/// See [`encode_frame`]. Control payloads are limited to
/// [`MAX_CONTROL_PAYLOAD`], which [`ControlFrame`] already enforces.
#[inline]
pub fn encode_control(frame: &ControlFrame, buf: &mut [u8]) -> Result<usize, EncodeError> {
    debug_assert!(frame.payload.len() <= MAX_CONTROL_PAYLOAD);
    encode_frame(frame.kind.marker(), frame.cmd, &frame.payload, buf)
}

/// Encode the one-byte ready marker.
///
/// # Errors
///
/// [`EncodeError::BufferTooSmall`] if `buf` is empty.
#[inline]
pub fn encode_done(buf: &mut [u8]) -> Result<usize, EncodeError> {
    let slot = buf.first_mut().ok_or(EncodeError::BufferTooSmall)?;
    *slot = FrameMarker::Done.byte();
    Ok(1)
}

/// Write a report frame to an `embedded_io::Write`.
///
/// # Errors
///
/// Any [`encode_report`] error, or [`EncodeError::WriteError`] if the write
/// fails.
#[cfg(feature = "embedded-io")]
pub fn write_report<W: embedded_io::Write>(
    writer: &mut W,
    id: ReportId,
    payload: &[u8],
) -> Result<(), EncodeError> {
    let mut buf = [0u8; MAX_FRAME_LEN];
    let len = encode_report(id, payload, &mut buf)?;
    writer
        .write_all(&buf[..len])
        .map_err(|_| EncodeError::WriteError)
}

/// Write a control frame to an `embedded_io::Write`.
///
/// # Errors
///
/// Any [`encode_control`] error, or [`EncodeError::WriteError`] if the write
/// fails.
#[cfg(feature = "embedded-io")]
pub fn write_control<W: embedded_io::Write>(
    writer: &mut W,
    frame: &ControlFrame,
) -> Result<(), EncodeError> {
    let mut buf = [0u8; MAX_FRAME_LEN];
    let len = encode_control(frame, &mut buf)?;
    writer
        .write_all(&buf[..len])
        .map_err(|_| EncodeError::WriteError)
}

/// Write the ready marker to an `embedded_io::Write`.
///
/// # Errors
///
/// [`EncodeError::WriteError`] if the write fails.
#[cfg(feature = "embedded-io")]
pub fn write_done<W: embedded_io::Write>(writer: &mut W) -> Result<(), EncodeError> {
    writer
        .write_all(&[FrameMarker::Done.byte()])
        .map_err(|_| EncodeError::WriteError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{ControlKind, MAX_FRAME_LEN};

    #[test]
    fn test_report_layout() {
        let mut buf = [0u8; MAX_FRAME_LEN];
        let len = encode_report(ReportId::Midi, &[0x09, 0x90], &mut buf).unwrap();
        assert_eq!(&buf[..len], &[0x7E, 3, 5, 0x09, 0x90]);
    }

    #[test]
    fn test_empty_payload_has_length_one() {
        let mut buf = [0u8; 8];
        let len = encode_report(ReportId::Gamepad, &[], &mut buf).unwrap();
        assert_eq!(&buf[..len], &[0x7E, 1, 2]);
    }

    #[test]
    fn test_control_layout() {
        let frame = ControlFrame::with_payload(ControlKind::Read, 0x32, &[0x10, 0x00, 8]).unwrap();
        let mut buf = [0u8; MAX_FRAME_LEN];
        let len = encode_control(&frame, &mut buf).unwrap();
        assert_eq!(&buf[..len], &[0x7C, 4, 0x32, 0x10, 0x00, 8]);
    }

    #[test]
    fn test_done_is_single_byte() {
        let mut buf = [0u8; 4];
        assert_eq!(encode_frame(FrameMarker::Done, 9, &[1, 2], &mut buf), Ok(1));
        assert_eq!(buf[0], 0x7F);
        assert_eq!(encode_done(&mut []), Err(EncodeError::BufferTooSmall));
    }

    #[test]
    fn test_payload_too_long() {
        let payload = [0u8; MAX_REPORT_PAYLOAD + 1];
        let mut buf = [0u8; MAX_FRAME_LEN + 8];
        assert_eq!(
            encode_report(ReportId::XInput, &payload, &mut buf),
            Err(EncodeError::PayloadTooLong)
        );
    }

    #[test]
    fn test_buffer_too_small() {
        let mut buf = [0u8; 4];
        assert_eq!(
            encode_report(ReportId::XInput, &[1, 2], &mut buf),
            Err(EncodeError::BufferTooSmall)
        );
    }

    #[test]
    fn test_largest_frame_fits_max_len() {
        let payload = [0xA5u8; MAX_REPORT_PAYLOAD];
        let mut buf = [0u8; MAX_FRAME_LEN];
        assert_eq!(
            encode_report(ReportId::XInput, &payload, &mut buf),
            Ok(MAX_FRAME_LEN)
        );
        assert_eq!(buf[1] as usize, MAX_REPORT_PAYLOAD + 1);
    }

    #[cfg(feature = "embedded-io")]
    #[test]
    fn test_write_report_to_io() {
        extern crate std;
        use std::vec::Vec;

        struct VecWriter(Vec<u8>);

        impl embedded_io::ErrorType for VecWriter {
            type Error = core::convert::Infallible;
        }

        impl embedded_io::Write for VecWriter {
            fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
                self.0.extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> Result<(), Self::Error> {
                Ok(())
            }
        }

        let mut w = VecWriter(Vec::new());
        write_report(&mut w, ReportId::Keyboard, &[0, 0, 4]).unwrap();
        write_done(&mut w).unwrap();
        assert_eq!(w.0, [0x7E, 4, 3, 0, 0, 4, 0x7F]);
    }
}
