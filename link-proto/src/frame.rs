//! Frame markers, report identifiers and the control frame type.
//!
//! Every frame on the link has the same header:
//!
//! ```text
//! <marker> <length> <id> <payload...>
//! ```
//!
//! `length` counts the id byte plus the payload bytes, so a frame with an
//! empty payload has `length == 1`. The [`FrameMarker::Done`] marker is a bare
//! byte with no header.

use heapless::Vec;

/// Largest report payload carried in one frame (one full-speed USB packet).
pub const MAX_REPORT_PAYLOAD: usize = 64;

/// Largest control (feature report) payload carried in one frame.
pub const MAX_CONTROL_PAYLOAD: usize = 32;

/// Bytes of header before the payload: marker, length, id.
pub const FRAME_HEADER_LEN: usize = 3;

/// Size of the largest encoded frame.
pub const MAX_FRAME_LEN: usize = FRAME_HEADER_LEN + MAX_REPORT_PAYLOAD;

/// First byte of every frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FrameMarker {
    /// Report data bound for a USB endpoint.
    Report = 0x7E,
    /// Host wrote a feature report; `id` is the command opcode.
    FeatureWrite = 0x7D,
    /// Host requested a feature report; `id` is the command opcode.
    FeatureRead = 0x7C,
    /// The far side's endpoint is ready for more data.
    Done = 0x7F,
}

impl FrameMarker {
    /// Raw byte value.
    #[inline]
    #[must_use]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Marker for a raw byte, if it is one.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x7E => Some(Self::Report),
            0x7D => Some(Self::FeatureWrite),
            0x7C => Some(Self::FeatureRead),
            0x7F => Some(Self::Done),
            _ => None,
        }
    }
}

/// Logical report channel carried in the id byte of a report frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ReportId {
    /// Feature report replies for the USB control endpoint.
    Control = 0,
    /// Vendor (XInput) gamepad report.
    XInput = 1,
    /// Console-specific HID gamepad report.
    Gamepad = 2,
    /// Boot keyboard report.
    Keyboard = 3,
    /// Mouse report.
    Mouse = 4,
    /// MIDI event packet.
    Midi = 5,
}

impl ReportId {
    /// Number of defined report ids; the routing table has this many rows.
    pub const COUNT: usize = 6;

    /// Raw byte value.
    #[inline]
    #[must_use]
    pub const fn byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for ReportId {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Control),
            1 => Ok(Self::XInput),
            2 => Ok(Self::Gamepad),
            3 => Ok(Self::Keyboard),
            4 => Ok(Self::Mouse),
            5 => Ok(Self::Midi),
            other => Err(other),
        }
    }
}

/// Direction of a control frame, as seen from the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlKind {
    /// SET_REPORT: the host is sending a command.
    Write,
    /// GET_REPORT: the host expects a reply on the control channel.
    Read,
}

impl ControlKind {
    /// Marker that introduces frames of this kind.
    #[inline]
    #[must_use]
    pub const fn marker(self) -> FrameMarker {
        match self {
            Self::Write => FrameMarker::FeatureWrite,
            Self::Read => FrameMarker::FeatureRead,
        }
    }
}

/// A complete feature-report frame: command opcode plus its payload.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlFrame {
    pub kind: ControlKind,
    pub cmd: u8,
    pub payload: Vec<u8, MAX_CONTROL_PAYLOAD>,
}

impl ControlFrame {
    /// Empty frame for the given opcode.
    #[must_use]
    pub const fn new(kind: ControlKind, cmd: u8) -> Self {
        Self {
            kind,
            cmd,
            payload: Vec::new(),
        }
    }

    /// Frame with a payload copied from `data`.
    ///
    /// Returns `None` if `data` exceeds [`MAX_CONTROL_PAYLOAD`].
    #[must_use]
    pub fn with_payload(kind: ControlKind, cmd: u8, data: &[u8]) -> Option<Self> {
        let payload = Vec::from_slice(data).ok()?;
        Some(Self { kind, cmd, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_bytes_roundtrip() {
        for marker in [
            FrameMarker::Report,
            FrameMarker::FeatureWrite,
            FrameMarker::FeatureRead,
            FrameMarker::Done,
        ] {
            assert_eq!(FrameMarker::from_byte(marker.byte()), Some(marker));
        }
        assert_eq!(FrameMarker::from_byte(0x00), None);
    }

    #[test]
    fn test_report_id_unknown() {
        assert_eq!(ReportId::try_from(2), Ok(ReportId::Gamepad));
        assert_eq!(ReportId::try_from(6), Err(6));
    }

    #[test]
    fn test_control_frame_payload_limit() {
        let data = [0xAA; MAX_CONTROL_PAYLOAD + 1];
        assert!(ControlFrame::with_payload(ControlKind::Write, 0x30, &data).is_none());
        let frame =
            ControlFrame::with_payload(ControlKind::Write, 0x30, &data[..MAX_CONTROL_PAYLOAD])
                .unwrap();
        assert_eq!(frame.payload.len(), MAX_CONTROL_PAYLOAD);
    }
}
