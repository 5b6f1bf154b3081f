//! Controller state to HID report conversion.

use link_proto::ReportId;

use crate::state::{ControllerState, STATE_LEN};
use crate::subtype::Subtype;

/// Encodes a state snapshot into the report layout of a USB personality.
///
/// Byte layouts are profile specific and live with the board support code;
/// the core only needs to know which report channel the bytes belong to.
pub trait ReportEncoder {
    /// Write the report for `subtype` into `buf`.
    ///
    /// Returns the channel and the number of bytes written, or `None` if this
    /// encoder has nothing to send for the subtype or `buf` is too small.
    fn encode(
        &mut self,
        subtype: Subtype,
        state: &ControllerState,
        buf: &mut [u8],
    ) -> Option<(ReportId, usize)>;
}

/// Sends the canonical [`ControllerState`] bytes on the subtype's channel.
///
/// Useful when the bridge re-encodes on its side, and in tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct CanonicalEncoder;

impl ReportEncoder for CanonicalEncoder {
    fn encode(
        &mut self,
        subtype: Subtype,
        state: &ControllerState,
        buf: &mut [u8],
    ) -> Option<(ReportId, usize)> {
        let out = buf.get_mut(..STATE_LEN)?;
        out.copy_from_slice(&state.to_bytes());
        Some((subtype.report_id(), STATE_LEN))
    }
}
