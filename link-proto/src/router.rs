//! Static routing table from report id to USB endpoint.

use crate::frame::ReportId;

/// Physical USB endpoint on the bridge side of the link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Endpoint {
    /// Endpoint 0; carries feature report replies.
    Control,
    /// Vendor interrupt IN endpoint used by the XInput profile.
    XInput,
    /// Shared HID interrupt IN endpoint (gamepad, keyboard, mouse).
    Hid,
    /// MIDI streaming IN endpoint.
    Midi,
}

/// Where a report id goes and whether its id byte is part of the USB report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Route {
    pub endpoint: Endpoint,
    /// `false` when the endpoint carries a single report type and the id byte
    /// must not reach the host. XInput reports carry their own
    /// `[type, length]` header.
    pub forward_id: bool,
}

impl Route {
    const fn new(endpoint: Endpoint, forward_id: bool) -> Self {
        Self {
            endpoint,
            forward_id,
        }
    }
}

/// Indexed by [`ReportId`] value.
const ROUTES: [Route; ReportId::COUNT] = [
    Route::new(Endpoint::Control, false),
    Route::new(Endpoint::XInput, false),
    Route::new(Endpoint::Hid, false),
    Route::new(Endpoint::Hid, true),
    Route::new(Endpoint::Hid, true),
    Route::new(Endpoint::Midi, false),
];

/// Look up the route for a raw id byte. Unknown ids have no route.
#[inline]
#[must_use]
pub fn route(id: u8) -> Option<Route> {
    ROUTES.get(id as usize).copied()
}

/// Look up the route for a known report id.
#[inline]
#[must_use]
pub const fn route_of(id: ReportId) -> Route {
    ROUTES[id as usize]
}
