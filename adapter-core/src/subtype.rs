//! Device subtypes: which USB personality the adapter presents.
//!
//! Stored as a raw byte in the configuration, so unknown values survive a
//! round trip. The numbering is the current one; configurations written
//! before version 17 use the older numbering and are remapped on load.

use link_proto::{route_of, Endpoint, ReportId};

/// Device subtype byte.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Subtype(pub u8);

impl Subtype {
    pub const XINPUT_GAMEPAD: Self = Self(1);
    pub const XINPUT_WHEEL: Self = Self(2);
    pub const XINPUT_ARCADE_STICK: Self = Self(3);
    pub const XINPUT_FLIGHT_STICK: Self = Self(4);
    pub const XINPUT_DANCE_PAD: Self = Self(5);
    pub const XINPUT_LIVE_GUITAR: Self = Self(6);
    pub const XINPUT_ROCK_BAND_GUITAR: Self = Self(7);
    pub const XINPUT_GUITAR_HERO_GUITAR: Self = Self(8);
    pub const XINPUT_ROCK_BAND_DRUMS: Self = Self(9);
    pub const XINPUT_GUITAR_HERO_DRUMS: Self = Self(10);
    pub const XINPUT_GUITAR_BASS: Self = Self(11);
    pub const XINPUT_DRUMS: Self = Self(12);
    pub const XINPUT_ARCADE_PAD: Self = Self(13);
    pub const XINPUT_TURNTABLE: Self = Self(14);
    pub const PS3_GAMEPAD: Self = Self(15);
    pub const SWITCH_GAMEPAD: Self = Self(16);
    pub const PS3_TURNTABLE: Self = Self(17);
    pub const PS3_GUITAR_HERO_GUITAR: Self = Self(18);
    pub const PS3_ROCK_BAND_GUITAR: Self = Self(19);
    pub const PS3_GUITAR_HERO_DRUMS: Self = Self(20);
    pub const PS3_ROCK_BAND_DRUMS: Self = Self(21);
    pub const WII_ROCK_BAND_GUITAR: Self = Self(22);
    pub const WII_ROCK_BAND_DRUMS: Self = Self(23);
    pub const WII_LIVE_GUITAR: Self = Self(24);
    pub const KEYBOARD_GAMEPAD: Self = Self(25);
    pub const KEYBOARD_GUITAR: Self = Self(26);
    pub const KEYBOARD_DRUMS: Self = Self(27);
    pub const MIDI_GAMEPAD: Self = Self(28);
    pub const MIDI_GUITAR: Self = Self(29);
    pub const MIDI_DRUMS: Self = Self(30);

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn is_guitar(self) -> bool {
        matches!(self.0, 6 | 7 | 8 | 11 | 18 | 19 | 22 | 24 | 26 | 29)
    }

    #[must_use]
    pub const fn is_drum(self) -> bool {
        matches!(self.0, 9 | 10 | 12 | 20 | 21 | 23 | 27 | 30)
    }

    #[must_use]
    pub const fn is_dj(self) -> bool {
        matches!(self.0, 14 | 17)
    }

    /// Report channel this personality sends its input on.
    #[must_use]
    pub const fn report_id(self) -> ReportId {
        if self.0 < Self::PS3_GAMEPAD.0 {
            ReportId::XInput
        } else if self.0 < Self::KEYBOARD_GAMEPAD.0 {
            ReportId::Gamepad
        } else if self.0 < Self::MIDI_GAMEPAD.0 {
            ReportId::Keyboard
        } else {
            ReportId::Midi
        }
    }

    /// USB endpoint the bridge watches for readiness with this personality.
    #[must_use]
    pub const fn endpoint(self) -> Endpoint {
        route_of(self.report_id()).endpoint
    }

    /// Translate a subtype stored before version 17 into the current
    /// numbering.
    ///
    /// Three insertions happened at once: a turntable after the XInput arcade
    /// pad, a Switch gamepad and a PS3 turntable after the PS3 gamepad, and a
    /// Wii Live guitar after the Wii drums. The thresholds are checked in that
    /// order against the progressively shifted value.
    #[must_use]
    pub const fn from_legacy(raw: u8) -> Self {
        let mut v = raw;
        if v > Self::XINPUT_ARCADE_PAD.0 {
            v = v.saturating_add(Self::XINPUT_TURNTABLE.0 - Self::XINPUT_ARCADE_PAD.0);
            if v > Self::PS3_GAMEPAD.0 {
                v = v.saturating_add(2);
            }
            if v > Self::WII_ROCK_BAND_DRUMS.0 {
                v = v.saturating_add(1);
            }
        }
        Self(v)
    }
}

impl From<u8> for Subtype {
    fn from(raw: u8) -> Self {
        Self(raw)
    }
}
