//! In-memory form of the persisted configuration and its byte layout.
//!
//! ```text
//! offset  field
//!  0      signature      u32
//!  4      version        u16
//!  6      device_subtype u8
//!  7      input_type     u8
//!  8      pins           [pin u8, flags u8; 21]
//! 50      axis_scale     [multiplier i16, offset i16, deadzone i16; 6]
//! 86      debounce       buttons u8, strum u8, combined_strum u8
//! 89      neck           u8 flags
//! 90      tilt           orientation u8, sensitivity u8
//! 92      deque          u8
//! 93      rf             enabled u8, id u32
//! 98      end
//! ```
//!
//! All multi-byte fields are little-endian. Every byte pattern decodes, so
//! the store can load whatever it finds and decide from the signature.

use crate::state::{Axis, Buttons};
use crate::subtype::Subtype;

/// Marks a region as holding a configuration.
pub const SIGNATURE: u32 = 0x0015_D4A2;

/// Layout version written by this firmware.
pub const CONFIG_VERSION: u16 = 18;

/// Encoded size.
pub const CONFIG_LEN: usize = 98;

/// Offset of the subtype byte, patched in place by quick subtype writes.
pub const SUBTYPE_OFFSET: usize = 6;

/// Pin number meaning "not connected".
pub const INVALID_PIN: u8 = 0xFF;

const VERSION_AT: usize = 4;
const INPUT_TYPE_AT: usize = 7;
const PINS_AT: usize = 8;
const AXIS_SCALE_AT: usize = 50;
const DEBOUNCE_AT: usize = 86;
const NECK_AT: usize = 89;
const TILT_AT: usize = 90;
const DEQUE_AT: usize = 92;
const RF_AT: usize = 93;

/// Where inputs come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum InputType {
    /// GPIO and ADC pins on this board.
    Direct = 0,
    /// A Wii extension controller on I2C.
    Wii = 1,
    /// A PS2 controller on SPI.
    Ps2 = 2,
}

/// One entry of the pin table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinConfig {
    pub pin: u8,
    pub inverted: bool,
}

impl PinConfig {
    pub const UNUSED: Self = Self::new(INVALID_PIN);

    #[must_use]
    pub const fn new(pin: u8) -> Self {
        Self {
            pin,
            inverted: false,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_connected(self) -> bool {
        self.pin != INVALID_PIN
    }
}

/// Digital entries in the pin table.
pub const DIGITAL_PIN_COUNT: usize = Buttons::DIGITAL.len();

/// Entries in the pin table.
pub const PIN_COUNT: usize = DIGITAL_PIN_COUNT + Axis::COUNT;

/// Pin table: one entry per digital button in [`Buttons::DIGITAL`] order,
/// then one per [`Axis`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pins(pub [PinConfig; PIN_COUNT]);

impl Pins {
    pub const DIGITAL_COUNT: usize = DIGITAL_PIN_COUNT;
    pub const COUNT: usize = PIN_COUNT;

    /// Index of the pin feeding `axis`.
    #[inline]
    #[must_use]
    pub const fn axis_index(axis: Axis) -> usize {
        Self::DIGITAL_COUNT + axis.index()
    }

    #[inline]
    #[must_use]
    pub fn axis(&self, axis: Axis) -> PinConfig {
        self.0[Self::axis_index(axis)]
    }

    #[inline]
    pub fn axis_mut(&mut self, axis: Axis) -> &mut PinConfig {
        &mut self.0[Self::axis_index(axis)]
    }

    /// Digital pins paired with the button they drive.
    pub fn digital(&self) -> impl Iterator<Item = (Buttons, PinConfig)> + '_ {
        Buttons::DIGITAL.iter().copied().zip(self.0.iter().copied())
    }
}

/// Linear calibration for one analog axis.
///
/// `value = (raw - offset) * multiplier / 1024`, then zeroed inside the
/// deadzone and clamped to the `i16` range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisScale {
    pub multiplier: i16,
    pub offset: i16,
    pub deadzone: i16,
}

impl AxisScale {
    /// Unit gain, no offset, no deadzone.
    pub const IDENTITY: Self = Self {
        multiplier: 1024,
        offset: 0,
        deadzone: 0,
    };

    #[must_use]
    pub fn apply(self, raw: i16) -> i16 {
        let centered = i32::from(raw) - i32::from(self.offset);
        let scaled = centered * i32::from(self.multiplier) / 1024;
        if scaled.abs() < i32::from(self.deadzone) {
            return 0;
        }
        // Clamped, so the cast is exact.
        scaled.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
    }
}

/// Debounce windows, in tenths of a millisecond since version 18.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Debounce {
    pub buttons: u8,
    pub strum: u8,
    /// Debounce strum up and down as one input.
    pub combined_strum: bool,
}

/// Guitar neck peripherals; bitmask of [`NeckFlags::GH5`] and friends.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NeckFlags(pub u8);

impl NeckFlags {
    pub const GH5: Self = Self(1 << 0);
    pub const GH5_BAR: Self = Self(1 << 1);
    pub const WORLD_TOUR: Self = Self(1 << 2);
    pub const WII: Self = Self(1 << 3);
    pub const PS2: Self = Self(1 << 4);
    pub const NONE: Self = Self(0);

    #[inline]
    #[must_use]
    pub const fn contains(self, flag: NeckFlags) -> bool {
        (self.0 & flag.0) == flag.0
    }
}

/// Tilt sensor orientation. Since version 14 only the axis is stored; the
/// sign comes from the axis inversion flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Orientation {
    Z = 0,
    Y = 1,
    X = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tilt {
    /// Raw [`Orientation`] byte.
    pub orientation: u8,
    pub sensitivity: u8,
}

/// Wireless link settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RfConfig {
    /// Receive inputs from a wireless controller instead of local pins.
    pub enabled: bool,
    /// Paired peer id.
    pub id: u32,
}

/// The full configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub signature: u32,
    pub version: u16,
    pub subtype: Subtype,
    /// Raw [`InputType`] byte.
    pub input_type: u8,
    pub pins: Pins,
    pub axis_scale: [AxisScale; Axis::COUNT],
    pub debounce: Debounce,
    pub neck: NeckFlags,
    pub tilt: Tilt,
    /// Queue inputs and replay them at the poll rate.
    pub deque: bool,
    pub rf: RfConfig,
}

/// Factory pin assignment for a Pico: buttons on GPIO 0..=14, sticks on the
/// ADC pins.
const DEFAULT_PINS: Pins = {
    let mut pins = [PinConfig::UNUSED; Pins::COUNT];
    let mut i = 0;
    while i < Pins::DIGITAL_COUNT {
        // Buttons pull to ground when pressed.
        pins[i] = PinConfig {
            pin: i as u8,
            inverted: true,
        };
        i += 1;
    }
    pins[Pins::axis_index(Axis::LeftX)] = PinConfig::new(26);
    pins[Pins::axis_index(Axis::LeftY)] = PinConfig::new(27);
    pins[Pins::axis_index(Axis::RightX)] = PinConfig::new(28);
    Pins(pins)
};

/// Debounce defaults in current units.
pub const DEFAULT_DEBOUNCE: Debounce = Debounce {
    buttons: 50,
    strum: 20,
    combined_strum: false,
};

/// The compiled-in configuration written on first boot or reset.
pub const DEFAULT_CONFIG: Config = Config {
    signature: SIGNATURE,
    version: CONFIG_VERSION,
    subtype: Subtype::XINPUT_GAMEPAD,
    input_type: InputType::Direct as u8,
    pins: DEFAULT_PINS,
    axis_scale: [AxisScale::IDENTITY; Axis::COUNT],
    debounce: DEFAULT_DEBOUNCE,
    neck: NeckFlags::NONE,
    tilt: Tilt {
        orientation: Orientation::Z as u8,
        sensitivity: 0,
    },
    deque: false,
    rf: RfConfig {
        enabled: false,
        id: 0,
    },
};

impl Default for Config {
    fn default() -> Self {
        DEFAULT_CONFIG
    }
}

fn read_u16(b: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([b[at], b[at + 1]])
}

fn read_i16(b: &[u8], at: usize) -> i16 {
    i16::from_le_bytes([b[at], b[at + 1]])
}

fn read_u32(b: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

impl Config {
    #[inline]
    #[must_use]
    pub fn has_signature(&self) -> bool {
        self.signature == SIGNATURE
    }

    #[must_use]
    pub fn input_type(&self) -> Option<InputType> {
        match self.input_type {
            0 => Some(InputType::Direct),
            1 => Some(InputType::Wii),
            2 => Some(InputType::Ps2),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; CONFIG_LEN] {
        let mut b = [0u8; CONFIG_LEN];
        b[0..VERSION_AT].copy_from_slice(&self.signature.to_le_bytes());
        b[VERSION_AT..SUBTYPE_OFFSET].copy_from_slice(&self.version.to_le_bytes());
        b[SUBTYPE_OFFSET] = self.subtype.raw();
        b[INPUT_TYPE_AT] = self.input_type;
        for (i, pin) in self.pins.0.iter().enumerate() {
            b[PINS_AT + i * 2] = pin.pin;
            b[PINS_AT + i * 2 + 1] = u8::from(pin.inverted);
        }
        for (i, scale) in self.axis_scale.iter().enumerate() {
            let at = AXIS_SCALE_AT + i * 6;
            b[at..at + 2].copy_from_slice(&scale.multiplier.to_le_bytes());
            b[at + 2..at + 4].copy_from_slice(&scale.offset.to_le_bytes());
            b[at + 4..at + 6].copy_from_slice(&scale.deadzone.to_le_bytes());
        }
        b[DEBOUNCE_AT] = self.debounce.buttons;
        b[DEBOUNCE_AT + 1] = self.debounce.strum;
        b[DEBOUNCE_AT + 2] = u8::from(self.debounce.combined_strum);
        b[NECK_AT] = self.neck.0;
        b[TILT_AT] = self.tilt.orientation;
        b[TILT_AT + 1] = self.tilt.sensitivity;
        b[DEQUE_AT] = u8::from(self.deque);
        b[RF_AT] = u8::from(self.rf.enabled);
        b[RF_AT + 1..CONFIG_LEN].copy_from_slice(&self.rf.id.to_le_bytes());
        b
    }

    /// Decode a stored image. Flag bytes other than bit 0 are ignored.
    #[must_use]
    pub fn from_bytes(b: &[u8; CONFIG_LEN]) -> Self {
        let mut pins = [PinConfig::UNUSED; Pins::COUNT];
        for (i, pin) in pins.iter_mut().enumerate() {
            *pin = PinConfig {
                pin: b[PINS_AT + i * 2],
                inverted: b[PINS_AT + i * 2 + 1] & 1 != 0,
            };
        }
        let mut axis_scale = [AxisScale::IDENTITY; Axis::COUNT];
        for (i, scale) in axis_scale.iter_mut().enumerate() {
            let at = AXIS_SCALE_AT + i * 6;
            *scale = AxisScale {
                multiplier: read_i16(b, at),
                offset: read_i16(b, at + 2),
                deadzone: read_i16(b, at + 4),
            };
        }
        Self {
            signature: read_u32(b, 0),
            version: read_u16(b, VERSION_AT),
            subtype: Subtype(b[SUBTYPE_OFFSET]),
            input_type: b[INPUT_TYPE_AT],
            pins: Pins(pins),
            axis_scale,
            debounce: Debounce {
                buttons: b[DEBOUNCE_AT],
                strum: b[DEBOUNCE_AT + 1],
                combined_strum: b[DEBOUNCE_AT + 2] & 1 != 0,
            },
            neck: NeckFlags(b[NECK_AT]),
            tilt: Tilt {
                orientation: b[TILT_AT],
                sensitivity: b[TILT_AT + 1],
            },
            deque: b[DEQUE_AT] & 1 != 0,
            rf: RfConfig {
                enabled: b[RF_AT] & 1 != 0,
                id: read_u32(b, RF_AT + 1),
            },
        }
    }
}
