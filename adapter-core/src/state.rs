//! Canonical controller state: Buttons, Axis, ControllerState.

use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// Button state bitfield in XInput bit order.
///
/// # Example
///
/// ```
/// use adapter_core::Buttons;
///
/// let buttons = Buttons::A | Buttons::START;
/// assert!(buttons.contains(Buttons::A));
/// assert!(!buttons.contains(Buttons::B));
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Buttons(pub u16);

impl Buttons {
    pub const DPAD_UP: Self = Self(1 << 0);
    pub const DPAD_DOWN: Self = Self(1 << 1);
    pub const DPAD_LEFT: Self = Self(1 << 2);
    pub const DPAD_RIGHT: Self = Self(1 << 3);
    pub const START: Self = Self(1 << 4);
    pub const BACK: Self = Self(1 << 5);
    pub const LS: Self = Self(1 << 6); // Left stick press
    pub const RS: Self = Self(1 << 7); // Right stick press
    pub const LB: Self = Self(1 << 8);
    pub const RB: Self = Self(1 << 9);
    pub const GUIDE: Self = Self(1 << 10);
    // Bit 11 is unused by XInput.
    pub const A: Self = Self(1 << 12);
    pub const B: Self = Self(1 << 13);
    pub const X: Self = Self(1 << 14);
    pub const Y: Self = Self(1 << 15);

    pub const NONE: Self = Self(0);

    /// Buttons in pin-table order (see [`crate::config::Pins`]).
    pub const DIGITAL: [Self; 15] = [
        Self::DPAD_UP,
        Self::DPAD_DOWN,
        Self::DPAD_LEFT,
        Self::DPAD_RIGHT,
        Self::START,
        Self::BACK,
        Self::LS,
        Self::RS,
        Self::LB,
        Self::RB,
        Self::GUIDE,
        Self::A,
        Self::B,
        Self::X,
        Self::Y,
    ];

    #[inline]
    #[must_use]
    pub const fn contains(self, button: Buttons) -> bool {
        (self.0 & button.0) == button.0
    }

    #[inline]
    pub fn set(&mut self, button: Buttons, pressed: bool) {
        if pressed {
            self.0 |= button.0;
        } else {
            self.0 &= !button.0;
        }
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Buttons {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Buttons {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Buttons {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for Buttons {
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for Buttons {
    type Output = Self;

    #[inline]
    fn not(self) -> Self::Output {
        Self(!self.0)
    }
}

/// Analog axis slot in [`ControllerState::axes`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Axis {
    LeftTrigger = 0,
    RightTrigger = 1,
    LeftX = 2,
    LeftY = 3,
    /// Whammy bar on guitars.
    RightX = 4,
    /// Tilt on guitars.
    RightY = 5,
}

impl Axis {
    pub const COUNT: usize = 6;

    pub const ALL: [Self; Self::COUNT] = [
        Self::LeftTrigger,
        Self::RightTrigger,
        Self::LeftX,
        Self::LeftY,
        Self::RightX,
        Self::RightY,
    ];

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Size of the encoded state.
pub const STATE_LEN: usize = 17;

const BUTTONS_AT: usize = 0;
const HAT_AT: usize = 2;
const AXES_AT: usize = 3;
const COUNTER_AT: usize = 15;

/// One sample of every input.
///
/// Encoded little-endian as:
///
/// ```text
/// 0..2   buttons
/// 2      hat
/// 3..15  axes[0..6]
/// 15..17 counter
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerState {
    pub buttons: Buttons,
    pub axes: [i16; Axis::COUNT],
    /// Hat direction, `0..8` clockwise from up; [`Self::HAT_CENTER`] when
    /// released.
    pub hat: u8,
    /// Incremented once per sample.
    pub counter: u16,
}

impl ControllerState {
    pub const HAT_CENTER: u8 = 0x08;

    /// Nothing pressed, axes centered.
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            buttons: Buttons::NONE,
            axes: [0; Axis::COUNT],
            hat: Self::HAT_CENTER,
            counter: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn axis(&self, axis: Axis) -> i16 {
        self.axes[axis.index()]
    }

    #[inline]
    pub fn set_axis(&mut self, axis: Axis, value: i16) {
        self.axes[axis.index()] = value;
    }

    /// Bump the sample counter.
    #[inline]
    pub fn advance(&mut self) {
        self.counter = self.counter.wrapping_add(1);
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; STATE_LEN] {
        let mut out = [0u8; STATE_LEN];
        out[BUTTONS_AT..HAT_AT].copy_from_slice(&self.buttons.raw().to_le_bytes());
        out[HAT_AT] = self.hat;
        for (i, value) in self.axes.iter().enumerate() {
            let at = AXES_AT + i * 2;
            out[at..at + 2].copy_from_slice(&value.to_le_bytes());
        }
        out[COUNTER_AT..STATE_LEN].copy_from_slice(&self.counter.to_le_bytes());
        out
    }

    #[must_use]
    pub fn from_bytes(bytes: &[u8; STATE_LEN]) -> Self {
        let mut axes = [0i16; Axis::COUNT];
        for (i, value) in axes.iter_mut().enumerate() {
            let at = AXES_AT + i * 2;
            *value = i16::from_le_bytes([bytes[at], bytes[at + 1]]);
        }
        Self {
            buttons: Buttons(u16::from_le_bytes([bytes[BUTTONS_AT], bytes[BUTTONS_AT + 1]])),
            axes,
            hat: bytes[HAT_AT],
            counter: u16::from_le_bytes([bytes[COUNTER_AT], bytes[COUNTER_AT + 1]]),
        }
    }

    /// Whether the inputs differ, ignoring the sample counter.
    #[must_use]
    pub fn input_differs(&self, other: &Self) -> bool {
        self.to_bytes()[..COUNTER_AT] != other.to_bytes()[..COUNTER_AT]
    }
}
