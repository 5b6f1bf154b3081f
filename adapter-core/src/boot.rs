//! Reset requests and the one-shot bootloader flag.
//!
//! A reset into the bootloader is requested by arming a word in RAM that the
//! startup code does not initialise, then resetting. The boot sequence takes
//! the flag exactly once, so a second, unrelated reset boots normally.

use crate::consts::BOOTLOADER_MAGIC;

/// What the next boot should do.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootMode {
    #[default]
    Normal,
    /// Enter the firmware update mode.
    Bootloader,
}

/// The raw flag word as it lives in reset-surviving RAM.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct BootFlag(u32);

impl BootFlag {
    pub const CLEARED: Self = Self(0);

    /// Wrap whatever the word contained at power-up.
    #[inline]
    #[must_use]
    pub const fn from_raw(word: u32) -> Self {
        Self(word)
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    pub fn arm(&mut self, mode: BootMode) {
        self.0 = match mode {
            BootMode::Normal => 0,
            BootMode::Bootloader => BOOTLOADER_MAGIC,
        };
    }

    /// Read and clear. Only the exact magic value selects the bootloader, so
    /// random RAM contents after a power cycle boot normally.
    pub fn take(&mut self) -> BootMode {
        let mode = if self.0 == BOOTLOADER_MAGIC {
            BootMode::Bootloader
        } else {
            BootMode::Normal
        };
        self.0 = 0;
        mode
    }
}

/// Board hook that resets the device.
///
/// Implementations arm the [`BootFlag`] and reset; on hardware `restart`
/// does not return.
pub trait BootControl {
    fn restart(&mut self, mode: BootMode);
}
