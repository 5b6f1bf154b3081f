//! On-board QSPI flash holding the configuration.
//!
//! The configuration gets the last erase sector of the 2 MiB part, well clear
//! of the program image.

use embassy_rp::flash::{Blocking, Flash, ERASE_SIZE};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;

/// Flash size of a Pico.
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;

/// Offset of the configuration sector from the start of flash.
pub const CONFIG_OFFSET: u32 = (FLASH_SIZE - ERASE_SIZE) as u32;

/// Flash driver the configuration store runs on.
pub type ConfigFlash = Flash<'static, FLASH, Blocking, FLASH_SIZE>;

/// Take the flash peripheral.
#[must_use]
pub fn config_flash(flash: Peri<'static, FLASH>) -> ConfigFlash {
    Flash::new_blocking(flash)
}

/// The chip's 64-bit unique id, read from the flash part.
///
/// Returns zeros if the flash does not answer.
pub fn unique_id(flash: &mut ConfigFlash) -> [u8; 8] {
    let mut id = [0u8; 8];
    if flash.blocking_unique_id(&mut id).is_err() {
        defmt::warn!("flash unique id unavailable");
    }
    id
}
