//! Reset and bootloader entry.
//!
//! The [`BootFlag`] word lives in `.uninit` RAM, which survives a system
//! reset. [`ResetControl`] arms it and resets; on the next start
//! [`enter_requested_mode`] takes it and jumps into the ROM USB bootloader
//! when asked to.

use core::mem::MaybeUninit;
use core::ptr;

use adapter_core::{BootControl, BootFlag, BootMode};
use cortex_m::peripheral::SCB;
use defmt::info;

#[link_section = ".uninit.BOOT_FLAG"]
static mut BOOT_FLAG: MaybeUninit<u32> = MaybeUninit::uninit();

fn load() -> BootFlag {
    // SAFETY: single word, only touched from thread mode before the
    // executor starts or right before a reset.
    BootFlag::from_raw(unsafe { ptr::read_volatile(ptr::addr_of!(BOOT_FLAG).cast::<u32>()) })
}

fn store(flag: BootFlag) {
    // SAFETY: see `load`.
    unsafe { ptr::write_volatile(ptr::addr_of_mut!(BOOT_FLAG).cast::<u32>(), flag.raw()) }
}

/// Take the flag left by the previous run. Does not return if it asked for
/// the bootloader.
pub fn enter_requested_mode() {
    let mut flag = load();
    let mode = flag.take();
    store(flag);
    if mode == BootMode::Bootloader {
        info!("entering USB bootloader");
        embassy_rp::rom_data::reset_to_usb_boot(0, 0);
    }
}

/// Arm the flag for `mode` and reset the chip.
pub fn reset(mode: BootMode) -> ! {
    let mut flag = BootFlag::CLEARED;
    flag.arm(mode);
    store(flag);
    SCB::sys_reset()
}

/// [`BootControl`] for the controller.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResetControl;

impl BootControl for ResetControl {
    fn restart(&mut self, mode: BootMode) {
        info!("resetting into {:?}", mode);
        reset(mode)
    }
}
