//! Timing and boot constants shared by both firmware images.

/// State is retransmitted at least this often even when unchanged, so the
/// peer can piggyback commands on the acknowledgement.
pub const RETRANSMIT_INTERVAL_MS: u64 = 100;

/// Time without a button change before the controller goes to sleep.
pub const SLEEP_TIMEOUT_MS: u64 = 600_000;

/// Value left in the boot flag to request firmware-update mode on the next
/// boot.
pub const BOOTLOADER_MAGIC: u32 = 0xDEAD_8001;

/// Link UART baud rate between the controller and the USB bridge.
pub const LINK_BAUD: u32 = 1_000_000;

/// Capacity of the link receive ring.
pub const LINK_RING_LEN: usize = 256;
