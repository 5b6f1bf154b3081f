//! RP2040 board support for the controller link adapter.
//!
//! Two binaries share this crate:
//!
//! - **`controller`**: samples the buttons, runs the [`Adapter`] poll loop and
//!   sends reports over the UART link
//! - **`usb-bridge`**: decodes the link and relays reports to the USB host,
//!   forwarding the host's feature requests back to the controller
//!
//! # Hardware Configuration
//!
//! Controller:
//!
//! | Function | GPIO | Description |
//! |----------|------|-------------|
//! | Buttons  | 0-14 | Digital inputs, pulled up, in [`Buttons::DIGITAL`] order |
//! | UART1 TX | 20   | Link to the bridge |
//! | UART1 RX | 21   | Link from the bridge |
//!
//! USB bridge:
//!
//! | Function | GPIO | Description |
//! |----------|------|-------------|
//! | UART1 TX | 8    | Link to the controller |
//! | UART1 RX | 9    | Link from the controller |
//! | UART1 CTS | 10  | Optional, with `uart-flow-control` |
//! | UART1 RTS | 11  | Optional, with `uart-flow-control` |
//! | LED      | 25   | On-board LED (link error indicator) |
//!
//! # Modules
//!
//! - [`link_uart`]: UART receive pump into a [`SharedRing`] and the blocking
//!   link writer ([`LinkTx`])
//! - [`flash`]: flash region holding the configuration
//! - [`boot`]: reset and bootloader entry ([`ResetControl`])
//! - [`sampler`]: GPIO button sampling ([`PinSampler`])
//! - [`usb_output`]: HID report layouts and the bridge's USB endpoints
//!
//! # Features
//!
//! - **`dev-panic`** (default): Use `panic-probe` for development (prints panic info via RTT)
//! - **`prod-panic`**: Use `panic-reset` for production (silent watchdog reset)
//! - **`uart-flow-control`**: Enable hardware flow control on the bridge (CTS/RTS on GPIO 10/11)
//!
//! # Re-exports
//!
//! This crate re-exports the core types the binaries need, so they only
//! depend on this crate.

#![no_std]

#[cfg(all(feature = "dev-panic", feature = "prod-panic"))]
compile_error!("Cannot enable both `dev-panic` and `prod-panic` features");

pub use adapter_core::{
    Adapter, BootControl, BootMode, Buttons, Config, ConfigStore, ControllerState, ReportRelay,
    StoreError, Tick, WiredLink,
};
pub use link_proto::{ControlFrame, ControlKind, Endpoint, SharedRing};

pub mod boot;
pub mod flash;
pub mod link_uart;
pub mod sampler;
pub mod usb_output;

pub use boot::ResetControl;
pub use flash::{ConfigFlash, CONFIG_OFFSET, FLASH_SIZE};
pub use link_uart::LinkTx;
pub use sampler::PinSampler;
pub use usb_output::{
    configure_usb, BoardEncoder, GamepadReport, HostRequestHandler, UsbEndpoints, UsbInterfaces,
};
