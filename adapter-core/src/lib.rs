//! Platform-agnostic core of the controller adapter.
//!
//! Everything between the sampled inputs and the link, independent of the
//! chip it runs on:
//!
//! - [`state`]: [`ControllerState`], the snapshot the poll loop transmits
//! - [`subtype`]: [`Subtype`], the USB personality and its report channel
//! - [`config`]: the persisted [`Config`] with migration and [`ConfigStore`]
//! - [`dispatch`]: control-channel commands ([`Dispatcher`])
//! - [`transport`]: the [`Transport`] trait, [`WiredLink`] and the bridge's
//!   [`ReportRelay`]
//! - [`rf`]: [`RfTransport`] and [`RfReceiver`] over a [`Radio`]
//! - [`schedule`]: [`TransmitGate`] and [`IdleTimer`]
//! - [`boot`]: the one-shot [`BootFlag`] and [`BootControl`]
//! - [`adapter`]: [`Adapter`], the context object the firmware loop owns
//!
//! # Poll loop
//!
//! ```
//! # use adapter_core::*;
//! # use embedded_storage::nor_flash::{ErrorType, NorFlash, NorFlashErrorKind, ReadNorFlash};
//! # struct Flash([u8; 4096]);
//! # impl ErrorType for Flash { type Error = NorFlashErrorKind; }
//! # impl ReadNorFlash for Flash {
//! #     const READ_SIZE: usize = 1;
//! #     fn read(&mut self, o: u32, b: &mut [u8]) -> Result<(), Self::Error> {
//! #         b.copy_from_slice(&self.0[o as usize..o as usize + b.len()]);
//! #         Ok(())
//! #     }
//! #     fn capacity(&self) -> usize { self.0.len() }
//! # }
//! # impl NorFlash for Flash {
//! #     const WRITE_SIZE: usize = 1;
//! #     const ERASE_SIZE: usize = 4096;
//! #     fn erase(&mut self, f: u32, t: u32) -> Result<(), Self::Error> {
//! #         self.0[f as usize..t as usize].fill(0xFF);
//! #         Ok(())
//! #     }
//! #     fn write(&mut self, o: u32, b: &[u8]) -> Result<(), Self::Error> {
//! #         self.0[o as usize..o as usize + b.len()].copy_from_slice(b);
//! #         Ok(())
//! #     }
//! # }
//! # struct Uart;
//! # impl embedded_io::ErrorType for Uart { type Error = core::convert::Infallible; }
//! # impl embedded_io::Write for Uart {
//! #     fn write(&mut self, b: &[u8]) -> Result<usize, Self::Error> { Ok(b.len()) }
//! #     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # struct Reset;
//! # impl BootControl for Reset { fn restart(&mut self, _mode: BootMode) {} }
//! # async fn run() -> Result<(), StoreError> {
//! static RX: link_proto::SharedRing<256> = link_proto::SharedRing::new();
//!
//! let store = ConfigStore::new(Flash([0xFF; 4096]), 0);
//! let mut adapter = Adapter::new(WiredLink::new(&RX, Uart), store, CanonicalEncoder, Reset)?;
//!
//! let state = ControllerState::neutral();
//! if adapter.tick(0, &state).await == Tick::Sleep {
//!     // wait for the wake pin, then
//!     adapter.wake(1).await;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting and route log output to defmt
//! - **`log`**: Route log output to the `log` facade
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

// Must come first so the macros are visible in every module.
#[macro_use]
mod fmt;

pub mod adapter;
pub mod boot;
pub mod config;
pub mod consts;
pub mod dispatch;
pub mod encoder;
pub mod rf;
pub mod schedule;
pub mod state;
pub mod subtype;
pub mod transport;

#[cfg(test)]
mod testutil;

// Re-export main types at crate root
pub use adapter::{Adapter, Tick};
pub use boot::{BootControl, BootFlag, BootMode};
pub use config::{Config, ConfigStore, StoreError};
pub use dispatch::{Command, CommandError, Dispatcher, Outcome};
pub use encoder::{CanonicalEncoder, ReportEncoder};
pub use rf::{Radio, RadioError, Received, RfReceiver, RfTransport};
pub use schedule::{IdleTimer, TransmitGate};
pub use state::{Axis, Buttons, ControllerState, STATE_LEN};
pub use subtype::Subtype;
pub use transport::{ReportRelay, Transport, WiredLink};
