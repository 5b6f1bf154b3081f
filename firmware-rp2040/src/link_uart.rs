//! The UART between the two MCUs.
//!
//! Received bytes go into a [`SharedRing`] that the link decoder drains from
//! the main loop; frames go out through [`LinkTx`], a blocking writer.
//!
//! Both sides run at [`LINK_BAUD`](adapter_core::consts::LINK_BAUD), 8N1.

use core::convert::Infallible;

use adapter_core::consts::LINK_BAUD;
use defmt::warn;
use embassy_rp::uart::{Async, Config as UartConfig, Error as UartError, UartRx, UartTx};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use link_proto::SharedRing;
use portable_atomic::{AtomicU32, Ordering};

/// Bytes lost because the ring was full when they arrived.
pub static RING_OVERRUNS: AtomicU32 = AtomicU32::new(0);

/// Bytes lost in the UART itself (FIFO overrun, framing, break).
pub static UART_ERRORS: AtomicU32 = AtomicU32::new(0);

/// UART configuration for the link.
#[must_use]
pub fn link_config() -> UartConfig {
    let mut config = UartConfig::default();
    config.baudrate = LINK_BAUD;
    config
}

/// Feed received bytes into `ring` forever, signalling `notify` after each.
///
/// Errors are counted and skipped; the framer resynchronises on the next
/// marker byte.
pub async fn pump<const N: usize>(
    mut rx: UartRx<'static, Async>,
    ring: &SharedRing<N>,
    notify: Option<&Signal<CriticalSectionRawMutex, ()>>,
) -> ! {
    let mut byte = [0u8; 1];
    loop {
        match rx.read(&mut byte).await {
            Ok(()) => {
                if ring.push(byte[0]) {
                    let lost = RING_OVERRUNS.fetch_add(1, Ordering::Relaxed) + 1;
                    warn!("link ring full, {} bytes lost so far", lost);
                }
                if let Some(signal) = notify {
                    signal.signal(());
                }
            }
            Err(e) => {
                UART_ERRORS.fetch_add(1, Ordering::Relaxed);
                match e {
                    UartError::Overrun => warn!("link UART overrun"),
                    other => warn!("link UART error: {:?}", other),
                }
            }
        }
    }
}

/// Blocking frame writer over the link's transmit half.
///
/// Frames are a few dozen bytes at 1 Mbaud, so writes finish well inside a
/// poll period.
pub struct LinkTx<'d> {
    tx: UartTx<'d, Async>,
}

impl<'d> LinkTx<'d> {
    #[must_use]
    pub fn new(tx: UartTx<'d, Async>) -> Self {
        Self { tx }
    }
}

impl embedded_io::ErrorType for LinkTx<'_> {
    type Error = Infallible;
}

impl embedded_io::Write for LinkTx<'_> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.tx.blocking_write(buf).is_err() {
            UART_ERRORS.fetch_add(1, Ordering::Relaxed);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.tx.blocking_flush().is_err() {
            UART_ERRORS.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}
