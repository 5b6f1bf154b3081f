//! Doubles shared by the integration tests.

#![allow(dead_code)]

use core::convert::Infallible;
use core::future::Future;
use core::pin::pin;
use core::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

use adapter_core::config::{Config, CONFIG_LEN};
use adapter_core::{BootControl, BootMode};
use embedded_storage::nor_flash::{ErrorType, NorFlash, NorFlashErrorKind, ReadNorFlash};
use link_proto::{Endpoint, EndpointSink, SharedRing};

/// One 4 KiB sector of NOR flash that counts program operations.
pub struct MockFlash {
    pub mem: Vec<u8>,
    pub writes: usize,
}

impl MockFlash {
    pub fn erased() -> Self {
        Self {
            mem: vec![0xFF; 4096],
            writes: 0,
        }
    }

    pub fn with_config(config: &Config) -> Self {
        let mut flash = Self::erased();
        flash.mem[..CONFIG_LEN].copy_from_slice(&config.to_bytes());
        flash
    }
}

impl ErrorType for MockFlash {
    type Error = NorFlashErrorKind;
}

impl ReadNorFlash for MockFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let at = offset as usize;
        let src = self
            .mem
            .get(at..at + bytes.len())
            .ok_or(NorFlashErrorKind::OutOfBounds)?;
        bytes.copy_from_slice(src);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.mem.len()
    }
}

impl NorFlash for MockFlash {
    const WRITE_SIZE: usize = 1;
    const ERASE_SIZE: usize = 4096;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        self.mem
            .get_mut(from as usize..to as usize)
            .ok_or(NorFlashErrorKind::OutOfBounds)?
            .fill(0xFF);
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let at = offset as usize;
        self.mem
            .get_mut(at..at + bytes.len())
            .ok_or(NorFlashErrorKind::OutOfBounds)?
            .copy_from_slice(bytes);
        self.writes += 1;
        Ok(())
    }
}

/// Writes into the other side's receive ring, like a UART TX wired to RX.
pub struct RingWriter<'a, const N: usize>(pub &'a SharedRing<N>);

impl<const N: usize> embedded_io::ErrorType for RingWriter<'_, N> {
    type Error = Infallible;
}

impl<const N: usize> embedded_io::Write for RingWriter<'_, N> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.0.push_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Records committed reports per endpoint.
#[derive(Default)]
pub struct MockUsb {
    current: Vec<u8>,
    pub committed: Vec<(Endpoint, Vec<u8>)>,
}

impl EndpointSink for MockUsb {
    fn select(&mut self, _endpoint: Endpoint) {
        self.current.clear();
    }

    fn write(&mut self, byte: u8) {
        self.current.push(byte);
    }

    fn commit(&mut self, endpoint: Endpoint) {
        self.committed.push((endpoint, std::mem::take(&mut self.current)));
    }

    fn is_ready(&self, _endpoint: Endpoint) -> bool {
        true
    }
}

#[derive(Default)]
pub struct MockBoot {
    pub restarts: Vec<BootMode>,
}

impl BootControl for MockBoot {
    fn restart(&mut self, mode: BootMode) {
        self.restarts.push(mode);
    }
}

pub fn block_on<F: Future>(f: F) -> F::Output {
    fn noop_raw_waker() -> RawWaker {
        fn noop(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            noop_raw_waker()
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
        RawWaker::new(core::ptr::null(), &VTABLE)
    }

    let waker = unsafe { Waker::from_raw(noop_raw_waker()) };
    let mut cx = Context::from_waker(&waker);
    let mut f = pin!(f);
    match f.as_mut().poll(&mut cx) {
        Poll::Ready(result) => result,
        Poll::Pending => panic!("future returned Pending unexpectedly"),
    }
}
