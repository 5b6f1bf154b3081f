//! Control-channel command dispatch.
//!
//! Feature frames carry a one-byte opcode as their id:
//!
//! | opcode | command | payload |
//! |--------|---------|---------|
//! | `0x30` | reboot | - |
//! | `0x31` | jump to bootloader | - |
//! | `0x32` | read config block | offset `u16` LE, length `u8` |
//! | `0x33` | write config block | offset `u16` LE, length `u16` LE, data |
//! | `0x34` | write config data | data (continues the open write) |
//! | `0x35` | write subtype | subtype `u8` |
//! | `0x36` | reset config | - |
//!
//! Replies are feature-read frames with the same opcode and a payload of
//! `[STATUS_OK, data...]` or `[STATUS_NACK, error code]`.

use embedded_storage::nor_flash::NorFlash;
use link_proto::{ControlFrame, ControlKind, MAX_RF_PAYLOAD};

use crate::boot::BootMode;
use crate::config::{ConfigStore, StoreError, CONFIG_LEN};
use crate::subtype::Subtype;

pub const REBOOT: u8 = 0x30;
pub const JUMP_TO_BOOTLOADER: u8 = 0x31;
pub const READ_CONFIG_BLOCK: u8 = 0x32;
pub const WRITE_CONFIG_BLOCK: u8 = 0x33;
pub const WRITE_CONFIG_DATA: u8 = 0x34;
pub const WRITE_SUBTYPE: u8 = 0x35;
pub const RESET_CONFIG: u8 = 0x36;

pub const STATUS_OK: u8 = 0x00;
pub const STATUS_NACK: u8 = 0xFF;

/// Direction a host request travels down the link in. Reads go as
/// feature-read frames, everything else as feature writes.
#[must_use]
pub const fn request_kind(cmd: u8) -> ControlKind {
    match cmd {
        READ_CONFIG_BLOCK => ControlKind::Read,
        _ => ControlKind::Write,
    }
}

/// Longest config read; report id, opcode and status share an RF packet
/// with the data.
pub const MAX_READ_LEN: usize = MAX_RF_PAYLOAD - 3;

/// Why a command was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Opcode not recognised.
    Unknown,
    /// Payload too short, too long or inconsistent.
    Malformed,
    /// Offset and length reach past the configuration.
    OutOfRange,
    /// Continuation data without an open write.
    NoPendingWrite,
}

impl CommandError {
    /// Code sent back after [`STATUS_NACK`].
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Unknown => 1,
            Self::Malformed => 2,
            Self::OutOfRange => 3,
            Self::NoPendingWrite => 4,
        }
    }
}

impl core::fmt::Display for CommandError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown command"),
            Self::Malformed => write!(f, "malformed command"),
            Self::OutOfRange => write!(f, "range outside configuration"),
            Self::NoPendingWrite => write!(f, "no write in progress"),
        }
    }
}

/// A parsed control-channel request, borrowing its data from the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Reboot,
    JumpToBootloader,
    ReadConfigBlock { offset: u16, len: u8 },
    WriteConfigBlock { offset: u16, len: u16, data: &'a [u8] },
    WriteConfigData(&'a [u8]),
    WriteSubtype(Subtype),
    ResetConfig,
}

impl<'a> Command<'a> {
    /// Decode a feature frame. The frame direction is not significant.
    ///
    /// # Errors
    ///
    /// [`CommandError::Unknown`] for an unrecognised opcode,
    /// [`CommandError::Malformed`] for a payload of the wrong shape.
    pub fn parse(frame: &'a ControlFrame) -> Result<Self, CommandError> {
        let p = frame.payload.as_slice();
        match frame.cmd {
            REBOOT => Ok(Self::Reboot),
            JUMP_TO_BOOTLOADER => Ok(Self::JumpToBootloader),
            READ_CONFIG_BLOCK => match p {
                [lo, hi, len] => Ok(Self::ReadConfigBlock {
                    offset: u16::from_le_bytes([*lo, *hi]),
                    len: *len,
                }),
                _ => Err(CommandError::Malformed),
            },
            WRITE_CONFIG_BLOCK => match p {
                [o0, o1, l0, l1, data @ ..] => Ok(Self::WriteConfigBlock {
                    offset: u16::from_le_bytes([*o0, *o1]),
                    len: u16::from_le_bytes([*l0, *l1]),
                    data,
                }),
                _ => Err(CommandError::Malformed),
            },
            WRITE_CONFIG_DATA => Ok(Self::WriteConfigData(p)),
            WRITE_SUBTYPE => match p {
                [subtype] => Ok(Self::WriteSubtype(Subtype(*subtype))),
                _ => Err(CommandError::Malformed),
            },
            RESET_CONFIG => Ok(Self::ResetConfig),
            _ => Err(CommandError::Unknown),
        }
    }
}

/// What the caller has to do after a command was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// Nothing to send back yet (a streamed write is still open).
    None,
    /// Send this feature-read frame back over the link.
    Reply(ControlFrame),
    /// Arm the boot flag and reset.
    Restart(BootMode),
    /// The store could not be committed; the device must restart.
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingWrite {
    offset: usize,
    len: usize,
    received: usize,
}

/// Turns control frames into store operations and resets.
///
/// Holds at most one streamed write. A new `WriteConfigBlock` abandons any
/// write still open.
pub struct Dispatcher {
    pending: Option<PendingWrite>,
    buf: [u8; CONFIG_LEN],
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: None,
            buf: [0; CONFIG_LEN],
        }
    }

    /// Whether a streamed write is waiting for more data.
    #[must_use]
    pub fn is_writing(&self) -> bool {
        self.pending.is_some()
    }

    /// Handle one frame against `store`.
    pub fn handle<F: NorFlash>(
        &mut self,
        frame: &ControlFrame,
        store: &mut ConfigStore<F>,
    ) -> Outcome {
        let command = match Command::parse(frame) {
            Ok(command) => command,
            Err(e) => {
                warn!("rejected command {}: {}", frame.cmd, e);
                return nack(frame.cmd, e);
            }
        };

        let result = match command {
            Command::Reboot => return Outcome::Restart(BootMode::Normal),
            Command::JumpToBootloader => return Outcome::Restart(BootMode::Bootloader),
            Command::ReadConfigBlock { offset, len } => {
                return self.read(frame.cmd, usize::from(offset), usize::from(len), store)
            }
            Command::WriteConfigBlock { offset, len, data } => {
                self.open_write(usize::from(offset), usize::from(len), data, store)
            }
            Command::WriteConfigData(data) => self.continue_write(data, store),
            Command::WriteSubtype(subtype) => {
                info!("subtype set to {}", subtype.raw());
                store.write_subtype(subtype).map(|()| true).map_err(Into::into)
            }
            Command::ResetConfig => {
                self.pending = None;
                store.reset_to_defaults().map(|()| true).map_err(Into::into)
            }
        };

        match result {
            Ok(true) => ok(frame.cmd, &[]),
            Ok(false) => Outcome::None,
            Err(CommandFailure::Rejected(e)) => {
                warn!("rejected command {}: {}", frame.cmd, e);
                nack(frame.cmd, e)
            }
            Err(CommandFailure::Flash) => Outcome::Fatal,
        }
    }

    fn read<F: NorFlash>(
        &self,
        cmd: u8,
        offset: usize,
        len: usize,
        store: &mut ConfigStore<F>,
    ) -> Outcome {
        if len > MAX_READ_LEN {
            return nack(cmd, CommandError::Malformed);
        }
        let mut data = [0u8; MAX_READ_LEN];
        match store.read_block(offset, &mut data[..len]) {
            Ok(()) => ok(cmd, &data[..len]),
            Err(StoreError::OutOfRange) => nack(cmd, CommandError::OutOfRange),
            Err(StoreError::Flash) => Outcome::Fatal,
        }
    }

    fn open_write<F: NorFlash>(
        &mut self,
        offset: usize,
        len: usize,
        data: &[u8],
        store: &mut ConfigStore<F>,
    ) -> Result<bool, CommandFailure> {
        if self.pending.take().is_some() {
            warn!("config write abandoned");
        }
        if len == 0 {
            return Err(CommandError::Malformed.into());
        }
        if offset + len > CONFIG_LEN {
            return Err(CommandError::OutOfRange.into());
        }
        self.pending = Some(PendingWrite {
            offset,
            len,
            received: 0,
        });
        self.continue_write(data, store)
    }

    /// Append data to the open write; hands the range to the store once
    /// complete. `Ok(true)` means the write finished.
    fn continue_write<F: NorFlash>(
        &mut self,
        data: &[u8],
        store: &mut ConfigStore<F>,
    ) -> Result<bool, CommandFailure> {
        let Some(mut write) = self.pending.take() else {
            return Err(CommandError::NoPendingWrite.into());
        };
        if write.received + data.len() > write.len {
            return Err(CommandError::Malformed.into());
        }
        let at = write.offset + write.received;
        self.buf[at..at + data.len()].copy_from_slice(data);
        write.received += data.len();

        if write.received < write.len {
            self.pending = Some(write);
            return Ok(false);
        }

        let range = write.offset..write.offset + write.len;
        let committed = store.write_block(write.offset, &self.buf[range])?;
        debug!(
            "config block {}..{} staged, committed: {}",
            write.offset,
            write.offset + write.len,
            committed
        );
        Ok(true)
    }
}

enum CommandFailure {
    Rejected(CommandError),
    Flash,
}

impl From<CommandError> for CommandFailure {
    fn from(e: CommandError) -> Self {
        Self::Rejected(e)
    }
}

impl From<StoreError> for CommandFailure {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::OutOfRange => Self::Rejected(CommandError::OutOfRange),
            StoreError::Flash => Self::Flash,
        }
    }
}

fn ok(cmd: u8, data: &[u8]) -> Outcome {
    let mut reply = ControlFrame::new(ControlKind::Read, cmd);
    // Reads are capped at MAX_READ_LEN, well inside the frame payload.
    let _ = reply.payload.push(STATUS_OK);
    let _ = reply.payload.extend_from_slice(data);
    Outcome::Reply(reply)
}

fn nack(cmd: u8, e: CommandError) -> Outcome {
    let mut reply = ControlFrame::new(ControlKind::Read, cmd);
    let _ = reply.payload.push(STATUS_NACK);
    let _ = reply.payload.push(e.code());
    Outcome::Reply(reply)
}
