//! Flash-backed configuration store.

use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};

use super::blob::{Config, CONFIG_LEN, CONFIG_VERSION, DEFAULT_CONFIG, SUBTYPE_OFFSET};
use super::migrate::migrate;
use crate::subtype::Subtype;

/// Size of the staging image; one flash program page.
pub const STAGING_LEN: usize = 256;

/// Error type for store operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Offset and length reach past the end of the configuration.
    OutOfRange,
    /// Erase, program or read of the backing flash failed.
    Flash,
}

impl core::fmt::Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OutOfRange => write!(f, "range outside configuration"),
            Self::Flash => write!(f, "flash error"),
        }
    }
}

fn check_range(offset: usize, len: usize) -> Result<(), StoreError> {
    match offset.checked_add(len) {
        Some(end) if end <= CONFIG_LEN => Ok(()),
        _ => Err(StoreError::OutOfRange),
    }
}

/// The persisted configuration plus a RAM staging image.
///
/// Writes land in the staging image and only reach flash when a write covers
/// the last byte of the configuration; the whole image is then erased and
/// programmed in one go. A sequence of partial writes is therefore durable
/// all at once or not at all.
///
/// A copy of the last image known to be in flash is kept alongside, so a
/// single-field write can persist without dragging half-staged blocks along.
pub struct ConfigStore<F> {
    flash: F,
    base: u32,
    staging: [u8; STAGING_LEN],
    committed: [u8; STAGING_LEN],
}

impl<F: NorFlash> ConfigStore<F> {
    /// Store over the erase sector starting at `base` (an offset into `flash`).
    pub fn new(flash: F, base: u32) -> Self {
        Self {
            flash,
            base,
            staging: [0xFF; STAGING_LEN],
            committed: [0xFF; STAGING_LEN],
        }
    }

    /// Read, validate and migrate the stored configuration.
    ///
    /// An invalid signature is replaced by the defaults; an old version is
    /// migrated and written back. A current configuration causes no write.
    ///
    /// # Errors
    ///
    /// [`StoreError::Flash`] if reading or writing back fails.
    pub fn load(&mut self) -> Result<Config, StoreError> {
        let mut image = [0u8; CONFIG_LEN];
        self.flash.read(self.base, &mut image).map_err(|_| {
            error!("config read failed");
            StoreError::Flash
        })?;
        let mut config = Config::from_bytes(&image);

        if !config.has_signature() {
            info!("no valid config found, writing defaults");
            self.stage(&DEFAULT_CONFIG);
            self.commit()?;
            return Ok(DEFAULT_CONFIG);
        }

        let from = config.version;
        if migrate(&mut config) {
            info!("config migrated from version {} to {}", from, CONFIG_VERSION);
            self.stage(&config);
            self.commit()?;
        } else {
            self.stage(&config);
            self.committed = self.staging;
        }
        Ok(config)
    }

    /// Copy `data` into the staging image at `offset`.
    ///
    /// Returns `true` if this write reached the end of the configuration and
    /// the image was committed.
    ///
    /// # Errors
    ///
    /// [`StoreError::OutOfRange`] leaves the staging image unchanged;
    /// [`StoreError::Flash`] if the commit fails.
    pub fn write_block(&mut self, offset: usize, data: &[u8]) -> Result<bool, StoreError> {
        check_range(offset, data.len())?;
        let end = offset + data.len();
        self.staging[offset..end].copy_from_slice(data);
        if end >= CONFIG_LEN {
            self.commit()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Read persisted bytes straight from flash.
    ///
    /// # Errors
    ///
    /// [`StoreError::OutOfRange`] or [`StoreError::Flash`].
    pub fn read_block(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), StoreError> {
        check_range(offset, buf.len())?;
        // In range, so it fits in the sector.
        let at = self.base + offset as u32;
        self.flash.read(at, buf).map_err(|_| StoreError::Flash)
    }

    /// Replace everything with the compiled-in defaults.
    ///
    /// # Errors
    ///
    /// [`StoreError::Flash`] if the commit fails.
    pub fn reset_to_defaults(&mut self) -> Result<(), StoreError> {
        info!("resetting config to defaults");
        self.stage(&DEFAULT_CONFIG);
        self.commit()
    }

    /// Change only the device subtype and persist it.
    ///
    /// The committed image is rewritten with the new subtype; blocks staged
    /// but not yet committed stay staged. The staging image picks up the new
    /// subtype too, so a later commit keeps it.
    ///
    /// # Errors
    ///
    /// [`StoreError::Flash`] if the commit fails. Staging is then unchanged.
    pub fn write_subtype(&mut self, subtype: Subtype) -> Result<(), StoreError> {
        let mut image = self.committed;
        image[SUBTYPE_OFFSET] = subtype.raw();
        self.program(&image)?;
        self.committed = image;
        self.staging[SUBTYPE_OFFSET] = subtype.raw();
        Ok(())
    }

    /// The configuration as currently staged.
    #[must_use]
    pub fn staged(&self) -> Config {
        image_config(&self.staging)
    }

    /// The configuration as last written to flash.
    #[must_use]
    pub fn committed(&self) -> Config {
        image_config(&self.committed)
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    pub fn into_inner(self) -> F {
        self.flash
    }

    fn stage(&mut self, config: &Config) {
        self.staging[..CONFIG_LEN].copy_from_slice(&config.to_bytes());
        self.staging[CONFIG_LEN..].fill(0xFF);
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        let image = self.staging;
        self.program(&image)?;
        self.committed = image;
        Ok(())
    }

    /// Erase the sector and program `image` with interrupts off.
    fn program(&mut self, image: &[u8; STAGING_LEN]) -> Result<(), StoreError> {
        let erase_len = STAGING_LEN.div_ceil(F::ERASE_SIZE) * F::ERASE_SIZE;
        let from = self.base;
        // Sector sizes are far below 4 GiB.
        let to = self.base + erase_len as u32;
        let flash = &mut self.flash;
        critical_section::with(|_| {
            flash.erase(from, to)?;
            flash.write(from, image)
        })
        .map_err(|_| {
            error!("config commit failed");
            StoreError::Flash
        })?;
        debug!("config committed at {}", from);
        Ok(())
    }
}

fn image_config(image: &[u8; STAGING_LEN]) -> Config {
    let mut bytes = [0u8; CONFIG_LEN];
    bytes.copy_from_slice(&image[..CONFIG_LEN]);
    Config::from_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::config::blob::SIGNATURE;
    use crate::testutil::MockFlash;

    #[test]
    fn test_blank_flash_gets_defaults_once() {
        let mut store = ConfigStore::new(MockFlash::erased(), 0);
        assert_eq!(store.load(), Ok(DEFAULT_CONFIG));
        assert_eq!(store.flash().writes, 1);
        assert_eq!(&store.flash().mem[..CONFIG_LEN], &DEFAULT_CONFIG.to_bytes());
    }

    #[test]
    fn test_current_config_is_not_rewritten() {
        let mut stored = DEFAULT_CONFIG;
        stored.subtype = Subtype::MIDI_DRUMS;
        let mut store = ConfigStore::new(MockFlash::with_config(&stored), 0);
        assert_eq!(store.load(), Ok(stored));
        assert_eq!(store.flash().writes, 0);
        assert_eq!(store.staged(), stored);
    }

    #[test]
    fn test_partial_writes_commit_at_end() {
        let mut store = ConfigStore::new(MockFlash::with_config(&DEFAULT_CONFIG), 0);
        store.load().unwrap();
        let mut target = DEFAULT_CONFIG;
        target.subtype = Subtype::PS3_ROCK_BAND_DRUMS;
        target.rf.id = 0x1234_5678;
        let bytes = target.to_bytes();

        assert_eq!(store.write_block(0, &bytes[..40]), Ok(false));
        assert_eq!(store.write_block(40, &bytes[40..90]), Ok(false));
        assert_eq!(store.flash().writes, 0);
        // Flash still holds the old configuration.
        let mut sub = [0u8; 1];
        store.read_block(SUBTYPE_OFFSET, &mut sub).unwrap();
        assert_eq!(sub[0], Subtype::XINPUT_GAMEPAD.raw());

        assert_eq!(store.write_block(90, &bytes[90..]), Ok(true));
        assert_eq!(store.flash().writes, 1);
        assert_eq!(&store.flash().mem[..CONFIG_LEN], &bytes);
    }

    #[test]
    fn test_out_of_range_is_rejected() {
        let mut store = ConfigStore::new(MockFlash::with_config(&DEFAULT_CONFIG), 0);
        store.load().unwrap();
        assert_eq!(
            store.write_block(CONFIG_LEN - 2, &[1, 2, 3]),
            Err(StoreError::OutOfRange)
        );
        assert_eq!(store.write_block(usize::MAX, &[1]), Err(StoreError::OutOfRange));
        let mut buf = [0u8; 8];
        assert_eq!(
            store.read_block(CONFIG_LEN - 4, &mut buf),
            Err(StoreError::OutOfRange)
        );
        assert_eq!(store.staged(), DEFAULT_CONFIG);
        assert_eq!(store.flash().writes, 0);
    }

    #[test]
    fn test_write_subtype_and_reset() {
        let mut store = ConfigStore::new(MockFlash::with_config(&DEFAULT_CONFIG), 0);
        store.load().unwrap();
        store.write_subtype(Subtype::WII_LIVE_GUITAR).unwrap();
        assert_eq!(store.flash().mem[SUBTYPE_OFFSET], Subtype::WII_LIVE_GUITAR.raw());
        assert_eq!(store.flash().mem[0..4], SIGNATURE.to_le_bytes());

        store.reset_to_defaults().unwrap();
        assert_eq!(&store.flash().mem[..CONFIG_LEN], &DEFAULT_CONFIG.to_bytes());
        assert_eq!(store.flash().writes, 2);
    }

    #[test]
    fn test_write_subtype_leaves_partial_blocks_staged() {
        let mut store = ConfigStore::new(MockFlash::with_config(&DEFAULT_CONFIG), 0);
        store.load().unwrap();
        let before = store.flash().mem[93];
        assert_eq!(store.write_block(93, &[before ^ 0x01]), Ok(false));
        assert_eq!(store.flash().writes, 0);

        store.write_subtype(Subtype::PS3_GAMEPAD).unwrap();
        assert_eq!(store.flash().writes, 1);
        assert_eq!(store.flash().mem[93], before);
        assert_eq!(store.flash().mem[SUBTYPE_OFFSET], Subtype::PS3_GAMEPAD.raw());

        let mut expected = DEFAULT_CONFIG;
        expected.subtype = Subtype::PS3_GAMEPAD;
        assert_eq!(store.committed(), expected);
        // The pending block and the new subtype are both staged.
        assert_eq!(store.staged().subtype, Subtype::PS3_GAMEPAD);
        assert_ne!(store.staged(), expected);
    }

    #[test]
    fn test_flash_failure_surfaces() {
        let mut flash = MockFlash::erased();
        flash.fail = true;
        let mut store = ConfigStore::new(flash, 0);
        assert_eq!(store.load(), Err(StoreError::Flash));
    }

    #[test]
    fn test_store_at_nonzero_base() {
        let mut flash = MockFlash::erased();
        flash.mem[..4096].fill(0x11);
        let mut store = ConfigStore::new(flash, 4096);
        assert_eq!(store.load(), Ok(DEFAULT_CONFIG));
        let mut sig = [0u8; 4];
        store.read_block(0, &mut sig).unwrap();
        assert_eq!(sig, SIGNATURE.to_le_bytes());
        // The neighbouring sector is untouched.
        assert!(store.flash().mem[..4096].iter().all(|&b| b == 0x11));
    }
}
