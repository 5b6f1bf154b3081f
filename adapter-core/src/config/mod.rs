//! Persistent, versioned device configuration.
//!
//! - [`blob`]: the [`Config`] record and its fixed byte layout
//! - [`migrate`]: the ordered [`MIGRATIONS`] table
//! - [`store`]: [`ConfigStore`], staging and atomic commit over `NorFlash`

pub mod blob;
pub mod migrate;
pub mod store;

pub use blob::{
    AxisScale, Config, Debounce, InputType, NeckFlags, Orientation, PinConfig, Pins, RfConfig,
    Tilt, CONFIG_LEN, CONFIG_VERSION, DEFAULT_CONFIG, DEFAULT_DEBOUNCE, INVALID_PIN, SIGNATURE,
    SUBTYPE_OFFSET,
};
pub use migrate::{migrate, Migration, MIGRATIONS};
pub use store::{ConfigStore, StoreError, STAGING_LEN};
