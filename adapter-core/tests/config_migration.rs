//! Loading stored configurations through the public store API.

mod common;

use adapter_core::config::{
    Config, ConfigStore, CONFIG_LEN, CONFIG_VERSION, DEFAULT_CONFIG, DEFAULT_DEBOUNCE, SIGNATURE,
};
use adapter_core::Subtype;
use common::MockFlash;

fn stored(version: u16, subtype: u8) -> Config {
    Config {
        version,
        subtype: Subtype(subtype),
        ..DEFAULT_CONFIG
    }
}

fn flash_config(store: &ConfigStore<MockFlash>) -> Config {
    let mut image = [0u8; CONFIG_LEN];
    image.copy_from_slice(&store.flash().mem[..CONFIG_LEN]);
    Config::from_bytes(&image)
}

#[test]
fn version_8_pad_reaches_current_with_defaults() {
    let mut old = stored(8, 12);
    old.debounce.buttons = 0x42;
    old.axis_scale[3].deadzone = 999;
    let mut store = ConfigStore::new(MockFlash::with_config(&old), 0);

    let config = store.load().unwrap();
    assert_eq!(config.version, CONFIG_VERSION);
    assert_eq!(config.subtype, Subtype(12));
    assert_eq!(config.axis_scale, DEFAULT_CONFIG.axis_scale);
    assert_eq!(config.debounce, DEFAULT_DEBOUNCE);
    assert_eq!(store.flash().writes, 1);
    assert_eq!(flash_config(&store), config);
}

#[test]
fn second_load_is_identical_and_silent() {
    for version in 0..CONFIG_VERSION {
        let mut store = ConfigStore::new(MockFlash::with_config(&stored(version, 20)), 0);
        let first = store.load().unwrap();
        let image = store.flash().mem.clone();

        let mut again = ConfigStore::new(store.into_inner(), 0);
        let second = again.load().unwrap();
        assert_eq!(first, second, "version {version}");
        assert_eq!(again.flash().mem, image);
        assert_eq!(again.flash().writes, 1, "version {version}");
    }
}

#[test]
fn subtype_insertions_applied_in_order() {
    let cases = [(13, 13), (14, 15), (16, 19), (19, 22), (20, 23), (22, 26), (26, 30)];
    for (old, new) in cases {
        let mut store = ConfigStore::new(MockFlash::with_config(&stored(16, old)), 0);
        assert_eq!(store.load().unwrap().subtype, Subtype(new), "subtype {old}");
    }
}

#[test]
fn corrupt_signature_recovers_defaults_with_one_write() {
    let mut bad = DEFAULT_CONFIG.to_bytes();
    bad[0] ^= 0x01;
    let mut flash = MockFlash::erased();
    flash.mem[..CONFIG_LEN].copy_from_slice(&bad);
    let mut store = ConfigStore::new(flash, 0);

    assert_eq!(store.load().unwrap(), DEFAULT_CONFIG);
    assert_eq!(store.flash().writes, 1);
    assert_eq!(&store.flash().mem[..4], &SIGNATURE.to_le_bytes());
}
