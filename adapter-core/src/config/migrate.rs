//! Forward-only schema migration.
//!
//! Each [`Migration`] applies to configurations whose version is below its
//! `below` mark. [`MIGRATIONS`] is sorted by that mark and every applicable
//! step runs in order, so a very old configuration walks the whole chain.

use super::blob::{Config, Debounce, Orientation, CONFIG_VERSION, DEFAULT_CONFIG};
use crate::state::Axis;
use crate::subtype::Subtype;

/// One schema step.
#[derive(Clone, Copy)]
pub struct Migration {
    /// Runs for configurations with `version < below`.
    pub below: u16,
    pub apply: fn(&mut Config),
}

/// Debounce defaults as they were stored before the version 18 rescale.
const LEGACY_DEBOUNCE: Debounce = Debounce {
    buttons: 5,
    strum: 2,
    combined_strum: false,
};

/// The whammy axis was simplified in version 9, which flipped its polarity
/// for guitars. The subtype is still in the pre-17 numbering here, so it is
/// classified after translating it with [`Subtype::from_legacy`] and never by
/// the raw stored number. Raw 15 is a guitar here; raw 18 is not.
fn flip_whammy(config: &mut Config) {
    if Subtype::from_legacy(config.subtype.raw()).is_guitar() {
        let whammy = config.pins.axis_mut(Axis::RightX);
        whammy.inverted = !whammy.inverted;
    }
}

fn backfill_axis_scale(config: &mut Config) {
    config.axis_scale = DEFAULT_CONFIG.axis_scale;
}

fn backfill_debounce(config: &mut Config) {
    config.debounce = LEGACY_DEBOUNCE;
}

/// Signed orientations (-Z, +Z, -Y, +Y, -X, +X) collapse to their axis.
fn collapse_tilt(config: &mut Config) {
    let axis = match config.tilt.orientation {
        0 | 1 => Orientation::Z,
        2 | 3 => Orientation::Y,
        4 | 5 => Orientation::X,
        _ => return,
    };
    config.tilt.orientation = axis as u8;
}

fn reset_combined_strum(config: &mut Config) {
    config.debounce.combined_strum = false;
}

fn clear_neck(config: &mut Config) {
    config.neck.0 = 0;
}

fn remap_subtypes(config: &mut Config) {
    config.subtype = Subtype::from_legacy(config.subtype.raw());
}

/// Debounce moved from milliseconds to tenths of a millisecond.
fn rescale_debounce(config: &mut Config) {
    config.deque = false;
    config.debounce.buttons = config.debounce.buttons.saturating_mul(10);
    config.debounce.strum = config.debounce.strum.saturating_mul(10);
}

/// Every schema step, in ascending order.
pub const MIGRATIONS: [Migration; 8] = [
    Migration {
        below: 9,
        apply: flip_whammy,
    },
    Migration {
        below: 12,
        apply: backfill_axis_scale,
    },
    Migration {
        below: 13,
        apply: backfill_debounce,
    },
    Migration {
        below: 14,
        apply: collapse_tilt,
    },
    Migration {
        below: 15,
        apply: reset_combined_strum,
    },
    Migration {
        below: 16,
        apply: clear_neck,
    },
    Migration {
        below: 17,
        apply: remap_subtypes,
    },
    Migration {
        below: 18,
        apply: rescale_debounce,
    },
];

/// Bring `config` to [`CONFIG_VERSION`].
///
/// Returns `true` if anything ran and the result must be persisted. A current
/// (or newer) configuration is left untouched.
pub fn migrate(config: &mut Config) -> bool {
    if config.version >= CONFIG_VERSION {
        return false;
    }
    let from = config.version;
    for step in MIGRATIONS.iter().filter(|m| from < m.below) {
        (step.apply)(config);
    }
    config.version = CONFIG_VERSION;
    true
}
