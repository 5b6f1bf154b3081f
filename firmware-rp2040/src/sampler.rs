//! GPIO button sampling.
//!
//! Buttons sit on GPIO 0-14. The configured pin table decides which GPIO
//! drives which button and whether it reads active-low; pins outside the
//! sampled range are treated as unconnected. Analog axes are left centered on
//! this board.

use adapter_core::config::Pins;
use adapter_core::{Buttons, ControllerState};
use embassy_rp::gpio::Input;

/// Number of sampled GPIOs, starting at GPIO 0.
pub const SAMPLED_PINS: usize = 15;

/// Button that wakes the controller from sleep.
pub const WAKE_BUTTON: Buttons = Buttons::START;

/// Reads the button GPIOs into a [`ControllerState`].
pub struct PinSampler<'d> {
    inputs: [Input<'d>; SAMPLED_PINS],
}

impl<'d> PinSampler<'d> {
    /// `inputs[n]` must be GPIO `n`, configured with a pull-up.
    #[must_use]
    pub fn new(inputs: [Input<'d>; SAMPLED_PINS]) -> Self {
        Self { inputs }
    }

    fn pressed(&self, gpio: u8, inverted: bool) -> Option<bool> {
        let input = self.inputs.get(usize::from(gpio))?;
        Some(input.is_high() != inverted)
    }

    /// Sample every connected button into `state` and bump its counter.
    pub fn sample(&self, pins: &Pins, state: &mut ControllerState) {
        let mut buttons = Buttons::NONE;
        for (button, pin) in pins.digital() {
            if !pin.is_connected() {
                continue;
            }
            if self.pressed(pin.pin, pin.inverted) == Some(true) {
                buttons |= button;
            }
        }
        state.buttons = buttons;
        state.hat = hat_from_dpad(buttons);
        state.advance();
    }

    /// Wait for the wake button to go down.
    ///
    /// Falls back to GPIO 0 if the wake button is unconnected.
    pub async fn wait_for_wake(&mut self, pins: &Pins) {
        let gpio = pins
            .digital()
            .find(|(button, pin)| *button == WAKE_BUTTON && pin.is_connected())
            .map_or(0, |(_, pin)| usize::from(pin.pin));
        match self.inputs.get_mut(gpio) {
            Some(input) => input.wait_for_any_edge().await,
            None => self.inputs[0].wait_for_any_edge().await,
        }
    }
}

/// Hat switch value for the d-pad buttons, clockwise from up.
#[must_use]
pub fn hat_from_dpad(buttons: Buttons) -> u8 {
    let up = buttons.contains(Buttons::DPAD_UP);
    let down = buttons.contains(Buttons::DPAD_DOWN);
    let left = buttons.contains(Buttons::DPAD_LEFT);
    let right = buttons.contains(Buttons::DPAD_RIGHT);
    match (up, right, down, left) {
        (true, false, _, false) => 0,
        (true, true, _, _) => 1,
        (false, true, false, _) => 2,
        (_, true, true, _) => 3,
        (false, false, true, false) => 4,
        (_, false, true, true) => 5,
        (false, _, false, true) => 6,
        (true, false, _, true) => 7,
        _ => ControllerState::HAT_CENTER,
    }
}
