//! Poll-loop timing: when to transmit and when to go to sleep.
//!
//! Both are driven by a caller-supplied millisecond clock so they can be
//! tested without a timer.

use crate::consts::{RETRANSMIT_INTERVAL_MS, SLEEP_TIMEOUT_MS};
use crate::state::Buttons;

/// Decides whether the current state goes out on this poll.
///
/// A changed state is always sent. An unchanged one is re-sent once the
/// interval has elapsed, which is the link's only retransmission and also
/// lets the peer detect a dead controller.
#[derive(Clone, Copy, Debug)]
pub struct TransmitGate {
    interval_ms: u64,
    last_sent: Option<u64>,
}

impl Default for TransmitGate {
    fn default() -> Self {
        Self::new(RETRANSMIT_INTERVAL_MS)
    }
}

impl TransmitGate {
    #[must_use]
    pub const fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_sent: None,
        }
    }

    #[must_use]
    pub fn should_send(&self, now_ms: u64, changed: bool) -> bool {
        match self.last_sent {
            None => true,
            Some(at) => changed || now_ms.saturating_sub(at) >= self.interval_ms,
        }
    }

    pub fn mark_sent(&mut self, now_ms: u64) {
        self.last_sent = Some(now_ms);
    }
}

/// Tracks how long the button mask has been unchanged.
#[derive(Clone, Copy, Debug)]
pub struct IdleTimer {
    timeout_ms: u64,
    last_change: u64,
    buttons: Option<Buttons>,
}

impl Default for IdleTimer {
    fn default() -> Self {
        Self::new(SLEEP_TIMEOUT_MS)
    }
}

impl IdleTimer {
    #[must_use]
    pub const fn new(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            last_change: 0,
            buttons: None,
        }
    }

    /// Record the buttons seen at `now_ms`. Axis movement does not count as
    /// activity.
    pub fn observe(&mut self, now_ms: u64, buttons: Buttons) {
        if self.buttons != Some(buttons) {
            self.buttons = Some(buttons);
            self.last_change = now_ms;
        }
    }

    #[must_use]
    pub fn expired(&self, now_ms: u64) -> bool {
        self.buttons.is_some() && now_ms.saturating_sub(self.last_change) >= self.timeout_ms
    }

    /// Restart the countdown, e.g. after waking.
    pub fn reset(&mut self, now_ms: u64) {
        self.last_change = now_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_poll_always_sends() {
        let gate = TransmitGate::default();
        assert!(gate.should_send(0, false));
    }

    #[test]
    fn test_unchanged_state_once_per_interval() {
        let mut gate = TransmitGate::default();
        let mut sent = 0;
        for now in 0..1000 {
            if gate.should_send(now, false) {
                gate.mark_sent(now);
                sent += 1;
            }
        }
        assert_eq!(sent, 10);
    }

    #[test]
    fn test_change_sends_immediately() {
        let mut gate = TransmitGate::new(100);
        gate.mark_sent(50);
        assert!(!gate.should_send(51, false));
        assert!(gate.should_send(51, true));
        assert!(!gate.should_send(149, false));
        assert!(gate.should_send(150, false));
    }

    #[test]
    fn test_idle_timer_tracks_buttons_only() {
        let mut timer = IdleTimer::new(1000);
        assert!(!timer.expired(5000));
        timer.observe(0, Buttons::NONE);
        timer.observe(999, Buttons::NONE);
        assert!(!timer.expired(999));
        assert!(timer.expired(1000));

        timer.observe(1000, Buttons::A);
        assert!(!timer.expired(1999));
        assert!(timer.expired(2000));

        timer.reset(2500);
        assert!(!timer.expired(3000));
        assert!(timer.expired(3500));
    }
}
