//! The controller's poll-loop context.

use embedded_storage::nor_flash::NorFlash;
use link_proto::{ControlFrame, MAX_REPORT_PAYLOAD};

use crate::boot::{BootControl, BootMode};
use crate::config::{Config, ConfigStore, StoreError};
use crate::dispatch::{Dispatcher, Outcome};
use crate::encoder::ReportEncoder;
use crate::schedule::{IdleTimer, TransmitGate};
use crate::state::ControllerState;
use crate::transport::Transport;

/// What one [`Adapter::tick`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Tick {
    /// Nothing was due.
    Idle,
    /// The state went out on the link.
    Sent,
    /// The idle timeout elapsed and the transport is suspended. Call
    /// [`Adapter::wake`] after the wake signal.
    Sleep,
}

/// Everything the controller loop owns: link, configuration, command
/// handling and timing.
///
/// The loop samples inputs into a [`ControllerState`] and calls
/// [`tick`](Self::tick) with the current time; the adapter decides whether to
/// transmit, executes any command that came back and reports when to sleep.
pub struct Adapter<T, F, E, B> {
    transport: T,
    store: ConfigStore<F>,
    config: Config,
    dispatcher: Dispatcher,
    encoder: E,
    boot: B,
    gate: TransmitGate,
    idle: IdleTimer,
    last: Option<ControllerState>,
}

impl<T, F, E, B> Adapter<T, F, E, B>
where
    T: Transport,
    F: NorFlash,
    E: ReportEncoder,
    B: BootControl,
{
    /// Load the configuration and build the context.
    ///
    /// # Errors
    ///
    /// [`StoreError::Flash`] if the configuration cannot be read or written
    /// back.
    pub fn new(
        transport: T,
        mut store: ConfigStore<F>,
        encoder: E,
        boot: B,
    ) -> Result<Self, StoreError> {
        let config = store.load()?;
        info!("config loaded, subtype {}", config.subtype.raw());
        Ok(Self {
            transport,
            store,
            config,
            dispatcher: Dispatcher::new(),
            encoder,
            boot,
            gate: TransmitGate::default(),
            idle: IdleTimer::default(),
            last: None,
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// One poll-loop step.
    pub async fn tick(&mut self, now_ms: u64, state: &ControllerState) -> Tick {
        while let Some(frame) = self.transport.poll_command() {
            self.execute(frame).await;
        }

        self.idle.observe(now_ms, state.buttons);
        if self.idle.expired(now_ms) {
            info!("idle timeout, sleeping");
            self.transport.suspend().await;
            return Tick::Sleep;
        }

        let changed = self.last.map_or(true, |last| state.input_differs(&last));
        if !self.gate.should_send(now_ms, changed) {
            return Tick::Idle;
        }

        let mut buf = [0u8; MAX_REPORT_PAYLOAD];
        let Some((id, len)) = self.encoder.encode(self.config.subtype, state, &mut buf) else {
            return Tick::Idle;
        };
        let command = self.transport.transmit(id, &buf[..len]).await;
        self.gate.mark_sent(now_ms);
        self.last = Some(*state);

        if let Some(frame) = command {
            self.execute(frame).await;
        }
        Tick::Sent
    }

    /// Resume after [`Tick::Sleep`]. Memory survived, so only the transport
    /// needs to come back; the next tick transmits unconditionally.
    pub async fn wake(&mut self, now_ms: u64) {
        info!("waking");
        self.transport.resume().await;
        self.idle.reset(now_ms);
        self.last = None;
    }

    async fn execute(&mut self, frame: ControlFrame) {
        match self.dispatcher.handle(&frame, &mut self.store) {
            Outcome::None => {}
            Outcome::Reply(reply) => {
                self.config = self.store.committed();
                self.transport.reply(&reply).await;
            }
            Outcome::Restart(mode) => {
                info!("restart requested: {:?}", mode);
                self.boot.restart(mode);
            }
            Outcome::Fatal => {
                error!("config store failed, restarting");
                self.boot.restart(BootMode::Normal);
            }
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn store(&self) -> &ConfigStore<F> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ConfigStore<F> {
        &mut self.store
    }

    pub fn boot(&self) -> &B {
        &self.boot
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::config::DEFAULT_CONFIG;
    use crate::consts::{RETRANSMIT_INTERVAL_MS, SLEEP_TIMEOUT_MS};
    use crate::dispatch::{READ_CONFIG_BLOCK, REBOOT, STATUS_OK, WRITE_CONFIG_BLOCK, WRITE_SUBTYPE};
    use crate::encoder::CanonicalEncoder;
    use crate::state::Buttons;
    use crate::subtype::Subtype;
    use crate::testutil::{block_on, MockFlash};
    use link_proto::{ControlKind, ReportId};
    use std::collections::VecDeque;
    use std::vec::Vec;

    #[derive(Default)]
    struct MockTransport {
        sent: Vec<(ReportId, Vec<u8>)>,
        replies: Vec<ControlFrame>,
        on_ack: VecDeque<ControlFrame>,
        unsolicited: VecDeque<ControlFrame>,
        suspended: bool,
        resumed: usize,
    }

    impl Transport for MockTransport {
        async fn transmit(&mut self, id: ReportId, report: &[u8]) -> Option<ControlFrame> {
            self.sent.push((id, report.to_vec()));
            self.on_ack.pop_front()
        }

        async fn reply(&mut self, frame: &ControlFrame) {
            self.replies.push(frame.clone());
        }

        fn poll_command(&mut self) -> Option<ControlFrame> {
            self.unsolicited.pop_front()
        }

        async fn suspend(&mut self) {
            self.suspended = true;
        }

        async fn resume(&mut self) {
            self.suspended = false;
            self.resumed += 1;
        }
    }

    #[derive(Default)]
    struct MockBoot {
        restarts: Vec<BootMode>,
    }

    impl BootControl for MockBoot {
        fn restart(&mut self, mode: BootMode) {
            self.restarts.push(mode);
        }
    }

    type TestAdapter = Adapter<MockTransport, MockFlash, CanonicalEncoder, MockBoot>;

    fn adapter() -> TestAdapter {
        let store = ConfigStore::new(MockFlash::with_config(&DEFAULT_CONFIG), 0);
        Adapter::new(
            MockTransport::default(),
            store,
            CanonicalEncoder,
            MockBoot::default(),
        )
        .unwrap()
    }

    fn command(cmd: u8, data: &[u8]) -> ControlFrame {
        ControlFrame::with_payload(ControlKind::Write, cmd, data).unwrap()
    }

    #[test]
    fn test_unchanged_state_resent_on_interval() {
        let mut adapter = adapter();
        let state = ControllerState::neutral();
        assert_eq!(block_on(adapter.tick(0, &state)), Tick::Sent);
        assert_eq!(block_on(adapter.tick(50, &state)), Tick::Idle);
        assert_eq!(
            block_on(adapter.tick(RETRANSMIT_INTERVAL_MS, &state)),
            Tick::Sent
        );
        assert_eq!(adapter.transport().sent.len(), 2);
    }

    #[test]
    fn test_change_sent_immediately_counter_ignored() {
        let mut adapter = adapter();
        let mut state = ControllerState::neutral();
        block_on(adapter.tick(0, &state));
        state.advance();
        assert_eq!(block_on(adapter.tick(1, &state)), Tick::Idle);
        state.buttons = Buttons::A;
        assert_eq!(block_on(adapter.tick(2, &state)), Tick::Sent);
        let (id, bytes) = &adapter.transport().sent[1];
        assert_eq!(*id, ReportId::XInput);
        assert_eq!(bytes.as_slice(), &state.to_bytes());
    }

    #[test]
    fn test_subtype_command_switches_channel() {
        let mut adapter = adapter();
        adapter
            .transport_mut()
            .on_ack
            .push_back(command(WRITE_SUBTYPE, &[Subtype::PS3_GAMEPAD.raw()]));
        let mut state = ControllerState::neutral();
        block_on(adapter.tick(0, &state));

        assert_eq!(adapter.config().subtype, Subtype::PS3_GAMEPAD);
        assert_eq!(adapter.transport().replies.len(), 1);
        assert_eq!(adapter.transport().replies[0].payload.as_slice(), [STATUS_OK]);

        state.buttons = Buttons::B;
        block_on(adapter.tick(1, &state));
        assert_eq!(adapter.transport().sent[1].0, ReportId::Gamepad);
    }

    #[test]
    fn test_pending_block_not_applied_by_subtype_write() {
        let mut adapter = adapter();
        let rf_enabled = u8::from(!DEFAULT_CONFIG.rf.enabled);
        let unsolicited = &mut adapter.transport_mut().unsolicited;
        unsolicited.push_back(command(WRITE_CONFIG_BLOCK, &[93, 0, 1, 0, rf_enabled]));
        unsolicited.push_back(command(WRITE_SUBTYPE, &[Subtype::PS3_GAMEPAD.raw()]));
        block_on(adapter.tick(0, &ControllerState::neutral()));

        assert_eq!(adapter.config().subtype, Subtype::PS3_GAMEPAD);
        assert_eq!(adapter.config().rf, DEFAULT_CONFIG.rf);
        assert_eq!(adapter.store().flash().mem[93], u8::from(DEFAULT_CONFIG.rf.enabled));
    }

    #[test]
    fn test_unsolicited_read_is_answered() {
        let mut adapter = adapter();
        adapter
            .transport_mut()
            .unsolicited
            .push_back(command(READ_CONFIG_BLOCK, &[0, 0, 4]));
        block_on(adapter.tick(0, &ControllerState::neutral()));
        let reply = &adapter.transport().replies[0];
        assert_eq!(reply.cmd, READ_CONFIG_BLOCK);
        assert_eq!(reply.payload[0], STATUS_OK);
        assert_eq!(&reply.payload[1..], &DEFAULT_CONFIG.to_bytes()[..4]);
    }

    #[test]
    fn test_reboot_restarts() {
        let mut adapter = adapter();
        adapter.transport_mut().on_ack.push_back(command(REBOOT, &[]));
        block_on(adapter.tick(0, &ControllerState::neutral()));
        assert_eq!(adapter.boot().restarts, [BootMode::Normal]);
    }

    #[test]
    fn test_flash_failure_restarts() {
        let mut adapter = adapter();
        adapter.store_mut().flash_mut().fail = true;
        adapter
            .transport_mut()
            .on_ack
            .push_back(command(WRITE_SUBTYPE, &[2]));
        block_on(adapter.tick(0, &ControllerState::neutral()));
        assert_eq!(adapter.boot().restarts, [BootMode::Normal]);
        assert!(adapter.transport().replies.is_empty());
    }

    #[test]
    fn test_sleep_after_idle_timeout_and_wake() {
        let mut adapter = adapter();
        let state = ControllerState::neutral();
        block_on(adapter.tick(0, &state));
        assert_ne!(
            block_on(adapter.tick(SLEEP_TIMEOUT_MS - 1, &state)),
            Tick::Sleep
        );
        assert_eq!(block_on(adapter.tick(SLEEP_TIMEOUT_MS, &state)), Tick::Sleep);
        assert!(adapter.transport().suspended);

        let woke_at = SLEEP_TIMEOUT_MS + 5_000;
        block_on(adapter.wake(woke_at));
        assert!(!adapter.transport().suspended);
        assert_eq!(adapter.transport().resumed, 1);
        assert_eq!(block_on(adapter.tick(woke_at + 1, &state)), Tick::Sent);
    }
}
