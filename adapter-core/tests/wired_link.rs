//! Controller and bridge talking over a simulated UART.

mod common;

use adapter_core::config::{ConfigStore, DEFAULT_CONFIG};
use adapter_core::dispatch::{READ_CONFIG_BLOCK, STATUS_OK, WRITE_SUBTYPE};
use adapter_core::{
    Adapter, Buttons, CanonicalEncoder, ControllerState, ReportRelay, Subtype, Tick, WiredLink,
};
use common::{block_on, MockBoot, MockFlash, MockUsb, RingWriter};
use link_proto::{ControlFrame, ControlKind, Endpoint, SharedRing};

#[test]
fn reports_and_commands_cross_the_link() {
    let to_bridge = SharedRing::<256>::new();
    let to_controller = SharedRing::<256>::new();

    let store = ConfigStore::new(MockFlash::with_config(&DEFAULT_CONFIG), 0);
    let link = WiredLink::new(&to_controller, RingWriter(&to_bridge));
    let mut adapter = Adapter::new(link, store, CanonicalEncoder, MockBoot::default()).unwrap();
    let mut relay = ReportRelay::new(
        MockUsb::default(),
        RingWriter(&to_controller),
        DEFAULT_CONFIG.subtype.endpoint(),
    );

    let mut state = ControllerState::neutral();
    state.buttons = Buttons::A | Buttons::DPAD_UP;
    assert_eq!(block_on(adapter.tick(0, &state)), Tick::Sent);

    assert_eq!(relay.poll(&mut &to_bridge), 1);
    let (endpoint, report) = &relay.sink().committed[0];
    assert_eq!(*endpoint, Endpoint::XInput);
    // XInput reports carry their own header, so no id byte goes to the host.
    assert_eq!(report.as_slice(), &state.to_bytes());

    // Host asks for the first config bytes; the controller answers on its
    // next tick and the bridge keeps the reply for GET_REPORT.
    let read =
        ControlFrame::with_payload(ControlKind::Read, READ_CONFIG_BLOCK, &[0, 0, 6]).unwrap();
    relay.forward(&read).unwrap();
    assert_eq!(block_on(adapter.tick(10, &state)), Tick::Idle);
    relay.poll(&mut &to_bridge);
    let reply = relay.last_reply().unwrap();
    assert_eq!(reply.cmd, READ_CONFIG_BLOCK);
    assert_eq!(reply.payload[0], STATUS_OK);
    assert_eq!(&reply.payload[1..], &DEFAULT_CONFIG.to_bytes()[..6]);

    // A subtype change moves later reports to the HID endpoint.
    let subtype = [Subtype::PS3_GAMEPAD.raw()];
    let write = ControlFrame::with_payload(ControlKind::Write, WRITE_SUBTYPE, &subtype).unwrap();
    relay.forward(&write).unwrap();
    state.buttons = Buttons::B;
    assert_eq!(block_on(adapter.tick(20, &state)), Tick::Sent);
    assert_eq!(adapter.config().subtype, Subtype::PS3_GAMEPAD);
    assert_eq!(adapter.store().flash().writes, 1);

    state.buttons = Buttons::X;
    block_on(adapter.tick(30, &state));
    relay.poll(&mut &to_bridge);
    let (endpoint, report) = relay.sink().committed.last().unwrap();
    assert_eq!(*endpoint, Endpoint::Hid);
    // Gamepad reports reach the host without their id byte.
    assert_eq!(report.as_slice(), &state.to_bytes());
}
