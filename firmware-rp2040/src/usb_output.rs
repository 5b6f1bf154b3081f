//! USB side of the adapter: report layouts and the bridge's endpoints.
//!
//! The controller encodes its state with [`BoardEncoder`]. The bridge decodes
//! the link into [`UsbEndpoints`], which hands each finished report to the
//! writer task of its endpoint through an [`EndpointQueue`]. Host feature
//! requests arrive through [`HostRequestHandler`].

use core::cell::RefCell;

use adapter_core::dispatch::request_kind;
use adapter_core::{ControllerState, ReportEncoder, Subtype};
use defmt::{error, info, trace, warn, Format};
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_usb::class::hid::{HidWriter, ReportId, RequestHandler, State};
use embassy_usb::class::midi::MidiClass;
use embassy_usb::control::OutResponse;
use embassy_usb::driver::{Endpoint as _, EndpointIn as _};
use embassy_usb::Builder;
use heapless::Vec;
use link_proto::{ControlFrame, Endpoint, EndpointSink, ReportId as LinkReportId};
use portable_atomic::{AtomicBool, Ordering};

pub type UsbDriver = Driver<'static, USB>;

/// Interrupt IN endpoint of the XInput interface.
pub type XInputEndpoint = <UsbDriver as embassy_usb::driver::Driver<'static>>::EndpointIn;

/// Largest report any endpoint carries.
pub const MAX_USB_REPORT: usize = 64;

/// One report on its way to the host.
pub type Report = Vec<u8, MAX_USB_REPORT>;

const XINPUT_REPORT_LEN: usize = 20;
const XINPUT_PACKET_SIZE: u16 = 32;

/// USB HID Gamepad report structure.
///
/// This matches [`REPORT_DESCRIPTOR`].
/// Total size: 8 bytes (buttons: 2, sticks: 4x1, triggers: 2x1)
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Format)]
#[repr(C)]
pub struct GamepadReport {
    pub buttons: u16,
    pub left_stick_x: i8,
    pub left_stick_y: i8,
    pub right_stick_x: i8,
    pub right_stick_y: i8,
    pub left_trigger: u8,
    pub right_trigger: u8,
}

impl GamepadReport {
    pub const SIZE: usize = 8;

    #[must_use]
    pub fn as_bytes(&self) -> [u8; Self::SIZE] {
        let buttons_bytes = self.buttons.to_le_bytes();
        [
            buttons_bytes[0],
            buttons_bytes[1],
            self.left_stick_x as u8,
            self.left_stick_y as u8,
            self.right_stick_x as u8,
            self.right_stick_y as u8,
            self.left_trigger,
            self.right_trigger,
        ]
    }
}

/// Triggers are sampled as non-negative `i16`.
fn trigger_u8(value: i16) -> u8 {
    (value.max(0) >> 7) as u8
}

impl From<&ControllerState> for GamepadReport {
    fn from(state: &ControllerState) -> Self {
        use adapter_core::Axis;
        Self {
            buttons: state.buttons.raw(),
            // Scale i16 to i8 by taking the high byte
            left_stick_x: (state.axis(Axis::LeftX) >> 8) as i8,
            left_stick_y: (state.axis(Axis::LeftY) >> 8) as i8,
            right_stick_x: (state.axis(Axis::RightX) >> 8) as i8,
            right_stick_y: (state.axis(Axis::RightY) >> 8) as i8,
            left_trigger: trigger_u8(state.axis(Axis::LeftTrigger)),
            right_trigger: trigger_u8(state.axis(Axis::RightTrigger)),
        }
    }
}

/// The 20-byte XInput input report. Button bits already use XInput order.
#[must_use]
pub fn xinput_report(state: &ControllerState) -> [u8; XINPUT_REPORT_LEN] {
    use adapter_core::Axis;
    let mut out = [0u8; XINPUT_REPORT_LEN];
    out[1] = XINPUT_REPORT_LEN as u8;
    out[2..4].copy_from_slice(&state.buttons.raw().to_le_bytes());
    out[4] = trigger_u8(state.axis(Axis::LeftTrigger));
    out[5] = trigger_u8(state.axis(Axis::RightTrigger));
    let sticks = [Axis::LeftX, Axis::LeftY, Axis::RightX, Axis::RightY];
    for (i, axis) in sticks.into_iter().enumerate() {
        let at = 6 + i * 2;
        out[at..at + 2].copy_from_slice(&state.axis(axis).to_le_bytes());
    }
    out
}

/// Report encoder for this board: XInput subtypes get the XInput layout,
/// HID gamepad subtypes the [`GamepadReport`]. Keyboard and MIDI
/// personalities are not wired on this board.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoardEncoder;

impl ReportEncoder for BoardEncoder {
    fn encode(
        &mut self,
        subtype: Subtype,
        state: &ControllerState,
        buf: &mut [u8],
    ) -> Option<(LinkReportId, usize)> {
        let id = subtype.report_id();
        let len = match id {
            LinkReportId::XInput => copy_into(buf, &xinput_report(state))?,
            LinkReportId::Gamepad => copy_into(buf, &GamepadReport::from(state).as_bytes())?,
            _ => return None,
        };
        Some((id, len))
    }
}

fn copy_into(buf: &mut [u8], report: &[u8]) -> Option<usize> {
    buf.get_mut(..report.len())?.copy_from_slice(report);
    Some(report.len())
}

/// Standard HID Gamepad Report Descriptor.
///
/// This descriptor defines a gamepad with:
/// - 16 buttons
/// - 2 analog sticks (X/Y each, signed 8-bit)
/// - 2 triggers (unsigned 8-bit)
pub const REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x05, // Usage (Gamepad)
    0xA1, 0x01, // Collection (Application)
    //
    // --- Buttons (16 buttons) ---
    0x05, 0x09, //   Usage Page (Button)
    0x19, 0x01, //   Usage Minimum (Button 1)
    0x29, 0x10, //   Usage Maximum (Button 16)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x95, 0x10, //   Report Count (16)
    0x75, 0x01, //   Report Size (1)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    // --- Left Stick ---
    0x05, 0x01, //   Usage Page (Generic Desktop)
    0x09, 0x30, //   Usage (X)
    0x09, 0x31, //   Usage (Y)
    0x15, 0x81, //   Logical Minimum (-127)
    0x25, 0x7F, //   Logical Maximum (127)
    0x95, 0x02, //   Report Count (2)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    // --- Right Stick ---
    0x09, 0x32, //   Usage (Z)
    0x09, 0x35, //   Usage (Rz)
    0x95, 0x02, //   Report Count (2)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    // --- Triggers ---
    0x09, 0x33, //   Usage (Rx) - Left trigger
    0x09, 0x34, //   Usage (Ry) - Right trigger
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, //   Logical Maximum (255)
    0x95, 0x02, //   Report Count (2)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    0xC0, // End Collection
];

/// Hand-off between the link decoder and one endpoint's writer task.
///
/// Latest report wins; the endpoint counts as busy from submission until the
/// writer has handed the report to the host.
pub struct EndpointQueue {
    report: Signal<CriticalSectionRawMutex, Report>,
    busy: AtomicBool,
}

impl EndpointQueue {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            report: Signal::new(),
            busy: AtomicBool::new(false),
        }
    }

    fn submit(&self, report: Report) {
        self.busy.store(true, Ordering::Release);
        self.report.signal(report);
    }

    pub async fn next(&self) -> Report {
        self.report.wait().await
    }

    /// Called by the writer once the host has the report.
    pub fn done(&self) {
        self.busy.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Default for EndpointQueue {
    fn default() -> Self {
        Self::new()
    }
}

pub static HID_QUEUE: EndpointQueue = EndpointQueue::new();
pub static XINPUT_QUEUE: EndpointQueue = EndpointQueue::new();
pub static MIDI_QUEUE: EndpointQueue = EndpointQueue::new();

fn queue(endpoint: Endpoint) -> Option<&'static EndpointQueue> {
    match endpoint {
        Endpoint::Hid => Some(&HID_QUEUE),
        Endpoint::XInput => Some(&XINPUT_QUEUE),
        Endpoint::Midi => Some(&MIDI_QUEUE),
        Endpoint::Control => None,
    }
}

/// [`EndpointSink`] over the endpoint queues.
#[derive(Default)]
pub struct UsbEndpoints {
    report: Report,
    overflowed: bool,
}

impl UsbEndpoints {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            report: Vec::new(),
            overflowed: false,
        }
    }
}

impl EndpointSink for UsbEndpoints {
    fn select(&mut self, _endpoint: Endpoint) {
        self.report.clear();
        self.overflowed = false;
    }

    fn write(&mut self, byte: u8) {
        if self.report.push(byte).is_err() {
            self.overflowed = true;
        }
    }

    fn commit(&mut self, endpoint: Endpoint) {
        let report = core::mem::take(&mut self.report);
        if self.overflowed {
            warn!("report for {:?} too long, dropped", endpoint);
            return;
        }
        match queue(endpoint) {
            Some(queue) => queue.submit(report),
            None => trace!("no USB endpoint for {:?}", endpoint),
        }
    }

    fn is_ready(&self, endpoint: Endpoint) -> bool {
        queue(endpoint).map_or(true, |queue| !queue.is_busy())
    }
}

/// Feature requests from the host, waiting to go down the link.
pub static HOST_REQUESTS: Channel<CriticalSectionRawMutex, ControlFrame, 4> = Channel::new();

/// The controller's latest reply, served on GET_REPORT.
pub static LAST_REPLY: Mutex<CriticalSectionRawMutex, RefCell<Option<ControlFrame>>> =
    Mutex::new(RefCell::new(None));

/// Record a reply from the controller for the host's next GET_REPORT.
pub fn store_reply(frame: &ControlFrame) {
    LAST_REPLY.lock(|reply| *reply.borrow_mut() = Some(frame.clone()));
}

/// HID request handler for feature reports.
///
/// The feature report id is the command opcode. SET_REPORT queues the
/// command for the controller; GET_REPORT returns the latest reply to that
/// opcode, prefixed with the id.
pub struct HostRequestHandler;

impl RequestHandler for HostRequestHandler {
    fn get_report(&mut self, id: ReportId, buf: &mut [u8]) -> Option<usize> {
        let ReportId::Feature(cmd) = id else {
            return None;
        };
        LAST_REPLY.lock(|reply| {
            let reply = reply.borrow();
            let frame = reply.as_ref().filter(|frame| frame.cmd == cmd)?;
            let len = frame.payload.len() + 1;
            let out = buf.get_mut(..len)?;
            out[0] = cmd;
            out[1..].copy_from_slice(&frame.payload);
            Some(len)
        })
    }

    fn set_report(&mut self, id: ReportId, data: &[u8]) -> OutResponse {
        let ReportId::Feature(cmd) = id else {
            return OutResponse::Rejected;
        };
        let payload = match data.split_first() {
            Some((&first, rest)) if first == cmd => rest,
            _ => data,
        };
        let Some(frame) = ControlFrame::with_payload(request_kind(cmd), cmd, payload) else {
            warn!("feature report {} too long ({} bytes)", cmd, payload.len());
            return OutResponse::Rejected;
        };
        match HOST_REQUESTS.try_send(frame) {
            Ok(()) => OutResponse::Accepted,
            Err(_) => {
                warn!("host request {} dropped, link busy", cmd);
                OutResponse::Rejected
            }
        }
    }

    fn set_idle_ms(&mut self, _id: Option<ReportId>, _duration_ms: u32) {}

    fn get_idle_ms(&mut self, _id: Option<ReportId>) -> Option<u32> {
        None
    }
}

/// Interfaces the bridge's writer tasks own.
pub struct UsbInterfaces {
    pub hid: HidWriter<'static, UsbDriver, 8>,
    pub xinput: XInputEndpoint,
    pub midi: MidiClass<'static, UsbDriver>,
}

/// Add the HID, XInput and MIDI interfaces to the USB builder.
pub fn configure_usb(
    builder: &mut Builder<'static, UsbDriver>,
    hid_state: &'static mut State<'static>,
    handler: &'static mut HostRequestHandler,
) -> UsbInterfaces {
    let config = embassy_usb::class::hid::Config {
        report_descriptor: REPORT_DESCRIPTOR,
        request_handler: Some(handler),
        poll_ms: 1,
        max_packet_size: 8,
        hid_subclass: embassy_usb::class::hid::HidSubclass::No,
        hid_boot_protocol: embassy_usb::class::hid::HidBootProtocol::None,
    };
    let hid = HidWriter::new(builder, hid_state, config);

    let xinput = {
        let mut function = builder.function(0xFF, 0x5D, 0x01);
        let mut interface = function.interface();
        let mut alt = interface.alt_setting(0xFF, 0x5D, 0x01, None);
        alt.endpoint_interrupt_in(None, XINPUT_PACKET_SIZE, 1)
    };

    let midi = MidiClass::new(builder, 1, 1, 64);

    UsbInterfaces { hid, xinput, midi }
}

/// Writer loop for the HID endpoint.
pub async fn run_hid(mut writer: HidWriter<'static, UsbDriver, 8>) -> ! {
    writer.ready().await;
    info!("USB HID ready");
    loop {
        let report = HID_QUEUE.next().await;
        if let Err(e) = writer.write(&report).await {
            error!("HID write failed: {:?}", e);
        }
        HID_QUEUE.done();
    }
}

/// Writer loop for the XInput endpoint.
pub async fn run_xinput(mut endpoint: XInputEndpoint) -> ! {
    endpoint.wait_enabled().await;
    info!("XInput endpoint enabled");
    loop {
        let report = XINPUT_QUEUE.next().await;
        if let Err(e) = endpoint.write(&report).await {
            error!("XInput write failed: {:?}", e);
        }
        XINPUT_QUEUE.done();
    }
}

/// Writer loop for the MIDI streaming endpoint.
pub async fn run_midi(mut class: MidiClass<'static, UsbDriver>) -> ! {
    loop {
        class.wait_connection().await;
        info!("MIDI connected");
        loop {
            let report = MIDI_QUEUE.next().await;
            let result = class.write_packet(&report).await;
            MIDI_QUEUE.done();
            if let Err(e) = result {
                error!("MIDI write failed: {:?}", e);
                break;
            }
        }
    }
}
