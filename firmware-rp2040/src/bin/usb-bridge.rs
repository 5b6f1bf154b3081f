#![no_std]
#![no_main]

use adapter_core::config::DEFAULT_CONFIG;
use adapter_core::consts::LINK_RING_LEN;
use defmt::{error, info};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_futures::select::{select3, Either3};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::{UART1, USB};
use embassy_rp::uart::{Async, Uart, UartRx};
use embassy_rp::usb::Driver;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use embassy_usb::class::hid::{HidWriter, State};
use embassy_usb::class::midi::MidiClass;
use embassy_usb::{Builder, Config as UsbConfig};
use link_adapter_rp2040::link_uart::{self, RING_OVERRUNS};
use link_adapter_rp2040::usb_output::{self, UsbDriver, XInputEndpoint, HOST_REQUESTS};
use link_adapter_rp2040::{
    configure_usb, ControlFrame, HostRequestHandler, LinkTx, ReportRelay, SharedRing,
    UsbEndpoints,
};
use portable_atomic::Ordering;
use static_cell::StaticCell;

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    UART1_IRQ => embassy_rp::uart::InterruptHandler<UART1>;
    USBCTRL_IRQ => embassy_rp::usb::InterruptHandler<USB>;
});

/// How often the relay rechecks endpoint readiness with no link traffic.
const READY_POLL: Duration = Duration::from_millis(1);

/// Bytes from the controller.
static LINK_RX: SharedRing<LINK_RING_LEN> = SharedRing::new();
static RX_READY: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// USB device configuration buffer.
static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static MSOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();

/// HID state.
static HID_STATE: StaticCell<State> = StaticCell::new();
static REQUEST_HANDLER: StaticCell<HostRequestHandler> = StaticCell::new();

type Relay = ReportRelay<UsbEndpoints, LinkTx<'static>>;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("USB bridge starting...");

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    // --- Link UART ---
    #[cfg(not(feature = "uart-flow-control"))]
    let uart = Uart::new(
        p.UART1,
        p.PIN_8, // TX
        p.PIN_9, // RX
        Irqs,
        p.DMA_CH0,
        p.DMA_CH1,
        link_uart::link_config(),
    );
    #[cfg(feature = "uart-flow-control")]
    let uart = Uart::new_with_rtscts(
        p.UART1,
        p.PIN_8,  // TX
        p.PIN_9,  // RX
        p.PIN_11, // RTS
        p.PIN_10, // CTS
        Irqs,
        p.DMA_CH0,
        p.DMA_CH1,
        link_uart::link_config(),
    );
    let (tx, rx) = uart.split();

    // --- USB Setup ---
    let usb_driver = Driver::new(p.USB, Irqs);

    let mut usb_config = UsbConfig::new(0x1209, 0x0001); // pid.codes test VID/PID
    usb_config.manufacturer = Some("Rust Gamepad");
    usb_config.product = Some("Controller Link Adapter");
    usb_config.serial_number = Some("001");
    usb_config.max_power = 100;
    usb_config.max_packet_size_0 = 64;

    let mut builder = Builder::new(
        usb_driver,
        usb_config,
        CONFIG_DESCRIPTOR.init([0; 256]),
        BOS_DESCRIPTOR.init([0; 256]),
        MSOS_DESCRIPTOR.init([0; 256]),
        CONTROL_BUF.init([0; 64]),
    );

    let interfaces = configure_usb(
        &mut builder,
        HID_STATE.init(State::new()),
        REQUEST_HANDLER.init(HostRequestHandler),
    );
    let usb_device = builder.build();

    // The controller boots with the stored personality; until its first
    // report arrives, assume the default one.
    let relay = ReportRelay::new(
        UsbEndpoints::new(),
        LinkTx::new(tx),
        DEFAULT_CONFIG.subtype.endpoint(),
    );

    // On-board LED toggles on lost link bytes
    let led = Output::new(p.PIN_25, Level::Low);

    spawner.spawn(usb_task(usb_device).unwrap());
    spawner.spawn(link_rx_task(rx).unwrap());
    spawner.spawn(hid_task(interfaces.hid).unwrap());
    spawner.spawn(xinput_task(interfaces.xinput).unwrap());
    spawner.spawn(midi_task(interfaces.midi).unwrap());
    spawner.spawn(relay_task(relay, led).unwrap());

    info!("USB bridge initialized, waiting for the controller...");
}

/// USB device task - runs the USB stack.
#[embassy_executor::task]
async fn usb_task(mut device: embassy_usb::UsbDevice<'static, UsbDriver>) {
    device.run().await;
}

/// Link receive task - moves UART bytes into the ring and wakes the relay.
#[embassy_executor::task]
async fn link_rx_task(rx: UartRx<'static, Async>) {
    link_uart::pump(rx, &LINK_RX, Some(&RX_READY)).await
}

#[embassy_executor::task]
async fn hid_task(writer: HidWriter<'static, UsbDriver, 8>) {
    usb_output::run_hid(writer).await
}

#[embassy_executor::task]
async fn xinput_task(endpoint: XInputEndpoint) {
    usb_output::run_xinput(endpoint).await
}

#[embassy_executor::task]
async fn midi_task(class: MidiClass<'static, UsbDriver>) {
    usb_output::run_midi(class).await
}

/// Relay task - decodes the link into the endpoints, sends the ready marker
/// and passes host feature requests down to the controller.
#[embassy_executor::task]
async fn relay_task(mut relay: Relay, mut led: Output<'static>) {
    let mut rx = &LINK_RX;
    let mut published: Option<ControlFrame> = None;
    let mut overruns = 0;
    loop {
        let event = select3(RX_READY.wait(), HOST_REQUESTS.receive(), Timer::after(READY_POLL));
        if let Either3::Second(request) = event.await {
            if let Err(e) = relay.forward(&request) {
                error!("request forward failed: {}", e);
            }
        }

        relay.poll(&mut rx);

        if relay.last_reply() != published.as_ref() {
            published = relay.last_reply().cloned();
            if let Some(reply) = &published {
                usb_output::store_reply(reply);
            }
        }

        let lost = RING_OVERRUNS.load(Ordering::Relaxed);
        if lost != overruns {
            overruns = lost;
            led.toggle();
        }
    }
}
