#![no_std]
#![no_main]

use adapter_core::consts::LINK_RING_LEN;
use defmt::{error, info};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Pull};
use embassy_rp::peripherals::UART1;
use embassy_rp::uart::{Async, Uart, UartRx};
use embassy_time::{Duration, Instant, Ticker};
use link_adapter_rp2040::{
    boot, flash, link_uart, Adapter, BoardEncoder, BootMode, ConfigFlash, ConfigStore,
    ControllerState, LinkTx, PinSampler, ResetControl, SharedRing, Tick, WiredLink,
    CONFIG_OFFSET,
};
use link_proto::derive_id;

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    UART1_IRQ => embassy_rp::uart::InterruptHandler<UART1>;
});

const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Bytes from the bridge: feature requests and ready markers.
static LINK_RX: SharedRing<LINK_RING_LEN> = SharedRing::new();

type ControllerAdapter = Adapter<
    WiredLink<'static, LinkTx<'static>, LINK_RING_LEN>,
    ConfigFlash,
    BoardEncoder,
    ResetControl,
>;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    boot::enter_requested_mode();

    info!("Controller starting...");
    let p = embassy_rp::init(embassy_rp::config::Config::default());

    // --- Link UART ---
    let uart = Uart::new(
        p.UART1,
        p.PIN_20, // TX
        p.PIN_21, // RX
        Irqs,
        p.DMA_CH0,
        p.DMA_CH1,
        link_uart::link_config(),
    );
    let (tx, rx) = uart.split();

    // --- Configuration ---
    let mut config_flash = flash::config_flash(p.FLASH);
    let unique_id = flash::unique_id(&mut config_flash);
    info!("pairing id {:08x}", derive_id(&unique_id));
    let store = ConfigStore::new(config_flash, CONFIG_OFFSET);

    let transport = WiredLink::new(&LINK_RX, LinkTx::new(tx));
    let adapter = match Adapter::new(transport, store, BoardEncoder, ResetControl) {
        Ok(adapter) => adapter,
        Err(e) => {
            error!("config store unusable: {}", e);
            boot::reset(BootMode::Normal)
        }
    };

    // --- Buttons ---
    let sampler = PinSampler::new([
        Input::new(p.PIN_0, Pull::Up),
        Input::new(p.PIN_1, Pull::Up),
        Input::new(p.PIN_2, Pull::Up),
        Input::new(p.PIN_3, Pull::Up),
        Input::new(p.PIN_4, Pull::Up),
        Input::new(p.PIN_5, Pull::Up),
        Input::new(p.PIN_6, Pull::Up),
        Input::new(p.PIN_7, Pull::Up),
        Input::new(p.PIN_8, Pull::Up),
        Input::new(p.PIN_9, Pull::Up),
        Input::new(p.PIN_10, Pull::Up),
        Input::new(p.PIN_11, Pull::Up),
        Input::new(p.PIN_12, Pull::Up),
        Input::new(p.PIN_13, Pull::Up),
        Input::new(p.PIN_14, Pull::Up),
    ]);

    spawner.spawn(link_rx_task(rx).unwrap());
    spawner.spawn(poll_task(adapter, sampler).unwrap());

    info!("Controller initialized");
}

/// Link receive task - moves UART bytes into the ring.
#[embassy_executor::task]
async fn link_rx_task(rx: UartRx<'static, Async>) {
    link_uart::pump(rx, &LINK_RX, None).await
}

/// Poll task - samples inputs and runs one adapter tick per period.
#[embassy_executor::task]
async fn poll_task(mut adapter: ControllerAdapter, mut sampler: PinSampler<'static>) {
    let mut ticker = Ticker::every(POLL_INTERVAL);
    let mut state = ControllerState::neutral();
    loop {
        sampler.sample(&adapter.config().pins, &mut state);
        if adapter.tick(Instant::now().as_millis(), &state).await == Tick::Sleep {
            let pins = adapter.config().pins;
            sampler.wait_for_wake(&pins).await;
            adapter.wake(Instant::now().as_millis()).await;
            ticker.reset();
        }
        ticker.next().await;
    }
}
