#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use core::cell::RefCell;

use aquabox_core::app_state::{AppError, halt};
use aquabox_core::config::NodeConfig;
use aquabox_core::scheduler::{RecalibrateSignal, SensorNode};
use aquabox_core::sensors::SensorBank;
use aquabox_firmware::adc::{AdcInput, SharedAdc};
use aquabox_firmware::net::TcpConnector;
use aquabox_firmware::node_env;
use aquabox_firmware::onewire::{Ds18b20, OneWireBus};
use aquabox_firmware::wifi::{self, WifiLink};
use embassy_executor::Spawner;
use embassy_net::{Config as NetConfig, DhcpConfig, StackResources};
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use esp_hal::analog::adc::{Adc, AdcConfig, Attenuation};
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Flex, Input, InputConfig, Pull};
use esp_hal::rng::Rng;
use esp_hal::timer::timg::TimerGroup;
use log::info;
use static_cell::StaticCell;

const TCP_BUFFER_LEN: usize = 4096;

static NODE_CONFIG: StaticCell<NodeConfig> = StaticCell::new();
static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
static NET_RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
static ADC1: StaticCell<SharedAdc> = StaticCell::new();
static TCP_RX: StaticCell<[u8; TCP_BUFFER_LEN]> = StaticCell::new();
static TCP_TX: StaticCell<[u8; TCP_BUFFER_LEN]> = StaticCell::new();
static RECALIBRATE: RecalibrateSignal = Signal::new();

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

/// BOOT button: takes a fresh zero-current offset on the next cycle.
#[embassy_executor::task]
async fn recalibrate_button(mut button: Input<'static>) {
    loop {
        button.wait_for_falling_edge().await;
        info!("Recalibration requested");
        RECALIBRATE.signal(());
    }
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized");

    let node_config: &'static NodeConfig = NODE_CONFIG.init(node_env::node_config());
    if node_config.wifi.ssid.is_empty() {
        halt(&AppError::config("AQUABOX_WIFI_SSID was not set at build time")).await;
    }

    // Sensors
    let mut adc_config = AdcConfig::new();
    let turbidity_pin = adc_config.enable_pin(peripherals.GPIO4, Attenuation::_11dB);
    let current_pin = adc_config.enable_pin(peripherals.GPIO5, Attenuation::_11dB);
    let level_pin = adc_config.enable_pin(peripherals.GPIO6, Attenuation::_11dB);
    let adc = ADC1.init(Mutex::new(RefCell::new(Adc::new(peripherals.ADC1, adc_config))));

    let sensors = SensorBank {
        turbidity: AdcInput::new(adc, turbidity_pin, "turbidity"),
        current: AdcInput::new(adc, current_pin, "ACS712"),
        water_level: AdcInput::new(adc, level_pin, "water level"),
        temperature: Ds18b20::new(OneWireBus::new(Flex::new(peripherals.GPIO7))),
    };

    let button = Input::new(
        peripherals.GPIO0,
        InputConfig::default().with_pull(Pull::Up),
    );
    spawner.spawn(recalibrate_button(button).expect("recalibrate_button spawn"));

    // Network
    let radio = match esp_radio::init() {
        Ok(radio) => RADIO.init(radio),
        Err(e) => {
            log::error!("esp_radio::init: {:?}", e);
            halt(&AppError::wifi("radio controller init failed")).await
        }
    };
    let (wifi_controller, interfaces) =
        match esp_radio::wifi::new(radio, peripherals.WIFI, Default::default()) {
            Ok(wifi) => wifi,
            Err(e) => {
                log::error!("esp_radio::wifi::new: {:?}", e);
                halt(&AppError::wifi("Wi-Fi driver init failed")).await
            }
        };

    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;
    let resources = NET_RESOURCES.init(StackResources::<3>::new());
    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        NetConfig::dhcpv4(DhcpConfig::default()),
        resources,
        seed,
    );

    spawner.spawn(wifi::net_task(runner).expect("net_task spawn"));
    spawner.spawn(
        wifi::wifi_task(
            wifi_controller,
            stack,
            node_env::WIFI_SSID,
            node_env::WIFI_PASSWORD,
        )
        .expect("wifi_task spawn"),
    );

    let connector = TcpConnector::new(
        stack,
        TCP_RX.init([0; TCP_BUFFER_LEN]),
        TCP_TX.init([0; TCP_BUFFER_LEN]),
        node_config.timeouts.get(),
    );

    info!(
        "Reporting to http://{}:{}{}",
        node_config.server.host, node_config.server.port, node_config.server.telemetry_path
    );

    let mut node = SensorNode::new(sensors, connector, WifiLink, &RECALIBRATE, node_config);
    node.run().await
}
