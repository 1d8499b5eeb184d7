//! Wi-Fi station and network stack tasks
//!
//! `wifi_task` joins once at boot. After a drop it waits for the node to ask
//! for a reconnect through [`WifiLink`], so the retry pace is set by the
//! node's reconnect throttle rather than by the radio driver.

use core::sync::atomic::{AtomicBool, Ordering};

use alloc::string::String;
use aquabox_core::link::Link;
use embassy_net::{Runner, Stack};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer, with_timeout};
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiDevice, WifiEvent};
use log::{info, warn};

static LINK_UP: AtomicBool = AtomicBool::new(false);
static RECONNECT: Signal<CriticalSectionRawMutex, ()> = Signal::new();

const DHCP_TIMEOUT: Duration = Duration::from_secs(15);
const SETUP_RETRY: Duration = Duration::from_secs(10);

/// Link state published by [`wifi_task`].
pub struct WifiLink;

impl Link for WifiLink {
    fn is_up(&self) -> bool {
        LINK_UP.load(Ordering::Acquire)
    }

    fn request_reconnect(&mut self) {
        RECONNECT.signal(());
    }
}

#[embassy_executor::task]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await;
}

#[embassy_executor::task]
pub async fn wifi_task(
    mut controller: WifiController<'static>,
    stack: Stack<'static>,
    ssid: &'static str,
    password: &'static str,
) {
    info!("WiFi task starting (ssid=\"{}\")", ssid);

    loop {
        if !matches!(controller.is_started(), Ok(true)) {
            let client_config = ModeConfig::Client(
                ClientConfig::default()
                    .with_ssid(String::from(ssid))
                    .with_password(String::from(password)),
            );
            if let Err(e) = controller.set_config(&client_config) {
                warn!("WiFi set_config error: {:?}", e);
                Timer::after(SETUP_RETRY).await;
                continue;
            }

            info!("Starting WiFi STA");
            if let Err(e) = controller.start_async().await {
                warn!("WiFi start error: {:?}", e);
                Timer::after(SETUP_RETRY).await;
                continue;
            }
        }

        info!("Connecting to WiFi SSID \"{}\"", ssid);
        match controller.connect_async().await {
            Ok(()) => {
                if with_timeout(DHCP_TIMEOUT, stack.wait_config_up()).await.is_err() {
                    warn!("No IPv4 config within {} s", DHCP_TIMEOUT.as_secs());
                } else {
                    if let Some(config) = stack.config_v4() {
                        info!("WiFi link up: ip={}", config.address.address());
                    }
                    LINK_UP.store(true, Ordering::Release);
                    controller.wait_for_event(WifiEvent::StaDisconnected).await;
                    LINK_UP.store(false, Ordering::Release);
                    warn!("WiFi STA disconnected");
                }
            }
            Err(e) => warn!("WiFi connect error: {:?}", e),
        }

        // Requests made while the link was still up are stale.
        RECONNECT.reset();
        RECONNECT.wait().await;
        info!("Reconnect requested");
        if let Err(e) = controller.disconnect_async().await {
            warn!("WiFi disconnect error: {:?}", e);
        }
        Timer::after(Duration::from_secs(1)).await;
    }
}
