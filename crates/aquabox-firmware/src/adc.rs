//! ADC1 channels behind the core's `AnalogInput`
//!
//! Turbidity, current and water level all sit on ADC1, which stays usable
//! while the radio is on. The converter is shared through a blocking mutex;
//! each channel owns its pin and polls its own one-shot conversion.

use core::cell::RefCell;

use aquabox_core::sensors::{AnalogInput, SensorError};
use embassy_futures::yield_now;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use esp_hal::Blocking;
use esp_hal::analog::adc::{Adc, AdcChannel, AdcPin};
use esp_hal::peripherals::ADC1;

pub type Adc1 = Adc<'static, ADC1<'static>, Blocking>;
pub type SharedAdc = Mutex<CriticalSectionRawMutex, RefCell<Adc1>>;

/// Give up on a conversion after this many polls
const MAX_POLLS: usize = 64;

pub struct AdcInput<PIN> {
    adc: &'static SharedAdc,
    pin: AdcPin<PIN, ADC1<'static>>,
    name: &'static str,
}

impl<PIN: AdcChannel> AdcInput<PIN> {
    pub fn new(adc: &'static SharedAdc, pin: AdcPin<PIN, ADC1<'static>>, name: &'static str) -> Self {
        Self { adc, pin, name }
    }
}

impl<PIN: AdcChannel> AnalogInput for AdcInput<PIN> {
    async fn read_raw(&mut self) -> Result<u16, SensorError> {
        for _ in 0..MAX_POLLS {
            let pin = &mut self.pin;
            // WouldBlock until the conversion started by the first call is done
            if let Ok(raw) = self.adc.lock(|adc| adc.borrow_mut().read_oneshot(pin)) {
                return Ok(raw);
            }
            yield_now().await;
        }
        Err(SensorError::ReadFailed {
            sensor: self.name,
            details: "conversion did not complete",
        })
    }
}
