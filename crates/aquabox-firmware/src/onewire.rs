//! Bit-banged one-wire bus and the DS18B20 probe on it
//!
//! Timings follow the standard-speed slots from the DS18B20 datasheet. Each
//! slot runs inside a critical section so an interrupt cannot stretch it.

use aquabox_core::sensors::ds18b20::{
    self, CONVERSION_TIME, CONVERT_T, READ_SCRATCHPAD, SCRATCHPAD_LEN, SENSOR_NAME, SKIP_ROM,
};
use aquabox_core::sensors::{SensorError, TemperatureProbe};
use embassy_time::Timer;
use esp_hal::delay::Delay;
use esp_hal::gpio::{DriveMode, Flex, OutputConfig, Pull};
use log::debug;

pub struct OneWireBus {
    pin: Flex<'static>,
    delay: Delay,
}

impl OneWireBus {
    /// Open-drain with the internal pull-up; an external 4.7k is still
    /// needed for reliable reads.
    pub fn new(mut pin: Flex<'static>) -> Self {
        pin.apply_output_config(
            &OutputConfig::default()
                .with_drive_mode(DriveMode::OpenDrain)
                .with_pull(Pull::Up),
        );
        pin.set_high();
        pin.set_output_enable(true);
        pin.set_input_enable(true);
        Self {
            pin,
            delay: Delay::new(),
        }
    }

    /// Reset pulse. Returns whether any device answered with a presence
    /// pulse.
    pub fn reset(&mut self) -> bool {
        critical_section::with(|_| {
            self.pin.set_low();
            self.delay.delay_micros(480);
            self.pin.set_high();
            self.delay.delay_micros(70);
            let present = self.pin.is_low();
            self.delay.delay_micros(410);
            present
        })
    }

    fn write_bit(&mut self, bit: bool) {
        critical_section::with(|_| {
            self.pin.set_low();
            if bit {
                self.delay.delay_micros(6);
                self.pin.set_high();
                self.delay.delay_micros(64);
            } else {
                self.delay.delay_micros(60);
                self.pin.set_high();
                self.delay.delay_micros(10);
            }
        })
    }

    fn read_bit(&mut self) -> bool {
        critical_section::with(|_| {
            self.pin.set_low();
            self.delay.delay_micros(6);
            self.pin.set_high();
            self.delay.delay_micros(9);
            let bit = self.pin.is_high();
            self.delay.delay_micros(55);
            bit
        })
    }

    pub fn write_byte(&mut self, byte: u8) {
        for i in 0..8 {
            self.write_bit(byte & (1 << i) != 0);
        }
    }

    pub fn read_byte(&mut self) -> u8 {
        let mut byte = 0;
        for i in 0..8 {
            if self.read_bit() {
                byte |= 1 << i;
            }
        }
        byte
    }
}

/// A single DS18B20 addressed with SKIP ROM.
pub struct Ds18b20 {
    bus: OneWireBus,
}

impl Ds18b20 {
    pub fn new(bus: OneWireBus) -> Self {
        Self { bus }
    }

    fn command(&mut self, command: u8) -> Result<(), SensorError> {
        if !self.bus.reset() {
            return Err(SensorError::Disconnected {
                sensor: SENSOR_NAME,
            });
        }
        self.bus.write_byte(SKIP_ROM);
        self.bus.write_byte(command);
        Ok(())
    }
}

impl TemperatureProbe for Ds18b20 {
    async fn read_celsius(&mut self) -> Result<f32, SensorError> {
        self.command(CONVERT_T)?;
        Timer::after(CONVERSION_TIME).await;

        self.command(READ_SCRATCHPAD)?;
        let mut scratchpad = [0u8; SCRATCHPAD_LEN];
        for byte in scratchpad.iter_mut() {
            *byte = self.bus.read_byte();
        }
        debug!("DS18B20 scratchpad: {:02x?}", scratchpad);

        ds18b20::decode_scratchpad(&scratchpad)
    }
}
