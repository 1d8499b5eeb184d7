//! ESP32-S3 firmware-specific modules for the aquabox sensor node
//!
//! This crate contains the hardware-specific glue that cannot compile on
//! desktop targets: the shared ADC, the DS18B20 one-wire driver, the Wi-Fi
//! station task and the embassy-net TCP adapter the core's transport runs on.

#![no_std]

extern crate alloc;

pub mod adc;
pub mod net;
pub mod node_env;
pub mod onewire;
pub mod wifi;
