//! Hardware-independent core library for the aquabox sensing nodes
//!
//! This crate contains all platform-agnostic logic shared by the sensor node
//! and the camera node: a minimal HTTP/1.1 client built on a raw byte stream,
//! the request builders (GET, text POST, form POST, multipart upload), the
//! current-sensor calibrator, the sampling pipeline and the per-tick
//! reporting state machine.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets (ESP32-S3) and desktop hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod app_state;
pub mod config;
pub mod link;
pub mod net;
pub mod reporter;
pub mod sampling;
pub mod scheduler;
pub mod sensors;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod mock;
