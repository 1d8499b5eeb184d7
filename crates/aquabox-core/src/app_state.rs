//! Startup failures that park a node

use embassy_time::{Duration, Timer};
use log::error;
use thiserror_no_std::Error;

/// Failures that stop a node before its loop starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Camera init failed: {0}")]
    CameraInit(heapless::String<64>),
    #[error("WiFi setup failed: {0}")]
    Wifi(heapless::String<64>),
    #[error("Invalid configuration: {0}")]
    Config(heapless::String<64>),
}

pub trait FromTruncated<T> {
    fn from_truncated(value: T) -> Self;
}

/// Copies as much of `value` as fits, cutting on a char boundary.
impl<const N: usize> FromTruncated<&str> for heapless::String<N> {
    fn from_truncated(value: &str) -> Self {
        let mut out = heapless::String::<N>::new();
        for ch in value.chars() {
            if out.push(ch).is_err() {
                break;
            }
        }
        out
    }
}

impl AppError {
    pub fn camera_init(details: &str) -> Self {
        Self::CameraInit(heapless::String::from_truncated(details))
    }

    pub fn wifi(details: &str) -> Self {
        Self::Wifi(heapless::String::from_truncated(details))
    }

    pub fn config(details: &str) -> Self {
        Self::Config(heapless::String::from_truncated(details))
    }
}

/// Log `err` and park the node forever.
pub async fn halt(err: &AppError) -> ! {
    error!("{}; halting", err);
    loop {
        Timer::after(Duration::from_secs(1)).await;
    }
}
