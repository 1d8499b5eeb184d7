//! Synthetic sensors, camera and link for running the nodes on a desktop.

use std::path::Path;
use std::time::Instant;

use aquabox_core::app_state::AppError;
use aquabox_core::link::Link;
use aquabox_core::sensors::{
    AnalogInput, Camera, CaptureError, SensorBank, SensorError, TemperatureProbe,
};
use log::{info, warn};

use crate::config::SyntheticConfig;

const ADC_MAX: u16 = 4095;
/// Zero-current ACS712 output on a 3.3 V, 12-bit ADC
const CURRENT_MIDPOINT: u16 = 2048;

/// A slow sine around `center`, sampled on the wall clock.
#[derive(Debug, Clone, Copy)]
struct Wave {
    center: f32,
    amplitude: f32,
    period_secs: f32,
}

impl Wave {
    fn at(&self, t: f32) -> f32 {
        self.center + self.amplitude * (core::f32::consts::TAU * t / self.period_secs).sin()
    }
}

/// An ADC channel following a sine, clamped to the 12-bit range.
pub struct SyntheticAdc {
    wave: Wave,
    started: Instant,
}

impl SyntheticAdc {
    fn new(center: u16, amplitude: u16, period_secs: f32) -> Self {
        Self {
            wave: Wave {
                center: f32::from(center),
                amplitude: f32::from(amplitude),
                period_secs,
            },
            started: Instant::now(),
        }
    }
}

impl AnalogInput for SyntheticAdc {
    async fn read_raw(&mut self) -> Result<u16, SensorError> {
        let t = self.started.elapsed().as_secs_f32();
        Ok(self.wave.at(t).round().clamp(0.0, f32::from(ADC_MAX)) as u16)
    }
}

/// A water temperature probe that can be told to drop out periodically.
pub struct SyntheticProbe {
    wave: Wave,
    started: Instant,
    dropout_every: u32,
    reads: u32,
}

impl TemperatureProbe for SyntheticProbe {
    async fn read_celsius(&mut self) -> Result<f32, SensorError> {
        self.reads = self.reads.wrapping_add(1);
        if self.dropout_every != 0 && self.reads % self.dropout_every == 0 {
            return Err(SensorError::Disconnected {
                sensor: "synthetic probe",
            });
        }
        Ok(self.wave.at(self.started.elapsed().as_secs_f32()))
    }
}

pub type SyntheticSensors = SensorBank<SyntheticAdc, SyntheticAdc, SyntheticAdc, SyntheticProbe>;

pub fn sensors(config: &SyntheticConfig) -> SyntheticSensors {
    SensorBank {
        turbidity: SyntheticAdc::new(config.turbidity_adc, 60, 90.0),
        current: SyntheticAdc::new(CURRENT_MIDPOINT, 12, 7.0),
        water_level: SyntheticAdc::new(config.water_level_adc, config.water_level_swing, 300.0),
        temperature: SyntheticProbe {
            wave: Wave {
                center: config.temperature_c,
                amplitude: 1.5,
                period_secs: 600.0,
            },
            started: Instant::now(),
            dropout_every: config.probe_dropout_every,
            reads: 0,
        },
    }
}

/// Serves the same JPEG for every capture.
pub struct StillCamera {
    frame: Vec<u8>,
}

impl StillCamera {
    /// Use the file at `image_path` when given, otherwise a generated frame
    /// of `frame_bytes`. An unreadable file is a camera init failure.
    pub fn new(image_path: Option<&Path>, frame_bytes: usize) -> Result<Self, AppError> {
        let Some(path) = image_path else {
            return Ok(Self {
                frame: generated_jpeg(frame_bytes),
            });
        };
        match std::fs::read(path) {
            Ok(frame) => {
                info!("Uploading {} ({} bytes)", path.display(), frame.len());
                Ok(Self { frame })
            }
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                Err(AppError::camera_init(&e.to_string()))
            }
        }
    }
}

impl Camera for StillCamera {
    async fn capture(&mut self) -> Result<&[u8], CaptureError> {
        if self.frame.is_empty() {
            return Err(CaptureError::Empty);
        }
        Ok(&self.frame)
    }
}

/// SOI, filler bytes and EOI. Enough for a server that only checks markers.
fn generated_jpeg(len: usize) -> Vec<u8> {
    if len < 4 {
        return Vec::new();
    }
    let mut frame = Vec::with_capacity(len);
    frame.extend_from_slice(&[0xFF, 0xD8]);
    frame.extend((0..len - 4).map(|i| (i % 251) as u8));
    frame.extend_from_slice(&[0xFF, 0xD9]);
    frame
}

/// The host's network is assumed up.
#[derive(Debug, Default)]
pub struct HostLink;

impl Link for HostLink {
    fn is_up(&self) -> bool {
        true
    }

    fn request_reconnect(&mut self) {
        info!("Reconnect requested (ignored on the host)");
    }
}
