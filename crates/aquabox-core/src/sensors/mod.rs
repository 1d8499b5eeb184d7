//! Sensor and camera collaborator traits
//!
//! The nodes only ever see these traits. The firmware backs them with the
//! ESP32 ADC and a DS18B20 on a one-wire bus; the simulator and the tests
//! back them with synthetic sources.

pub mod calibration;
pub mod ds18b20;

use core::future::Future;
use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SensorError {
    #[error("{sensor}: read failed ({details})")]
    ReadFailed {
        sensor: &'static str,
        details: &'static str,
    },
    #[error("{sensor}: not connected")]
    Disconnected { sensor: &'static str },
    #[error("{sensor}: reading {value} outside plausible range")]
    OutOfRange { sensor: &'static str, value: f32 },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureError {
    #[error("camera returned no frame")]
    NoFrame,
    #[error("camera returned an empty frame")]
    Empty,
}

/// A single analog input channel producing raw ADC counts.
pub trait AnalogInput {
    /// Take one conversion.
    fn read_raw(&mut self) -> impl Future<Output = Result<u16, SensorError>>;
}

/// A temperature probe reporting degrees Celsius.
///
/// Implementations return [`SensorError::Disconnected`] when the probe does
/// not answer; range validation is left to the sampler.
pub trait TemperatureProbe {
    fn read_celsius(&mut self) -> impl Future<Output = Result<f32, SensorError>>;
}

/// A camera that owns its frame buffer and lends it out for one upload.
pub trait Camera {
    /// Capture a JPEG frame. The returned slice stays valid until the next
    /// call on the camera.
    fn capture(&mut self) -> impl Future<Output = Result<&[u8], CaptureError>>;
}

/// A captured JPEG borrowed read-only for the duration of one upload.
#[derive(Debug, Clone, Copy)]
pub struct ImageFrame<'a> {
    pub device_id: &'a str,
    pub jpeg: &'a [u8],
}

impl<'a> ImageFrame<'a> {
    pub const fn new(device_id: &'a str, jpeg: &'a [u8]) -> Self {
        Self { device_id, jpeg }
    }

    pub const fn len(&self) -> usize {
        self.jpeg.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.jpeg.is_empty()
    }
}

/// The full set of inputs the sensor node samples each tick.
pub trait Sensors {
    type Turbidity: AnalogInput;
    type Current: AnalogInput;
    type WaterLevel: AnalogInput;
    type Temperature: TemperatureProbe;

    fn turbidity(&mut self) -> &mut Self::Turbidity;
    fn current(&mut self) -> &mut Self::Current;
    fn water_level(&mut self) -> &mut Self::WaterLevel;
    fn temperature(&mut self) -> &mut Self::Temperature;
}

/// Plain container wiring four concrete inputs into [`Sensors`].
pub struct SensorBank<T, C, L, P> {
    pub turbidity: T,
    pub current: C,
    pub water_level: L,
    pub temperature: P,
}

impl<T, C, L, P> Sensors for SensorBank<T, C, L, P>
where
    T: AnalogInput,
    C: AnalogInput,
    L: AnalogInput,
    P: TemperatureProbe,
{
    type Turbidity = T;
    type Current = C;
    type WaterLevel = L;
    type Temperature = P;

    fn turbidity(&mut self) -> &mut T {
        &mut self.turbidity
    }

    fn current(&mut self) -> &mut C {
        &mut self.current
    }

    fn water_level(&mut self) -> &mut L {
        &mut self.water_level
    }

    fn temperature(&mut self) -> &mut P {
        &mut self.temperature
    }
}
