//! Sensor node sampling pipeline
//!
//! [`Sampler::sample_raw`] pulls one reading from every input;
//! [`Sampler::encode`] turns those readings into a [`TelemetryRecord`] in
//! physical units. A bad temperature reading does not fail the tick, it is
//! replaced by the sentinel so the rest of the record still gets reported.

use log::{debug, error, info};

use crate::config::SensingConfig;
use crate::sensors::calibration::{CurrentCalibrator, ZeroOffset};
use crate::sensors::{AnalogInput, SensorError, Sensors, TemperatureProbe};
use crate::telemetry::{Temperature, TelemetryRecord};

/// Readings as they came off the hardware.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawReadings {
    pub turbidity_adc: u16,
    /// Probe result before range validation
    pub temperature: Result<f32, SensorError>,
    /// Averaged and offset-corrected
    pub current_a: f32,
    pub water_level_adc: u16,
}

pub struct Sampler<'a, S: Sensors> {
    sensors: S,
    calibrator: CurrentCalibrator,
    config: &'a SensingConfig,
}

impl<'a, S: Sensors> Sampler<'a, S> {
    pub fn new(sensors: S, config: &'a SensingConfig) -> Self {
        Self {
            sensors,
            calibrator: CurrentCalibrator::new(config.adc, config.current),
            config,
        }
    }

    /// Re-measure the zero-current baseline from the current input.
    pub async fn calibrate(&mut self) -> Result<ZeroOffset, SensorError> {
        self.calibrator.calibrate(self.sensors.current()).await
    }

    pub fn offset(&self) -> ZeroOffset {
        self.calibrator.offset()
    }

    pub async fn sample_raw(&mut self) -> Result<RawReadings, SensorError> {
        let turbidity_adc = self.sensors.turbidity().read_raw().await?;
        let temperature = self.sensors.temperature().read_celsius().await;
        let current_a = self.calibrator.read_amps(self.sensors.current()).await?;
        let water_level_adc = self.sensors.water_level().read_raw().await?;

        Ok(RawReadings {
            turbidity_adc,
            temperature,
            current_a,
            water_level_adc,
        })
    }

    pub fn encode(&self, raw: RawReadings) -> TelemetryRecord<'a> {
        let config = self.config;
        let adc = config.adc;

        let turbidity_voltage = adc.volts(f32::from(raw.turbidity_adc));
        let turbidity_ntu = config.turbidity.ntu(turbidity_voltage);
        let water_quality = config.turbidity.quality_label(turbidity_ntu);

        let temperature = match config.temperature.check(raw.temperature) {
            Ok(celsius) => Temperature::Celsius(celsius),
            Err(e) => {
                error!("{}; check wiring and the 4.7k pull-up", e);
                Temperature::Unavailable
            }
        };

        let water_level_volts = adc.volts(f32::from(raw.water_level_adc));
        let water_level_cm = config.water_level.level_cm(water_level_volts);

        info!(
            "Turbidity adc={} {}V {} NTU -> {}",
            raw.turbidity_adc, turbidity_voltage, turbidity_ntu, water_quality
        );
        info!(
            "Temp {} C, current {} A, level adc={} {}V {} cm",
            temperature.as_reported(),
            raw.current_a,
            raw.water_level_adc,
            water_level_volts,
            water_level_cm
        );

        TelemetryRecord {
            turbidity_adc: raw.turbidity_adc,
            turbidity_voltage,
            turbidity_ntu,
            water_quality,
            temperature,
            current_a: raw.current_a,
            water_level_adc: raw.water_level_adc,
            water_level_cm,
        }
    }

    /// `sample_raw` followed by `encode`.
    pub async fn sample(&mut self) -> Result<TelemetryRecord<'a>, SensorError> {
        let raw = self.sample_raw().await?;
        debug!("Raw readings: {:?}", raw);
        Ok(self.encode(raw))
    }
}
