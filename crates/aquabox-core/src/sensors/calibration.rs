//! Raw ADC to physical unit conversion
//!
//! All conversions are linear in the ADC voltage. The only value learned at
//! runtime is the current sensor's zero point, held by [`CurrentCalibrator`]
//! and refreshed by an explicit [`CurrentCalibrator::calibrate`] call.

use alloc::string::String;
use embassy_time::{Duration, Timer};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::{AnalogInput, SensorError};

/// ADC reference voltage and full-scale count.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct AdcScale {
    pub vref: f32,
    pub full_scale: u16,
}

impl AdcScale {
    /// 12-bit ESP32 ADC with 11 dB attenuation (0–3.3 V)
    pub const ESP32_12BIT: Self = Self {
        vref: 3.3,
        full_scale: 4095,
    };

    /// Convert a (possibly averaged) ADC count to volts.
    #[inline]
    pub fn volts(&self, adc: f32) -> f32 {
        adc * self.vref / self.full_scale as f32
    }
}

impl Default for AdcScale {
    fn default() -> Self {
        Self::ESP32_12BIT
    }
}

/// Hall-effect current sensor parameters (WCS1800 family).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct CurrentSensorConfig {
    /// Output slope in volts per ampere
    pub sensitivity_v_per_a: f32,
    /// Zero point assumed until the first calibration completes
    pub initial_zero_adc: f32,
    pub calibration_samples: u16,
    pub calibration_delay_us: u64,
    /// Samples averaged into one current reading
    pub averaging_samples: u16,
    pub averaging_delay_us: u64,
}

impl Default for CurrentSensorConfig {
    fn default() -> Self {
        Self {
            sensitivity_v_per_a: 0.066,
            initial_zero_adc: 2048.0,
            calibration_samples: 500,
            calibration_delay_us: 2_000,
            averaging_samples: 50,
            averaging_delay_us: 200,
        }
    }
}

/// Zero-current baseline in ADC counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZeroOffset(pub f32);

/// Owns the zero-current offset and turns current-sensor ADC readings into
/// amperes.
///
/// The offset is written only by [`calibrate`](Self::calibrate), which takes
/// `&mut self`; every reader borrows it shared, so a concurrent caller has to
/// hold the calibrator behind a mutex to recalibrate.
pub struct CurrentCalibrator {
    scale: AdcScale,
    config: CurrentSensorConfig,
    offset: ZeroOffset,
}

impl CurrentCalibrator {
    pub fn new(scale: AdcScale, config: CurrentSensorConfig) -> Self {
        Self {
            scale,
            config,
            offset: ZeroOffset(config.initial_zero_adc),
        }
    }

    pub fn offset(&self) -> ZeroOffset {
        self.offset
    }

    /// Average a fixed number of consecutive samples and store the mean as
    /// the new zero point.
    ///
    /// If any sample fails the previous offset is kept.
    pub async fn calibrate<A: AnalogInput>(
        &mut self,
        input: &mut A,
    ) -> Result<ZeroOffset, SensorError> {
        let count = self.config.calibration_samples.max(1);
        let delay = Duration::from_micros(self.config.calibration_delay_us);

        info!("Calibrating current sensor over {} samples", count);
        let mean = average(input, count, delay).await?;

        self.offset = ZeroOffset(mean);
        info!("Zero current ADC = {}", mean);
        Ok(self.offset)
    }

    /// Take an averaged reading from the current input and convert it.
    pub async fn read_amps<A: AnalogInput>(&self, input: &mut A) -> Result<f32, SensorError> {
        let count = self.config.averaging_samples.max(1);
        let delay = Duration::from_micros(self.config.averaging_delay_us);

        let adc = average(input, count, delay).await?;
        let amps = self.amps_from_adc(adc);
        debug!("Current: adc={} -> {} A", adc, amps);
        Ok(amps)
    }

    /// `(V(adc) - V(offset)) / sensitivity`
    pub fn amps_from_adc(&self, adc: f32) -> f32 {
        let volts = self.scale.volts(adc);
        let zero_volts = self.scale.volts(self.offset.0);
        (volts - zero_volts) / self.config.sensitivity_v_per_a
    }
}

/// Arithmetic mean of `count` conversions spaced `delay` apart.
pub async fn average<A: AnalogInput>(
    input: &mut A,
    count: u16,
    delay: Duration,
) -> Result<f32, SensorError> {
    let mut sum: u64 = 0;
    for i in 0..count {
        sum += input.read_raw().await? as u64;
        if i + 1 < count && delay.as_ticks() > 0 {
            Timer::after(delay).await;
        }
    }
    Ok(sum as f32 / count as f32)
}

/// Resistive water level probe: `level = (V - V0) / K`, clamped.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct WaterLevelCalibration {
    /// Probe voltage with no water
    pub v0: f32,
    /// Volts per centimetre
    pub k_v_per_cm: f32,
    pub min_cm: f32,
    pub max_cm: f32,
}

impl Default for WaterLevelCalibration {
    fn default() -> Self {
        Self {
            v0: 0.0,
            k_v_per_cm: 0.136,
            min_cm: 0.0,
            max_cm: 20.0,
        }
    }
}

impl WaterLevelCalibration {
    pub fn level_cm(&self, volts: f32) -> f32 {
        let level = (volts - self.v0) / self.k_v_per_cm;
        if level.is_nan() {
            return self.min_cm;
        }
        level.clamp(self.min_cm, self.max_cm)
    }
}

/// Plausible range for the water temperature probe.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct TemperatureLimits {
    pub min_c: f32,
    pub max_c: f32,
}

impl Default for TemperatureLimits {
    fn default() -> Self {
        Self {
            min_c: -50.0,
            max_c: 125.0,
        }
    }
}

impl TemperatureLimits {
    /// Pass a probe result through the range check.
    pub fn check(&self, reading: Result<f32, SensorError>) -> Result<f32, SensorError> {
        let celsius = reading?;
        if celsius.is_nan() || celsius < self.min_c || celsius > self.max_c {
            return Err(SensorError::OutOfRange {
                sensor: "DS18B20",
                value: celsius,
            });
        }
        Ok(celsius)
    }
}

/// Turbidity voltage to NTU mapping.
///
/// Only a fixed output is available for now: every reading reports the same
/// NTU value and quality label regardless of the measured voltage.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum TurbidityModel {
    Fixed { ntu: f32, label: String },
}

impl Default for TurbidityModel {
    fn default() -> Self {
        Self::Fixed {
            ntu: 406.0,
            label: String::from("DUC"),
        }
    }
}

impl TurbidityModel {
    pub fn ntu(&self, _volts: f32) -> f32 {
        match self {
            Self::Fixed { ntu, .. } => *ntu,
        }
    }

    pub fn quality_label(&self, _ntu: f32) -> &str {
        match self {
            Self::Fixed { label, .. } => label.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FixedAdc, SequenceAdc};
    use embassy_futures::block_on;

    fn fast_config(samples: u16) -> CurrentSensorConfig {
        CurrentSensorConfig {
            calibration_samples: samples,
            calibration_delay_us: 0,
            averaging_samples: 50,
            averaging_delay_us: 0,
            ..CurrentSensorConfig::default()
        }
    }

    #[test]
    fn adc_to_volts() {
        let scale = AdcScale::ESP32_12BIT;
        assert_eq!(scale.volts(0.0), 0.0);
        assert!((scale.volts(4095.0) - 3.3).abs() < 1e-6);
    }

    #[test]
    fn calibrate_stores_mean_of_samples() {
        let mut calibrator = CurrentCalibrator::new(AdcScale::default(), fast_config(4));
        let mut adc = SequenceAdc::new(&[2000, 2010, 2020, 2030]);

        let offset = block_on(calibrator.calibrate(&mut adc)).unwrap();

        assert_eq!(offset, ZeroOffset(2015.0));
        assert_eq!(calibrator.offset(), ZeroOffset(2015.0));
    }

    #[test]
    fn flat_baseline_reads_zero_amps() {
        let mut calibrator = CurrentCalibrator::new(AdcScale::default(), fast_config(500));
        let mut adc = FixedAdc(2048);

        let offset = block_on(calibrator.calibrate(&mut adc)).unwrap();
        assert_eq!(offset, ZeroOffset(2048.0));

        let amps = block_on(calibrator.read_amps(&mut adc)).unwrap();
        assert!(amps.abs() < 0.0005, "expected ~0 A, got {amps}");
    }

    #[test]
    fn current_follows_voltage_difference() {
        let calibrator = CurrentCalibrator::new(AdcScale::default(), fast_config(1));
        // offset stays at the initial 2048 counts
        let scale = AdcScale::default();
        let expected = (scale.volts(2148.0) - scale.volts(2048.0)) / 0.066;

        assert!((calibrator.amps_from_adc(2148.0) - expected).abs() < 1e-5);
        assert!(calibrator.amps_from_adc(1948.0) < 0.0);
    }

    #[test]
    fn failed_calibration_keeps_previous_offset() {
        let mut calibrator = CurrentCalibrator::new(AdcScale::default(), fast_config(3));
        let mut adc = SequenceAdc::new(&[2100, 2100]);

        assert!(block_on(calibrator.calibrate(&mut adc)).is_err());
        assert_eq!(calibrator.offset(), ZeroOffset(2048.0));
    }

    #[test]
    fn water_level_linear_and_clamped() {
        let cal = WaterLevelCalibration::default();
        assert!((cal.level_cm(1.36) - 10.0).abs() < 1e-4);
        assert_eq!(cal.level_cm(-0.5), 0.0);
        assert_eq!(cal.level_cm(3.3), 20.0);

        let degenerate = WaterLevelCalibration {
            k_v_per_cm: 0.0,
            ..cal
        };
        assert_eq!(degenerate.level_cm(0.0), 0.0);
        assert_eq!(degenerate.level_cm(1.0), 20.0);
    }

    #[test]
    fn temperature_outside_window_is_rejected() {
        let limits = TemperatureLimits::default();
        assert_eq!(limits.check(Ok(24.5)), Ok(24.5));
        assert_eq!(limits.check(Ok(-50.0)), Ok(-50.0));
        assert!(limits.check(Ok(-50.1)).is_err());
        assert!(limits.check(Ok(125.5)).is_err());
        assert!(limits.check(Ok(f32::NAN)).is_err());
        assert!(
            limits
                .check(Err(SensorError::Disconnected { sensor: "DS18B20" }))
                .is_err()
        );
    }

    #[test]
    fn fixed_turbidity_ignores_voltage() {
        let model = TurbidityModel::default();
        assert_eq!(model.ntu(0.1), 406.0);
        assert_eq!(model.ntu(3.0), 406.0);
        assert_eq!(model.quality_label(406.0), "DUC");
    }
}
