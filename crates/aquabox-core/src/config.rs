//! Node configuration
//!
//! A single [`NodeConfig`] is built once at startup and passed by reference
//! into the transport, reporter and sampler. The simulator reads it from a
//! TOML file; the firmware fills in credentials and the server address from
//! build-time constants and keeps the defaults for everything else.

use alloc::string::String;
use embassy_time::Duration;
use serde::{Deserialize, Serialize};

use crate::sensors::calibration::{
    AdcScale, CurrentSensorConfig, TemperatureLimits, TurbidityModel, WaterLevelCalibration,
};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct NodeConfig {
    pub wifi: WifiConfig,
    pub server: ServerConfig,
    pub timeouts: TimeoutConfig,
    pub upload: UploadConfig,
    pub sensing: SensingConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WifiConfig {
    pub ssid: String,
    pub password: String,
    /// Minimum spacing between reconnect requests while the link is down
    pub reconnect_interval_ms: u64,
    /// How long boot waits for the first association
    pub join_timeout_ms: u64,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            ssid: String::new(),
            password: String::new(),
            reconnect_interval_ms: 30_000,
            join_timeout_ms: 30_000,
        }
    }
}

impl WifiConfig {
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

/// Collection server address and endpoint paths
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Liveness probe, answers with `pong`
    pub ping_path: String,
    /// Round-trip diagnostic, echoes a plain text body
    pub echo_path: String,
    /// Multipart image upload
    pub upload_path: String,
    /// URL-encoded telemetry
    pub telemetry_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("192.168.137.1"),
            port: 80,
            ping_path: String::from("/aquabox/ping.php"),
            echo_path: String::from("/aquabox/post_echo.php"),
            upload_path: String::from("/aquabox/upload_image.php"),
            telemetry_path: String::from("/aquabox/test_data.php"),
        }
    }
}

/// Per-operation deadlines and read-side limits
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for GET and the echo POST
    pub get_ms: u64,
    /// Deadline for the URL-encoded telemetry POST
    pub form_post_ms: u64,
    /// Deadline for the multipart image upload
    pub upload_ms: u64,
    /// Interval between "is anything readable yet" checks
    pub poll_interval_ms: u64,
    /// While draining, give up after this long without new bytes
    pub drain_idle_ms: u64,
    /// Response bytes kept in memory; the rest is read and discarded
    pub max_response_bytes: usize,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            get_ms: 8_000,
            form_post_ms: 10_000,
            upload_ms: 15_000,
            poll_interval_ms: 10,
            drain_idle_ms: 1_000,
            max_response_bytes: 4_096,
        }
    }
}

impl TimeoutConfig {
    pub fn get(&self) -> Duration {
        Duration::from_millis(self.get_ms)
    }

    pub fn form_post(&self) -> Duration {
        Duration::from_millis(self.form_post_ms)
    }

    pub fn upload(&self) -> Duration {
        Duration::from_millis(self.upload_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn drain_idle(&self) -> Duration {
        Duration::from_millis(self.drain_idle_ms)
    }
}

/// Camera node upload settings
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct UploadConfig {
    /// Logical device identifier sent in the `device_id` form field
    pub device_id: String,
    pub boundary: String,
    /// Payload slice size, one TCP segment on a 1500 byte MTU
    pub chunk_size: usize,
    /// Pause between payload slices so the socket's tx buffer can drain
    pub chunk_pacing_ms: u64,
    /// Minimum time between two captures
    pub shot_period_ms: u64,
    /// Sleep between checks of the shot period
    pub idle_poll_ms: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            device_id: String::from("esp32cam-01"),
            boundary: String::from("----esp32camBoundary"),
            chunk_size: 1460,
            chunk_pacing_ms: 1,
            shot_period_ms: 5_000,
            idle_poll_ms: 5,
        }
    }
}

impl UploadConfig {
    pub fn chunk_pacing(&self) -> Duration {
        Duration::from_millis(self.chunk_pacing_ms)
    }

    pub fn shot_period(&self) -> Duration {
        Duration::from_millis(self.shot_period_ms)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }
}

/// Sensor node conversion constants and timing
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SensingConfig {
    pub adc: AdcScale,
    pub current: CurrentSensorConfig,
    pub water_level: WaterLevelCalibration,
    pub temperature: TemperatureLimits,
    pub turbidity: TurbidityModel,
    /// Delay after each report before the next sample is taken
    pub cycle_delay_ms: u64,
}

impl Default for SensingConfig {
    fn default() -> Self {
        Self {
            adc: AdcScale::default(),
            current: CurrentSensorConfig::default(),
            water_level: WaterLevelCalibration::default(),
            temperature: TemperatureLimits::default(),
            turbidity: TurbidityModel::default(),
            cycle_delay_ms: 5_000,
        }
    }
}

impl SensingConfig {
    pub fn cycle_delay(&self) -> Duration {
        Duration::from_millis(self.cycle_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_deadlines_differ_per_operation() {
        let timeouts = TimeoutConfig::default();
        assert_eq!(timeouts.get(), Duration::from_secs(8));
        assert_eq!(timeouts.form_post(), Duration::from_secs(10));
        assert_eq!(timeouts.upload(), Duration::from_secs(15));
    }

    #[test]
    fn default_endpoints() {
        let server = ServerConfig::default();
        assert_eq!(server.port, 80);
        assert_eq!(server.upload_path, "/aquabox/upload_image.php");
        assert_eq!(server.telemetry_path, "/aquabox/test_data.php");
    }
}
