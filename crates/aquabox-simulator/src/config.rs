//! Simulator settings loaded from `aquabox.toml`.

use std::path::{Path, PathBuf};

use aquabox_core::config::NodeConfig;
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Shape of the synthetic sensor signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    /// Mean turbidity ADC count
    pub turbidity_adc: u16,
    /// Water level ADC count at the middle of the sweep
    pub water_level_adc: u16,
    /// Peak deviation of the water level sweep, in counts
    pub water_level_swing: u16,
    /// Mean water temperature
    pub temperature_c: f32,
    /// Report the probe as disconnected every n-th read, 0 to never
    pub probe_dropout_every: u32,
    /// Size of the generated JPEG when no image file is given
    pub frame_bytes: usize,
    /// JPEG to upload instead of a generated frame
    pub image_path: Option<PathBuf>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            turbidity_adc: 3100,
            water_level_adc: 1850,
            water_level_swing: 400,
            temperature_c: 24.0,
            probe_dropout_every: 0,
            frame_bytes: 24 * 1024,
            image_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub node: NodeConfig,
    pub synthetic: SyntheticConfig,
}

impl SimulatorConfig {
    /// Load from `path`, falling back to defaults when the file is missing
    /// or invalid.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<SimulatorConfig>(&content) {
                    Ok(config) => {
                        info!("Loaded settings from {}", path.display());
                        return config;
                    }
                    Err(e) => warn!("Could not parse {}: {}", path.display(), e),
                },
                Err(e) => warn!("Could not read {}: {}", path.display(), e),
            }
        }

        info!("Using default settings");
        SimulatorConfig::default()
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from("aquabox.toml")
    }
}
