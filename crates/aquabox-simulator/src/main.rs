//! Desktop simulator for the aquabox nodes.
//!
//! Runs the sensor node or the camera node from `aquabox-core` against a
//! real collection server, with synthetic sensors and a still camera
//! standing in for the hardware.
//!
//! ```text
//! aquabox-simulator [sensor|camera] [path/to/aquabox.toml]
//! ```
//!
//! Set `RUST_LOG=debug` to see state transitions and request sizes. In
//! sensor mode, typing `r` and Enter requests a fresh current calibration,
//! like the BOOT button on the board.

mod config;
mod net;
mod sources;

use std::io::BufRead as _;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;

use aquabox_core::app_state::halt;
use aquabox_core::scheduler::{CameraNode, RecalibrateSignal, SensorNode};
use embassy_futures::block_on;
use embassy_sync::signal::Signal;
use log::{error, info};

use crate::config::SimulatorConfig;
use crate::net::StdConnector;
use crate::sources::{HostLink, StillCamera};

static RECALIBRATE: RecalibrateSignal = Signal::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Sensor,
    Camera,
}

impl Mode {
    fn parse(arg: &str) -> Option<Self> {
        match arg {
            "sensor" => Some(Mode::Sensor),
            "camera" => Some(Mode::Camera),
            _ => None,
        }
    }
}

/// Stand-in for the BOOT button: each `r` line on stdin requests a
/// recalibration.
fn spawn_recalibrate_reader() {
    thread::spawn(|| {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim() == "r" {
                info!("Recalibration requested");
                RECALIBRATE.signal(());
            }
        }
    });
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let mode = match args.next() {
        None => Mode::Sensor,
        Some(arg) => match Mode::parse(&arg) {
            Some(mode) => mode,
            None => {
                error!("Unknown mode {:?}, expected \"sensor\" or \"camera\"", arg);
                return ExitCode::FAILURE;
            }
        },
    };
    let config_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(SimulatorConfig::default_path);

    let config = SimulatorConfig::load(&config_path);
    let node = &config.node;
    info!(
        "Simulating the {:?} node against http://{}:{}",
        mode, node.server.host, node.server.port
    );

    match mode {
        Mode::Sensor => {
            spawn_recalibrate_reader();
            let mut sensor_node = SensorNode::new(
                sources::sensors(&config.synthetic),
                StdConnector,
                HostLink,
                &RECALIBRATE,
                node,
            );
            block_on(sensor_node.run())
        }
        Mode::Camera => {
            let camera = match StillCamera::new(
                config.synthetic.image_path.as_deref(),
                config.synthetic.frame_bytes,
            ) {
                Ok(camera) => camera,
                Err(e) => block_on(halt(&e)),
            };
            let mut camera_node = CameraNode::new(camera, StdConnector, HostLink, node);
            block_on(camera_node.run())
        }
    }
}
