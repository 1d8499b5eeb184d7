//! Per-tick state machines for the two node kinds
//!
//! Every tick walks `Idle -> Sampling -> Encoding -> Sending -> (Success |
//! Failure) -> Idle`. Failures stay local to the tick: they are logged, the
//! reading is dropped and the next tick starts fresh. While the link is down
//! the `Sending` step is skipped and a reconnect is requested at most once
//! per reconnect interval.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};
use log::{debug, error, info, warn};

use crate::config::NodeConfig;
use crate::link::{Link, ReconnectThrottle, wait_for_link};
use crate::net::Connector;
use crate::reporter::Reporter;
use crate::sampling::Sampler;
use crate::sensors::{Camera, ImageFrame, Sensors};

/// Raised from outside (console command, button) to recalibrate the
/// current sensor before the next sample.
pub type RecalibrateSignal = Signal<CriticalSectionRawMutex, ()>;

/// Text posted to the echo endpoint at camera startup
pub const ECHO_TEXT: &str = "hello";

const LINK_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Sampling,
    Encoding,
    Sending,
    Success,
    Failure,
}

/// How a tick ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The server confirmed the record or frame.
    Delivered,
    /// Sampling, capture or delivery failed; the data was dropped.
    Failed,
    /// Sampled fine but the link was down, nothing was sent.
    LinkDown,
    /// The shot period has not elapsed yet.
    NotDue,
}

/// Skip sending while the link is down, asking for a reconnect at most once
/// per throttle interval.
fn link_ready<L: Link>(link: &mut L, throttle: &mut ReconnectThrottle, now: Instant) -> bool {
    if link.is_up() {
        throttle.link_up(now);
        return true;
    }
    if throttle.try_acquire(now) {
        warn!("WiFi disconnected, reconnecting");
        link.request_reconnect();
    } else {
        warn!("WiFi not connected, waiting before retry");
    }
    false
}

/// Samples every sensor, posts the record, then sleeps the cycle delay.
pub struct SensorNode<'a, S: Sensors, C: Connector, L: Link> {
    sampler: Sampler<'a, S>,
    reporter: Reporter<'a, C>,
    link: L,
    throttle: ReconnectThrottle,
    recalibrate: &'a RecalibrateSignal,
    config: &'a NodeConfig,
    state: CycleState,
}

impl<'a, S: Sensors, C: Connector, L: Link> SensorNode<'a, S, C, L> {
    pub fn new(
        sensors: S,
        connector: C,
        link: L,
        recalibrate: &'a RecalibrateSignal,
        config: &'a NodeConfig,
    ) -> Self {
        Self {
            sampler: Sampler::new(sensors, &config.sensing),
            reporter: Reporter::new(connector, config),
            link,
            throttle: ReconnectThrottle::new(config.wifi.reconnect_interval()),
            recalibrate,
            config,
            state: CycleState::Idle,
        }
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn sampler(&self) -> &Sampler<'a, S> {
        &self.sampler
    }

    pub fn reporter(&self) -> &Reporter<'a, C> {
        &self.reporter
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    fn transition(&mut self, next: CycleState) {
        debug!("{:?} -> {:?}", self.state, next);
        self.state = next;
    }

    async fn calibrate(&mut self) {
        if let Err(e) = self.sampler.calibrate().await {
            error!("Calibration failed, keeping offset {}: {}", self.sampler.offset().0, e);
        }
    }

    /// Wait for the first association, then take the initial calibration.
    pub async fn start(&mut self) {
        let window = self.config.wifi.join_timeout();
        if wait_for_link(&self.link, window, LINK_POLL).await {
            info!("WiFi connected");
        } else {
            warn!("WiFi not up after {} ms, starting anyway", window.as_millis());
        }
        self.calibrate().await;
    }

    pub async fn tick(&mut self, now: Instant) -> TickOutcome {
        if self.recalibrate.try_take().is_some() {
            info!("Recalibration requested");
            self.calibrate().await;
        }

        self.transition(CycleState::Sampling);
        let raw = match self.sampler.sample_raw().await {
            Ok(raw) => raw,
            Err(e) => {
                error!("Sampling failed: {}", e);
                return self.finish(CycleState::Failure, TickOutcome::Failed);
            }
        };

        self.transition(CycleState::Encoding);
        let record = self.sampler.encode(raw);

        if !link_ready(&mut self.link, &mut self.throttle, now) {
            self.transition(CycleState::Idle);
            return TickOutcome::LinkDown;
        }

        self.transition(CycleState::Sending);
        match self.reporter.send_telemetry(&record).await {
            Ok(_) => self.finish(CycleState::Success, TickOutcome::Delivered),
            Err(e) => {
                error!("Error sending data: {}", e);
                self.finish(CycleState::Failure, TickOutcome::Failed)
            }
        }
    }

    fn finish(&mut self, terminal: CycleState, outcome: TickOutcome) -> TickOutcome {
        self.transition(terminal);
        self.transition(CycleState::Idle);
        outcome
    }

    pub async fn run(&mut self) -> ! {
        self.start().await;
        let delay = self.config.sensing.cycle_delay();
        loop {
            self.tick(Instant::now()).await;
            Timer::after(delay).await;
        }
    }
}

/// Captures and uploads a frame every shot period.
pub struct CameraNode<'a, K: Camera, C: Connector, L: Link> {
    camera: K,
    reporter: Reporter<'a, C>,
    link: L,
    throttle: ReconnectThrottle,
    config: &'a NodeConfig,
    last_shot: Option<Instant>,
    state: CycleState,
}

impl<'a, K: Camera, C: Connector, L: Link> CameraNode<'a, K, C, L> {
    pub fn new(camera: K, connector: C, link: L, config: &'a NodeConfig) -> Self {
        Self {
            camera,
            reporter: Reporter::new(connector, config),
            link,
            throttle: ReconnectThrottle::new(config.wifi.reconnect_interval()),
            config,
            last_shot: None,
            state: CycleState::Idle,
        }
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn camera(&self) -> &K {
        &self.camera
    }

    pub fn reporter(&self) -> &Reporter<'a, C> {
        &self.reporter
    }

    fn transition(&mut self, next: CycleState) {
        debug!("{:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Ping and echo once so the path to the server shows up in the log.
    /// Neither result gates the upload loop.
    pub async fn diagnostics(&mut self) {
        match self.reporter.ping().await {
            Ok(_) => info!("Ping OK"),
            Err(e) => warn!("Ping failed: {}", e),
        }
        match self.reporter.echo(ECHO_TEXT).await {
            Ok(_) => info!("Echo OK"),
            Err(e) => warn!("Echo failed: {}", e),
        }
    }

    pub async fn start(&mut self) {
        let window = self.config.wifi.join_timeout();
        if wait_for_link(&self.link, window, LINK_POLL).await {
            info!("WiFi connected");
        } else {
            warn!("WiFi not up after {} ms, starting anyway", window.as_millis());
        }
        self.diagnostics().await;
    }

    pub async fn tick(&mut self, now: Instant) -> TickOutcome {
        let period = self.config.upload.shot_period();
        if let Some(last) = self.last_shot
            && now.saturating_duration_since(last) < period
        {
            return TickOutcome::NotDue;
        }
        self.last_shot = Some(now);

        self.transition(CycleState::Sampling);
        let config = self.config;
        let jpeg = match self.camera.capture().await {
            Ok(jpeg) => jpeg,
            Err(e) => {
                error!("Capture failed: {}", e);
                self.state = CycleState::Idle;
                return TickOutcome::Failed;
            }
        };

        self.state = CycleState::Encoding;
        let frame = ImageFrame::new(&config.upload.device_id, jpeg);

        if !link_ready(&mut self.link, &mut self.throttle, now) {
            self.state = CycleState::Idle;
            return TickOutcome::LinkDown;
        }

        self.state = CycleState::Sending;
        let outcome = match self.reporter.upload_frame(&frame).await {
            Ok(_) => {
                info!("UPLOAD OK");
                (CycleState::Success, TickOutcome::Delivered)
            }
            Err(e) => {
                error!("UPLOAD FAIL: {}", e);
                (CycleState::Failure, TickOutcome::Failed)
            }
        };
        self.transition(outcome.0);
        self.transition(CycleState::Idle);
        outcome.1
    }

    pub async fn run(&mut self) -> ! {
        self.start().await;
        let idle = self.config.upload.idle_poll();
        loop {
            self.tick(Instant::now()).await;
            Timer::after(idle).await;
        }
    }
}
