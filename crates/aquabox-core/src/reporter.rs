//! Turns readings and frames into HTTP exchanges
//!
//! Each operation builds its request, runs it through the [`Transport`]
//! under its own deadline and applies its own [`SuccessPolicy`]:
//!
//! | Operation        | Request           | Deadline     | Success when          |
//! |------------------|-------------------|--------------|-----------------------|
//! | `ping`           | GET               | `get`        | body contains `pong`  |
//! | `echo`           | POST `text/plain` | `get`        | status line present   |
//! | `send_telemetry` | POST form         | `form_post`  | status line present   |
//! | `upload_frame`   | POST multipart    | `upload`     | `"success":true`      |

use embassy_time::Duration;
use log::{info, warn};
use thiserror_no_std::Error;

use crate::config::NodeConfig;
use crate::net::{
    Connector, MarkerPolicy, MultipartBody, Request, Response, StatusPolicy, SuccessPolicy,
    Transport, TransportError,
};
use crate::sensors::ImageFrame;
use crate::telemetry::TelemetryRecord;

pub const PING_MARKER: &str = "pong";

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportError {
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
    #[error("server did not confirm (status {status:?})")]
    Rejected { status: Option<u16> },
}

pub struct Reporter<'a, C: Connector> {
    transport: Transport<'a, C>,
    config: &'a NodeConfig,
}

impl<'a, C: Connector> Reporter<'a, C> {
    pub fn new(connector: C, config: &'a NodeConfig) -> Self {
        Self {
            transport: Transport::new(connector, config),
            config,
        }
    }

    pub fn transport(&self) -> &Transport<'a, C> {
        &self.transport
    }

    /// Liveness probe against the ping endpoint.
    pub async fn ping(&mut self) -> Result<Response, ReportError> {
        let config = self.config;
        let server = &config.server;
        info!("[GET] http://{}:{}{}", server.host, server.port, server.ping_path);

        let request = Request::get(&server.host, &server.ping_path);
        self.send(&request, config.timeouts.get(), &MarkerPolicy(PING_MARKER))
            .await
    }

    /// Post `text` to the echo endpoint and log what comes back.
    pub async fn echo(&mut self, text: &str) -> Result<Response, ReportError> {
        let config = self.config;
        let server = &config.server;
        info!("[POST] http://{}:{}{}", server.host, server.port, server.echo_path);

        let request = Request::post_text(&server.host, &server.echo_path, text);
        self.send(&request, config.timeouts.get(), &StatusPolicy)
            .await
    }

    /// Post one telemetry record. Any parsable status line counts as
    /// delivered; the body is only logged.
    pub async fn send_telemetry(
        &mut self,
        record: &TelemetryRecord<'_>,
    ) -> Result<Response, ReportError> {
        let config = self.config;
        let server = &config.server;
        let form = record.to_form();
        info!("POST data: {}", form.as_str());

        let request = Request::post_form(&server.host, &server.telemetry_path, form);
        self.send(&request, config.timeouts.form_post(), &StatusPolicy)
            .await
    }

    /// Upload one JPEG frame as `multipart/form-data`.
    pub async fn upload_frame(&mut self, frame: &ImageFrame<'_>) -> Result<Response, ReportError> {
        let config = self.config;
        let server = &config.server;
        info!(
            "[UPLOAD] -> http://{}:{}{} ({} bytes)",
            server.host,
            server.port,
            server.upload_path,
            frame.len()
        );

        let body = MultipartBody::image_upload(&config.upload.boundary, frame);
        let request = Request::post_multipart(&server.host, &server.upload_path, body);
        self.send(&request, config.timeouts.upload(), &MarkerPolicy::UPLOAD)
            .await
    }

    async fn send<P: SuccessPolicy>(
        &mut self,
        request: &Request<'_>,
        timeout: Duration,
        policy: &P,
    ) -> Result<Response, ReportError> {
        let response = self.transport.exchange(request, timeout).await?;
        let status = response.status();

        match status {
            Some(code) => info!("HTTP {} from {}", code, request.path),
            None => warn!("No status line in response from {}", request.path),
        }
        info!("Response: {}", response.body_text());

        if policy.accepts(&response) {
            Ok(response)
        } else {
            Err(ReportError::Rejected { status })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockServer;
    use crate::net::parse_form;
    use crate::telemetry::Temperature;
    use alloc::vec::Vec;
    use embassy_futures::block_on;

    fn config() -> NodeConfig {
        let mut config = NodeConfig::default();
        config.timeouts.poll_interval_ms = 1;
        config.timeouts.drain_idle_ms = 5;
        config.timeouts.get_ms = 20;
        config.timeouts.form_post_ms = 20;
        config.timeouts.upload_ms = 20;
        config.upload.chunk_pacing_ms = 0;
        config
    }

    fn record() -> TelemetryRecord<'static> {
        TelemetryRecord {
            turbidity_adc: 1200,
            turbidity_voltage: 0.97,
            turbidity_ntu: 406.0,
            water_quality: "DUC",
            temperature: Temperature::Unavailable,
            current_a: 0.0,
            water_level_adc: 1688,
            water_level_cm: 10.0,
        }
    }

    #[test]
    fn ping_expects_pong() {
        let config = config();
        let mut reporter = Reporter::new(MockServer::answering(b"HTTP/1.1 200 OK\r\n\r\npong"), &config);
        assert!(block_on(reporter.ping()).is_ok());

        let mut reporter = Reporter::new(MockServer::answering(b"HTTP/1.1 404 Not Found\r\n\r\n"), &config);
        assert_eq!(
            block_on(reporter.ping()),
            Err(ReportError::Rejected { status: Some(404) })
        );
    }

    #[test]
    fn echo_posts_plain_text() {
        let config = config();
        let mut reporter = Reporter::new(
            MockServer::answering(b"HTTP/1.1 200 OK\r\n\r\n{\"echo\":\"hello\"}"),
            &config,
        );
        assert!(block_on(reporter.echo("hello")).is_ok());

        let sent = reporter.transport().connector().received_text();
        assert!(sent.starts_with("POST /aquabox/post_echo.php HTTP/1.1\r\n"));
        assert!(sent.contains("Content-Type: text/plain\r\n"));
        assert!(sent.ends_with("\r\n\r\nhello"));
    }

    #[test]
    fn telemetry_is_delivered_on_any_status() {
        let config = config();
        let mut reporter = Reporter::new(
            MockServer::answering(b"HTTP/1.1 500 Internal Server Error\r\n\r\n"),
            &config,
        );
        assert!(block_on(reporter.send_telemetry(&record())).is_ok());

        let sent = reporter.transport().connector().received_text();
        let (_, body) = sent.split_once("\r\n\r\n").unwrap();
        let fields = parse_form(body);
        let keys: Vec<&str> = fields.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(
            keys,
            [
                "turbidity_adc",
                "turbidity_voltage",
                "turbidity_ntu",
                "water_quality",
                "temperature_c",
                "current_a",
                "water_level_adc",
                "water_level_cm",
            ]
        );
        assert_eq!(fields[4].1, "-127.00");
        assert!(sent.contains(&alloc::format!("Content-Length: {}\r\n", body.len())));
    }

    #[test]
    fn telemetry_without_status_line_fails() {
        let config = config();
        let mut reporter = Reporter::new(MockServer::answering(b"garbage"), &config);
        assert_eq!(
            block_on(reporter.send_telemetry(&record())),
            Err(ReportError::Rejected { status: None })
        );
    }

    #[test]
    fn silent_server_times_out() {
        let config = config();
        let mut reporter = Reporter::new(MockServer::silent(), &config);
        assert_eq!(
            block_on(reporter.send_telemetry(&record())),
            Err(ReportError::Transport(TransportError::ReadTimeout { waited_ms: 20 }))
        );
        assert_eq!(reporter.transport().connector().aborts, 1);
    }

    #[test]
    fn upload_success_depends_on_marker() {
        let config = config();
        let jpeg: Vec<u8> = (0..10_000u32).map(|i| i as u8).collect();
        let frame = ImageFrame::new(&config.upload.device_id, &jpeg);

        let cases: [(&[u8], bool); 3] = [
            (b"HTTP/1.1 200 OK\r\n\r\n{\"success\":true}", true),
            (b"HTTP/1.1 200 OK\r\n\r\n{\"success\":false}", false),
            (b"HTTP/1.1 200 OK\r\n\r\n<html>oops", false),
        ];
        for (reply, ok) in cases {
            let mut reporter = Reporter::new(MockServer::answering(reply), &config);
            assert_eq!(block_on(reporter.upload_frame(&frame)).is_ok(), ok);
        }
    }
}
