//! One request, one connection
//!
//! [`Transport::exchange`] opens a connection, writes the request, polls for
//! the first response bytes, drains the answer and closes. All of it runs
//! against a single per-operation deadline. A timeout or a failed write
//! aborts the connection, so nothing is ever left open between exchanges.

use alloc::vec::Vec;
use embassy_time::{Duration, Instant, Timer, with_deadline};
use embedded_io::Error as _;
use log::{debug, warn};

use super::request::{ChunkPacing, Request};
use super::response::Response;
use super::{Connection, Connector, TransportError};
use crate::config::{NodeConfig, ServerConfig, TimeoutConfig};

const READ_CHUNK: usize = 256;

/// Outcome of waiting for a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Bytes are buffered.
    Ready,
    /// The peer hung up without sending anything.
    Closed,
    /// The deadline passed first.
    TimedOut,
}

/// Poll `conn` every `poll` until bytes arrive, the peer closes, or
/// `deadline` passes.
pub async fn await_readable<T: Connection>(
    conn: &T,
    deadline: Instant,
    poll: Duration,
) -> Readiness {
    loop {
        if conn.has_pending() {
            return Readiness::Ready;
        }
        if !conn.is_open() {
            return Readiness::Closed;
        }
        if Instant::now() >= deadline {
            return Readiness::TimedOut;
        }
        Timer::after(poll).await;
    }
}

/// Read until the peer closes or stays quiet for `idle_gap`.
///
/// At most `cap` bytes are kept; anything past that is read and dropped so
/// the peer can still finish.
pub async fn drain<T: Connection>(
    conn: &mut T,
    idle_gap: Duration,
    poll: Duration,
    cap: usize,
) -> Response {
    let mut bytes = Vec::new();
    let mut truncated = false;
    let mut buf = [0u8; READ_CHUNK];
    let mut last_data = Instant::now();

    loop {
        if conn.has_pending() {
            match conn.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    let room = cap.saturating_sub(bytes.len());
                    if n > room {
                        truncated = true;
                    }
                    bytes.extend_from_slice(&buf[..n.min(room)]);
                    last_data = Instant::now();
                }
                Err(e) => {
                    warn!("Read failed while draining response: {:?}", e.kind());
                    break;
                }
            }
        } else if !conn.is_open() || last_data.elapsed() >= idle_gap {
            break;
        } else {
            Timer::after(poll).await;
        }
    }

    if truncated {
        warn!("Response exceeded {} bytes, truncated", cap);
    }
    Response::new(bytes, truncated)
}

/// HTTP exchanges against the configured collection server.
pub struct Transport<'a, C: Connector> {
    connector: C,
    server: &'a ServerConfig,
    timeouts: &'a TimeoutConfig,
    pacing: ChunkPacing,
}

impl<'a, C: Connector> Transport<'a, C> {
    pub fn new(connector: C, config: &'a NodeConfig) -> Self {
        Self {
            connector,
            server: &config.server,
            timeouts: &config.timeouts,
            pacing: ChunkPacing {
                chunk_size: config.upload.chunk_size,
                delay: config.upload.chunk_pacing(),
            },
        }
    }

    pub fn server(&self) -> &'a ServerConfig {
        self.server
    }

    pub fn timeouts(&self) -> &'a TimeoutConfig {
        self.timeouts
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Send `request` on a fresh connection and collect the answer.
    ///
    /// `timeout` bounds the whole exchange, from connect to close.
    pub async fn exchange(
        &mut self,
        request: &Request<'_>,
        timeout: Duration,
    ) -> Result<Response, TransportError> {
        let server = self.server;
        let timeouts = self.timeouts;
        let pacing = self.pacing;
        let deadline = Instant::now() + timeout;
        let timed_out = TransportError::ReadTimeout {
            waited_ms: timeout.as_millis(),
        };

        let connect = self.connector.connect(&server.host, server.port);
        let mut conn = match with_deadline(deadline, connect).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                warn!("Connect to {}:{} failed", server.host, server.port);
                return Err(e);
            }
            Err(_) => {
                warn!("Connect to {}:{} timed out", server.host, server.port);
                return Err(TransportError::Connect);
            }
        };

        match with_deadline(deadline, request.write_to(&mut conn, pacing)).await {
            Ok(Ok(written)) => debug!(
                "{} {} sent ({} bytes)",
                request.method.as_str(),
                request.path,
                written
            ),
            Ok(Err(e)) => {
                warn!("Write to {} failed: {:?}", request.path, e.kind());
                conn.abort();
                return Err(TransportError::Write);
            }
            Err(_) => {
                warn!("Write to {} did not finish before the deadline", request.path);
                conn.abort();
                return Err(TransportError::Write);
            }
        }

        match await_readable(&conn, deadline, timeouts.poll_interval()).await {
            Readiness::Ready => {}
            Readiness::Closed => debug!("Peer closed without a response"),
            Readiness::TimedOut => {
                warn!("Timeout waiting for response from {}", request.path);
                conn.abort();
                return Err(timed_out);
            }
        }

        let drained = with_deadline(
            deadline,
            drain(
                &mut conn,
                timeouts.drain_idle(),
                timeouts.poll_interval(),
                timeouts.max_response_bytes,
            ),
        )
        .await;
        let Ok(response) = drained else {
            warn!("Response from {} still arriving at the deadline", request.path);
            conn.abort();
            return Err(timed_out);
        };

        if with_deadline(deadline, conn.close()).await.is_err() {
            debug!("Close not acknowledged before the deadline");
            conn.abort();
        }

        debug!("Response from {}: {} bytes", request.path, response.len());
        Ok(response)
    }
}
