//! In-memory collaborators for unit tests.

use alloc::vec::Vec;
use embassy_time::{Duration, Timer};
use embedded_io::ErrorKind;

use crate::link::Link;
use crate::net::{Connection, Connector, TransportError};
use crate::sensors::{AnalogInput, Camera, CaptureError, SensorError, TemperatureProbe};

/// ADC channel that always converts to the same count.
pub struct FixedAdc(pub u16);

impl AnalogInput for FixedAdc {
    async fn read_raw(&mut self) -> Result<u16, SensorError> {
        Ok(self.0)
    }
}

/// ADC channel replaying a fixed list of counts, then failing.
pub struct SequenceAdc {
    values: Vec<u16>,
    next: usize,
}

impl SequenceAdc {
    pub fn new(values: &[u16]) -> Self {
        Self {
            values: values.to_vec(),
            next: 0,
        }
    }
}

impl AnalogInput for SequenceAdc {
    async fn read_raw(&mut self) -> Result<u16, SensorError> {
        let value = self.values.get(self.next).copied().ok_or(SensorError::ReadFailed {
            sensor: "mock",
            details: "sequence exhausted",
        })?;
        self.next += 1;
        Ok(value)
    }
}

pub struct FixedProbe(pub Result<f32, SensorError>);

impl TemperatureProbe for FixedProbe {
    async fn read_celsius(&mut self) -> Result<f32, SensorError> {
        self.0
    }
}

pub struct MockCamera {
    pub frame: Option<Vec<u8>>,
    pub captures: usize,
}

impl MockCamera {
    pub fn with_frame(frame: Vec<u8>) -> Self {
        Self {
            frame: Some(frame),
            captures: 0,
        }
    }
}

impl Camera for MockCamera {
    async fn capture(&mut self) -> Result<&[u8], CaptureError> {
        self.captures += 1;
        match &self.frame {
            None => Err(CaptureError::NoFrame),
            Some(frame) if frame.is_empty() => Err(CaptureError::Empty),
            Some(frame) => Ok(frame.as_slice()),
        }
    }
}

pub struct MockLink {
    pub up: bool,
    pub reconnects: usize,
}

impl Link for MockLink {
    fn is_up(&self) -> bool {
        self.up
    }

    fn request_reconnect(&mut self) {
        self.reconnects += 1;
    }
}

/// Scripted peer: records what the client writes and answers with a canned
/// response, or never answers at all when `response` is `None`.
#[derive(Default)]
pub struct MockServer {
    pub response: Option<Vec<u8>>,
    pub refuse: bool,
    pub fail_writes: bool,
    /// Sleep this long inside every write
    pub write_delay: Option<Duration>,
    /// Never finish: every read waits this long and returns one byte
    pub trickle: Option<Duration>,
    /// Keep the stream open after the whole answer has been read
    pub linger: bool,
    /// The close handshake never completes
    pub stall_close: bool,
    pub received: Vec<u8>,
    pub connects: usize,
    pub closes: usize,
    pub aborts: usize,
    /// Largest single write seen, to check chunked streaming
    pub largest_write: usize,
}

impl MockServer {
    pub fn answering(response: &[u8]) -> Self {
        Self {
            response: Some(response.to_vec()),
            ..Self::default()
        }
    }

    pub fn silent() -> Self {
        Self::default()
    }

    pub fn received_text(&self) -> &str {
        core::str::from_utf8(&self.received).unwrap_or("<binary>")
    }
}

pub struct MockConnection<'c> {
    server: &'c mut MockServer,
    cursor: usize,
    closed: bool,
}

impl Connector for MockServer {
    type Connection<'c>
        = MockConnection<'c>
    where
        Self: 'c;

    async fn connect(&mut self, _host: &str, _port: u16) -> Result<MockConnection<'_>, TransportError> {
        if self.refuse {
            return Err(TransportError::Connect);
        }
        self.connects += 1;
        Ok(MockConnection {
            server: self,
            cursor: 0,
            closed: false,
        })
    }
}

impl MockConnection<'_> {
    fn remaining(&self) -> &[u8] {
        match &self.server.response {
            Some(response) => &response[self.cursor.min(response.len())..],
            None => &[],
        }
    }
}

impl embedded_io::ErrorType for MockConnection<'_> {
    type Error = ErrorKind;
}

impl embedded_io_async::Read for MockConnection<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        if let Some(interval) = self.server.trickle {
            Timer::after(interval).await;
            buf[0] = b'x';
            return Ok(1);
        }
        let remaining = self.remaining();
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.cursor += n;
        Ok(n)
    }
}

impl embedded_io_async::Write for MockConnection<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, ErrorKind> {
        if self.server.fail_writes {
            return Err(ErrorKind::BrokenPipe);
        }
        if let Some(delay) = self.server.write_delay {
            Timer::after(delay).await;
        }
        self.server.received.extend_from_slice(buf);
        self.server.largest_write = self.server.largest_write.max(buf.len());
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), ErrorKind> {
        Ok(())
    }
}

impl Connection for MockConnection<'_> {
    fn is_open(&self) -> bool {
        // A scripted peer hangs up once its whole answer has been read
        // unless told to linger; a silent one keeps the stream open forever.
        !self.closed
            && (self.server.response.is_none()
                || self.server.linger
                || !self.remaining().is_empty())
    }

    fn has_pending(&self) -> bool {
        !self.closed && (self.server.trickle.is_some() || !self.remaining().is_empty())
    }

    async fn close(&mut self) {
        self.closed = true;
        self.server.closes += 1;
        if self.server.stall_close {
            core::future::pending::<()>().await;
        }
    }

    fn abort(&mut self) {
        self.closed = true;
        self.server.aborts += 1;
    }
}
