//! `std::net` sockets behind the core's `Connector`
//!
//! Streams are switched to non-blocking after connecting; readiness is
//! answered with `peek` and would-block reads yield to the embassy timer.

use std::io::{self, Read as _, Write as _};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use aquabox_core::net::{Connection, Connector, TransportError};
use embassy_time::Timer;
use embedded_io::ErrorKind;
use log::warn;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const WOULD_BLOCK_BACKOFF: embassy_time::Duration = embassy_time::Duration::from_millis(1);

#[derive(Debug, Default)]
pub struct StdConnector;

impl Connector for StdConnector {
    type Connection<'c>
        = StdConnection
    where
        Self: 'c;

    async fn connect(&mut self, host: &str, port: u16) -> Result<StdConnection, TransportError> {
        let address = (host, port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| {
                warn!("Could not resolve {}:{}", host, port);
                TransportError::Connect
            })?;

        let stream = TcpStream::connect_timeout(&address, CONNECT_TIMEOUT).map_err(|e| {
            warn!("TCP connect to {} failed: {}", address, e);
            TransportError::Connect
        })?;
        stream.set_nodelay(true).map_err(|_| TransportError::Connect)?;
        stream
            .set_nonblocking(true)
            .map_err(|_| TransportError::Connect)?;

        Ok(StdConnection { stream })
    }
}

pub struct StdConnection {
    stream: TcpStream,
}

impl StdConnection {
    fn peek(&self) -> io::Result<usize> {
        let mut probe = [0u8; 1];
        self.stream.peek(&mut probe)
    }
}

fn error_kind(e: &io::Error) -> ErrorKind {
    match e.kind() {
        io::ErrorKind::ConnectionReset => ErrorKind::ConnectionReset,
        io::ErrorKind::ConnectionAborted => ErrorKind::ConnectionAborted,
        io::ErrorKind::BrokenPipe => ErrorKind::BrokenPipe,
        io::ErrorKind::NotConnected => ErrorKind::NotConnected,
        io::ErrorKind::TimedOut => ErrorKind::TimedOut,
        io::ErrorKind::Interrupted => ErrorKind::Interrupted,
        _ => ErrorKind::Other,
    }
}

impl embedded_io::ErrorType for StdConnection {
    type Error = ErrorKind;
}

impl embedded_io_async::Read for StdConnection {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        loop {
            match self.stream.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    Timer::after(WOULD_BLOCK_BACKOFF).await
                }
                Err(e) => return Err(error_kind(&e)),
            }
        }
    }
}

impl embedded_io_async::Write for StdConnection {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, ErrorKind> {
        loop {
            match self.stream.write(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    Timer::after(WOULD_BLOCK_BACKOFF).await
                }
                Err(e) => return Err(error_kind(&e)),
            }
        }
    }

    async fn flush(&mut self) -> Result<(), ErrorKind> {
        loop {
            match self.stream.flush() {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    Timer::after(WOULD_BLOCK_BACKOFF).await
                }
                Err(e) => return Err(error_kind(&e)),
            }
        }
    }
}

impl Connection for StdConnection {
    fn is_open(&self) -> bool {
        match self.peek() {
            // Zero bytes peeked means the peer sent FIN and nothing is left.
            Ok(0) => false,
            Ok(_) => true,
            Err(e) => e.kind() == io::ErrorKind::WouldBlock,
        }
    }

    fn has_pending(&self) -> bool {
        matches!(self.peek(), Ok(n) if n > 0)
    }

    /// The kernel finishes the FIN handshake after the stream is dropped.
    async fn close(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Write);
    }

    fn abort(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::thread;

    use aquabox_core::config::NodeConfig;
    use aquabox_core::net::{Request, StatusPolicy, SuccessPolicy, Transport};
    use embassy_futures::block_on;

    use super::*;

    #[test]
    fn exchange_against_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 512];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                request.extend_from_slice(&buf[..n]);
            }
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\npong")
                .unwrap();
            String::from_utf8(request).unwrap()
        });

        let mut config = NodeConfig::default();
        config.server.host = String::from("127.0.0.1");
        config.server.port = port;

        let mut transport = Transport::new(StdConnector, &config);
        let request = Request::get("127.0.0.1", "/aquabox/ping.php");
        let response = block_on(transport.exchange(&request, config.timeouts.get())).unwrap();

        assert!(StatusPolicy.accepts(&response));
        assert_eq!(response.status(), Some(200));
        assert_eq!(response.body(), b"pong");

        let received = server.join().unwrap();
        assert!(received.starts_with("GET /aquabox/ping.php HTTP/1.1\r\n"));
        assert!(received.contains("Connection: close\r\n"));
    }

    #[test]
    fn refused_connection_is_a_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut connector = StdConnector;
        let result = block_on(connector.connect("127.0.0.1", port));
        assert!(matches!(result, Err(TransportError::Connect)));
    }
}
