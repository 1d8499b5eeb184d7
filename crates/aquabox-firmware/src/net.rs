//! embassy-net TCP sockets behind the core's `Connector`
//!
//! One socket at a time, built on a fixed pair of buffers that are lent out
//! for the lifetime of each connection.

use core::net::Ipv4Addr;

use aquabox_core::net::{Connection, Connector, TransportError};
use embassy_net::Stack;
use embassy_net::tcp::{self, State, TcpSocket};
use embassy_time::{Duration, Timer};
use embedded_io::ErrorKind;
use log::warn;

const CLOSE_POLL: Duration = Duration::from_millis(10);

pub struct TcpConnector {
    stack: Stack<'static>,
    rx_buffer: &'static mut [u8],
    tx_buffer: &'static mut [u8],
    socket_timeout: Duration,
}

impl TcpConnector {
    /// `socket_timeout` drops a peer that stops acknowledging; keep it
    /// within the shortest operation deadline.
    pub fn new(
        stack: Stack<'static>,
        rx_buffer: &'static mut [u8],
        tx_buffer: &'static mut [u8],
        socket_timeout: Duration,
    ) -> Self {
        Self {
            stack,
            rx_buffer,
            tx_buffer,
            socket_timeout,
        }
    }
}

impl Connector for TcpConnector {
    type Connection<'c>
        = TcpConnection<'c>
    where
        Self: 'c;

    async fn connect(&mut self, host: &str, port: u16) -> Result<TcpConnection<'_>, TransportError> {
        // No DNS on the node, the server is configured by address.
        let address: Ipv4Addr = host.parse().map_err(|_| {
            warn!("Server host {:?} is not an IPv4 address", host);
            TransportError::Connect
        })?;

        if !self.stack.is_config_up() {
            warn!("Network stack has no IPv4 config yet");
            return Err(TransportError::Connect);
        }

        let mut socket = TcpSocket::new(self.stack, &mut *self.rx_buffer, &mut *self.tx_buffer);
        socket.set_timeout(Some(self.socket_timeout));

        if let Err(e) = socket.connect((address, port)).await {
            warn!("TCP connect to {}:{} failed: {:?}", address, port, e);
            socket.abort();
            return Err(TransportError::Connect);
        }
        Ok(TcpConnection { socket })
    }
}

pub struct TcpConnection<'c> {
    socket: TcpSocket<'c>,
}

// A reset is the only error an established socket reports.
fn error_kind(_: tcp::Error) -> ErrorKind {
    ErrorKind::ConnectionReset
}

impl embedded_io::ErrorType for TcpConnection<'_> {
    type Error = ErrorKind;
}

impl embedded_io_async::Read for TcpConnection<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        self.socket.read(buf).await.map_err(error_kind)
    }
}

impl embedded_io_async::Write for TcpConnection<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, ErrorKind> {
        self.socket.write(buf).await.map_err(error_kind)
    }

    async fn flush(&mut self) -> Result<(), ErrorKind> {
        self.socket.flush().await.map_err(error_kind)
    }
}

impl Connection for TcpConnection<'_> {
    fn is_open(&self) -> bool {
        self.socket.may_recv()
    }

    fn has_pending(&self) -> bool {
        self.socket.can_recv()
    }

    /// Sends FIN and waits for the handshake to finish. Dropping the socket
    /// earlier would discard the FIN still queued in smoltcp.
    async fn close(&mut self) {
        self.socket.close();
        while !matches!(self.socket.state(), State::Closed | State::TimeWait) {
            Timer::after(CLOSE_POLL).await;
        }
    }

    fn abort(&mut self) {
        self.socket.abort();
    }
}
