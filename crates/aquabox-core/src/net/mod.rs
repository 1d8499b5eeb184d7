//! Minimal HTTP/1.1 client over a raw byte stream
//!
//! Every exchange opens a fresh connection, writes one request, waits for
//! the first response bytes under a per-operation deadline, drains what the
//! peer sends and closes. There is no keep-alive, no chunked decoding and no
//! TLS; responses are only searched for status lines and marker strings.

pub mod form;
pub mod multipart;
pub mod request;
pub mod response;
pub mod transport;

pub use form::{FormBody, parse_form};
pub use multipart::MultipartBody;
pub use request::{Body, ChunkPacing, Method, Request};
pub use response::{MarkerPolicy, Response, StatusPolicy, SuccessPolicy};
pub use transport::{Readiness, Transport};

use core::future::Future;
use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    #[error("could not open a connection to the server")]
    Connect,
    #[error("request could not be fully written")]
    Write,
    #[error("no response within {waited_ms} ms")]
    ReadTimeout { waited_ms: u64 },
}

/// An open, exclusively owned byte stream to the server.
///
/// Reads and writes come from `embedded-io-async`; the two probes below let
/// the transport poll for readability without blocking on `read`.
pub trait Connection: embedded_io_async::Read + embedded_io_async::Write {
    /// Whether the peer may still deliver bytes (not closed, or bytes still
    /// buffered).
    fn is_open(&self) -> bool;

    /// Whether bytes are buffered and a `read` would return immediately.
    fn has_pending(&self) -> bool;

    /// Orderly close once the exchange is finished. Resolves when the peer
    /// has seen the close; the caller bounds the wait.
    fn close(&mut self) -> impl Future<Output = ()>;

    /// Tear the connection down immediately (after a timeout or write error).
    fn abort(&mut self);
}

/// Opens connections to `host:port`.
pub trait Connector {
    type Connection<'c>: Connection
    where
        Self: 'c;

    fn connect(
        &mut self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<Self::Connection<'_>, TransportError>>;
}
