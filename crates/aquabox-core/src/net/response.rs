//! Raw response buffer and success policies
//!
//! The transport hands back whatever bytes the peer sent. Deciding whether
//! those bytes mean "delivered" is left to a [`SuccessPolicy`], so marker
//! matching can be swapped for real parsing without touching the transport.

use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;

/// Literal the upload endpoint puts in its JSON body on success.
pub const UPLOAD_SUCCESS_MARKER: &str = "\"success\":true";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    bytes: Vec<u8>,
    truncated: bool,
}

impl Response {
    pub fn new(bytes: Vec<u8>, truncated: bool) -> Self {
        Self { bytes, truncated }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the peer sent more than the buffer cap allowed.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Status code from an `HTTP/1.x <code> <reason>` first line.
    pub fn status(&self) -> Option<u16> {
        let line_end = self
            .bytes
            .iter()
            .position(|&b| b == b'\n')
            .unwrap_or(self.bytes.len());
        let line = core::str::from_utf8(&self.bytes[..line_end]).ok()?;

        let mut parts = line.trim_end_matches('\r').split(' ');
        let version = parts.next()?;
        if !version.starts_with("HTTP/1.") {
            return None;
        }
        let code = parts.next()?;
        if code.len() != 3 {
            return None;
        }
        let code: u16 = code.parse().ok()?;
        (100..600).contains(&code).then_some(code)
    }

    /// Bytes after the header block, or everything when there is no header
    /// terminator.
    pub fn body(&self) -> &[u8] {
        match self.bytes.windows(4).position(|w| w == b"\r\n\r\n") {
            Some(end) => &self.bytes[end + 4..],
            None => &self.bytes,
        }
    }

    pub fn contains(&self, marker: &str) -> bool {
        let marker = marker.as_bytes();
        if marker.is_empty() {
            return true;
        }
        self.bytes.windows(marker.len()).any(|w| w == marker)
    }

    /// Lossy text view for logging.
    pub fn as_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.body())
    }
}

/// Decides whether a response counts as a successful delivery.
pub trait SuccessPolicy {
    fn accepts(&self, response: &Response) -> bool;
}

/// Success iff the raw response contains a literal marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerPolicy<'m>(pub &'m str);

impl MarkerPolicy<'static> {
    pub const UPLOAD: Self = Self(UPLOAD_SUCCESS_MARKER);
}

impl SuccessPolicy for MarkerPolicy<'_> {
    fn accepts(&self, response: &Response) -> bool {
        response.contains(self.0)
    }
}

/// Success iff the server answered with a parsable status line.
///
/// The code itself is not inspected; a 500 still means the server got the
/// bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusPolicy;

impl SuccessPolicy for StatusPolicy {
    fn accepts(&self, response: &Response) -> bool {
        response.status().is_some()
    }
}
