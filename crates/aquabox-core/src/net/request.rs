//! HTTP/1.1 request framing
//!
//! A [`Request`] is an ordered header list plus a typed [`Body`]. The head is
//! rendered deterministically (`Host`, `Content-Type`, `Content-Length`,
//! `Connection: close`), so the exact byte count is known before anything is
//! sent.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write as _;
use embassy_time::{Duration, Timer};
use embedded_io_async::Write;
use heapless::Vec as HVec;

use super::form::FormBody;
use super::multipart::MultipartBody;

/// Host, Content-Type, Content-Length, Connection
pub const MAX_HEADERS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: &'static str,
    pub value: String,
}

#[derive(Debug, Clone)]
pub enum Body<'a> {
    Empty,
    /// `text/plain`
    Text(&'a str),
    /// `application/x-www-form-urlencoded`
    Form(FormBody),
    /// `multipart/form-data`, payload streamed in slices
    Multipart(MultipartBody<'a>),
}

/// How a large payload is fed to the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPacing {
    pub chunk_size: usize,
    pub delay: Duration,
}

impl ChunkPacing {
    /// One MSS per write with a 1 ms breather in between
    pub const DEFAULT: Self = Self {
        chunk_size: 1460,
        delay: Duration::from_millis(1),
    };
}

impl Default for ChunkPacing {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Body<'_> {
    pub fn content_type(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Text(_) => Some(String::from("text/plain")),
            Self::Form(_) => Some(String::from("application/x-www-form-urlencoded")),
            Self::Multipart(multipart) => Some(multipart.content_type()),
        }
    }

    pub fn content_length(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Text(text) => text.len(),
            Self::Form(form) => form.len(),
            Self::Multipart(multipart) => multipart.content_length(),
        }
    }

    /// Write the body, slicing multipart payloads according to `pacing`.
    ///
    /// Returns the number of body bytes written.
    pub async fn write_to<W: Write>(
        &self,
        out: &mut W,
        pacing: ChunkPacing,
    ) -> Result<usize, W::Error> {
        match self {
            Self::Empty => Ok(0),
            Self::Text(text) => {
                out.write_all(text.as_bytes()).await?;
                Ok(text.len())
            }
            Self::Form(form) => {
                out.write_all(form.as_bytes()).await?;
                Ok(form.len())
            }
            Self::Multipart(multipart) => {
                out.write_all(multipart.field_part().as_bytes()).await?;
                out.write_all(multipart.file_header().as_bytes()).await?;

                let payload = multipart.payload();
                for chunk in payload.chunks(pacing.chunk_size.max(1)) {
                    out.write_all(chunk).await?;
                    if pacing.delay.as_ticks() > 0 {
                        Timer::after(pacing.delay).await;
                    }
                }

                out.write_all(multipart.trailer().as_bytes()).await?;
                Ok(multipart.content_length())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Request<'a> {
    pub method: Method,
    pub host: &'a str,
    pub path: &'a str,
    pub body: Body<'a>,
}

impl<'a> Request<'a> {
    pub fn get(host: &'a str, path: &'a str) -> Self {
        Self {
            method: Method::Get,
            host,
            path,
            body: Body::Empty,
        }
    }

    pub fn post_text(host: &'a str, path: &'a str, text: &'a str) -> Self {
        Self {
            method: Method::Post,
            host,
            path,
            body: Body::Text(text),
        }
    }

    pub fn post_form(host: &'a str, path: &'a str, form: FormBody) -> Self {
        Self {
            method: Method::Post,
            host,
            path,
            body: Body::Form(form),
        }
    }

    pub fn post_multipart(host: &'a str, path: &'a str, multipart: MultipartBody<'a>) -> Self {
        Self {
            method: Method::Post,
            host,
            path,
            body: Body::Multipart(multipart),
        }
    }

    /// Headers in wire order.
    pub fn headers(&self) -> HVec<Header, MAX_HEADERS> {
        let mut headers = HVec::new();
        // Capacity matches the fixed set pushed below.
        let _ = headers.push(Header {
            name: "Host",
            value: String::from(self.host),
        });
        if let Some(content_type) = self.body.content_type() {
            let _ = headers.push(Header {
                name: "Content-Type",
                value: content_type,
            });
        }
        if self.method == Method::Post {
            let _ = headers.push(Header {
                name: "Content-Length",
                value: format!("{}", self.body.content_length()),
            });
        }
        let _ = headers.push(Header {
            name: "Connection",
            value: String::from("close"),
        });
        headers
    }

    /// Request line, headers and the blank line that ends them.
    pub fn head(&self) -> String {
        let mut head = String::with_capacity(160);
        let _ = write!(head, "{} {} HTTP/1.1\r\n", self.method.as_str(), self.path);
        for header in self.headers() {
            let _ = write!(head, "{}: {}\r\n", header.name, header.value);
        }
        head.push_str("\r\n");
        head
    }

    pub fn content_length(&self) -> usize {
        self.body.content_length()
    }

    /// Bytes on the wire for this request.
    pub fn wire_len(&self) -> usize {
        self.head().len() + self.content_length()
    }

    /// Write head and body. Returns the total number of bytes written.
    pub async fn write_to<W: Write>(
        &self,
        out: &mut W,
        pacing: ChunkPacing,
    ) -> Result<usize, W::Error> {
        let head = self.head();
        out.write_all(head.as_bytes()).await?;
        let body_len = self.body.write_to(out, pacing).await?;
        out.flush().await?;
        Ok(head.len() + body_len)
    }

    /// The whole request as one buffer. Copies the payload, so only meant for
    /// small bodies and diagnostics.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.wire_len());
        bytes.extend_from_slice(self.head().as_bytes());
        match &self.body {
            Body::Empty => {}
            Body::Text(text) => bytes.extend_from_slice(text.as_bytes()),
            Body::Form(form) => bytes.extend_from_slice(form.as_bytes()),
            Body::Multipart(multipart) => {
                bytes.extend_from_slice(multipart.field_part().as_bytes());
                bytes.extend_from_slice(multipart.file_header().as_bytes());
                bytes.extend_from_slice(multipart.payload());
                bytes.extend_from_slice(multipart.trailer().as_bytes());
            }
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockServer;
    use crate::net::{Connector, parse_form};
    use crate::sensors::ImageFrame;
    use embassy_futures::block_on;

    const HOST: &str = "192.168.137.1";

    /// Split a raw request at the blank line and pull out Content-Length.
    fn split(raw: &[u8]) -> (&str, &[u8], Option<usize>) {
        let end = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("no header terminator")
            + 4;
        let head = core::str::from_utf8(&raw[..end]).unwrap();
        let length = head
            .lines()
            .find_map(|line| line.strip_prefix("Content-Length: "))
            .map(|value| value.trim().parse().unwrap());
        (head, &raw[end..], length)
    }

    #[test]
    fn get_has_no_body_headers() {
        let request = Request::get(HOST, "/aquabox/ping.php");
        assert_eq!(
            request.head(),
            "GET /aquabox/ping.php HTTP/1.1\r\n\
             Host: 192.168.137.1\r\n\
             Connection: close\r\n\r\n"
        );
        assert_eq!(request.to_bytes(), request.head().into_bytes());
    }

    #[test]
    fn text_post_declares_exact_length() {
        let request = Request::post_text(HOST, "/aquabox/post_echo.php", "hello");
        assert_eq!(
            request.head(),
            "POST /aquabox/post_echo.php HTTP/1.1\r\n\
             Host: 192.168.137.1\r\n\
             Content-Type: text/plain\r\n\
             Content-Length: 5\r\n\
             Connection: close\r\n\r\n"
        );
    }

    #[test]
    fn form_post_length_matches_body_and_round_trips() {
        let form = FormBody::new()
            .int("turbidity_adc", 1200)
            .fixed("turbidity_voltage", 0.97, 2)
            .text("water_quality", "DUC")
            .fixed("current_a", 0.0, 3);
        let request = Request::post_form(HOST, "/aquabox/test_data.php", form);

        let raw = request.to_bytes();
        let (head, body, length) = split(&raw);

        assert!(head.contains("Content-Type: application/x-www-form-urlencoded\r\n"));
        assert_eq!(length, Some(body.len()));

        let fields = parse_form(core::str::from_utf8(body).unwrap());
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[2], ("water_quality".into(), "DUC".into()));
        assert_eq!(fields[3], ("current_a".into(), "0.000".into()));
    }

    #[test]
    fn multipart_stream_matches_declared_length() {
        for len in [0usize, 1460, 10_000] {
            let jpeg: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let frame = ImageFrame::new("esp32cam-01", &jpeg);
            let multipart = MultipartBody::image_upload("----esp32camBoundary", &frame);
            let request = Request::post_multipart(HOST, "/aquabox/upload_image.php", multipart);

            let mut server = MockServer::silent();
            let written = block_on(async {
                let mut conn = server.connect(HOST, 80).await.unwrap();
                request
                    .write_to(
                        &mut conn,
                        ChunkPacing {
                            chunk_size: 1460,
                            delay: Duration::from_ticks(0),
                        },
                    )
                    .await
                    .unwrap()
            });

            let (head, body, length) = split(&server.received);
            assert!(head.contains(
                "Content-Type: multipart/form-data; boundary=----esp32camBoundary\r\n"
            ));
            assert_eq!(length, Some(body.len()), "payload of {len} bytes");
            assert_eq!(written, server.received.len());
            assert_eq!(server.received, request.to_bytes());
            assert!(server.largest_write <= head.len().max(1460));
        }
    }
}
