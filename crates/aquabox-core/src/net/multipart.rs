//! `multipart/form-data` image upload body
//!
//! Two parts: a `device_id` text field, then a `file` part carrying the
//! JPEG. The framing strings are built up front so `Content-Length` is exact
//! before a single byte is written; the JPEG itself is never copied and is
//! streamed from the camera's buffer in slices by [`Body::write_to`].
//!
//! [`Body::write_to`]: super::Body::write_to

use alloc::format;
use alloc::string::String;

use crate::sensors::ImageFrame;

pub const FILE_FIELD: &str = "file";
pub const FILE_NAME: &str = "frame.jpg";
pub const FILE_CONTENT_TYPE: &str = "image/jpeg";
pub const DEVICE_FIELD: &str = "device_id";

#[derive(Debug, Clone)]
pub struct MultipartBody<'a> {
    boundary: &'a str,
    field_part: String,
    file_header: String,
    trailer: String,
    payload: &'a [u8],
}

impl<'a> MultipartBody<'a> {
    pub fn image_upload(boundary: &'a str, frame: &ImageFrame<'a>) -> Self {
        let field_part = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"{DEVICE_FIELD}\"\r\n\
             \r\n\
             {}\r\n",
            frame.device_id
        );
        let file_header = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"{FILE_FIELD}\"; filename=\"{FILE_NAME}\"\r\n\
             Content-Type: {FILE_CONTENT_TYPE}\r\n\
             \r\n"
        );
        let trailer = format!("\r\n--{boundary}--\r\n");

        Self {
            boundary,
            field_part,
            file_header,
            trailer,
            payload: frame.jpeg,
        }
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// `field part + file header + payload + trailer`
    pub fn content_length(&self) -> usize {
        self.field_part.len() + self.file_header.len() + self.payload.len() + self.trailer.len()
    }

    pub fn field_part(&self) -> &str {
        &self.field_part
    }

    pub fn file_header(&self) -> &str {
        &self.file_header
    }

    pub fn trailer(&self) -> &str {
        &self.trailer
    }

    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARY: &str = "----esp32camBoundary";

    #[test]
    fn framing_matches_form_data_layout() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xD9];
        let frame = ImageFrame::new("esp32cam-01", &jpeg);
        let body = MultipartBody::image_upload(BOUNDARY, &frame);

        assert_eq!(
            body.field_part(),
            "------esp32camBoundary\r\n\
             Content-Disposition: form-data; name=\"device_id\"\r\n\r\n\
             esp32cam-01\r\n"
        );
        assert_eq!(
            body.file_header(),
            "------esp32camBoundary\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"frame.jpg\"\r\n\
             Content-Type: image/jpeg\r\n\r\n"
        );
        assert_eq!(body.trailer(), "\r\n------esp32camBoundary--\r\n");
        assert_eq!(
            body.content_type(),
            "multipart/form-data; boundary=----esp32camBoundary"
        );
    }

    #[test]
    fn content_length_is_sum_of_parts() {
        for len in [0usize, 1, 1459, 1460, 1461, 10_000] {
            let jpeg = alloc::vec![0xAB; len];
            let frame = ImageFrame::new("esp32cam-01", &jpeg);
            let body = MultipartBody::image_upload(BOUNDARY, &frame);

            let expected = body.field_part().len()
                + body.file_header().len()
                + len
                + body.trailer().len();
            assert_eq!(body.content_length(), expected, "payload of {len} bytes");
        }
    }
}
