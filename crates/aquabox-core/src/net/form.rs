//! `application/x-www-form-urlencoded` bodies
//!
//! Fields keep their insertion order and numbers are rendered with a fixed
//! number of decimals, so the encoded length is known as soon as the body is
//! built.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;

/// An encoded `key=value&key=value` body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormBody {
    encoded: String,
}

impl FormBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn int(mut self, key: &str, value: i64) -> Self {
        self.start_field(key);
        let _ = write!(self.encoded, "{}", value);
        self
    }

    /// Append a number rendered with exactly `decimals` digits after the
    /// point.
    pub fn fixed(mut self, key: &str, value: f32, decimals: usize) -> Self {
        self.start_field(key);
        let _ = write!(self.encoded, "{:.*}", decimals, without_negative_zero(value, decimals));
        self
    }

    pub fn text(mut self, key: &str, value: &str) -> Self {
        self.start_field(key);
        percent_encode_into(&mut self.encoded, value);
        self
    }

    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.encoded.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.encoded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoded.is_empty()
    }

    fn start_field(&mut self, key: &str) {
        if !self.encoded.is_empty() {
            self.encoded.push('&');
        }
        percent_encode_into(&mut self.encoded, key);
        self.encoded.push('=');
    }
}

// `{:.2}` renders -0.001 as "-0.00"; the server should see "0.00".
fn without_negative_zero(value: f32, decimals: usize) -> f32 {
    let mut half_step = 0.5_f32;
    for _ in 0..decimals {
        half_step /= 10.0;
    }
    if value > -half_step && value < half_step {
        0.0
    } else {
        value
    }
}

fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~')
}

fn percent_encode_into(out: &mut String, value: &str) {
    for &byte in value.as_bytes() {
        if is_unreserved(byte) {
            out.push(byte as char);
        } else if byte == b' ' {
            out.push('+');
        } else {
            let _ = write!(out, "%{:02X}", byte);
        }
    }
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => decoded.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        decoded.push(hi << 4 | lo);
                        i += 2;
                    }
                    _ => decoded.push(b'%'),
                }
            }
            other => decoded.push(other),
        }
        i += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

/// Decode a form body back into ordered `(key, value)` pairs.
pub fn parse_form(body: &str) -> Vec<(String, String)> {
    body.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (percent_decode(key), percent_decode(value)),
            None => (percent_decode(pair), String::new()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_keep_order_and_precision() {
        let body = FormBody::new()
            .int("turbidity_adc", 1234)
            .fixed("turbidity_voltage", 0.99457, 2)
            .fixed("current_a", 1.23456, 3)
            .fixed("water_level_cm", 10.0, 1);

        assert_eq!(
            body.as_str(),
            "turbidity_adc=1234&turbidity_voltage=0.99&current_a=1.235&water_level_cm=10.0"
        );
        assert_eq!(body.len(), body.as_str().len());
    }

    #[test]
    fn tiny_negatives_render_as_zero() {
        let body = FormBody::new().fixed("current_a", -0.0004, 3);
        assert_eq!(body.as_str(), "current_a=0.000");

        let body = FormBody::new().fixed("temperature_c", -127.0, 2);
        assert_eq!(body.as_str(), "temperature_c=-127.00");
    }

    #[test]
    fn text_is_percent_encoded() {
        let body = FormBody::new().text("water_quality", "a b&c=d/ü");
        assert_eq!(body.as_str(), "water_quality=a+b%26c%3Dd%2F%C3%BC");
    }

    #[test]
    fn decoder_recovers_fields() {
        let body = FormBody::new()
            .int("turbidity_adc", 812)
            .text("water_quality", "a b&c")
            .fixed("temperature_c", 24.5, 2);

        let fields = parse_form(body.as_str());
        assert_eq!(
            fields,
            alloc::vec![
                ("turbidity_adc".into(), "812".into()),
                ("water_quality".into(), "a b&c".into()),
                ("temperature_c".into(), "24.50".into()),
            ]
        );
    }

    #[test]
    fn decoder_tolerates_broken_escapes() {
        let fields = parse_form("k=100%&x=%zz&flag");
        assert_eq!(fields[0], ("k".into(), "100%".into()));
        assert_eq!(fields[1], ("x".into(), "%zz".into()));
        assert_eq!(fields[2], ("flag".into(), String::new()));
    }
}
