//! DS18B20 one-wire protocol constants and scratchpad decoding
//!
//! The bus timing lives in the firmware; this module only knows what to send
//! and how to make sense of the nine bytes that come back.

use embassy_time::Duration;

use super::SensorError;

pub const SENSOR_NAME: &str = "DS18B20";

pub const SKIP_ROM: u8 = 0xCC;
pub const CONVERT_T: u8 = 0x44;
pub const READ_SCRATCHPAD: u8 = 0xBE;

/// Worst case conversion time at 12-bit resolution
pub const CONVERSION_TIME: Duration = Duration::from_millis(750);

pub const SCRATCHPAD_LEN: usize = 9;

/// Dallas/Maxim CRC-8 (x^8 + x^5 + x^4 + 1, LSB first).
pub fn crc8(bytes: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in bytes {
        let mut byte = byte;
        for _ in 0..8 {
            let mix = (crc ^ byte) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            byte >>= 1;
        }
    }
    crc
}

/// Temperature in °C from a scratchpad read.
///
/// A bus with nothing on it reads back as all ones.
pub fn decode_scratchpad(scratchpad: &[u8; SCRATCHPAD_LEN]) -> Result<f32, SensorError> {
    if scratchpad.iter().all(|&b| b == 0xFF) {
        return Err(SensorError::Disconnected {
            sensor: SENSOR_NAME,
        });
    }
    if crc8(&scratchpad[..8]) != scratchpad[8] {
        return Err(SensorError::ReadFailed {
            sensor: SENSOR_NAME,
            details: "scratchpad CRC mismatch",
        });
    }

    let raw = i16::from_le_bytes([scratchpad[0], scratchpad[1]]);
    Ok(f32::from(raw) / 16.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc_matches_reference_rom_code() {
        assert_eq!(crc8(&[0x02, 0x1C, 0xB8, 0x01, 0x00, 0x00, 0x00]), 0xA2);
    }

    #[test]
    fn decodes_positive_and_negative_readings() {
        let warm = [0x91, 0x01, 0x4B, 0x46, 0x7F, 0xFF, 0x0F, 0x10, 0x25];
        assert_eq!(decode_scratchpad(&warm), Ok(25.0625));

        let cold = [0x5E, 0xFF, 0x4B, 0x46, 0x7F, 0xFF, 0x02, 0x10, 0xB6];
        assert_eq!(decode_scratchpad(&cold), Ok(-10.125));
    }

    #[test]
    fn empty_bus_is_disconnected() {
        assert_eq!(
            decode_scratchpad(&[0xFF; SCRATCHPAD_LEN]),
            Err(SensorError::Disconnected {
                sensor: SENSOR_NAME
            })
        );
    }

    #[test]
    fn corrupted_scratchpad_is_rejected() {
        let corrupted = [0x91, 0x01, 0x4B, 0x46, 0x7F, 0xFF, 0x0F, 0x10, 0x26];
        assert!(matches!(
            decode_scratchpad(&corrupted),
            Err(SensorError::ReadFailed { .. })
        ));
    }
}
