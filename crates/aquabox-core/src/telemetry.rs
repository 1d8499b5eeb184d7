//! One sensor node reading, ready to post

use crate::net::FormBody;

/// Water temperature, or the marker for a probe that could not be trusted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Temperature {
    Celsius(f32),
    /// Disconnected or outside the plausible range
    Unavailable,
}

impl Temperature {
    /// What the server receives for [`Temperature::Unavailable`].
    pub const SENTINEL_C: f32 = -127.0;

    pub fn as_reported(self) -> f32 {
        match self {
            Self::Celsius(celsius) => celsius,
            Self::Unavailable => Self::SENTINEL_C,
        }
    }
}

/// Snapshot of every sensor, built once per tick and consumed by the
/// reporter.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRecord<'a> {
    pub turbidity_adc: u16,
    pub turbidity_voltage: f32,
    pub turbidity_ntu: f32,
    pub water_quality: &'a str,
    pub temperature: Temperature,
    pub current_a: f32,
    pub water_level_adc: u16,
    /// Always within the configured clamp window
    pub water_level_cm: f32,
}

impl TelemetryRecord<'_> {
    /// URL-encoded body in the order and precision the collection endpoint
    /// expects.
    pub fn to_form(&self) -> FormBody {
        FormBody::new()
            .int("turbidity_adc", i64::from(self.turbidity_adc))
            .fixed("turbidity_voltage", self.turbidity_voltage, 2)
            .fixed("turbidity_ntu", self.turbidity_ntu, 2)
            .text("water_quality", self.water_quality)
            .fixed("temperature_c", self.temperature.as_reported(), 2)
            .fixed("current_a", self.current_a, 3)
            .int("water_level_adc", i64::from(self.water_level_adc))
            .fixed("water_level_cm", self.water_level_cm, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::parse_form;

    fn record(temperature: Temperature) -> TelemetryRecord<'static> {
        TelemetryRecord {
            turbidity_adc: 1234,
            turbidity_voltage: 0.9945,
            turbidity_ntu: 406.0,
            water_quality: "DUC",
            temperature,
            current_a: 0.0123,
            water_level_adc: 1688,
            water_level_cm: 9.97,
        }
    }

    #[test]
    fn form_fields_in_fixed_order_and_precision() {
        let form = record(Temperature::Celsius(24.5)).to_form();
        assert_eq!(
            form.as_str(),
            "turbidity_adc=1234&turbidity_voltage=0.99&turbidity_ntu=406.00\
             &water_quality=DUC&temperature_c=24.50&current_a=0.012\
             &water_level_adc=1688&water_level_cm=10.0"
        );
    }

    #[test]
    fn unavailable_temperature_is_sent_as_sentinel() {
        let form = record(Temperature::Unavailable).to_form();
        let fields = parse_form(form.as_str());
        let temperature = fields
            .iter()
            .find(|(key, _)| key == "temperature_c")
            .map(|(_, value)| value.as_str());
        assert_eq!(temperature, Some("-127.00"));
    }
}
