use serde::{Deserialize, Serialize};

use crate::error::NodeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Temperature,
    Humidity,
}

/// One sensor sample. Either field may be NaN when the sensor misreads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub temperature: f32,
    pub humidity: f32,
}

impl Reading {
    pub fn new(temperature: f32, humidity: f32) -> Self {
        Self {
            temperature,
            humidity,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.temperature.is_nan() && !self.humidity.is_nan()
    }

    pub fn validate(&self) -> Result<(), NodeError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(NodeError::InvalidReading {
                temperature: self.temperature,
                humidity: self.humidity,
            })
        }
    }

    pub fn value(&self, kind: MetricKind) -> f32 {
        match kind {
            MetricKind::Temperature => self.temperature,
            MetricKind::Humidity => self.humidity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatusPayload {
    pub device_no: String,
    pub is_device_connected: bool,
}

impl DeviceStatusPayload {
    pub fn active(device_no: &str) -> Self {
        Self {
            device_no: device_no.to_string(),
            is_device_connected: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveDataPayload {
    pub device_no: String,
    pub current_temperature: f64,
    pub current_humidity: f64,
    pub is_ac_on: bool,
    pub is_heater_on: bool,
}

impl LiveDataPayload {
    pub fn new(device_no: &str, reading: &Reading, cooling_on: bool, heater_on: bool) -> Self {
        Self {
            device_no: device_no.to_string(),
            current_temperature: round_to(reading.temperature, 1),
            current_humidity: round_to(reading.humidity, 1),
            is_ac_on: cooling_on,
            is_heater_on: heater_on,
        }
    }
}

/// Query string of the alert endpoint; the alert itself has no body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertQuery {
    pub current_temperature: f64,
    pub current_humidity: f64,
    pub device_no: String,
}

impl AlertQuery {
    pub fn new(device_no: &str, reading: &Reading) -> Self {
        Self {
            current_temperature: round_to(reading.temperature, 2),
            current_humidity: round_to(reading.humidity, 2),
            device_no: device_no.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceQuery {
    pub device_no: String,
}

pub fn round_to(value: f32, places: i32) -> f64 {
    let scale = 10_f64.powi(places);
    (f64::from(value) * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_in_either_field_invalidates_reading() {
        assert!(Reading::new(22.5, 40.0).is_valid());
        assert!(!Reading::new(f32::NAN, 40.0).is_valid());
        assert!(!Reading::new(22.5, f32::NAN).is_valid());
        assert!(matches!(
            Reading::new(22.5, f32::NAN).validate(),
            Err(NodeError::InvalidReading { .. })
        ));
    }

    #[test]
    fn live_payload_rounds_to_one_decimal() {
        let payload = LiveDataPayload::new("D01", &Reading::new(23.46, 51.04), true, false);

        assert_eq!(payload.current_temperature, 23.5);
        assert_eq!(payload.current_humidity, 51.0);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["device_no"], "D01");
        assert_eq!(json["is_ac_on"], true);
        assert_eq!(json["is_heater_on"], false);
    }

    #[test]
    fn device_status_payload_matches_wire_shape() {
        let json = serde_json::to_string(&DeviceStatusPayload::active("D01")).unwrap();
        assert_eq!(json, r#"{"device_no":"D01","is_device_connected":true}"#);
    }

    #[test]
    fn alert_query_keeps_two_decimals() {
        let query = AlertQuery::new("D01", &Reading::new(27.125, 80.0));
        assert_eq!(query.current_temperature, 27.13);
        assert_eq!(query.current_humidity, 80.0);
    }
}
