use serde::{Deserialize, Deserializer, Serialize};

use crate::error::NodeError;

pub const DEFAULT_TEMP_MIN: f32 = 0.0;
pub const DEFAULT_TEMP_MAX: f32 = 100.0;
pub const DEFAULT_HUM_MIN: f32 = 0.0;
pub const DEFAULT_HUM_MAX: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    pub temp_min: f32,
    pub temp_max: f32,
    pub hum_min: f32,
    pub hum_max: f32,
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self {
            temp_min: DEFAULT_TEMP_MIN,
            temp_max: DEFAULT_TEMP_MAX,
            hum_min: DEFAULT_HUM_MIN,
            hum_max: DEFAULT_HUM_MAX,
        }
    }
}

impl ThresholdSet {
    pub fn new(temp_min: f32, temp_max: f32, hum_min: f32, hum_max: f32) -> Self {
        Self {
            temp_min,
            temp_max,
            hum_min,
            hum_max,
        }
    }

    /// Temperature at or past either bound counts as out of range.
    pub fn temperature_out_of_range(&self, temperature: f32) -> bool {
        temperature >= self.temp_max || temperature <= self.temp_min
    }

    pub fn humidity_out_of_range(&self, humidity: f32) -> bool {
        humidity <= self.hum_min || humidity >= self.hum_max
    }
}

/// Body of the threshold endpoint. Any field may be missing, `null` or not a
/// number; each such field falls back to its own default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdResponse {
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub min_temperature: Option<f32>,
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_temperature: Option<f32>,
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub min_humidity: Option<f32>,
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_humidity: Option<f32>,
}

impl ThresholdResponse {
    pub fn parse(body: &[u8]) -> Result<Self, NodeError> {
        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|err| NodeError::MalformedResponse(err.to_string()))?;
        if !value.is_object() {
            return Err(NodeError::MalformedResponse(
                "threshold body is not a JSON object".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(|err| NodeError::MalformedResponse(err.to_string()))
    }

    pub fn into_set(self) -> ThresholdSet {
        ThresholdSet {
            temp_min: self.min_temperature.unwrap_or(DEFAULT_TEMP_MIN),
            temp_max: self.max_temperature.unwrap_or(DEFAULT_TEMP_MAX),
            hum_min: self.min_humidity.unwrap_or(DEFAULT_HUM_MIN),
            hum_max: self.max_humidity.unwrap_or(DEFAULT_HUM_MAX),
        }
    }
}

impl From<ThresholdSet> for ThresholdResponse {
    fn from(set: ThresholdSet) -> Self {
        Self {
            min_temperature: Some(set.temp_min),
            max_temperature: Some(set.temp_max),
            min_humidity: Some(set.hum_min),
            max_humidity: Some(set.hum_max),
        }
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64().map(|number| number as f32))
}

/// Current thresholds plus bookkeeping about how they were obtained.
#[derive(Debug, Clone, Default)]
pub struct ThresholdStore {
    current: ThresholdSet,
    refreshed: u64,
    failed: u64,
}

impl ThresholdStore {
    pub fn new(initial: ThresholdSet) -> Self {
        Self {
            current: initial,
            refreshed: 0,
            failed: 0,
        }
    }

    pub fn current(&self) -> ThresholdSet {
        self.current
    }

    pub fn has_fetched(&self) -> bool {
        self.refreshed > 0
    }

    pub fn refresh_count(&self) -> u64 {
        self.refreshed
    }

    pub fn failure_count(&self) -> u64 {
        self.failed
    }

    /// Applies the outcome of one fetch. A failure keeps whatever was held
    /// before; a success replaces all four bounds in one assignment.
    pub fn apply(
        &mut self,
        outcome: Result<ThresholdResponse, NodeError>,
    ) -> Result<ThresholdSet, NodeError> {
        match outcome {
            Ok(response) => {
                self.current = response.into_set();
                self.refreshed = self.refreshed.saturating_add(1);
                Ok(self.current)
            }
            Err(err) => {
                self.failed = self.failed.saturating_add(1);
                Err(err)
            }
        }
    }
}
