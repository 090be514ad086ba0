use serde::{Deserialize, Serialize};

use crate::thresholds::ThresholdSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub device_no: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_no: "D01".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub base_url: String,
    pub bearer_token: String,
    pub timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            bearer_token: String::new(),
            timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    pub cycle_interval_ms: u64,
    /// Bounds in force until the first successful fetch.
    pub initial_thresholds: ThresholdSet,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            cycle_interval_ms: 10_000,
            initial_thresholds: ThresholdSet::default(),
        }
    }
}

/// Parameters of the simulated sensor used by host builds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    pub base_temperature: f32,
    pub temperature_swing: f32,
    pub base_humidity: f32,
    pub humidity_swing: f32,
    pub period_cycles: u32,
    /// Every n-th sample reads as NaN; 0 disables.
    pub invalid_every: u32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            base_temperature: 24.0,
            temperature_swing: 4.0,
            base_humidity: 50.0,
            humidity_swing: 15.0,
            period_cycles: 12,
            invalid_every: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
}

impl RuntimeConfig {
    pub fn sanitize(&mut self) {
        let device_no = self.device.device_no.trim();
        self.device.device_no = if device_no.is_empty() {
            DeviceConfig::default().device_no
        } else {
            device_no.to_string()
        };

        let base_url = self.service.base_url.trim().trim_end_matches('/');
        self.service.base_url = if base_url.is_empty() {
            ServiceConfig::default().base_url
        } else {
            base_url.to_string()
        };
        self.service.timeout_ms = self.service.timeout_ms.clamp(500, 60_000);

        self.control.cycle_interval_ms = self.control.cycle_interval_ms.clamp(1_000, 3_600_000);
        if !thresholds_are_finite(&self.control.initial_thresholds) {
            self.control.initial_thresholds = ThresholdSet::default();
        }

        self.sensor.period_cycles = self.sensor.period_cycles.max(2);
    }
}

fn thresholds_are_finite(set: &ThresholdSet) -> bool {
    [set.temp_min, set.temp_max, set.hum_min, set.hum_max]
        .iter()
        .all(|bound| bound.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_missing_sections() {
        let mut config: RuntimeConfig =
            serde_json::from_str(r#"{"device":{"device_no":" D07 "}}"#).unwrap();
        config.sanitize();

        assert_eq!(config.device.device_no, "D07");
        assert_eq!(config.control.cycle_interval_ms, 10_000);
        assert_eq!(config.service.base_url, "http://127.0.0.1:3000");
    }

    #[test]
    fn sanitize_clamps_intervals_and_trims_url() {
        let mut config = RuntimeConfig::default();
        config.service.base_url = "http://10.0.0.2:3000/".to_string();
        config.service.timeout_ms = 0;
        config.control.cycle_interval_ms = 5;
        config.device.device_no = "  ".to_string();
        config.sanitize();

        assert_eq!(config.service.base_url, "http://10.0.0.2:3000");
        assert_eq!(config.service.timeout_ms, 500);
        assert_eq!(config.control.cycle_interval_ms, 1_000);
        assert_eq!(config.device.device_no, "D01");
    }

    #[test]
    fn non_finite_initial_thresholds_reset() {
        let mut config = RuntimeConfig::default();
        config.control.initial_thresholds.temp_max = f32::INFINITY;
        config.sanitize();

        assert_eq!(config.control.initial_thresholds, ThresholdSet::default());
    }
}
