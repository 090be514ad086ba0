pub mod config;
pub mod control;
pub mod display;
pub mod endpoints;
pub mod error;
pub mod thresholds;
pub mod types;

pub use config::{ControlConfig, DeviceConfig, RuntimeConfig, SensorConfig, ServiceConfig};
pub use control::{ActuatorCommand, AlertState, AlertTransition, ControlContext, Evaluation};
pub use display::{extract_digits, Digit, DigitSequence, SegmentBuffer};
pub use endpoints::*;
pub use error::NodeError;
pub use thresholds::{ThresholdResponse, ThresholdSet, ThresholdStore};
pub use types::{AlertQuery, DeviceQuery, DeviceStatusPayload, LiveDataPayload};
pub use types::{MetricKind, Reading};
