//! Seams between the control loop and everything it drives or listens to.
//!
//! Hardware-facing ports are synchronous and infallible once running; the
//! network-facing ones are async and return [`NodeError`] so the loop can log
//! and carry on.

use stableroom_common::{ActuatorCommand, NodeError, Reading, SegmentBuffer, ThresholdResponse};

pub trait Sensor {
    /// Brings the sensor up. An error here halts the node for good.
    fn init(&mut self) -> Result<(), NodeError>;

    fn read(&mut self) -> Reading;
}

/// Accepts finished frames and owns the physical refresh.
pub trait SegmentSink {
    fn write_screen(&mut self, buffer: &SegmentBuffer);
}

pub trait Actuators {
    fn apply(&mut self, command: ActuatorCommand);
}

#[allow(async_fn_in_trait)]
pub trait ReportingPort {
    async fn notify_active(&self) -> Result<(), NodeError>;

    async fn report_live(&self, reading: &Reading, command: ActuatorCommand)
        -> Result<(), NodeError>;

    async fn report_alert(&self, reading: &Reading) -> Result<(), NodeError>;
}

#[allow(async_fn_in_trait)]
pub trait ThresholdSource {
    async fn fetch_thresholds(&self) -> Result<ThresholdResponse, NodeError>;
}
