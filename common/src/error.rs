use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NodeError {
    /// The sensor could not be brought up. Fatal at startup.
    #[error("sensor unavailable: {0}")]
    SensorUnavailable(String),
    #[error("transport failure: {0}")]
    TransportFailure(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("invalid reading (temperature={temperature}, humidity={humidity})")]
    InvalidReading { temperature: f32, humidity: f32 },
}

impl NodeError {
    /// Only a sensor failure stops the node; everything else is contained
    /// within the cycle that hit it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SensorUnavailable(_))
    }
}
