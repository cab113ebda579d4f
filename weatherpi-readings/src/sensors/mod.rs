mod simulate;

pub use simulate::{daylight, SimulatedSensor};

use async_trait::async_trait;

use crate::errors::SensorError;
use crate::models::RawSample;

/// Source of raw environmental samples.
#[async_trait]
pub trait SensorSource: Send {
    async fn read(&mut self) -> Result<RawSample, SensorError>;
}
