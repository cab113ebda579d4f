use crate::errors::SensorError;

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("Acquisition failed: {0}")]
    Acquisition(#[from] SensorError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
