#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("Bus fault: {0}")]
    Bus(String),
}
