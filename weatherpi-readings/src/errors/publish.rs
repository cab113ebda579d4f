#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("Endpoint {0} not connected")]
    NotConnected(String),

    #[error("Publish to {0} timed out")]
    Timeout(String),
}
