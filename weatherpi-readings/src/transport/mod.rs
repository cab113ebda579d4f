mod mqtt;

pub use mqtt::{client_id_prefix, MqttEndpoint};

use async_trait::async_trait;

use crate::errors::PublishError;
use crate::models::ConnectionState;

/// A publish-capable endpoint with its own connection lifecycle.
#[async_trait]
pub trait Publisher: Send {
    fn name(&self) -> &str;

    fn state(&self) -> ConnectionState;

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PublishError>;

    /// Asks the endpoint to re-establish its connection.
    async fn reconnect(&mut self) -> Result<(), PublishError>;

    async fn close(&mut self) {}
}
