use futures::future::join_all;

use crate::errors::PublishError;
use crate::models::{ConnectionState, DerivedReading, WeatherPayload};
use crate::transport::Publisher;

pub const TOPIC_SUFFIX: &str = "WeatherData";

/// The fixed set of publish endpoints, each owning its connection state.
pub struct EndpointRegistry {
    endpoints: Vec<Box<dyn Publisher>>,
}

impl EndpointRegistry {
    pub fn new(endpoints: Vec<Box<dyn Publisher>>) -> Self {
        Self { endpoints }
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn states(&self) -> Vec<(String, ConnectionState)> {
        self.endpoints
            .iter()
            .map(|endpoint| (endpoint.name().to_string(), endpoint.state()))
            .collect()
    }

    /// Sends to every endpoint concurrently and waits for all of them.
    pub async fn publish(&mut self, topic: &str, payload: &[u8]) -> Vec<PublishOutcome> {
        join_all(
            self.endpoints
                .iter_mut()
                .map(|endpoint| deliver(endpoint.as_mut(), topic, payload)),
        )
        .await
    }

    pub async fn close(&mut self) {
        join_all(self.endpoints.iter_mut().map(|endpoint| endpoint.close())).await;
    }
}

#[derive(Debug)]
pub enum DeliveryStatus {
    Delivered,
    Failed(PublishError),
}

#[derive(Debug)]
pub struct PublishOutcome {
    pub endpoint: String,
    pub status: DeliveryStatus,
}

impl PublishOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self.status, DeliveryStatus::Delivered)
    }
}

async fn deliver(endpoint: &mut dyn Publisher, topic: &str, payload: &[u8]) -> PublishOutcome {
    let status = match endpoint.publish(topic, payload).await {
        Ok(()) => {
            tracing::debug!("Published message to {} via {}", topic, endpoint.name());
            DeliveryStatus::Delivered
        }
        Err(e) => {
            tracing::warn!("Client {} failed to send message to topic {}: {}", endpoint.name(), topic, e);

            if let Err(e) = endpoint.reconnect().await {
                tracing::warn!("Reconnect of {} failed: {}", endpoint.name(), e);
            }

            DeliveryStatus::Failed(e)
        }
    };

    PublishOutcome {
        endpoint: endpoint.name().to_string(),
        status,
    }
}

/// Serializes readings and fans them out under `<prefix>WeatherData`.
pub struct PublishService {
    topic: String,
}

impl PublishService {
    pub fn new(topic_prefix: &str) -> Self {
        Self {
            topic: format!("{topic_prefix}{TOPIC_SUFFIX}"),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn payload(reading: &DerivedReading) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&WeatherPayload::from(reading))
    }

    pub async fn publish(
        &self,
        reading: &DerivedReading,
        registry: &mut EndpointRegistry,
    ) -> Result<Vec<PublishOutcome>, serde_json::Error> {
        let payload = Self::payload(reading)?;

        Ok(registry.publish(&self.topic, &payload).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_from_prefix() {
        assert_eq!(PublishService::new("Weatherstation/").topic(), "Weatherstation/WeatherData");
        assert_eq!(PublishService::new("").topic(), "WeatherData");
    }

    #[test]
    fn test_payload_is_rounded_json() {
        let reading = DerivedReading {
            temperature_c: 20.0,
            pressure_hpa: 1013.0,
            humidity_pct: 50.0,
            lux: 10000.0,
            ambient_lux: 10000.0,
            dew_point_c: 9.3,
            corrected_humidity_pct: 46.3,
        };

        let payload = PublishService::payload(&reading).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "temperature": 20.0,
                "pressure": 1013.0,
                "humidity": 50.0,
                "dew_point": 9.3,
                "lx": 10000.0,
                "ambient_lux": 10000.0
            })
        );
    }
}
