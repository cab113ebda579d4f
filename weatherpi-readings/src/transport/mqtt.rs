use std::fs;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS, TlsConfiguration, Transport,
};
use tokio::sync::{watch, Notify};
use tokio::time::timeout;

use crate::configs::Endpoint;
use crate::errors::PublishError;
use crate::models::ConnectionState;
use crate::transport::Publisher;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// `<hostname>_s-<n>`, shared by every endpoint of this process.
pub fn client_id_prefix() -> String {
    let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| String::from("weatherpi"));
    let suffix: u16 = rand::rng().random_range(0..=1000);

    format!("{hostname}_s-{suffix}")
}

fn client_id(prefix: &str, endpoint: &Endpoint) -> String {
    format!("{prefix}{}", endpoint.host)
}

/// MQTT broker connection kept alive by a background event loop task.
pub struct MqttEndpoint {
    name: String,
    client: AsyncClient,
    state: watch::Receiver<ConnectionState>,
    wake: Arc<Notify>,
    timeout: Duration,
}

impl MqttEndpoint {
    /// Creates the client and spawns its event loop; the connection itself
    /// is established in the background.
    pub fn connect(
        endpoint: &Endpoint,
        client_id_prefix: &str,
        keep_alive: Duration,
        publish_timeout: Duration,
    ) -> io::Result<Self> {
        let name = format!("{}:{}", endpoint.host, endpoint.port);

        let mut options = MqttOptions::new(client_id(client_id_prefix, endpoint), &endpoint.host, endpoint.port);
        options.set_keep_alive(keep_alive);

        if let Some(username) = &endpoint.username {
            options.set_credentials(username, endpoint.password.clone().unwrap_or_default());
        }

        if let Some(transport) = Self::transport(endpoint)? {
            options.set_transport(transport);
        }

        let (client, event_loop) = AsyncClient::new(options, 10);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let wake = Arc::new(Notify::new());

        tokio::spawn(drive(name.clone(), event_loop, state_tx, wake.clone()));

        Ok(Self {
            name,
            client,
            state: state_rx,
            wake,
            timeout: publish_timeout,
        })
    }

    fn transport(endpoint: &Endpoint) -> io::Result<Option<Transport>> {
        match &endpoint.tls {
            Some(tls) => {
                let ca = fs::read(&tls.ca_path)?;
                let client_auth = match (&tls.cert_path, &tls.key_path) {
                    (Some(cert_path), Some(key_path)) => Some((fs::read(cert_path)?, fs::read(key_path)?)),
                    _ => None,
                };

                Ok(Some(Transport::Tls(TlsConfiguration::Simple {
                    ca,
                    alpn: None,
                    client_auth,
                })))
            }
            None if endpoint.port == 8883 => Ok(Some(Transport::tls_with_default_config())),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Publisher for MqttEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        if !self.state().is_connected() {
            return Err(PublishError::NotConnected(self.name.clone()));
        }

        timeout(self.timeout, self.client.publish(topic, QoS::AtMostOnce, false, payload.to_vec()))
            .await
            .map_err(|_| PublishError::Timeout(self.name.clone()))??;

        Ok(())
    }

    async fn reconnect(&mut self) -> Result<(), PublishError> {
        // Cuts the back-off of the event loop short
        self.wake.notify_one();
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.client.disconnect().await {
            tracing::debug!("MQTT disconnect from {} failed: {}", self.name, e);
        }
    }
}

async fn drive(
    name: String,
    mut event_loop: EventLoop,
    state: watch::Sender<ConnectionState>,
    wake: Arc<Notify>,
) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    tracing::info!("Connected to MQTT Broker {}", name);
                    state.send_replace(ConnectionState::Connected);
                } else {
                    tracing::error!("Failed to connect to MQTT Broker {}, return code {:?}", name, ack.code);
                    state.send_replace(ConnectionState::Disconnected);
                }
            }
            Ok(Event::Outgoing(rumqttc::Outgoing::Disconnect)) => {
                tracing::info!("Disconnecting from MQTT Broker {}", name);
                state.send_replace(ConnectionState::Disconnected);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                if state.send_replace(ConnectionState::Disconnected).is_connected() {
                    tracing::warn!("Disconnected from MQTT Broker {}: {}", name, e);
                } else {
                    tracing::error!("Failed to connect to MQTT Broker {}: {}", name, e);
                }

                tokio::select! {
                    _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                    _ = wake.notified() => {}
                }
            }
        }

        if state.is_closed() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use uuid::Uuid;

    use super::*;
    use crate::configs::EndpointTls;

    fn endpoint(host: &str, port: u16) -> Endpoint {
        Endpoint {
            host: host.to_string(),
            port,
            username: None,
            password: None,
            tls: None,
        }
    }

    fn temp_file(contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("weatherpi-{}.pem", Uuid::new_v4()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_client_id_format() {
        let prefix = client_id_prefix();
        let (hostname, suffix) = prefix.rsplit_once("_s-").unwrap();

        assert!(!hostname.is_empty());
        assert!(suffix.parse::<u16>().unwrap() <= 1000);
        assert_eq!(
            client_id(&prefix, &endpoint("mqtt.example.com", 1883)),
            format!("{prefix}mqtt.example.com")
        );
    }

    #[test]
    fn test_plain_transport_by_default() {
        assert!(MqttEndpoint::transport(&endpoint("localhost", 1883)).unwrap().is_none());
    }

    #[test]
    fn test_default_tls_on_secure_port() {
        let transport = MqttEndpoint::transport(&endpoint("localhost", 8883)).unwrap();

        assert!(matches!(transport, Some(Transport::Tls(_))));
    }

    #[test]
    fn test_configured_tls_files_loaded() {
        let ca_path = temp_file(b"ca");
        let cert_path = temp_file(b"cert");
        let key_path = temp_file(b"key");

        let mut secure = endpoint("localhost", 8883);
        secure.tls = Some(EndpointTls {
            ca_path: ca_path.display().to_string(),
            cert_path: Some(cert_path.display().to_string()),
            key_path: Some(key_path.display().to_string()),
        });

        let transport = MqttEndpoint::transport(&secure).unwrap();

        for path in [&ca_path, &cert_path, &key_path] {
            let _ = fs::remove_file(path);
        }

        let Some(Transport::Tls(TlsConfiguration::Simple { ca, client_auth, .. })) = transport else {
            panic!("expected a simple TLS configuration");
        };
        assert_eq!(ca, b"ca".to_vec());
        assert_eq!(client_auth, Some((b"cert".to_vec(), b"key".to_vec())));
    }

    #[test]
    fn test_missing_ca_file_is_an_error() {
        let mut secure = endpoint("localhost", 8883);
        secure.tls = Some(EndpointTls {
            ca_path: String::from("/nonexistent-directory/ca.pem"),
            cert_path: None,
            key_path: None,
        });

        assert!(MqttEndpoint::transport(&secure).is_err());
    }

    #[tokio::test]
    async fn test_publish_fails_fast_while_disconnected() {
        let mut client = MqttEndpoint::connect(
            &endpoint("127.0.0.1", 1),
            "test_s-1",
            Duration::from_secs(5),
            Duration::from_secs(1),
        )
        .unwrap();

        assert_eq!(client.name(), "127.0.0.1:1");
        assert_eq!(client.state(), ConnectionState::Disconnected);

        let result = client.publish("Weatherstation/WeatherData", b"{}").await;

        assert!(matches!(result, Err(PublishError::NotConnected(name)) if name == "127.0.0.1:1"));
        assert!(client.reconnect().await.is_ok());
    }
}
