use crate::configs::{StoreConnection, StoreConnector};
use crate::errors::SinkError;
use crate::models::{ConnectionState, DerivedReading, ReadingRow};

/// Durable sink for accepted readings.
///
/// Holds at most one connection. A dead connection is replaced by a single
/// reconnect attempt before the write; a failed write drops the connection
/// so the next cycle starts from a fresh one. Nothing is retried or queued
/// within a cycle.
pub struct PersistenceService {
    connector: Box<dyn StoreConnector>,
    connection: Option<Box<dyn StoreConnection>>,
}

impl PersistenceService {
    pub fn new(connector: Box<dyn StoreConnector>) -> Self {
        Self {
            connector,
            connection: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        match self.connection {
            Some(_) => ConnectionState::Connected,
            None => ConnectionState::Disconnected,
        }
    }

    /// Opens the connection ahead of the first cycle.
    pub async fn connect(&mut self) -> Result<(), SinkError> {
        self.ensure_connected().await.map(|_| ())
    }

    pub async fn store(&mut self, reading: &DerivedReading) -> Result<(), SinkError> {
        let connection = self.ensure_connected().await?;

        match connection.insert(&ReadingRow::from(reading)).await {
            Ok(()) => {
                tracing::debug!("Stored reading {:?}", reading);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Database insert failed: {}", e);
                self.disconnect().await;
                Err(e)
            }
        }
    }

    pub async fn disconnect(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.close().await;
        }
    }

    async fn ensure_connected(&mut self) -> Result<&mut Box<dyn StoreConnection>, SinkError> {
        let alive = match self.connection.as_mut() {
            Some(connection) => connection.is_alive().await,
            None => false,
        };

        if !alive {
            if self.connection.is_some() {
                tracing::warn!("Database connection lost; attempting reconnect");
                self.disconnect().await;
            }

            match self.connector.connect().await {
                Ok(connection) => {
                    tracing::info!("Connected to database");
                    self.connection = Some(connection);
                }
                Err(e) => {
                    tracing::error!("Database connection failed: {}", e);
                    return Err(e);
                }
            }
        }

        self.connection.as_mut().ok_or(SinkError::NotConnected)
    }
}
