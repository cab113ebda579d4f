use std::time::Duration;

use async_trait::async_trait;
use sqlx::any::install_default_drivers;
use sqlx::{AnyConnection, Connection};
use tokio::time::timeout;

use crate::configs::settings::Database;
use crate::errors::SinkError;
use crate::models::{ReadingRow, ReadingTable, Table};

/// Opens connections to the reading store.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn StoreConnection>, SinkError>;
}

/// A single live connection to the reading store.
#[async_trait]
pub trait StoreConnection: Send {
    async fn is_alive(&mut self) -> bool;

    /// Inserts one row and commits it.
    async fn insert(&mut self, row: &ReadingRow) -> Result<(), SinkError>;

    async fn close(&mut self);
}

#[derive(Debug, Clone)]
pub struct SqlStorage {
    url: String,
    create_schema: bool,
    timeout: Duration,
}

impl SqlStorage {
    pub fn new(database: &Database, timeout: Duration) -> Self {
        install_default_drivers();

        Self {
            url: database.connection_url(),
            create_schema: database.create_schema,
            timeout,
        }
    }

    pub fn from_url(url: impl Into<String>, create_schema: bool, timeout: Duration) -> Self {
        install_default_drivers();

        Self {
            url: url.into(),
            create_schema,
            timeout,
        }
    }
}

#[async_trait]
impl StoreConnector for SqlStorage {
    async fn connect(&self) -> Result<Box<dyn StoreConnection>, SinkError> {
        let mut connection = timeout(self.timeout, AnyConnection::connect(&self.url))
            .await
            .map_err(|_| SinkError::Timeout { operation: "connect" })??;

        if self.create_schema {
            timeout(self.timeout, sqlx::query(&ReadingTable.create()).execute(&mut connection))
                .await
                .map_err(|_| SinkError::Timeout { operation: "schema" })??;
        }

        Ok(Box::new(SqlConnection {
            connection: Some(connection),
            timeout: self.timeout,
        }))
    }
}

pub struct SqlConnection {
    connection: Option<AnyConnection>,
    timeout: Duration,
}

impl SqlConnection {
    async fn insert_row(connection: &mut AnyConnection, row: &ReadingRow) -> Result<(), sqlx::Error> {
        let mut transaction = connection.begin().await?;

        sqlx::query(ReadingTable::INSERT)
            .bind(row.humidity)
            .bind(row.pressure)
            .bind(row.temperature)
            .bind(row.lux)
            .bind(row.ambient_lux)
            .execute(&mut *transaction)
            .await?;

        transaction.commit().await
    }
}

#[async_trait]
impl StoreConnection for SqlConnection {
    async fn is_alive(&mut self) -> bool {
        match self.connection.as_mut() {
            Some(connection) => matches!(timeout(self.timeout, connection.ping()).await, Ok(Ok(()))),
            None => false,
        }
    }

    async fn insert(&mut self, row: &ReadingRow) -> Result<(), SinkError> {
        let connection = self.connection.as_mut().ok_or(SinkError::NotConnected)?;

        timeout(self.timeout, Self::insert_row(connection, row))
            .await
            .map_err(|_| SinkError::Timeout { operation: "insert" })??;

        Ok(())
    }

    async fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            if let Err(e) = connection.close().await {
                tracing::debug!("Database close failed: {}", e);
            }
        }
    }
}
