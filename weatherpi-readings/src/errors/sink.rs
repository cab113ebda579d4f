#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database {operation} timed out")]
    Timeout { operation: &'static str },

    #[error("Database not connected")]
    NotConnected,
}
