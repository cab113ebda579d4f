use std::time::Duration;

use async_trait::async_trait;

/// Waits between cycles.
#[async_trait]
pub trait Timer: Send {
    async fn sleep(&mut self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTimer;

#[async_trait]
impl Timer for TokioTimer {
    async fn sleep(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
