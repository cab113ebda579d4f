use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::clock::TokioTimer;
use crate::configs::{Settings, SqlStorage};
use crate::sensors::SimulatedSensor;
use crate::services::{CycleService, EndpointRegistry, PersistenceService, PublishService};
use crate::transport::{client_id_prefix, MqttEndpoint, Publisher};

pub mod clock;
pub mod configs;
pub mod errors;
pub mod models;
pub mod sensors;
pub mod services;
pub mod transport;

/// Fails only when a broker client cannot be created; everything after
/// startup is retried by the cycle loop.
pub async fn run(settings: &Arc<Settings>, shutdown: watch::Receiver<bool>) -> io::Result<()> {
    if settings.timeouts_clamped() {
        tracing::warn!(
            "I/O timeouts exceed 80% of the {}s refresh interval; clamped to {:?} (publish) and {:?} (database)",
            settings.broker.refresh,
            settings.publish_timeout(),
            settings.database_timeout()
        );
    }

    let prefix = client_id_prefix();
    let keep_alive = Duration::from_secs(settings.broker.keep_alive);

    let mut endpoints: Vec<Box<dyn Publisher>> = Vec::with_capacity(settings.broker.endpoints.len());
    for endpoint in &settings.broker.endpoints {
        let client = MqttEndpoint::connect(endpoint, &prefix, keep_alive, settings.publish_timeout()).map_err(|e| {
            tracing::error!("Failed to create MQTT client for {}:{}: {}", endpoint.host, endpoint.port, e);
            e
        })?;
        endpoints.push(Box::new(client));
    }

    let mut cycle = CycleService::new(
        Box::new(SimulatedSensor::new()),
        settings.calibration,
        PublishService::new(&settings.broker.topic),
        EndpointRegistry::new(endpoints),
        Box::new(TokioTimer),
        settings.refresh_interval(),
    )
    .with_warm_up(Duration::from_secs(settings.sensor.warm_up));

    if settings.database.enabled {
        let storage = SqlStorage::new(&settings.database, settings.database_timeout());
        cycle = cycle.with_persistence(PersistenceService::new(Box::new(storage)));
    }

    cycle.run(shutdown).await;

    Ok(())
}
