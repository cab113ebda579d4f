use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;

use crate::clock::Timer;
use crate::errors::{CycleError, SinkError};
use crate::models::{CalibrationOffsets, DerivedReading};
use crate::sensors::SensorSource;
use crate::services::metrics_service::compute;
use crate::services::persistence_service::PersistenceService;
use crate::services::publish_service::{EndpointRegistry, PublishOutcome, PublishService};
use crate::services::validation_service::is_artifact;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

#[derive(Debug)]
pub enum CycleOutcome {
    /// The reading passed validation and was handed to every sink.
    Completed {
        reading: DerivedReading,
        /// `None` when persistence is disabled
        stored: Option<Result<(), SinkError>>,
        published: Vec<PublishOutcome>,
    },
    /// Power-on artifact, nothing stored or published.
    Discarded(DerivedReading),
    Failed(CycleError),
    /// A panic escaped the cycle body.
    Fault(String),
}

/// Drives acquire, compute, validate, store and publish once per interval.
pub struct CycleService {
    sensor: Box<dyn SensorSource>,
    calibration: CalibrationOffsets,
    persistence: Option<PersistenceService>,
    publisher: PublishService,
    registry: EndpointRegistry,
    timer: Box<dyn Timer>,
    interval: Duration,
    warm_up: Option<Duration>,
    state: SchedulerState,
}

impl CycleService {
    pub fn new(
        sensor: Box<dyn SensorSource>,
        calibration: CalibrationOffsets,
        publisher: PublishService,
        registry: EndpointRegistry,
        timer: Box<dyn Timer>,
        interval: Duration,
    ) -> Self {
        Self {
            sensor,
            calibration,
            persistence: None,
            publisher,
            registry,
            timer,
            interval,
            warm_up: None,
            state: SchedulerState::Idle,
        }
    }

    pub fn with_persistence(mut self, persistence: PersistenceService) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Discard one read at start-up and wait before the first cycle.
    pub fn with_warm_up(mut self, delay: Duration) -> Self {
        self.warm_up = Some(delay);
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    /// Runs cycles until `shutdown` turns true, checking it only between cycles.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            "Starting readings loop: {} endpoint(s), interval {:?}, persistence {}",
            self.registry.len(),
            self.interval,
            if self.persistence.is_some() { "enabled" } else { "disabled" }
        );

        if let Some(persistence) = self.persistence.as_mut() {
            // Failure is logged by the service and retried on the first store
            let _ = persistence.connect().await;
        }

        if let Some(delay) = self.warm_up {
            if let Err(e) = self.sensor.read().await {
                tracing::warn!("Warm-up read failed: {}", e);
            }
            self.timer.sleep(delay).await;
        }

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.run_once().await;

            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = self.timer.sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Shutting down readings loop");

        self.registry.close().await;
        if let Some(persistence) = self.persistence.as_mut() {
            persistence.disconnect().await;
        }
    }

    /// Executes one cycle body; never panics and never returns an error.
    pub async fn run_once(&mut self) -> CycleOutcome {
        self.state = SchedulerState::Running;

        let outcome = match AssertUnwindSafe(self.cycle()).catch_unwind().await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                tracing::error!("Cycle skipped: {}", e);
                CycleOutcome::Failed(e)
            }
            Err(panic) => {
                let message = panic_message(panic);
                tracing::error!("Unexpected error in sensor loop; continuing: {}", message);
                CycleOutcome::Fault(message)
            }
        };

        self.state = SchedulerState::Idle;

        outcome
    }

    async fn cycle(&mut self) -> Result<CycleOutcome, CycleError> {
        let raw = self.sensor.read().await?;
        let reading = compute(&raw, &self.calibration);

        if is_artifact(&reading) {
            tracing::warn!(
                "Bad sensor reading detected: temp={} hum={} pres={}",
                reading.temperature_c,
                reading.humidity_pct,
                reading.pressure_hpa
            );
            return Ok(CycleOutcome::Discarded(reading));
        }

        let stored = match self.persistence.as_mut() {
            Some(persistence) => Some(persistence.store(&reading).await),
            None => None,
        };

        let published = self.publisher.publish(&reading, &mut self.registry).await?;

        Ok(CycleOutcome::Completed {
            reading,
            stored,
            published,
        })
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("unknown panic")
    }
}
