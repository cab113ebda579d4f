pub mod cycle_service;
pub mod metrics_service;
pub mod persistence_service;
pub mod publish_service;
pub mod validation_service;

pub use cycle_service::{CycleOutcome, CycleService, SchedulerState};
pub use persistence_service::PersistenceService;
pub use publish_service::{DeliveryStatus, EndpointRegistry, PublishOutcome, PublishService};
