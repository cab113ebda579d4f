pub mod cycle;
pub mod publish;
pub mod sensor;
pub mod sink;

pub use cycle::CycleError;
pub use publish::PublishError;
pub use sensor::SensorError;
pub use sink::SinkError;
