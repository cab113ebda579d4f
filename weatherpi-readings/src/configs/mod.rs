mod settings;
mod storage;

pub use settings::{Broker, Database, Endpoint, EndpointTls, Logger, Sensor, Settings};
pub use storage::{SqlConnection, SqlStorage, StoreConnection, StoreConnector};
