mod connection;
mod reading;

pub use connection::ConnectionState;
pub use reading::{CalibrationOffsets, DerivedReading, RawSample, ReadingRow, ReadingTable, WeatherPayload};

pub trait Table {
    /// The name of the table
    fn name(&self) -> &'static str;

    /// The SQL statement to create the table
    fn create(&self) -> String;

    /// The SQL statement to dispose the table
    fn dispose(&self) -> String;
}
