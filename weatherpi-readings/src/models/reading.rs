use serde::{Deserialize, Serialize};

use crate::models::Table;

/// One capture of the raw sensor channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Degrees Celsius
    pub temperature: f64,
    /// Hectopascal
    pub pressure: f64,
    /// Relative humidity in percent
    pub humidity: f64,
    /// Raw clear channel count of the colour sensor
    pub light_channel: f64,
}

/// Additive offsets applied to every sample before derivation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationOffsets {
    pub temperature: f64,
    pub pressure: f64,
    pub humidity: f64,
    /// Applied to the raw light channel, not to the converted lux
    pub lux: f64,
}

/// The calibrated, derived and rounded result of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedReading {
    pub temperature_c: f64,
    pub pressure_hpa: f64,
    pub humidity_pct: f64,
    pub lux: f64,
    pub ambient_lux: f64,
    pub dew_point_c: f64,
    pub corrected_humidity_pct: f64,
}

/// Wire format published under `<prefix>WeatherData`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherPayload {
    pub temperature: f64,
    pub pressure: f64,
    pub humidity: f64,
    pub dew_point: f64,
    pub lx: f64,
    pub ambient_lux: f64,
}

impl From<&DerivedReading> for WeatherPayload {
    fn from(reading: &DerivedReading) -> Self {
        Self {
            temperature: reading.temperature_c,
            pressure: reading.pressure_hpa,
            humidity: reading.humidity_pct,
            dew_point: reading.dew_point_c,
            lx: reading.lux,
            ambient_lux: reading.ambient_lux,
        }
    }
}

/// Column values of a persisted reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadingRow {
    pub humidity: f64,
    pub pressure: f64,
    pub temperature: f64,
    pub lux: f64,
    pub ambient_lux: f64,
}

impl From<&DerivedReading> for ReadingRow {
    fn from(reading: &DerivedReading) -> Self {
        Self {
            humidity: reading.humidity_pct,
            pressure: reading.pressure_hpa,
            temperature: reading.temperature_c,
            lux: reading.lux,
            ambient_lux: reading.ambient_lux,
        }
    }
}

pub struct ReadingTable;

impl ReadingTable {
    pub const INSERT: &'static str =
        "INSERT INTO Readings (Humidity, Pressure, Temperature, Lux, AmbientLux) VALUES (?, ?, ?, ?, ?)";
}

impl Table for ReadingTable {
    fn name(&self) -> &'static str {
        "Readings"
    }

    // DOUBLE keeps the statement valid for both MySQL and SQLite
    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS Readings (
                Humidity DOUBLE NOT NULL,
                Pressure DOUBLE NOT NULL,
                Temperature DOUBLE NOT NULL,
                Lux DOUBLE NOT NULL,
                AmbientLux DOUBLE NOT NULL
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS Readings;")
    }
}
