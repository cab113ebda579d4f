use crate::models::DerivedReading;

/// Rounded values the BME280 emits right after power-on.
const ARTIFACT_TEMPERATURE: f64 = 22.0;
const ARTIFACT_HUMIDITY: f64 = 82.3;
const ARTIFACT_PRESSURE: f64 = 684.3;

/// Whether the reading is the known power-on artifact rather than a measurement.
pub fn is_artifact(reading: &DerivedReading) -> bool {
    reading.temperature_c == ARTIFACT_TEMPERATURE
        && reading.humidity_pct == ARTIFACT_HUMIDITY
        && reading.pressure_hpa == ARTIFACT_PRESSURE
}
