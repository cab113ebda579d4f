use crate::models::{CalibrationOffsets, DerivedReading, RawSample};

/// Raw clear-channel counts per lux of the colour sensor.
pub const LUX_DIVISOR: f64 = 1.638375;
pub const MAX_LUX: f64 = 40000.0;
pub const MAX_AMBIENT_LUX: f64 = 10000.0;

// Magnus constants for water vapour over liquid water
const MAGNUS_A: f64 = 17.27;
const MAGNUS_B: f64 = 237.7;
const MIN_RH_FRACTION: f64 = 1e-6;
const MIN_DENOMINATOR: f64 = 1e-9;

/// Dew point together with the formula that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DewPoint {
    Magnus(f64),
    Fallback(f64),
}

impl DewPoint {
    pub fn value(&self) -> f64 {
        match self {
            DewPoint::Magnus(value) | DewPoint::Fallback(value) => *value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, DewPoint::Fallback(_))
    }
}

/// Applies calibration and derives every secondary metric of one sample.
///
/// All arithmetic runs on unrounded values; each field is rounded to one
/// decimal only when the reading is assembled.
pub fn compute(raw: &RawSample, calibration: &CalibrationOffsets) -> DerivedReading {
    let temperature = raw.temperature + calibration.temperature;
    let pressure = raw.pressure + calibration.pressure;
    let humidity = raw.humidity + calibration.humidity;
    let light_channel = raw.light_channel + calibration.lux;

    let lux = lux_from_channel(light_channel);
    let ambient_lux = lux.min(MAX_AMBIENT_LUX);

    let dew_point = dew_point(temperature, humidity);
    if dew_point.is_fallback() {
        tracing::warn!(
            "Magnus dew point undefined for temperature={} humidity={}, using fallback",
            temperature,
            humidity
        );
    }
    let dew_point = dew_point.value();
    let corrected_humidity = corrected_humidity(temperature, dew_point);

    DerivedReading {
        temperature_c: round_one_decimal(temperature),
        pressure_hpa: round_one_decimal(pressure),
        humidity_pct: round_one_decimal(humidity),
        lux: round_one_decimal(lux),
        ambient_lux: round_one_decimal(ambient_lux),
        dew_point_c: round_one_decimal(dew_point),
        corrected_humidity_pct: round_one_decimal(corrected_humidity),
    }
}

/// Converts a calibrated light channel to lux, rounded to the nearest
/// hundred and clamped to `[0, MAX_LUX]`.
pub fn lux_from_channel(light_channel: f64) -> f64 {
    let lux = round_to_hundreds(light_channel / LUX_DIVISOR);

    if lux.is_nan() {
        return 0.0;
    }

    // `max` first so that -0.0 from rounding small negatives ends up as 0.0
    lux.max(0.0).min(MAX_LUX) + 0.0
}

/// Rounds to the nearest hundred, ties to even (250 -> 200, 350 -> 400).
pub fn round_to_hundreds(value: f64) -> f64 {
    (value / 100.0).round_ties_even() * 100.0
}

/// Rounds the exact binary value to one decimal place, ties to even.
///
/// `value * 10.0` is itself rounded, so a product landing exactly on a half
/// is resolved with the residual of the multiplication: 21.95 is stored as
/// 21.9499... and rounds down, while 684.25 is a true tie and goes to 684.2.
pub fn round_one_decimal(value: f64) -> f64 {
    let scaled = value * 10.0;
    if !scaled.is_finite() {
        return value;
    }

    // Exact: scaled + residual == value * 10
    let residual = value.mul_add(10.0, -scaled);

    let rounded = if (scaled - scaled.trunc()).abs() == 0.5 {
        if residual > 0.0 {
            scaled.ceil()
        } else if residual < 0.0 {
            scaled.floor()
        } else {
            scaled.round_ties_even()
        }
    } else {
        scaled.round()
    };

    rounded / 10.0
}

pub fn dew_point(temperature: f64, humidity: f64) -> DewPoint {
    let rh_fraction = (humidity / 100.0).clamp(MIN_RH_FRACTION, 1.0);
    let gamma = MAGNUS_A * temperature / (MAGNUS_B + temperature) + rh_fraction.ln();
    let denominator = MAGNUS_A - gamma;

    if gamma.is_finite() && denominator.abs() > MIN_DENOMINATOR {
        let value = MAGNUS_B * gamma / denominator;
        if value.is_finite() {
            return DewPoint::Magnus(value);
        }
    }

    DewPoint::Fallback(temperature - (100.0 - humidity) / 5.0)
}

pub fn corrected_humidity(temperature: f64, dew_point: f64) -> f64 {
    100.0 - 5.0 * (temperature - dew_point)
}
