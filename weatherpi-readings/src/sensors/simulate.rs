use std::ops::Range;

use async_trait::async_trait;
use rand::Rng;
use time::OffsetDateTime;

use crate::errors::SensorError;
use crate::models::RawSample;
use crate::sensors::SensorSource;
use crate::services::metrics_service::LUX_DIVISOR;

const SUNRISE: f64 = 0.25;
const SUNSET: f64 = 0.75;
const TWILIGHT: f64 = 0.03;

/// Night and midday levels of one measured quantity, plus its jitter.
#[derive(Debug, Clone, Copy)]
struct Channel {
    night: f64,
    day: f64,
    noise: f64,
}

impl Channel {
    fn level(&self, daylight: f64) -> f64 {
        self.night + (self.day - self.night) * daylight
    }

    fn sample(&self, daylight: f64, rng: &mut impl Rng) -> f64 {
        let noise: Range<f64> = -self.noise..self.noise;
        if noise.is_empty() {
            self.level(daylight)
        } else {
            self.level(daylight) + rng.random_range(noise)
        }
    }
}

const TEMPERATURE: Channel = Channel { night: 10.0, day: 30.0, noise: 0.5 };
const PRESSURE: Channel = Channel { night: 1013.25, day: 1013.25, noise: 3.0 };
const HUMIDITY: Channel = Channel { night: 85.0, day: 55.0, noise: 0.0 };
const LUX: Channel = Channel { night: 5.0, day: 20000.0, noise: 0.0 };

/// Share of full daylight at a point of the day: 0 at night, 1 between
/// sunrise and sunset, with a smooth twilight around both.
pub fn daylight(day_fraction: f64) -> f64 {
    let t = day_fraction.rem_euclid(1.0);
    let dawn = smoothstep(SUNRISE - TWILIGHT, SUNRISE + TWILIGHT, t);
    let dusk = smoothstep(SUNSET - TWILIGHT, SUNSET + TWILIGHT, t);

    dawn - dusk
}

fn smoothstep(start: f64, end: f64, x: f64) -> f64 {
    let t = ((x - start) / (end - start)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Stand-in for the BME280/BH1745 pair, following the daylight curve.
#[derive(Debug, Default)]
pub struct SimulatedSensor;

impl SimulatedSensor {
    pub fn new() -> Self {
        Self
    }

    pub fn sample_at(day_fraction: f64) -> RawSample {
        let light = daylight(day_fraction);
        let mut rng = rand::rng();

        RawSample {
            temperature: TEMPERATURE.sample(light, &mut rng),
            pressure: PRESSURE.sample(light, &mut rng),
            humidity: HUMIDITY.sample(light, &mut rng).round(),
            light_channel: LUX.sample(light, &mut rng) * LUX_DIVISOR,
        }
    }
}

#[async_trait]
impl SensorSource for SimulatedSensor {
    async fn read(&mut self) -> Result<RawSample, SensorError> {
        let now = OffsetDateTime::now_utc();
        let seconds = now.hour() as f64 * 3600.0 + now.minute() as f64 * 60.0 + now.second() as f64;

        Ok(Self::sample_at(seconds / 86400.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daylight_curve() {
        assert_eq!(daylight(0.0), 0.0);
        assert_eq!(daylight(0.5), 1.0);
        assert_eq!(daylight(1.0), 0.0);
        assert!((daylight(SUNRISE) - 0.5).abs() < 1e-9);
        assert!((daylight(SUNSET) - 0.5).abs() < 1e-9);

        for step in 0..=100 {
            let light = daylight(step as f64 / 100.0);
            assert!((0.0..=1.0).contains(&light), "daylight {light}");
        }
    }

    #[test]
    fn test_noon_and_midnight_samples() {
        let noon = SimulatedSensor::sample_at(0.5);
        let midnight = SimulatedSensor::sample_at(0.0);

        assert!((noon.light_channel / LUX_DIVISOR - 20000.0).abs() < 1e-6);
        assert_eq!(noon.humidity, 55.0);
        assert!((midnight.light_channel / LUX_DIVISOR - 5.0).abs() < 1e-9);
        assert_eq!(midnight.humidity, 85.0);
        assert!(noon.temperature > midnight.temperature);
    }

    #[test]
    fn test_humidity_falls_as_light_rises() {
        let mut previous = f64::INFINITY;
        for step in 0..=50 {
            let sample = SimulatedSensor::sample_at(step as f64 / 100.0);
            assert!((55.0..=85.0).contains(&sample.humidity), "humidity {}", sample.humidity);
            assert!(sample.humidity <= previous);
            previous = sample.humidity;
        }
    }

    #[tokio::test]
    async fn test_read_is_plausible() {
        let sample = SimulatedSensor::new().read().await.unwrap();

        assert!((9.0..=31.0).contains(&sample.temperature));
        assert!((1010.0..=1017.0).contains(&sample.pressure));
        assert!(sample.light_channel >= 0.0);
    }
}
