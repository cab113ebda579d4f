use std::env;
use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::models::CalibrationOffsets;

/// Variables understood by earlier deployments, mapped onto settings keys.
const LEGACY_VARIABLES: [(&str, &str); 11] = [
    ("broker.topic", "MQTT_TOPIC"),
    ("broker.refresh", "MQTT_REFRESH"),
    ("database.enabled", "DB_USE_SQL"),
    ("database.server", "DB_SERVER"),
    ("database.name", "DB_NAME"),
    ("database.username", "DB_USERNAME"),
    ("database.password", "DB_PASSWORD"),
    ("calibration.temperature", "CAL_TEMPERATURE"),
    ("calibration.pressure", "CAL_PRESSURE"),
    ("calibration.humidity", "CAL_HUMIDITY"),
    ("calibration.lux", "CAL_LUX"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logger {
    pub level: String,
}

impl Default for Logger {
    fn default() -> Self {
        Self { level: String::from("info") }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointTls {
    pub ca_path: String,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(alias = "brokerfqdn")]
    pub host: String,
    #[serde(alias = "brokerport")]
    pub port: u16,
    #[serde(default, alias = "brokerusername")]
    pub username: Option<String>,
    #[serde(default, alias = "brokerpassword")]
    pub password: Option<String>,
    #[serde(default)]
    pub tls: Option<EndpointTls>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Broker {
    /// Prepended to `WeatherData` to form the publish topic
    pub topic: String,
    /// Seconds between two cycles
    pub refresh: u64,
    /// Seconds a single publish may take
    pub timeout: u64,
    pub keep_alive: u64,
    pub endpoints: Vec<Endpoint>,
}

impl Default for Broker {
    fn default() -> Self {
        Self {
            topic: String::from("Weatherstation/"),
            refresh: 300,
            timeout: 10,
            keep_alive: 60,
            endpoints: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Database {
    pub enabled: bool,
    /// Full connection url, takes precedence over the individual fields
    pub url: Option<String>,
    pub server: String,
    pub name: String,
    pub username: String,
    pub password: String,
    pub create_schema: bool,
    /// Seconds a connect or insert may take
    pub timeout: u64,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            server: String::new(),
            name: String::new(),
            username: String::new(),
            password: String::new(),
            create_schema: false,
            timeout: 10,
        }
    }
}

impl Database {
    pub fn connection_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "mysql://{}:{}@{}/{}",
                self.username, self.password, self.server, self.name
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Sensor {
    /// Seconds to wait after the discarded power-on read
    pub warm_up: u64,
}

impl Default for Sensor {
    fn default() -> Self {
        Self { warm_up: 1 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub logger: Logger,
    pub broker: Broker,
    pub database: Database,
    pub calibration: CalibrationOffsets,
    pub sensor: Sensor,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());
        let config_file = env::var("READINGS_CONFIG").unwrap_or("configs/default".into());

        let mut builder = Config::builder()
            .add_source(File::with_name(&config_file).required(false))
            .add_source(File::with_name(&format!("configs/{run_mode}")).required(false))
            .add_source(Environment::with_prefix("READINGS").separator("__"));

        for (key, variable) in LEGACY_VARIABLES {
            builder = builder.set_override_option(key, env::var(variable).ok())?;
        }

        let mut settings: Settings = builder.build()?.try_deserialize()?;

        if let Ok(brokers) = env::var("MQTT_BROKERS") {
            settings.broker.endpoints = Self::parse_endpoints(&brokers)?;
        }

        settings.validate()?;

        Ok(settings)
    }

    /// Parses the JSON broker list of `MQTT_BROKERS`.
    pub fn parse_endpoints(brokers: &str) -> Result<Vec<Endpoint>, ConfigError> {
        serde_json::from_str(brokers)
            .map_err(|e| ConfigError::Message(format!("invalid MQTT_BROKERS: {e}")))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broker.endpoints.is_empty() {
            return Err(ConfigError::Message("no MQTT broker endpoints configured".into()));
        }

        if self.broker.refresh == 0 {
            return Err(ConfigError::Message("broker.refresh must be positive".into()));
        }

        for endpoint in &self.broker.endpoints {
            let Some(tls) = &endpoint.tls else { continue };

            let files = [Some(&tls.ca_path), tls.cert_path.as_ref(), tls.key_path.as_ref()];
            if let Some(missing) = files.into_iter().flatten().find(|path| !Path::new(path).is_file()) {
                return Err(ConfigError::Message(format!(
                    "TLS file {missing} for broker {}:{} not found",
                    endpoint.host, endpoint.port
                )));
            }
        }

        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.broker.refresh)
    }

    pub fn publish_timeout(&self) -> Duration {
        self.bounded_timeout(self.broker.timeout)
    }

    pub fn database_timeout(&self) -> Duration {
        self.bounded_timeout(self.database.timeout)
    }

    /// Whether a configured timeout had to be shortened to fit the cycle.
    pub fn timeouts_clamped(&self) -> bool {
        let limit = self.timeout_limit();
        Duration::from_secs(self.broker.timeout) > limit || Duration::from_secs(self.database.timeout) > limit
    }

    // I/O must resolve before the next cycle is due
    fn timeout_limit(&self) -> Duration {
        self.refresh_interval().mul_f64(0.8)
    }

    fn bounded_timeout(&self, seconds: u64) -> Duration {
        Duration::from_secs(seconds).min(self.timeout_limit())
    }
}
