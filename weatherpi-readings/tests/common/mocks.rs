use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use weatherpi_readings::clock::Timer;
use weatherpi_readings::configs::{StoreConnection, StoreConnector};
use weatherpi_readings::errors::{PublishError, SensorError, SinkError};
use weatherpi_readings::models::{ConnectionState, RawSample};
use weatherpi_readings::sensors::SensorSource;
use weatherpi_readings::transport::Publisher;

pub fn sample(temperature: f64, pressure: f64, humidity: f64, light_channel: f64) -> RawSample {
    RawSample {
        temperature,
        pressure,
        humidity,
        light_channel,
    }
}

pub fn reference_sample() -> RawSample {
    sample(20.0, 1013.0, 50.0, 16383.75)
}

pub fn artifact_sample() -> RawSample {
    sample(22.0, 684.3, 82.3, 0.0)
}

pub enum Step {
    Sample(RawSample),
    Fail,
    Panic,
}

/// Replays scripted steps, then repeats the reference sample.
#[derive(Clone, Default)]
pub struct MockSensor {
    steps: Arc<Mutex<VecDeque<Step>>>,
    pub reads: Arc<AtomicUsize>,
}

impl MockSensor {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(steps.into())),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SensorSource for MockSensor {
    async fn read(&mut self) -> Result<RawSample, SensorError> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Sample(sample)) => Ok(sample),
            Some(Step::Fail) => Err(SensorError::Bus(String::from("i2c timeout"))),
            Some(Step::Panic) => panic!("sensor driver exploded"),
            None => Ok(reference_sample()),
        }
    }
}

#[derive(Clone)]
pub struct MockPublisher {
    name: String,
    fail: bool,
    pub sent: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    pub reconnects: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
}

impl MockPublisher {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fail: false,
            sent: Arc::new(Mutex::new(Vec::new())),
            reconnects: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(name)
        }
    }

    pub fn sent(&self) -> Vec<(String, Vec<u8>)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn reconnects(&self) -> usize {
        self.reconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> ConnectionState {
        if self.fail {
            ConnectionState::Disconnected
        } else {
            ConnectionState::Connected
        }
    }

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        if self.fail {
            return Err(PublishError::Timeout(self.name.clone()));
        }

        self.sent.lock().unwrap().push((topic.to_string(), payload.to_vec()));
        Ok(())
    }

    async fn reconnect(&mut self) -> Result<(), PublishError> {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
        Err(PublishError::NotConnected(self.name.clone()))
    }

    async fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Connector whose connections are always refused.
pub struct RefusingConnector {
    pub attempts: Arc<AtomicUsize>,
}

impl RefusingConnector {
    pub fn new() -> Self {
        Self {
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl StoreConnector for RefusingConnector {
    async fn connect(&self) -> Result<Box<dyn StoreConnection>, SinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(SinkError::Timeout { operation: "connect" })
    }
}

/// Records requested sleeps and returns immediately.
#[derive(Clone, Default)]
pub struct FakeTimer {
    pub slept: Arc<Mutex<Vec<Duration>>>,
    stop: Option<(usize, Arc<watch::Sender<bool>>)>,
}

impl FakeTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown once `sleeps` sleeps have been recorded.
    pub fn stopping_after(sleeps: usize, shutdown: watch::Sender<bool>) -> Self {
        Self {
            slept: Arc::new(Mutex::new(Vec::new())),
            stop: Some((sleeps, Arc::new(shutdown))),
        }
    }

    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

#[async_trait]
impl Timer for FakeTimer {
    async fn sleep(&mut self, duration: Duration) {
        let count = {
            let mut slept = self.slept.lock().unwrap();
            slept.push(duration);
            slept.len()
        };

        if let Some((sleeps, shutdown)) = &self.stop {
            if count >= *sleeps {
                let _ = shutdown.send(true);
            }
        }
    }
}
