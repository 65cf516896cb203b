//! Scripted in-memory intensity source for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::services::source::{IntensitySource, SourceError, ZoneReading};

/// Replays queued responses in order, then falls back to a fixed reading.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<ZoneReading, SourceError>>>,
    fallback_intensity: f64,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback_intensity: 250.0,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn then(self, response: Result<ZoneReading, SourceError>) -> Self {
        self.script.lock().unwrap().push_back(response);
        self
    }

    pub fn then_transient(self, times: usize) -> Self {
        (0..times).fold(self, |source, i| {
            source.then(Err(SourceError::Transient {
                message: format!("connection reset #{}", i + 1),
                status: Some(503),
            }))
        })
    }

    pub fn with_fallback_intensity(mut self, value: f64) -> Self {
        self.fallback_intensity = value;
        self
    }

    /// Sleep before answering every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn reading(carbon_intensity: f64) -> ZoneReading {
    ZoneReading {
        carbon_intensity,
        fossil_fuel_percentage: Some(40.0),
        renewable_percentage: Some(55.0),
    }
}

#[async_trait]
impl IntensitySource for ScriptedSource {
    async fn fetch_zone(&self, _zone: &str) -> Result<ZoneReading, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(reading(self.fallback_intensity)))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
