//! Engine configuration
//!
//! Every field has a default, so a TOML file only needs the values it changes:
//!
//! ```toml
//! worker_threads = 8
//! max_attempts = 20
//! idle_delay_ms = 10
//! ```

use crate::error::{EngineError, Result};
use crate::retry::RetryPolicy;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Worker pool and retry configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Number of worker threads (and scan partitions)
    pub worker_threads: usize,
    /// Attempts per work item before it is reported as exhausted
    pub max_attempts: u32,
    /// Backoff after the first failed attempt
    pub initial_backoff_ms: u64,
    /// Upper bound on any single backoff
    pub max_backoff_ms: u64,
    /// Growth factor between consecutive backoffs
    pub backoff_multiplier: f64,
    /// Sleep between passes that found nothing to do
    pub idle_delay_ms: u64,
    /// Notification entries fetched per scan batch
    pub scan_batch_size: usize,
    /// Safety bound for `run_until_idle`
    pub max_idle_passes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: 4,
            max_attempts: 10,
            initial_backoff_ms: 1,
            max_backoff_ms: 100,
            backoff_multiplier: 2.0,
            idle_delay_ms: 50,
            scan_batch_size: 256,
            max_idle_passes: 1000,
        }
    }
}

impl EngineConfig {
    /// Small, fast settings for tests
    pub fn testing() -> Self {
        Self {
            worker_threads: 2,
            max_attempts: 5,
            initial_backoff_ms: 0,
            max_backoff_ms: 1,
            backoff_multiplier: 2.0,
            idle_delay_ms: 1,
            scan_batch_size: 16,
            max_idle_passes: 100,
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(s).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Reject settings the worker pool cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.worker_threads == 0 {
            return Err(EngineError::Config("worker_threads must be at least 1".into()));
        }
        if self.max_attempts == 0 {
            return Err(EngineError::Config("max_attempts must be at least 1".into()));
        }
        if self.scan_batch_size == 0 {
            return Err(EngineError::Config("scan_batch_size must be at least 1".into()));
        }
        if self.max_idle_passes == 0 {
            return Err(EngineError::Config("max_idle_passes must be at least 1".into()));
        }
        if self.backoff_multiplier.is_nan() || self.backoff_multiplier < 1.0 {
            return Err(EngineError::Config(format!(
                "backoff_multiplier must be >= 1.0, got {}",
                self.backoff_multiplier
            )));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(EngineError::Config(format!(
                "initial_backoff_ms ({}) exceeds max_backoff_ms ({})",
                self.initial_backoff_ms, self.max_backoff_ms
            )));
        }
        Ok(())
    }

    /// Set the number of worker threads
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    /// Set the attempt ceiling per work item
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set initial and maximum backoff
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff_ms = initial.as_millis() as u64;
        self.max_backoff_ms = max.as_millis() as u64;
        self
    }

    /// Set the idle delay between empty passes
    pub fn with_idle_delay(mut self, delay: Duration) -> Self {
        self.idle_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set the scan batch size
    pub fn with_scan_batch_size(mut self, size: usize) -> Self {
        self.scan_batch_size = size;
        self
    }

    /// Set the pass bound for `run_until_idle`
    pub fn with_max_idle_passes(mut self, passes: usize) -> Self {
        self.max_idle_passes = passes;
        self
    }

    /// Idle delay as a [`Duration`]
    pub fn idle_delay(&self) -> Duration {
        Duration::from_millis(self.idle_delay_ms)
    }

    /// Retry policy described by this configuration
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            multiplier: self.backoff_multiplier,
        }
    }
}
