//! # Configuration
//!
//! Runtime configuration for the generation pipeline. Every section has
//! defaults, so an absent file or an empty document yields a working setup.
//!
//! ```rust,no_run
//! use prototyper_core::config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::load()?;
//! println!("max concurrency: {}", config.scheduler.max_concurrency);
//! # Ok(())
//! # }
//! ```

pub mod loader;

use crate::error::{PrototyperError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub use loader::{detect_environment, ConfigLoader};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrototyperConfig {
    pub scheduler: SchedulerConfig,
    pub events: EventConfig,
    pub executor: ExecutorConfig,
}

impl PrototyperConfig {
    pub fn validate(&self) -> Result<()> {
        self.scheduler.validate()?;
        if self.events.channel_capacity == 0 {
            return Err(PrototyperError::Configuration(
                "events.channel_capacity must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.executor.simulated_confidence) {
            return Err(PrototyperError::Configuration(format!(
                "executor.simulated_confidence must be within 0.0..=1.0, got {}",
                self.executor.simulated_confidence
            )));
        }
        Ok(())
    }
}

/// What happens to a task whose dependency failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyFailurePolicy {
    /// Dependents are settled as failed without running.
    #[default]
    Skip,
    /// Dependents run once every dependency has settled, successfully or not.
    Proceed,
}

impl fmt::Display for DependencyFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Proceed => write!(f, "proceed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Hard cap on simultaneously in-flight executor calls.
    pub max_concurrency: usize,
    /// Per-attempt executor timeout.
    pub timeout_ms: u64,
    /// Extra attempts after the first for retryable failures.
    pub retry_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub dependency_failure_policy: DependencyFailurePolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 3,
            timeout_ms: 30_000,
            retry_attempts: 2,
            retry_base_delay_ms: 100,
            dependency_failure_policy: DependencyFailurePolicy::Skip,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(PrototyperError::Configuration(
                "scheduler.max_concurrency must be greater than 0".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(PrototyperError::Configuration(
                "scheduler.timeout_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Delay before retry number `attempt` (1-based), doubling each time.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.retry_base_delay_ms.saturating_mul(factor))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    pub channel_capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub simulated_latency_ms: u64,
    pub simulated_confidence: f64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            simulated_latency_ms: 25,
            simulated_confidence: 0.85,
        }
    }
}
