// Optimizer configuration

use crate::error::OptimizeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Largest source and target batch the duration service accepts per request
pub const MAX_CHUNK_SIZE: usize = 10;

/// Exchange rates up to this value break combined-cost ties by price,
/// larger ones by duration
pub const PRICE_TIE_BREAK_EXCHANGE_LIMIT: i64 = 2000;

/// How the shopper moves between locations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    #[default]
    Walking,
    Driving,
    Taxi,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportMode::Walking => "walking",
            TransportMode::Driving => "driving",
            TransportMode::Taxi => "taxi",
        };
        f.write_str(name)
    }
}

/// Settings of one optimizer instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub transport: TransportMode,

    /// Sources and targets per duration request, at most [`MAX_CHUNK_SIZE`]
    pub chunk_size: usize,

    /// Timeout handed to every external call, in seconds
    pub request_timeout_secs: u64,

    /// Duration requests allowed in flight at once
    pub max_concurrent_requests: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            transport: TransportMode::Walking,
            chunk_size: MAX_CHUNK_SIZE,
            request_timeout_secs: 30,
            max_concurrent_requests: 4,
        }
    }
}

impl OptimizerConfig {
    /// Loads a configuration from a JSON file; missing fields take defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, OptimizeError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            OptimizeError::InvalidInput(format!("cannot read config {}: {e}", path.display()))
        })?;
        let config: OptimizerConfig = serde_json::from_str(&text).map_err(|e| {
            OptimizeError::InvalidInput(format!("cannot parse config {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), OptimizeError> {
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(OptimizeError::InvalidInput(format!(
                "chunk_size must be within 1..={MAX_CHUNK_SIZE}, got {}",
                self.chunk_size
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(OptimizeError::InvalidInput(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.max_concurrent_requests == 0 {
            return Err(OptimizeError::InvalidInput(
                "max_concurrent_requests must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
