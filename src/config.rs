use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{EnvelopeError, Result};
use crate::services::framing::{EnvelopeFramer, DEFAULT_MAX_FRAME_SIZE};

pub const DEFAULT_LOG_FILTER: &str = "info,aea_envelope=info";
pub const MAX_FRAME_SIZE_ENV: &str = "AEA_ENVELOPE_MAX_FRAME_SIZE";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    pub max_frame_size: Option<usize>,
    pub log_filter: Option<String>,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| EnvelopeError::Config(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| EnvelopeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `AEA_ENVELOPE_MAX_FRAME_SIZE` on top of the loaded values.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(raw) = std::env::var(MAX_FRAME_SIZE_ENV) {
            let size = raw.trim().parse::<usize>().map_err(|e| {
                EnvelopeError::Config(format!("{MAX_FRAME_SIZE_ENV}={raw}: {e}"))
            })?;
            self.max_frame_size = Some(size);
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.max_frame_size == Some(0) {
            return Err(EnvelopeError::Config(
                "max_frame_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size.unwrap_or(DEFAULT_MAX_FRAME_SIZE)
    }

    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    pub fn framer(&self) -> EnvelopeFramer {
        EnvelopeFramer::new(self.max_frame_size())
    }
}
