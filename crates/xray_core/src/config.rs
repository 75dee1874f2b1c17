use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::http::HttpInference;
use crate::inference::{InferenceError, InferenceService};
use crate::mock::{DEFAULT_MOCK_DELAY, MockInference};

/// Environment variable that points the app at a real backend.
pub const BACKEND_URL_ENV: &str = "XRAY_BACKEND_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("timeout_ms must be greater than zero")]
    ZeroTimeout,
    #[error("Cannot build inference service: {0}")]
    Service(#[from] InferenceError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Mock,
    Http,
}

/// Settings for the inference service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub backend: Backend,
    pub mock_delay_ms: u64,
    /// Fixed seed for reproducible mock results.
    pub seed: Option<u64>,
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Mock,
            mock_delay_ms: DEFAULT_MOCK_DELAY.as_millis() as u64,
            seed: None,
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub inference: InferenceConfig,
}

impl AppConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// A non-empty backend URL switches to the HTTP backend.
    pub fn with_backend_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.inference.backend = Backend::Http;
            self.inference.base_url = url.trim().to_string();
        }
        self
    }

    pub fn build_service(&self) -> Result<Arc<dyn InferenceService>, ConfigError> {
        let cfg = &self.inference;
        let service: Arc<dyn InferenceService> = match cfg.backend {
            Backend::Mock => {
                let delay = Duration::from_millis(cfg.mock_delay_ms);
                match cfg.seed {
                    Some(seed) => Arc::new(MockInference::with_seed(delay, seed)),
                    None => Arc::new(MockInference::new(delay)),
                }
            }
            Backend::Http => {
                // A zero timeout makes every request fail immediately.
                if cfg.timeout_ms == 0 {
                    return Err(ConfigError::ZeroTimeout);
                }
                Arc::new(HttpInference::new(
                    cfg.base_url.clone(),
                    Duration::from_millis(cfg.timeout_ms),
                )?)
            }
        };
        tracing::info!("using {} inference backend", service.name());
        Ok(service)
    }
}
