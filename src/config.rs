//! Configuration management for the Document Analyzer

use serde::Deserialize;
use std::env;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub session: SessionConfig,
    pub preview: PreviewConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Maximum multipart body size in megabytes
    pub max_upload_mb: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Minutes of inactivity before a session and its results are dropped
    pub idle_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewConfig {
    /// Bounding box (pixels) for image detail thumbnails
    pub max_px: u32,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8501,
            },
            upload: UploadConfig { max_upload_mb: 200 },
            session: SessionConfig { idle_minutes: 60 },
            preview: PreviewConfig { max_px: 300 },
        }
    }
}

impl UploadConfig {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port)?,
            },
            upload: UploadConfig {
                max_upload_mb: parse_var("MAX_UPLOAD_MB", defaults.upload.max_upload_mb)?,
            },
            session: SessionConfig {
                idle_minutes: positive(
                    "SESSION_IDLE_MINUTES",
                    parse_var("SESSION_IDLE_MINUTES", defaults.session.idle_minutes)?,
                )?,
            },
            preview: PreviewConfig {
                max_px: positive("PREVIEW_MAX_PX", parse_var("PREVIEW_MAX_PX", defaults.preview.max_px)?)?,
            },
        })
    }
}

/// Read an environment variable, falling back to `default` when unset
fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(default),
    }
}

fn positive<T>(name: &'static str, value: T) -> Result<T, ConfigError>
where
    T: PartialOrd + Default + ToString,
{
    if value > T::default() {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            name,
            value: value.to_string(),
        })
    }
}
