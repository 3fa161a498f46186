use std::{env, fmt::Display, str::FromStr, time::Duration};

use thiserror::Error;
use tracing::{info, warn};

const MIB: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendMode {
    Remote { url: String, service_key: String },
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub jwt_secret: String,
    pub session_audience: String,
    pub auth_redirect: String,
    pub backend: BackendMode,
    pub public_base_url: String,
    pub post_image_max_bytes: usize,
    pub avatar_max_bytes: usize,
    pub write_rate_per_second: u32,
    pub backend_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = try_load("PORT", "3000")?;
        let jwt_secret = var("SESSION_JWT_SECRET").ok_or(ConfigError::Missing("SESSION_JWT_SECRET"))?;

        let backend = match (var("BACKEND_URL"), var("BACKEND_SERVICE_KEY")) {
            (Some(url), Some(service_key)) => BackendMode::Remote { url, service_key },
            (Some(_), None) => return Err(ConfigError::Missing("BACKEND_SERVICE_KEY")),
            (None, _) => {
                warn!("BACKEND_URL not set, serving from the in-process backend");
                BackendMode::Memory
            }
        };

        let public_base_url =
            var("PUBLIC_BASE_URL").unwrap_or_else(|| format!("http://localhost:{port}"));

        Ok(Self {
            port,
            jwt_secret,
            session_audience: try_load("SESSION_AUDIENCE", "authenticated")?,
            auth_redirect: try_load("AUTH_REDIRECT_PATH", "/auth")?,
            backend,
            public_base_url,
            post_image_max_bytes: try_load("POST_IMAGE_MAX_BYTES", &(5 * MIB).to_string())?,
            avatar_max_bytes: try_load("AVATAR_MAX_BYTES", &(2 * MIB).to_string())?,
            write_rate_per_second: try_load("WRITE_RATE_PER_SECOND", "10")?,
            backend_timeout: Duration::from_secs(try_load("BACKEND_TIMEOUT_SECS", "10")?),
        })
    }

    /// Configuration for tests and local runs against the in-process backend.
    pub fn local(jwt_secret: impl Into<String>) -> Self {
        Self {
            port: 3000,
            jwt_secret: jwt_secret.into(),
            session_audience: "authenticated".into(),
            auth_redirect: "/auth".into(),
            backend: BackendMode::Memory,
            public_base_url: "http://localhost:3000".into(),
            post_image_max_bytes: 5 * MIB,
            avatar_max_bytes: 2 * MIB,
            write_rate_per_second: 10,
            backend_timeout: Duration::from_secs(10),
        }
    }

    /// Largest request body accepted; uploads get room for multipart framing.
    pub fn body_limit(&self) -> usize {
        self.post_image_max_bytes.max(self.avatar_max_bytes) + 64 * 1024
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    parse(key, &raw)
}

fn parse<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}
