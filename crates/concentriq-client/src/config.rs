//! Secrets-file and environment configuration.
//!
//! Credentials live in a JSON secrets file, by default
//! `~/.secrets/concentriq.json`:
//!
//! ```json
//! {
//!     "api_url": "https://concentriq.example.com/",
//!     "user": "you@example.com",
//!     "password": "...",
//!     "ssl_certificate": "/path/to/internal-ca.pem"
//! }
//! ```
//!
//! Environment variables (`CONCENTRIQ_API_URL`, `CONCENTRIQ_USER`,
//! `CONCENTRIQ_PASSWORD`, `CONCENTRIQ_SSL_CERTIFICATE`) override the file,
//! so CI jobs can run without one.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ClientError;

/// Default location of the secrets file, `~` expanded at load time.
pub const DEFAULT_SECRETS_PATH: &str = "~/.secrets/concentriq.json";

const ENV_PREFIX: &str = "CONCENTRIQ";

/// Validated client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the platform API, with a trailing slash.
    pub api_url: String,
    /// Basic-auth user (the account's email address).
    pub user: String,
    /// Basic-auth password.
    pub password: String,
    /// Optional PEM file with an extra root certificate for on-premise
    /// deployments behind an internal CA.
    pub ssl_certificate: Option<PathBuf>,
}

/// The secrets file before validation; every member optional so the file and
/// the environment can each contribute a subset.
#[derive(Debug, Clone, Default, Deserialize)]
struct RawConfig {
    api_url: Option<String>,
    user: Option<String>,
    password: Option<String>,
    ssl_certificate: Option<PathBuf>,
}

impl RawConfig {
    /// Overlay environment variables onto the file contents.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup(&format!("{ENV_PREFIX}_API_URL")) {
            self.api_url = Some(v);
        }
        if let Some(v) = lookup(&format!("{ENV_PREFIX}_USER")) {
            self.user = Some(v);
        }
        if let Some(v) = lookup(&format!("{ENV_PREFIX}_PASSWORD")) {
            self.password = Some(v);
        }
        if let Some(v) = lookup(&format!("{ENV_PREFIX}_SSL_CERTIFICATE")) {
            self.ssl_certificate = Some(PathBuf::from(v));
        }
    }

    fn finalize(self) -> Result<ClientConfig, ClientError> {
        let api_url = self
            .api_url
            .ok_or_else(|| ClientError::Config("missing key in config: 'api_url'".to_owned()))?;
        if !api_url.starts_with("http") {
            return Err(ClientError::Config(format!(
                "api_url must start with http..., got: {api_url:?}"
            )));
        }

        let user = self
            .user
            .ok_or_else(|| ClientError::Config("missing key in config: 'user'".to_owned()))?;
        if user.trim().is_empty() {
            return Err(ClientError::Config("user must be non-empty".to_owned()));
        }

        let password = self
            .password
            .ok_or_else(|| ClientError::Config("missing key in config: 'password'".to_owned()))?;
        if password.trim().is_empty() {
            return Err(ClientError::Config("password must be non-empty".to_owned()));
        }

        // The API client joins endpoints onto the base URL, which requires
        // the trailing slash.
        let api_url = if api_url.ends_with('/') {
            api_url
        } else {
            format!("{api_url}/")
        };

        Ok(ClientConfig {
            api_url,
            user,
            password,
            ssl_certificate: self.ssl_certificate,
        })
    }
}

impl ClientConfig {
    /// Load configuration from a secrets file plus environment overrides.
    ///
    /// A missing file is not an error as long as the environment supplies
    /// everything required.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] when a required member is missing or
    /// invalid, [`ClientError::Io`]/[`ClientError::Json`] when the file
    /// exists but cannot be read or parsed.
    pub fn from_secrets_file(path: Option<&Path>) -> Result<Self, ClientError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => expand_tilde(DEFAULT_SECRETS_PATH),
        };

        let mut raw = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str::<RawConfig>(&contents)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => RawConfig::default(),
            Err(err) => return Err(err.into()),
        };
        raw.apply_env(|name| std::env::var(name).ok());
        raw.finalize()
    }

    /// Load configuration from environment variables alone.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] when a required variable is missing
    /// or invalid.
    pub fn from_env() -> Result<Self, ClientError> {
        let mut raw = RawConfig::default();
        raw.apply_env(|name| std::env::var(name).ok());
        raw.finalize()
    }
}

/// Expand a leading `~/` against `$HOME`.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}
