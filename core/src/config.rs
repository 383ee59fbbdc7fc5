//! Client configuration.
//!
//! ```toml
//! url = "https://confluence.example.org"
//! # username = "admin"
//! # password = "admin"
//! http_timeout = "5s"
//! # max_connections = 5
//!
//! ## Optional TLS config
//! # tls_ca = "/etc/confluence/ca.pem"
//! # tls_cert = "/etc/confluence/cert.pem"
//! # tls_key = "/etc/confluence/key.pem"
//! # insecure_skip_verify = false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::gate::DEFAULT_MAX_CONNECTIONS;
use crate::http::Credentials;

/// Default transport timeout (one hour).
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Accepts duration strings such as `"500ms"`, `"5s"` or `"1m"`. Zero
    /// falls back to [`DEFAULT_HTTP_TIMEOUT`].
    #[serde(default = "default_http_timeout", with = "humantime_serde")]
    pub http_timeout: Duration,
    /// Values of zero or below fall back to [`DEFAULT_MAX_CONNECTIONS`].
    #[serde(default = "default_max_connections")]
    pub max_connections: i64,
    #[serde(flatten)]
    pub tls: TlsConfig,
}

fn default_http_timeout() -> Duration {
    DEFAULT_HTTP_TIMEOUT
}

fn default_max_connections() -> i64 {
    DEFAULT_MAX_CONNECTIONS as i64
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: String::new(),
            password: String::new(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            max_connections: default_max_connections(),
            tls: TlsConfig::default(),
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.username = username.to_string();
        self.password = password.to_string();
        self
    }

    pub fn with_max_connections(mut self, max_connections: i64) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = tls;
        self
    }

    pub fn effective_max_connections(&self) -> usize {
        if self.max_connections <= 0 {
            DEFAULT_MAX_CONNECTIONS
        } else {
            self.max_connections as usize
        }
    }

    pub fn http_timeout(&self) -> Duration {
        if self.http_timeout.is_zero() {
            DEFAULT_HTTP_TIMEOUT
        } else {
            self.http_timeout
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.as_str(), self.password.as_str())
    }
}

/// TLS settings for the transport. All optional; the default trusts the
/// built-in roots and presents no client certificate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TlsConfig {
    /// Extra PEM root certificate to trust.
    #[serde(default)]
    pub tls_ca: Option<PathBuf>,
    /// PEM client certificate; requires `tls_key`.
    #[serde(default)]
    pub tls_cert: Option<PathBuf>,
    #[serde(default)]
    pub tls_key: Option<PathBuf>,
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

impl TlsConfig {
    /// Load the configured files into `builder`.
    pub fn apply(&self, mut builder: reqwest::ClientBuilder) -> Result<reqwest::ClientBuilder> {
        if self.insecure_skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(ca) = &self.tls_ca {
            let cert = reqwest::Certificate::from_pem(&read_pem(ca)?).map_err(Error::Client)?;
            builder = builder.add_root_certificate(cert);
        }

        match (&self.tls_cert, &self.tls_key) {
            (Some(cert), Some(key)) => {
                let mut pem = read_pem(cert)?;
                pem.push(b'\n');
                pem.extend(read_pem(key)?);
                let identity = reqwest::Identity::from_pem(&pem).map_err(Error::Client)?;
                builder = builder.identity(identity);
            }
            (None, None) => {}
            _ => {
                return Err(Error::Tls(
                    "tls_cert and tls_key must be set together".to_string(),
                ))
            }
        }
        Ok(builder)
    }
}

fn read_pem(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| Error::TlsFile {
        path: path.to_path_buf(),
        source,
    })
}
