//! Error types for the Confluence polling client.
//!
//! # Design
//! Non-success HTTP outcomes are described by [`ApiError`], which carries the
//! request URL and the status line. Everything the transport or the JSON
//! decoder reports is passed through untouched in its own variant so callers
//! can tell a refused connection from a malformed body from a 401.

use std::fmt;
use std::path::PathBuf;

/// A non-success HTTP outcome from the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Path or URL of the request that failed.
    pub url: String,
    pub status: u16,
    /// Status line text, e.g. `401 Unauthorized`.
    pub title: String,
    pub description: Option<String>,
}

impl ApiError {
    pub fn new(url: impl Into<String>, status: u16, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            title: title.into(),
            description: None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) if !description.is_empty() => {
                write!(f, "[{}] {}: {description}", self.url, self.title)
            }
            _ => write!(f, "[{}] {}", self.url, self.title),
        }
    }
}

impl std::error::Error for ApiError {}

/// Errors returned by the client, the gather cycle, and configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server answered with a status the client does not accept.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Connection, timeout, or body read failure reported by the transport.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// The response body was not the JSON the caller asked for.
    #[error(transparent)]
    Decode(#[from] serde_json::Error),

    /// The caller's cancellation token fired.
    #[error("request cancelled")]
    Cancelled,

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP transport could not be constructed.
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid tls configuration: {0}")]
    Tls(String),

    #[error("failed to read {}: {source}", path.display())]
    TlsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error empty space name")]
    EmptySpaceName,
}

impl Error {
    /// Returns the [`ApiError`] if this is a classified HTTP failure.
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(api) => Some(api),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
