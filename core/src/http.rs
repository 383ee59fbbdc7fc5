//! HTTP request and response types, and the pure request builder.
//!
//! # Design
//! Requests are described as plain data before they touch the network.
//! [`build_get_request`] composes the URL and headers from credentials and
//! the current session cookie without any I/O, so the header rules can be
//! tested in isolation. The client turns an [`HttpRequest`] into a transport
//! call and hands back an [`HttpResponse`] for classification.

use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::Result;
use crate::session::SessionCookie;

/// HTTP method for a request. The polling client only ever reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// Returns the first header value with the given (lowercase) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Status line text, e.g. `204 No Content`.
    pub status_text: String,
    pub body: Vec<u8>,
}

/// Basic-auth credentials. Either half may be empty, in which case no
/// `Authorization` header is sent.
#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Clone for Credentials {
    fn clone(&self) -> Self {
        Self::new(self.username.clone(), self.password.expose_secret())
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self::new("", "")
    }

    /// Basic auth is only sent when both username and password are set.
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.expose_secret().is_empty()
    }

    fn basic_header(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password.expose_secret());
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(raw)
        )
    }
}

/// Build a GET request for `url`.
///
/// Adds `authorization` when `credentials` are complete, `cookie` when a
/// session is present, and always `accept: application/json`. Fails only if
/// `url` does not parse.
pub fn build_get_request(
    url: &str,
    credentials: &Credentials,
    session: Option<&SessionCookie>,
) -> Result<HttpRequest> {
    let url = Url::parse(url)?;
    let mut headers = Vec::with_capacity(3);
    if credentials.is_complete() {
        headers.push(("authorization".to_string(), credentials.basic_header()));
    }
    if let Some(cookie) = session {
        headers.push(("cookie".to_string(), cookie.header_value()));
    }
    headers.push(("accept".to_string(), "application/json".to_string()));

    Ok(HttpRequest {
        method: HttpMethod::Get,
        url,
        headers,
    })
}
