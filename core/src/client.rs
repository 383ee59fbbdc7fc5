//! Authenticated, concurrency-bounded REST client for Confluence.
//!
//! # Design
//! `ConfluenceClient` owns everything a fetch touches: the base URL, the
//! credentials, one `reqwest::Client`, the [`ConcurrencyGate`] and the
//! [`SessionStore`]. None of it is shared between client instances.
//!
//! A fetch builds its request against the current session cookie, waits for
//! a gate slot, performs the round-trip, gives the slot back, then
//! classifies the response. A 401 clears the session as a side effect; the
//! triggering request is not retried.

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{ApiError, Error, Result};
use crate::gate::ConcurrencyGate;
use crate::http::{build_get_request, Credentials, HttpMethod, HttpRequest, HttpResponse};
use crate::session::{find_session_cookie, SessionCookie, SessionStore};
use crate::types::{CollectionResponse, SpaceResponse};

pub const SPACE_PATH: &str = "/rest/api/space";

#[derive(Debug)]
pub struct ConfluenceClient {
    base_url: String,
    http: reqwest::Client,
    credentials: Credentials,
    gate: ConcurrencyGate,
    session: SessionStore,
}

impl ConfluenceClient {
    /// Build a client with its own transport, sized, timed and TLS-configured
    /// from `config`.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let builder = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .pool_max_idle_per_host(config.effective_max_connections());
        let http = config.tls.apply(builder)?.build().map_err(Error::Client)?;
        Ok(Self::with_http_client(http, config))
    }

    /// Build a client around an existing transport.
    pub fn with_http_client(http: reqwest::Client, config: &ClientConfig) -> Self {
        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            http,
            credentials: config.credentials(),
            gate: ConcurrencyGate::new(config.effective_max_connections()),
            session: SessionStore::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    pub fn session_cookie(&self) -> Option<SessionCookie> {
        self.session.get()
    }

    /// Acquire a session cookie from the base URL, then fetch the space
    /// collection once to check connectivity and credentials.
    ///
    /// A missing session cookie is not an error. Any failure of the warm-up
    /// fetch is returned. Nothing is retried.
    #[instrument(skip(self, cancel), fields(base_url = %self.base_url))]
    pub async fn initialize(&self, cancel: &CancellationToken) -> Result<()> {
        let request = build_get_request(&self.base_url, &self.credentials, None)?;
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            response = self.send(&request) => response?,
        };

        let cookies: Vec<(String, String)> = response
            .cookies()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();
        match find_session_cookie(cookies) {
            Some(cookie) => {
                debug!(name = %cookie.name, "session cookie acquired");
                self.session.set(Some(cookie));
            }
            None => debug!("no session cookie offered"),
        }

        self.get_json::<SpaceResponse>(cancel, SPACE_PATH).await?;
        Ok(())
    }

    pub async fn fetch_spaces(&self, cancel: &CancellationToken) -> Result<SpaceResponse> {
        self.fetch_collection(cancel, SPACE_PATH).await
    }

    pub async fn fetch_collection<T: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        path: &str,
    ) -> Result<CollectionResponse<T>> {
        self.get_json(cancel, path).await
    }

    /// GET `{base_url}{path}` through the gate and decode the JSON body.
    ///
    /// The gate slot is released before this returns on every path. If
    /// `cancel` fires while waiting for a slot, no request is sent.
    #[instrument(skip(self, cancel))]
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        path: &str,
    ) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        let session = self.session.get();
        let request = build_get_request(&url, &self.credentials, session.as_ref())?;

        let permit = self.gate.acquire(cancel).await?;
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            response = self.round_trip(&request) => response,
        };
        permit.release();
        let response = response?;

        if response.status == 401 {
            warn!(path, "unauthorized, clearing session");
            self.session.clear();
        }
        classify(path, &response)
    }

    async fn send(&self, request: &HttpRequest) -> Result<reqwest::Response> {
        let mut builder = match request.method {
            HttpMethod::Get => self.http.get(request.url.clone()),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        Ok(builder.send().await?)
    }

    async fn round_trip(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let response = self.send(request).await?;
        let status = response.status();
        let body = response.bytes().await?;
        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status_line(status),
            body: body.to_vec(),
        })
    }
}

/// Map a response to a decoded body or an [`ApiError`].
///
/// Anything outside 2xx is an error, and so is 204: collection endpoints
/// always return a body.
pub fn classify<T: DeserializeOwned>(path: &str, response: &HttpResponse) -> Result<T> {
    if !(200..300).contains(&response.status) || response.status == 204 {
        return Err(ApiError::new(path, response.status, response.status_text.as_str()).into());
    }
    Ok(serde_json::from_slice(&response.body)?)
}

fn status_line(status: reqwest::StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {reason}", status.as_str()),
        None => status.as_str().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TlsConfig;

    fn response(status: u16, text: &str, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            status_text: text.to_string(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn classify_decodes_success() {
        let resp = response(200, "200 OK", r#"{"results":[{"id":1,"key":"K","name":"N"}]}"#);
        let spaces: SpaceResponse = classify(SPACE_PATH, &resp).unwrap();
        assert_eq!(spaces.results.len(), 1);
        assert_eq!(spaces.results[0].key, "K");
    }

    #[test]
    fn classify_rejects_no_content() {
        let resp = response(204, "204 No Content", "");
        let err = classify::<SpaceResponse>(SPACE_PATH, &resp).unwrap_err();
        let api = err.as_api().unwrap();
        assert_eq!(api.status, 204);
        assert_eq!(api.url, SPACE_PATH);
        assert_eq!(api.title, "204 No Content");
    }

    #[test]
    fn classify_rejects_non_2xx() {
        for (status, text) in [(301, "301 Moved Permanently"), (401, "401 Unauthorized"), (503, "503 Service Unavailable")] {
            let err = classify::<SpaceResponse>(SPACE_PATH, &response(status, text, "{}")).unwrap_err();
            assert_eq!(err.as_api().unwrap().status, status);
        }
    }

    #[test]
    fn classify_passes_decode_errors_through() {
        let err = classify::<SpaceResponse>(SPACE_PATH, &response(200, "200 OK", "not json")).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn status_line_includes_reason() {
        assert_eq!(status_line(reqwest::StatusCode::UNAUTHORIZED), "401 Unauthorized");
        assert_eq!(
            status_line(reqwest::StatusCode::from_u16(599).unwrap()),
            "599"
        );
    }

    #[test]
    fn base_url_trailing_slash_is_stripped() {
        let config = ClientConfig::new("http://localhost:8090/");
        let client = ConfluenceClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8090");
        assert_eq!(client.gate().capacity(), 5);
        assert!(client.session_cookie().is_none());
    }

    #[test]
    fn unreadable_tls_ca_fails_construction() {
        let config = ClientConfig::new("https://wiki.example.org").with_tls(TlsConfig {
            tls_ca: Some("/nonexistent/confluence/ca.pem".into()),
            ..Default::default()
        });
        let err = ConfluenceClient::new(&config).unwrap_err();
        assert!(matches!(err, Error::TlsFile { .. }));
    }

    #[test]
    fn insecure_tls_client_builds() {
        let config = ClientConfig::new("https://wiki.example.org").with_tls(TlsConfig {
            insecure_skip_verify: true,
            ..Default::default()
        });
        assert!(ConfluenceClient::new(&config).is_ok());
    }

    #[tokio::test]
    async fn cancelled_fetch_sends_nothing() {
        // port 9 (discard) is never contacted: cancellation wins before the gate
        let config = ClientConfig::new("http://127.0.0.1:9");
        let client = ConfluenceClient::new(&config).unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let err = client.fetch_spaces(&token).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(client.gate().available(), 5);
    }

    #[tokio::test]
    async fn invalid_base_url_fails_before_the_gate() {
        let client = ConfluenceClient::new(&ClientConfig::new("not a url")).unwrap();
        let err = client
            .fetch_spaces(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
        assert_eq!(client.gate().available(), 5);
    }
}
