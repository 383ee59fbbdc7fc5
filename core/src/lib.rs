//! Polling client core for the Confluence REST API.
//!
//! # Overview
//! Fetches collection endpoints from a session-cookie protected server and
//! turns the decoded entities into records for a metrics sink.
//!
//! # Design
//! - `ConfluenceClient` owns its session cookie and concurrency gate; each
//!   instance is independent.
//! - Requests are built as plain data (`build_get_request`) before they hit
//!   the transport, and responses are classified by a pure function
//!   (`classify`), so both are testable without a server.
//! - Transport and decode failures are surfaced unchanged; only HTTP status
//!   outcomes become `ApiError`.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod gate;
pub mod gather;
pub mod http;
pub mod session;
pub mod sink;
pub mod types;

pub use client::{classify, ConfluenceClient, SPACE_PATH};
pub use config::{ClientConfig, TlsConfig};
pub use error::{ApiError, Error, Result};
pub use gate::{ConcurrencyGate, GatePermit, DEFAULT_MAX_CONNECTIONS};
pub use gather::{space_fields, SpaceGatherer, MEASUREMENT_SPACE};
pub use http::{build_get_request, Credentials, HttpMethod, HttpRequest, HttpResponse};
pub use session::{SessionCookie, SessionStore};
pub use sink::{CollectingSink, FieldValue, Fields, MetricSink, Record, Tags};
pub use types::{CollectionResponse, Space, SpaceExpandable, SpaceLinks, SpaceResponse};

pub use tokio_util::sync::CancellationToken;
