//! One gather cycle: lazily set up the client, fetch spaces, emit records.

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::{Host, Url};

use crate::client::ConfluenceClient;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::sink::{FieldValue, Fields, MetricSink, Tags};
use crate::types::Space;

pub const MEASUREMENT_SPACE: &str = "confluence_space";

#[derive(Debug)]
pub struct SpaceGatherer {
    config: ClientConfig,
    client: Option<ConfluenceClient>,
}

impl SpaceGatherer {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            client: None,
        }
    }

    /// The client from a previous successful initialization, if any.
    pub fn client(&self) -> Option<&ConfluenceClient> {
        self.client.as_ref()
    }

    /// Run one cycle.
    ///
    /// The first call builds and initializes a client; if that fails the
    /// error is returned and the next call starts over. Later calls reuse the
    /// client and its session. Fetch and per-space failures go to `sink` and
    /// do not fail the cycle.
    #[instrument(skip_all, fields(url = %self.config.url))]
    pub async fn gather(&mut self, sink: &dyn MetricSink, cancel: &CancellationToken) -> Result<()> {
        let client = match self.client.take() {
            Some(client) => client,
            None => {
                let client = ConfluenceClient::new(&self.config)?;
                client.initialize(cancel).await?;
                client
            }
        };
        let client = self.client.insert(client);

        let spaces = match client.fetch_spaces(cancel).await {
            Ok(spaces) => spaces,
            Err(err) => {
                sink.report_error(err);
                return Ok(());
            }
        };

        debug!(count = spaces.results.len(), "fetched spaces");
        for space in &spaces.results {
            match space_fields(space, &self.config.url) {
                Ok((fields, tags)) => sink.report_fields(MEASUREMENT_SPACE, fields, tags),
                Err(err) => sink.report_error(err),
            }
        }
        Ok(())
    }
}

/// Fields and tags for one space record.
pub fn space_fields(space: &Space, base_url: &str) -> Result<(Fields, Tags)> {
    if space.name.is_empty() {
        return Err(Error::EmptySpaceName);
    }

    let url = Url::parse(base_url)?;
    let mut tags = Tags::new();
    let source = match url.host() {
        // `[::1]` is tagged as `::1`
        Some(Host::Ipv6(addr)) => addr.to_string(),
        Some(host) => host.to_string(),
        None => String::new(),
    };
    tags.insert("source".to_string(), source);
    tags.insert(
        "port".to_string(),
        url.port().map(|p| p.to_string()).unwrap_or_default(),
    );

    let mut fields = Fields::new();
    fields.insert("id".to_string(), FieldValue::Int(space.id));
    fields.insert("key".to_string(), space.key.as_str().into());
    fields.insert("name".to_string(), space.name.as_str().into());
    fields.insert("type".to_string(), space.kind.as_str().into());
    fields.insert("webui".to_string(), space.links.webui.as_str().into());
    fields.insert("self".to_string(), space.links.self_link.as_str().into());

    Ok((fields, tags))
}
