//! HTTP client for the remote content service.

use super::{ItemsResponse, Meta, RemoteSource};
use crate::error::{Error, ErrorKind, Result};
use crate::{Collection, ItemQuery};
use async_trait::async_trait;
use exn::ResultExt;
use serde::Deserialize;
use serde_json::Value as Json;
use std::time::Duration;
use url::Url;

/// Remote source backed by the content service's REST API.
///
/// Listings are requested as `GET {base}/items/{collection}` with a bearer
/// token. Each request is bounded by the configured timeout; nothing is
/// retried.
#[derive(Clone)]
pub struct HttpRemote {
    name: String,
    base: Url,
    access_token: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Json,
    #[serde(default)]
    meta: Option<Meta>,
}

impl HttpRemote {
    pub fn new(base: Url, access_token: impl Into<String>, timeout: Duration) -> Result<Self> {
        if base.cannot_be_a_base() {
            exn::bail!(ErrorKind::InvalidConfig(format!("{base} cannot be used as a base URL")));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .or_raise(|| ErrorKind::InvalidConfig("HTTP client".to_string()))?;
        Ok(Self {
            name: base.host_str().unwrap_or("remote").to_string(),
            base,
            access_token: access_token.into(),
            client,
        })
    }

    fn items_url(&self, collection: Collection) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| Error::from(ErrorKind::InvalidConfig(format!("{} cannot be used as a base URL", self.base))))?
            .pop_if_empty()
            .extend(["items", collection.as_str()]);
        Ok(url)
    }
}

/// Singletons answer with an object; everything else with an array.
fn records(data: Json) -> Result<Vec<Json>> {
    match data {
        Json::Array(records) => Ok(records),
        Json::Object(_) => Ok(vec![data]),
        Json::Null => Ok(Vec::new()),
        other => exn::bail!(ErrorKind::InvalidResponse(format!("unexpected data: {other}"))),
    }
}

#[async_trait]
impl RemoteSource for HttpRemote {
    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(level = "debug", skip(self, query), fields(remote = %self.name))]
    async fn fetch(&self, collection: Collection, query: &ItemQuery) -> Result<ItemsResponse> {
        let url = self.items_url(collection)?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(&query.params())
            .send()
            .await
            .or_raise(|| ErrorKind::Network(format!("GET items/{collection}")))?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%collection, status = status.as_u16(), "Remote refused listing");
            exn::bail!(ErrorKind::Status(status.as_u16()));
        }
        let envelope: Envelope =
            response.json().await.or_raise(|| ErrorKind::InvalidResponse(format!("items/{collection}")))?;
        let data = records(envelope.data)?;
        tracing::debug!(%collection, records = data.len(), "Fetched remote records");
        Ok(ItemsResponse { data, meta: envelope.meta })
    }
}
