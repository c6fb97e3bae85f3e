use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use conflict_map_shared::{Dataset, FeatureCollection};

/// Why a single dataset fetch produced no usable collection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("fetch error: {0}")]
    Network(String),
    #[error("HTTP {status}")]
    Http { status: u16 },
    #[error("parse error: {0}")]
    Parse(String),
}

/// Where dataset collections come from.
///
/// Futures are not required to be `Send`: every fetch runs on the viewer's
/// single thread.
pub trait DatasetSource {
    fn fetch<P>(
        &self,
        dataset: Dataset,
        params: &[(&'static str, String)],
    ) -> impl Future<Output = Result<FeatureCollection<P>, FetchError>>
    where
        P: DeserializeOwned + Default;
}

/// Fetches collections from the conflict API over HTTP.
#[derive(Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base: String,
}

impl HttpSource {
    pub fn new(
        base: &str,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("conflict-map/", env!("CARGO_PKG_VERSION")))
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .or_else(|e| {
                warn!(
                    error = %e,
                    "failed to build configured HTTP client, retrying without custom user-agent"
                );
                reqwest::Client::builder()
                    .timeout(request_timeout)
                    .connect_timeout(connect_timeout)
                    .build()
            })
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self::with_client(client, base))
    }

    pub fn with_client(client: reqwest::Client, base: &str) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(
        &self,
        dataset: Dataset,
        params: &[(&'static str, String)],
    ) -> Result<reqwest::Url, FetchError> {
        let mut url = reqwest::Url::parse(&format!("{}{}", self.base, dataset.path()))
            .map_err(|e| FetchError::Network(format!("invalid url: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

impl DatasetSource for HttpSource {
    async fn fetch<P>(
        &self,
        dataset: Dataset,
        params: &[(&'static str, String)],
    ) -> Result<FeatureCollection<P>, FetchError>
    where
        P: DeserializeOwned + Default,
    {
        let url = self.url_for(dataset, params)?;
        debug!(%dataset, %url, "fetching dataset");

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        serde_json::from_slice::<FeatureCollection<P>>(&body)
            .map_err(|e| FetchError::Parse(e.to_string()))
    }
}
