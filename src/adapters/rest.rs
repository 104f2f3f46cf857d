//! JSON over HTTP adapter
//!
//! Fetches a JSON list of items with one GET request. Bare host names are
//! expanded to the default service path `https://<host>/arex`; URLs with any
//! scheme other than http or https are not supported.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use tracing::{debug, warn};

use crate::config::UserConfig;
use crate::core::retrieval::{Discovered, EndpointQuerier, QueryOptions, QueryOutcome, QueryStatus};
use crate::domain::entities::Endpoint;
use crate::error::{GridError, Result};

pub struct RestQuerier<T> {
    name: String,
    interfaces: Vec<String>,
    client: Client,
    _kind: PhantomData<fn() -> T>,
}

impl<T> RestQuerier<T> {
    pub fn new(name: &str, interface: &str) -> Self {
        Self {
            name: name.to_string(),
            interfaces: vec![interface.to_string()],
            client: Client::new(),
            _kind: PhantomData,
        }
    }

    /// Maps an endpoint URL to the URL actually fetched
    pub fn normalize_url(url: &str) -> Option<String> {
        match url.split_once("://") {
            Some((scheme, _)) => {
                let scheme = scheme.to_lowercase();
                if scheme == "http" || scheme == "https" {
                    Some(url.to_string())
                } else {
                    None
                }
            }
            None if url.is_empty() => None,
            None => {
                let host = url.trim_end_matches('/');
                if host.contains('/') {
                    Some(format!("https://{}", host))
                } else {
                    Some(format!("https://{}/arex", host))
                }
            }
        }
    }
}

impl<T: DeserializeOwned> RestQuerier<T> {
    async fn fetch(&self, config: &UserConfig, url: &str) -> Result<Vec<T>> {
        let mut request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(config.timeout());
        if let Some(token) = &config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GridError::QueryFailed(format!(
                "{} answered with HTTP {}",
                url, status
            )));
        }
        Ok(response.json::<Vec<T>>().await?)
    }
}

#[async_trait]
impl<T> EndpointQuerier<T> for RestQuerier<T>
where
    T: DeserializeOwned + Discovered + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn supported_interfaces(&self) -> Vec<String> {
        self.interfaces.clone()
    }

    fn supports(&self, endpoint: &Endpoint) -> bool {
        Self::normalize_url(&endpoint.url).is_some()
    }

    async fn query(
        &self,
        config: &UserConfig,
        endpoint: &Endpoint,
        _options: &QueryOptions,
    ) -> QueryOutcome<T> {
        let Some(url) = Self::normalize_url(&endpoint.url) else {
            return (Vec::new(), QueryStatus::failed("Unsupported URL scheme"));
        };

        debug!(querier = %self.name, url = %url, "🌐 Fetching endpoint information");
        match self.fetch(config, &url).await {
            Ok(mut items) => {
                let mut origin = endpoint.clone();
                if origin.interface_name.is_empty() {
                    if let Some(interface) = self.interfaces.first() {
                        origin.interface_name = interface.clone();
                    }
                }
                for item in items.iter_mut() {
                    item.discovered_at(&origin);
                }
                (items, QueryStatus::successful())
            }
            Err(e) => {
                warn!(querier = %self.name, url = %url, error = %e, "❌ Endpoint request failed");
                (Vec::new(), QueryStatus::failed(e.to_string()))
            }
        }
    }
}
