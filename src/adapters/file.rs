//! Adapter reading static catalogs from local YAML or JSON files

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::path::PathBuf;
use tracing::debug;

use super::INTERFACE_FILE;
use crate::config::UserConfig;
use crate::core::retrieval::{Discovered, EndpointQuerier, QueryOptions, QueryOutcome, QueryStatus};
use crate::domain::entities::Endpoint;
use crate::error::{GridError, Result};

pub struct FileQuerier<T> {
    name: String,
    _kind: PhantomData<fn() -> T>,
}

impl<T> FileQuerier<T> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            _kind: PhantomData,
        }
    }

    fn path_of(endpoint: &Endpoint) -> Option<PathBuf> {
        if endpoint.url.starts_with("file://") {
            return url::Url::parse(&endpoint.url).ok()?.to_file_path().ok();
        }
        if endpoint.url.contains("://") {
            return None;
        }
        let lower = endpoint.url.to_lowercase();
        if lower.ends_with(".yaml") || lower.ends_with(".yml") || lower.ends_with(".json") {
            Some(PathBuf::from(&endpoint.url))
        } else {
            None
        }
    }
}

impl<T: DeserializeOwned> FileQuerier<T> {
    async fn load(path: &PathBuf) -> Result<Vec<T>> {
        let content = tokio::fs::read_to_string(path).await?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "yaml" | "yml" => Ok(serde_yaml::from_str(&content)?),
            "json" => Ok(serde_json::from_str(&content)?),
            other => Err(GridError::ValidationError(format!(
                "Unsupported catalog format '{}' for {}",
                other,
                path.display()
            ))),
        }
    }
}

#[async_trait]
impl<T> EndpointQuerier<T> for FileQuerier<T>
where
    T: DeserializeOwned + Discovered + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn supported_interfaces(&self) -> Vec<String> {
        vec![INTERFACE_FILE.to_string()]
    }

    fn supports(&self, endpoint: &Endpoint) -> bool {
        Self::path_of(endpoint).is_some()
    }

    async fn query(
        &self,
        _config: &UserConfig,
        endpoint: &Endpoint,
        _options: &QueryOptions,
    ) -> QueryOutcome<T> {
        let Some(path) = Self::path_of(endpoint) else {
            return (Vec::new(), QueryStatus::failed("Not a local catalog path"));
        };

        match Self::load(&path).await {
            Ok(mut items) => {
                let origin = if endpoint.interface_name.is_empty() {
                    endpoint.clone().with_interface(INTERFACE_FILE)
                } else {
                    endpoint.clone()
                };
                for item in items.iter_mut() {
                    item.discovered_at(&origin);
                }
                debug!(path = %path.display(), items = items.len(), "📁 Loaded catalog file");
                (items, QueryStatus::successful())
            }
            Err(e) => (Vec::new(), QueryStatus::failed(e.to_string())),
        }
    }
}
