use anyhow::Context;
use axum::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{Car, SearchResponse};
use crate::config::RegistryConfig;

pub const PAGE_SIZE: u32 = 10;

/// Read-only access to the government vehicle registry.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Full-text search over the cars resource.
    async fn search_cars(&self, q: &str, limit: u32, offset: u32) -> anyhow::Result<Vec<Car>>;
    /// The record whose plate is exactly `plate`, if any.
    async fn find_plate(&self, plate: &str) -> anyhow::Result<Option<Car>>;
    /// Whether the plate holds an accessibility (Tav Neche) designation.
    async fn has_tav_neche(&self, plate: &str) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct GovRegistry {
    http: reqwest::Client,
    base_url: String,
    cars_resource: String,
    tav_resource: String,
}

impl GovRegistry {
    pub fn new(config: &RegistryConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("carlist/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .context("build registry http client")?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cars_resource: config.cars_resource.clone(),
            tav_resource: config.tav_resource.clone(),
        })
    }

    async fn datastore_search<T: DeserializeOwned>(
        &self,
        resource_id: &str,
        query: Query<'_>,
        limit: u32,
        offset: Option<u32>,
    ) -> anyhow::Result<Vec<T>> {
        let url = format!("{}/datastore_search", self.base_url);
        let params = search_params(resource_id, query, limit, offset);

        let body: SearchResponse<T> = self
            .http
            .get(&url)
            .query(&params)
            .send()
            .await
            .with_context(|| format!("datastore_search {}", resource_id))?
            .error_for_status()
            .with_context(|| format!("datastore_search {} status", resource_id))?
            .json()
            .await
            .with_context(|| format!("decode datastore_search {}", resource_id))?;

        if !body.success {
            anyhow::bail!("datastore_search {} reported failure", resource_id);
        }
        debug!(resource_id, ?query, records = body.result.records.len(), "registry search");
        Ok(body.result.records)
    }
}

#[async_trait]
impl RegistryClient for GovRegistry {
    async fn search_cars(&self, q: &str, limit: u32, offset: u32) -> anyhow::Result<Vec<Car>> {
        self.datastore_search(&self.cars_resource, Query::Text(q), limit, Some(offset))
            .await
    }

    async fn find_plate(&self, plate: &str) -> anyhow::Result<Option<Car>> {
        let records: Vec<Car> = self
            .datastore_search(&self.cars_resource, Query::Plate(plate), 1, None)
            .await?;
        Ok(records.into_iter().find(|c| c.mispar_rechev == plate))
    }

    async fn has_tav_neche(&self, plate: &str) -> anyhow::Result<bool> {
        let records: Vec<serde_json::Value> = self
            .datastore_search(&self.tav_resource, Query::Text(plate), 1, None)
            .await?;
        Ok(!records.is_empty())
    }
}

/// How records are selected: CKAN full-text `q`, or an exact `filters` match
/// on the plate column.
#[derive(Debug, Clone, Copy)]
enum Query<'a> {
    Text(&'a str),
    Plate(&'a str),
}

fn search_params(
    resource_id: &str,
    query: Query<'_>,
    limit: u32,
    offset: Option<u32>,
) -> Vec<(&'static str, String)> {
    let mut params = vec![("resource_id", resource_id.to_string())];
    match query {
        Query::Text(q) => params.push(("q", q.to_string())),
        Query::Plate(plate) => params.push((
            "filters",
            serde_json::json!({ "mispar_rechev": plate }).to_string(),
        )),
    }
    params.push(("limit", limit.to_string()));
    if let Some(offset) = offset {
        params.push(("offset", offset.to_string()));
    }
    params
}

/// Offset of the first record of a 1-based page.
pub fn page_offset(page: u32) -> u32 {
    page.max(1).saturating_sub(1).saturating_mul(PAGE_SIZE)
}
