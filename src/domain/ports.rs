use crate::domain::model::{EntityKind, HealthReport, SourcePage};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt::Debug;
use std::time::Duration;

/// Limit/offset window applied after the merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: usize,
    pub offset: usize,
}

/// Validated, normalized filters for one entity family.
///
/// The serialized form (which must leave out the page window) is the cache key body.
pub trait EntityFilters: Clone + Debug + Serialize + Send + Sync + 'static {
    fn page(&self) -> PageRequest;
    fn data_source(&self) -> Option<&str>;
    /// Filters an HTTP source may apply on its side; sources are free to ignore them.
    fn query_params(&self) -> Vec<(String, String)>;
}

pub trait Entity: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Filters: EntityFilters;

    const KIND: EntityKind;

    fn id(&self) -> &str;
    fn source(&self) -> &str;
    fn set_source(&mut self, source: &str);
    fn matches(&self, filters: &Self::Filters) -> bool;
    /// Ordering on the requested sort key and direction only; ties are resolved by the merger.
    fn compare(&self, other: &Self, filters: &Self::Filters) -> Ordering;
}

#[async_trait]
pub trait HealthProbe: Send + Sync {
    fn name(&self) -> &str;
    async fn health_check(&self) -> Result<HealthReport>;
}

/// One upstream system serving one entity family.
///
/// Implementations own paging, rate limits, retries and field mapping for their system.
#[async_trait]
pub trait SourceAdapter<E: Entity>: HealthProbe {
    async fn fetch(&self, filters: &E::Filters) -> Result<SourcePage<E>>;
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;
    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> Result<()>;
}
