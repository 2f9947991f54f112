use crate::adapters::cache::NoopCache;
use crate::core::fan_out::{fetch_all, probe_all};
use crate::core::merge::{contributing_sources, merge, paginate};
use crate::core::{
    AggregationResult, CacheStore, Entity, EntityFilters, HealthProbe, HealthStatus, SourceAdapter,
};
use crate::domain::filters::{
    ContactFilters, ContactQuery, FinanceFilters, FinanceQuery, ProjectFilters, ProjectQuery,
};
use crate::domain::model::{
    AggregationMetadata, HealthReport, OverallHealth, ServiceStatus, UnifiedContact,
    UnifiedFinanceRecord, UnifiedProject,
};
use crate::utils::error::{AggregatorError, Result};
use crate::utils::monitor::RuntimeMonitor;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
pub struct FacadeSettings {
    pub cache_ttl: Duration,
    /// Upper bound on one adapter call; slower adapters count as failed for that call.
    pub adapter_timeout: Duration,
}

impl Default for FacadeSettings {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            adapter_timeout: DEFAULT_ADAPTER_TIMEOUT,
        }
    }
}

/// Adapters registered for one entity family, in registration order.
pub struct SourceRegistry<E: Entity> {
    adapters: Vec<Arc<dyn SourceAdapter<E>>>,
}

impl<E: Entity> SourceRegistry<E> {
    fn new(adapters: Vec<Arc<dyn SourceAdapter<E>>>) -> Result<Self> {
        let mut names = HashSet::new();
        for adapter in &adapters {
            if !names.insert(adapter.name().to_string()) {
                return Err(AggregatorError::config(format!(
                    "source '{}' registered twice for {}",
                    adapter.name(),
                    E::KIND
                )));
            }
        }
        Ok(Self { adapters })
    }

    pub fn names(&self) -> Vec<String> {
        self.adapters.iter().map(|a| a.name().to_string()).collect()
    }

    fn select(&self, data_source: Option<&str>) -> Vec<Arc<dyn SourceAdapter<E>>> {
        match data_source {
            Some(name) => self
                .adapters
                .iter()
                .filter(|a| a.name() == name)
                .cloned()
                .collect(),
            None => self.adapters.clone(),
        }
    }
}

/// Single entry point over every configured source.
///
/// Callers never see how many sources sit behind a call. Sources are queried
/// concurrently; individual failures are reported in the result metadata
/// unless the caller asked for that one source by name.
pub struct AggregationFacade {
    contacts: SourceRegistry<UnifiedContact>,
    projects: SourceRegistry<UnifiedProject>,
    finance: SourceRegistry<UnifiedFinanceRecord>,
    probes: Vec<Arc<dyn HealthProbe>>,
    cache: Arc<dyn CacheStore>,
    settings: FacadeSettings,
    monitor: RuntimeMonitor,
}

impl AggregationFacade {
    pub fn builder() -> AggregationFacadeBuilder {
        AggregationFacadeBuilder::default()
    }

    pub fn settings(&self) -> FacadeSettings {
        self.settings
    }

    pub fn contact_sources(&self) -> Vec<String> {
        self.contacts.names()
    }

    pub fn project_sources(&self) -> Vec<String> {
        self.projects.names()
    }

    pub fn finance_sources(&self) -> Vec<String> {
        self.finance.names()
    }

    pub async fn get_contacts(
        &self,
        query: ContactQuery,
    ) -> Result<AggregationResult<UnifiedContact>> {
        let filters = ContactFilters::from_query(query, &self.contacts.names())?;
        self.aggregate(&self.contacts, filters).await
    }

    pub async fn get_projects(
        &self,
        query: ProjectQuery,
    ) -> Result<AggregationResult<UnifiedProject>> {
        let filters = ProjectFilters::from_query(query, &self.projects.names())?;
        self.aggregate(&self.projects, filters).await
    }

    pub async fn get_finance_data(
        &self,
        query: FinanceQuery,
    ) -> Result<AggregationResult<UnifiedFinanceRecord>> {
        let filters = FinanceFilters::from_query(query, &self.finance.names())?;
        self.aggregate(&self.finance, filters).await
    }

    /// Probes every distinct source once. Never fails: unreachable sources are
    /// reported as unhealthy.
    pub async fn get_health_status(&self) -> HealthStatus {
        let settled = probe_all(&self.probes, self.settings.adapter_timeout).await;

        let mut services = BTreeMap::new();
        for probe in settled {
            let report = match probe.outcome {
                Ok(report) => report,
                Err(reason) => HealthReport::unhealthy(reason),
            };
            services.insert(probe.source, report);
        }

        let healthy = services
            .values()
            .filter(|r| r.status == ServiceStatus::Healthy)
            .count();
        let status = OverallHealth::from_counts(healthy, services.len());
        tracing::info!(
            "🩺 Health: {:?} ({}/{} sources healthy)",
            status,
            healthy,
            services.len()
        );

        HealthStatus {
            status,
            services,
            uptime_seconds: self.monitor.uptime().as_secs(),
            memory_mb: self.monitor.memory_usage_mb(),
        }
    }

    async fn aggregate<E: Entity>(
        &self,
        registry: &SourceRegistry<E>,
        filters: E::Filters,
    ) -> Result<AggregationResult<E>> {
        let started = Instant::now();
        let key = cache_key::<E>(&filters)?;
        let registered = registry.names();

        if let Some(entry) = self.cached::<E>(&key).await {
            tracing::debug!("Cache hit for {} ({} records)", E::KIND, entry.items.len());
            return Ok(finish(
                &registered,
                &entry.items,
                &filters,
                entry.partial_failures,
                true,
                started,
            ));
        }

        let adapters = registry.select(filters.data_source());
        if adapters.is_empty() {
            return Err(AggregatorError::NoSources {
                entity: E::KIND.to_string(),
            });
        }

        tracing::debug!(
            "Fetching {} from {} source(s): {:?}",
            E::KIND,
            adapters.len(),
            adapters.iter().map(|a| a.name()).collect::<Vec<_>>()
        );
        let settled = fetch_all(&adapters, &filters, self.settings.adapter_timeout).await;

        let mut pages = Vec::new();
        let mut failures = Vec::new();
        for outcome in settled {
            match outcome.outcome {
                Ok(mut page) => {
                    tracing::debug!(
                        "📥 {}: {} {} (source reports {})",
                        outcome.source,
                        page.items.len(),
                        E::KIND,
                        page.total
                    );
                    for item in &mut page.items {
                        if item.source() != outcome.source {
                            item.set_source(&outcome.source);
                        }
                    }
                    pages.push(page.items);
                }
                Err(reason) => failures.push((outcome.source, reason)),
            }
        }

        if let Some(requested) = filters.data_source() {
            if let Some((_, reason)) = failures.into_iter().next() {
                return Err(AggregatorError::SourceUnavailable {
                    source_name: requested.to_string(),
                    reason,
                });
            }
            failures = Vec::new();
        }

        if pages.is_empty() {
            return Err(AggregatorError::AllSourcesFailed {
                entity: E::KIND.to_string(),
                failures: failures
                    .into_iter()
                    .map(|(source, reason)| format!("{}: {}", source, reason))
                    .collect(),
            });
        }

        let entry = CachedMerge {
            items: merge(pages, &filters),
            partial_failures: failures.into_iter().map(|(source, _)| source).collect(),
        };
        self.store(&key, &entry).await;

        let result = finish(
            &registered,
            &entry.items,
            &filters,
            entry.partial_failures,
            false,
            started,
        );
        tracing::info!(
            "✅ {}: {} of {} record(s) from {:?} in {}ms{}",
            E::KIND,
            result.data.len(),
            result.pagination.total,
            result.metadata.sources,
            result.metadata.processing_time_ms,
            if result.metadata.partial_failures.is_empty() {
                String::new()
            } else {
                format!(" (failed: {:?})", result.metadata.partial_failures)
            }
        );
        Ok(result)
    }

    /// Cache errors and unreadable entries count as misses.
    async fn cached<E: Entity>(&self, key: &str) -> Option<CachedMerge<E>> {
        match self.cache.get(key).await {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(items) => Some(items),
                Err(e) => {
                    tracing::warn!("⚠️ Ignoring unreadable cache entry '{}': {}", key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("⚠️ Cache lookup failed, treating as miss: {}", e);
                None
            }
        }
    }

    async fn store<E: Entity>(&self, key: &str, entry: &CachedMerge<E>) {
        let value = match serde_json::to_value(entry) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("⚠️ Could not serialize {} for cache: {}", E::KIND, e);
                return;
            }
        };
        if let Err(e) = self.cache.set(key, value, self.settings.cache_ttl).await {
            tracing::warn!("⚠️ Cache write failed, continuing without cache: {}", e);
        }
    }
}

/// Merged, sorted records of one query plus the sources that failed while
/// producing them, replayed as-is on a hit.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "E: Entity")]
struct CachedMerge<E> {
    items: Vec<E>,
    partial_failures: Vec<String>,
}

/// Entity family plus the normalized filters, page window excluded, so every
/// page of one query shares an entry.
fn cache_key<E: Entity>(filters: &E::Filters) -> Result<String> {
    Ok(format!("{}:{}", E::KIND, serde_json::to_string(filters)?))
}

fn finish<E: Entity>(
    registered: &[String],
    items: &[E],
    filters: &E::Filters,
    partial_failures: Vec<String>,
    cache_hit: bool,
    started: Instant,
) -> AggregationResult<E> {
    let (data, pagination) = paginate(items, filters.page());
    AggregationResult {
        data,
        pagination,
        metadata: AggregationMetadata {
            sources: contributing_sources(registered, items),
            cache_hit,
            processing_time_ms: started.elapsed().as_millis() as u64,
            partial_failures,
        },
    }
}

#[derive(Default)]
pub struct AggregationFacadeBuilder {
    contacts: Vec<Arc<dyn SourceAdapter<UnifiedContact>>>,
    projects: Vec<Arc<dyn SourceAdapter<UnifiedProject>>>,
    finance: Vec<Arc<dyn SourceAdapter<UnifiedFinanceRecord>>>,
    probes: Vec<Arc<dyn HealthProbe>>,
    cache: Option<Arc<dyn CacheStore>>,
    settings: FacadeSettings,
}

impl AggregationFacadeBuilder {
    pub fn contact_source<A>(mut self, adapter: Arc<A>) -> Self
    where
        A: SourceAdapter<UnifiedContact> + 'static,
    {
        self.add_probe(adapter.clone());
        self.contacts.push(adapter);
        self
    }

    pub fn project_source<A>(mut self, adapter: Arc<A>) -> Self
    where
        A: SourceAdapter<UnifiedProject> + 'static,
    {
        self.add_probe(adapter.clone());
        self.projects.push(adapter);
        self
    }

    pub fn finance_source<A>(mut self, adapter: Arc<A>) -> Self
    where
        A: SourceAdapter<UnifiedFinanceRecord> + 'static,
    {
        self.add_probe(adapter.clone());
        self.finance.push(adapter);
        self
    }

    /// Without a cache every call goes to the sources.
    pub fn cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn settings(mut self, settings: FacadeSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.settings.cache_ttl = ttl;
        self
    }

    pub fn adapter_timeout(mut self, timeout: Duration) -> Self {
        self.settings.adapter_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<AggregationFacade> {
        Ok(AggregationFacade {
            contacts: SourceRegistry::new(self.contacts)?,
            projects: SourceRegistry::new(self.projects)?,
            finance: SourceRegistry::new(self.finance)?,
            probes: self.probes,
            cache: self.cache.unwrap_or_else(|| Arc::new(NoopCache)),
            settings: self.settings,
            monitor: RuntimeMonitor::new(),
        })
    }

    /// A source serving several entity families is probed once, under its first registration.
    fn add_probe(&mut self, probe: Arc<dyn HealthProbe>) {
        if self.probes.iter().all(|p| p.name() != probe.name()) {
            self.probes.push(probe);
        }
    }
}
