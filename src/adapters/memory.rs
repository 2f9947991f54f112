use crate::core::{Entity, HealthProbe, SourceAdapter, SourcePage};
use crate::domain::model::HealthReport;
use crate::utils::error::{AggregatorError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Source backed by a fixed list of records.
///
/// Returns everything it holds regardless of filters, like an upstream that
/// cannot filter server-side. Failure, latency and health are configurable,
/// which makes it the stand-in for real systems in tests and demos.
pub struct StaticSource<E> {
    name: String,
    items: Vec<E>,
    failure: Option<String>,
    delay: Option<Duration>,
    healthy: bool,
    calls: AtomicUsize,
}

impl<E> StaticSource<E> {
    pub fn new(name: &str, items: Vec<E>) -> Self {
        Self {
            name: name.to_string(),
            items,
            failure: None,
            delay: None,
            healthy: true,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every `fetch` fails with `reason`; health reports unhealthy too.
    pub fn failing(mut self, reason: &str) -> Self {
        self.failure = Some(reason.to_string());
        self.healthy = false;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    /// Number of `fetch` calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<E: Send + Sync> HealthProbe for StaticSource<E> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn health_check(&self) -> Result<HealthReport> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.healthy {
            Ok(HealthReport::healthy(Some(serde_json::json!({
                "records": self.items.len()
            }))))
        } else {
            Ok(HealthReport::unhealthy(
                self.failure.clone().unwrap_or_else(|| "marked unhealthy".to_string()),
            ))
        }
    }
}

#[async_trait]
impl<E: Entity> SourceAdapter<E> for StaticSource<E> {
    async fn fetch(&self, _filters: &E::Filters) -> Result<SourcePage<E>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(reason) => Err(AggregatorError::adapter(&self.name, reason.clone())),
            None => Ok(SourcePage::new(self.items.clone())),
        }
    }
}
