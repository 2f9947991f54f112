//! Settle-all fan-out.
//!
//! Every call runs to completion or until the guard duration elapses; one
//! call failing never cancels the others. Outcomes come back in call order,
//! whatever order the calls finish in.

use crate::core::{Entity, HealthProbe, SourceAdapter, SourcePage};
use crate::domain::model::HealthReport;
use crate::utils::error::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

#[derive(Debug)]
pub struct Settled<T> {
    pub source: String,
    /// `Err` carries a human-readable reason; the failure subtype is not kept.
    pub outcome: std::result::Result<T, String>,
}

pub async fn settle_all<T, F>(calls: Vec<(String, F)>, guard: Duration) -> Vec<Settled<T>>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    let names: Vec<String> = calls.iter().map(|(name, _)| name.clone()).collect();
    let mut outcomes: Vec<Option<std::result::Result<T, String>>> =
        names.iter().map(|_| None).collect();

    let mut tasks = JoinSet::new();
    for (index, (name, call)) in calls.into_iter().enumerate() {
        tasks.spawn(async move {
            let outcome = match tokio::time::timeout(guard, call).await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(e.to_string()),
                Err(_) => Err(format!("no response within {}ms", guard.as_millis())),
            };
            if let Err(reason) = &outcome {
                tracing::warn!("⚠️ Source '{}' failed: {}", name, reason);
            }
            (index, outcome)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => outcomes[index] = Some(outcome),
            Err(e) => tracing::error!("❌ Source task aborted: {}", e),
        }
    }

    names
        .into_iter()
        .zip(outcomes)
        .map(|(source, outcome)| Settled {
            source,
            outcome: outcome.unwrap_or_else(|| Err("source task aborted".to_string())),
        })
        .collect()
}

/// One `fetch` per adapter, all with the same filters.
pub async fn fetch_all<E: Entity>(
    adapters: &[Arc<dyn SourceAdapter<E>>],
    filters: &E::Filters,
    guard: Duration,
) -> Vec<Settled<SourcePage<E>>> {
    let calls = adapters
        .iter()
        .map(|adapter| {
            let adapter = Arc::clone(adapter);
            let filters = filters.clone();
            let name = adapter.name().to_string();
            (name, async move { adapter.fetch(&filters).await })
        })
        .collect::<Vec<_>>();
    settle_all(calls, guard).await
}

pub async fn probe_all(probes: &[Arc<dyn HealthProbe>], guard: Duration) -> Vec<Settled<HealthReport>> {
    let calls = probes
        .iter()
        .map(|probe| {
            let probe = Arc::clone(probe);
            let name = probe.name().to_string();
            (name, async move { probe.health_check().await })
        })
        .collect::<Vec<_>>();
    settle_all(calls, guard).await
}
