use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Entity families the facade serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Contacts,
    Projects,
    Finance,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Contacts => "contacts",
            EntityKind::Projects => "projects",
            EntityKind::Finance => "finance",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactEnrichment {
    /// 0.0 (no relationship) to 1.0 (close relationship).
    pub relationship_strength: Option<f64>,
    /// Strategic score, 0 to 100.
    pub score: Option<f64>,
    pub last_interaction: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedContact {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub organization: Option<String>,
    pub title: Option<String>,
    pub source: String,
    pub enrichment: Option<ContactEnrichment>,
}

impl UnifiedContact {
    pub fn score(&self) -> Option<f64> {
        self.enrichment.as_ref().and_then(|e| e.score)
    }

    pub fn last_interaction(&self) -> Option<DateTime<Utc>> {
        self.enrichment.as_ref().and_then(|e| e.last_interaction)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Active,
    Completed,
    Paused,
    Cancelled,
}

impl ProjectStatus {
    pub const CHOICES: [(&'static str, ProjectStatus); 4] = [
        ("active", ProjectStatus::Active),
        ("completed", ProjectStatus::Completed),
        ("paused", ProjectStatus::Paused),
        ("cancelled", ProjectStatus::Cancelled),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Paused => "paused",
            ProjectStatus::Cancelled => "cancelled",
        }
    }

    /// Maps the status labels source systems use onto the unified enum.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "active" | "in progress" | "in-progress" | "ongoing" => Some(ProjectStatus::Active),
            "completed" | "complete" | "done" => Some(ProjectStatus::Completed),
            "paused" | "on hold" | "on-hold" => Some(ProjectStatus::Paused),
            "cancelled" | "canceled" | "archived" => Some(ProjectStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedProject {
    pub id: String,
    pub name: String,
    pub status: ProjectStatus,
    pub budget: Option<f64>,
    pub revenue_actual: Option<f64>,
    #[serde(default)]
    pub contact_ids: Vec<String>,
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinanceKind {
    Income,
    Expense,
}

impl FinanceKind {
    pub const CHOICES: [(&'static str, FinanceKind); 2] = [
        ("income", FinanceKind::Income),
        ("expense", FinanceKind::Expense),
    ];
}

/// Signed amount: income is positive, expense negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub value: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedFinanceRecord {
    pub id: String,
    pub date: NaiveDate,
    pub amount: Money,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: FinanceKind,
    pub counterparty: Option<String>,
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
    pub total: usize,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationMetadata {
    pub sources: Vec<String>,
    pub cache_hit: bool,
    pub processing_time_ms: u64,
    pub partial_failures: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
    pub metadata: AggregationMetadata,
}

/// What a single adapter call hands back before merging.
#[derive(Debug, Clone)]
pub struct SourcePage<T> {
    pub items: Vec<T>,
    /// Count as reported by the source, before any cross-source merge.
    pub total: usize,
}

impl<T> SourcePage<T> {
    pub fn new(items: Vec<T>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: ServiceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl HealthReport {
    pub fn healthy(details: Option<serde_json::Value>) -> Self {
        Self {
            status: ServiceStatus::Healthy,
            details,
        }
    }

    pub fn unhealthy(reason: impl Into<String>) -> Self {
        Self {
            status: ServiceStatus::Unhealthy,
            details: Some(serde_json::json!({ "error": reason.into() })),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallHealth {
    Healthy,
    Degraded,
    Unhealthy,
}

impl OverallHealth {
    pub fn from_counts(healthy: usize, total: usize) -> Self {
        if total > 0 && healthy == total {
            OverallHealth::Healthy
        } else if healthy > 0 {
            OverallHealth::Degraded
        } else {
            OverallHealth::Unhealthy
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: OverallHealth,
    pub services: BTreeMap<String, HealthReport>,
    pub uptime_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_health_from_counts() {
        assert_eq!(OverallHealth::from_counts(3, 3), OverallHealth::Healthy);
        assert_eq!(OverallHealth::from_counts(1, 3), OverallHealth::Degraded);
        assert_eq!(OverallHealth::from_counts(0, 3), OverallHealth::Unhealthy);
        assert_eq!(OverallHealth::from_counts(0, 0), OverallHealth::Unhealthy);
    }

    #[test]
    fn test_project_status_labels() {
        assert_eq!(ProjectStatus::from_label("In Progress"), Some(ProjectStatus::Active));
        assert_eq!(ProjectStatus::from_label("On Hold"), Some(ProjectStatus::Paused));
        assert_eq!(ProjectStatus::from_label("canceled"), Some(ProjectStatus::Cancelled));
        assert_eq!(ProjectStatus::from_label("someday"), None);
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result: AggregationResult<UnifiedContact> = AggregationResult {
            data: vec![],
            pagination: Pagination {
                limit: 50,
                offset: 0,
                total: 0,
                has_more: false,
            },
            metadata: AggregationMetadata {
                sources: vec![],
                cache_hit: false,
                processing_time_ms: 3,
                partial_failures: vec!["gmail".to_string()],
            },
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["pagination"]["hasMore"], false);
        assert_eq!(json["metadata"]["partialFailures"][0], "gmail");
        assert_eq!(json["metadata"]["cacheHit"], false);
    }
}
