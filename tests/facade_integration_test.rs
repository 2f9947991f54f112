use async_trait::async_trait;
use chrono::NaiveDate;
use placemat_aggregator::adapters::{MemoryCache, StaticSource};
use placemat_aggregator::core::CacheStore;
use placemat_aggregator::domain::model::{
    FinanceKind, Money, OverallHealth, ProjectStatus, ServiceStatus,
};
use placemat_aggregator::{
    AggregationFacade, AggregatorError, ContactQuery, FinanceQuery, ProjectQuery, Result,
    UnifiedContact, UnifiedFinanceRecord, UnifiedProject,
};
use std::sync::Arc;
use std::time::Duration;

fn contact(source: &str, n: usize) -> UnifiedContact {
    UnifiedContact {
        id: format!("{}-{}", source, n),
        name: format!("{} Person {:02}", source, n),
        email: Some(format!("person{}@{}.example.org", n, source.to_lowercase())),
        organization: Some(if n % 2 == 0 { "Acme" } else { "Globex" }.to_string()),
        title: None,
        source: source.to_string(),
        enrichment: None,
    }
}

fn contacts(source: &str, count: usize) -> Vec<UnifiedContact> {
    (0..count).map(|n| contact(source, n)).collect()
}

fn project(id: &str, name: &str, status: ProjectStatus) -> UnifiedProject {
    UnifiedProject {
        id: id.to_string(),
        name: name.to_string(),
        status,
        budget: Some(1000.0),
        revenue_actual: None,
        contact_ids: vec![],
        source: "supabase".to_string(),
    }
}

fn record(id: &str, date: &str, value: f64, kind: FinanceKind) -> UnifiedFinanceRecord {
    UnifiedFinanceRecord {
        id: id.to_string(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        amount: Money {
            value,
            currency: "AUD".to_string(),
        },
        category: "Consulting".to_string(),
        kind,
        counterparty: None,
        source: "xero".to_string(),
    }
}

struct BrokenCache;

#[async_trait]
impl CacheStore for BrokenCache {
    async fn get(&self, _key: &str) -> Result<Option<serde_json::Value>> {
        Err(AggregatorError::Cache {
            message: "connection refused".to_string(),
        })
    }

    async fn set(&self, _key: &str, _value: serde_json::Value, _ttl: Duration) -> Result<()> {
        Err(AggregatorError::Cache {
            message: "connection refused".to_string(),
        })
    }
}

#[tokio::test]
async fn test_slow_source_becomes_partial_failure() {
    let a = Arc::new(StaticSource::new("A", contacts("A", 10)));
    let b = Arc::new(StaticSource::new("B", contacts("B", 5)));
    let c = Arc::new(
        StaticSource::new("C", contacts("C", 3)).with_delay(Duration::from_secs(5)),
    );

    let facade = AggregationFacade::builder()
        .contact_source(a)
        .contact_source(b)
        .contact_source(c)
        .adapter_timeout(Duration::from_millis(100))
        .build()
        .unwrap();

    let result = facade.get_contacts(ContactQuery::default()).await.unwrap();

    assert_eq!(result.data.len(), 15);
    assert_eq!(result.pagination.total, 15);
    assert!(!result.pagination.has_more);
    assert_eq!(result.metadata.sources, vec!["A", "B"]);
    assert_eq!(result.metadata.partial_failures, vec!["C"]);
    assert!(!result.metadata.cache_hit);
}

#[tokio::test]
async fn test_invalid_limit_calls_no_adapter() {
    let a = Arc::new(StaticSource::new("A", contacts("A", 3)));
    let facade = AggregationFacade::builder()
        .contact_source(a.clone())
        .build()
        .unwrap();

    let err = facade
        .get_contacts(ContactQuery {
            limit: Some(0),
            ..Default::default()
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AggregatorError::Validation { .. }));
    assert!(err.is_client_error());
    assert_eq!(a.calls(), 0);
}

#[tokio::test]
async fn test_named_source_failure_is_not_masked() {
    let notion = Arc::new(StaticSource::new("notion", contacts("notion", 2)).failing("401"));
    let gmail = Arc::new(StaticSource::new("gmail", contacts("gmail", 4)));
    let facade = AggregationFacade::builder()
        .contact_source(notion.clone())
        .contact_source(gmail.clone())
        .build()
        .unwrap();

    let err = facade
        .get_contacts(ContactQuery {
            data_source: Some("notion".to_string()),
            ..Default::default()
        })
        .await
        .unwrap_err();

    match err {
        AggregatorError::SourceUnavailable { source_name, .. } => assert_eq!(source_name, "notion"),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(notion.calls(), 1);
    assert_eq!(gmail.calls(), 0);
}

#[tokio::test]
async fn test_unknown_data_source_is_rejected() {
    let facade = AggregationFacade::builder()
        .contact_source(Arc::new(StaticSource::new("gmail", contacts("gmail", 1))))
        .build()
        .unwrap();

    let err = facade
        .get_contacts(ContactQuery {
            data_source: Some("salesforce".to_string()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(err.is_client_error());
}

#[tokio::test]
async fn test_every_source_failing() {
    let facade = AggregationFacade::builder()
        .project_source(Arc::new(
            StaticSource::<UnifiedProject>::new("notion", vec![]).failing("timeout"),
        ))
        .project_source(Arc::new(
            StaticSource::<UnifiedProject>::new("supabase", vec![]).failing("503"),
        ))
        .build()
        .unwrap();

    let err = facade
        .get_projects(ProjectQuery::default())
        .await
        .unwrap_err();
    match err {
        AggregatorError::AllSourcesFailed { failures, .. } => {
            assert_eq!(failures.len(), 2);
            assert!(failures[0].starts_with("notion"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_no_sources_configured() {
    let facade = AggregationFacade::builder().build().unwrap();
    let err = facade
        .get_finance_data(FinanceQuery::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AggregatorError::NoSources { .. }));
}

#[tokio::test]
async fn test_repeat_query_is_served_from_cache() {
    let a = Arc::new(StaticSource::new("A", contacts("A", 4)));
    let facade = AggregationFacade::builder()
        .contact_source(a.clone())
        .cache(Arc::new(MemoryCache::new()))
        .build()
        .unwrap();

    let first = facade.get_contacts(ContactQuery::default()).await.unwrap();
    let second = facade.get_contacts(ContactQuery::default()).await.unwrap();

    assert!(!first.metadata.cache_hit);
    assert!(second.metadata.cache_hit);
    assert_eq!(first.data, second.data);
    assert_eq!(first.pagination, second.pagination);
    assert_eq!(a.calls(), 1);

    // Other pages of the same query share the entry.
    let page = facade
        .get_contacts(ContactQuery {
            limit: Some(2),
            offset: Some(2),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(page.metadata.cache_hit);
    assert_eq!(page.data, first.data[2..4].to_vec());
    assert_eq!(a.calls(), 1);
}

#[tokio::test]
async fn test_partial_results_are_replayed_from_cache() {
    let a = Arc::new(StaticSource::new("A", contacts("A", 2)));
    let b = Arc::new(StaticSource::new("B", contacts("B", 2)).failing("boom"));
    let facade = AggregationFacade::builder()
        .contact_source(a.clone())
        .contact_source(b.clone())
        .cache(Arc::new(MemoryCache::new()))
        .build()
        .unwrap();

    let first = facade.get_contacts(ContactQuery::default()).await.unwrap();
    let second = facade.get_contacts(ContactQuery::default()).await.unwrap();

    assert!(!first.metadata.cache_hit);
    assert!(second.metadata.cache_hit);
    assert_eq!(first.metadata.partial_failures, vec!["B"]);
    assert_eq!(second.metadata.partial_failures, vec!["B"]);
    assert_eq!(first.data, second.data);
    assert_eq!(first.pagination, second.pagination);
    assert_eq!(a.calls(), 1);
    assert_eq!(b.calls(), 1);
}

#[tokio::test]
async fn test_broken_cache_degrades_to_direct_fetch() {
    let a = Arc::new(StaticSource::new("A", contacts("A", 3)));
    let facade = AggregationFacade::builder()
        .contact_source(a.clone())
        .cache(Arc::new(BrokenCache))
        .build()
        .unwrap();

    let first = facade.get_contacts(ContactQuery::default()).await.unwrap();
    let second = facade.get_contacts(ContactQuery::default()).await.unwrap();

    assert_eq!(first.data.len(), 3);
    assert!(!second.metadata.cache_hit);
    assert!(second.metadata.partial_failures.is_empty());
    assert_eq!(a.calls(), 2);
}

#[tokio::test]
async fn test_results_are_deterministic_regardless_of_latency() {
    let mut shuffled = contacts("A", 6);
    shuffled.reverse();
    let fast = Arc::new(StaticSource::new("A", shuffled));
    let slow = Arc::new(
        StaticSource::new("B", contacts("B", 6)).with_delay(Duration::from_millis(30)),
    );
    let facade = AggregationFacade::builder()
        .contact_source(slow)
        .contact_source(fast)
        .build()
        .unwrap();

    let first = facade.get_contacts(ContactQuery::default()).await.unwrap();
    let second = facade.get_contacts(ContactQuery::default()).await.unwrap();
    assert_eq!(first.data, second.data);

    let names: Vec<&str> = first.data.iter().map(|c| c.name.as_str()).collect();
    let mut sorted = names.clone();
    sorted.sort_by_key(|name| name.to_lowercase());
    assert_eq!(names, sorted);
}

#[tokio::test]
async fn test_pagination_invariants_hold_for_every_page() {
    let facade = AggregationFacade::builder()
        .contact_source(Arc::new(StaticSource::new("A", contacts("A", 17))))
        .contact_source(Arc::new(StaticSource::new("B", contacts("B", 6))))
        .build()
        .unwrap();

    for limit in [1_i64, 5, 10, 23, 50] {
        for offset in [0_i64, 4, 20, 23] {
            let result = facade
                .get_contacts(ContactQuery {
                    limit: Some(limit),
                    offset: Some(offset),
                    ..Default::default()
                })
                .await
                .unwrap();
            let page = &result.pagination;
            assert_eq!(page.total, 23);
            assert!(result.data.len() <= limit as usize);
            assert!(page.offset + result.data.len() <= page.total);
            assert_eq!(page.has_more, page.offset + page.limit < page.total);
        }
    }
}

#[tokio::test]
async fn test_filters_apply_after_merge() {
    let facade = AggregationFacade::builder()
        .contact_source(Arc::new(StaticSource::new("A", contacts("A", 4))))
        .contact_source(Arc::new(StaticSource::new("B", contacts("B", 4))))
        .build()
        .unwrap();

    let result = facade
        .get_contacts(ContactQuery {
            company: Some("acme".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(result.pagination.total, 4);
    assert!(result
        .data
        .iter()
        .all(|c| c.organization.as_deref() == Some("Acme")));
}

#[tokio::test]
async fn test_project_status_filter() {
    let facade = AggregationFacade::builder()
        .project_source(Arc::new(StaticSource::new(
            "supabase",
            vec![
                project("p1", "Website rebuild", ProjectStatus::Active),
                project("p2", "Brand refresh", ProjectStatus::Completed),
                project("p3", "Annual report", ProjectStatus::Active),
            ],
        )))
        .build()
        .unwrap();

    let result = facade
        .get_projects(ProjectQuery {
            status: Some("active".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    let names: Vec<&str> = result.data.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Annual report", "Website rebuild"]);
}

#[tokio::test]
async fn test_finance_window_and_default_order() {
    let facade = AggregationFacade::builder()
        .finance_source(Arc::new(StaticSource::new(
            "xero",
            vec![
                record("t1", "2024-01-10", 500.0, FinanceKind::Income),
                record("t2", "2024-02-03", -120.0, FinanceKind::Expense),
                record("t3", "2024-03-15", 900.0, FinanceKind::Income),
                record("t4", "2023-12-31", 75.0, FinanceKind::Income),
            ],
        )))
        .build()
        .unwrap();

    let result = facade
        .get_finance_data(FinanceQuery {
            date_from: Some("2024-01-01".to_string()),
            date_to: Some("2024-02-28".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    let ids: Vec<&str> = result.data.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["t2", "t1"]);

    let err = facade
        .get_finance_data(FinanceQuery {
            date_from: Some("2024-03-01".to_string()),
            date_to: Some("2024-01-01".to_string()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(err.is_client_error());
}

#[tokio::test]
async fn test_health_rollup() {
    let healthy = || Arc::new(StaticSource::new("A", contacts("A", 1)));

    let all_up = AggregationFacade::builder()
        .contact_source(healthy())
        .build()
        .unwrap();
    let status = all_up.get_health_status().await;
    assert_eq!(status.status, OverallHealth::Healthy);

    let degraded = AggregationFacade::builder()
        .contact_source(healthy())
        .contact_source(Arc::new(
            StaticSource::new("B", contacts("B", 1)).unhealthy(),
        ))
        .build()
        .unwrap();
    let status = degraded.get_health_status().await;
    assert_eq!(status.status, OverallHealth::Degraded);
    assert_eq!(status.services["B"].status, ServiceStatus::Unhealthy);
    assert_eq!(status.services["A"].status, ServiceStatus::Healthy);

    let down = AggregationFacade::builder()
        .contact_source(Arc::new(
            StaticSource::new("B", contacts("B", 1)).failing("gone"),
        ))
        .build()
        .unwrap();
    assert_eq!(down.get_health_status().await.status, OverallHealth::Unhealthy);
}

#[tokio::test]
async fn test_slow_health_probe_reports_unhealthy() {
    let facade = AggregationFacade::builder()
        .contact_source(Arc::new(
            StaticSource::new("slow", contacts("slow", 1)).with_delay(Duration::from_secs(5)),
        ))
        .adapter_timeout(Duration::from_millis(50))
        .build()
        .unwrap();

    let status = facade.get_health_status().await;
    assert_eq!(status.status, OverallHealth::Unhealthy);
    assert_eq!(status.services["slow"].status, ServiceStatus::Unhealthy);
}
