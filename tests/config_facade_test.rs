use httpmock::prelude::*;
use placemat_aggregator::adapters::NoopCache;
use placemat_aggregator::domain::model::ProjectStatus;
use placemat_aggregator::{AggregatorConfig, ContactQuery, ProjectQuery};
use std::sync::Arc;

#[tokio::test]
async fn test_multi_entity_source_uses_one_endpoint_per_entity() {
    let server = MockServer::start_async().await;
    let people = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/people");
            then.status(200).json_body(serde_json::json!({
                "results": [
                    {"id": "n-1", "name": "Ada Lovelace", "email": "ada@example.org"}
                ]
            }));
        })
        .await;
    let projects = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/projects");
            then.status(200).json_body(serde_json::json!({
                "results": [
                    {"id": "p-1", "name": "Difference engine", "status": "In progress", "people": ["n-1"]}
                ]
            }));
        })
        .await;

    let toml_content = format!(
        r#"
[[sources]]
name = "notion"
kind = "notion"
entities = ["contacts", "projects"]

[sources.endpoints]
contacts = "{}"
projects = "{}"
"#,
        server.url("/v1/people"),
        server.url("/v1/projects")
    );
    let config = AggregatorConfig::from_toml_str(&toml_content).unwrap();
    let facade = config.build_facade(Arc::new(NoopCache)).unwrap();

    let contacts = facade.get_contacts(ContactQuery::default()).await.unwrap();
    let projects_result = facade.get_projects(ProjectQuery::default()).await.unwrap();

    people.assert_hits_async(1).await;
    projects.assert_hits_async(1).await;
    assert_eq!(contacts.data.len(), 1);
    assert_eq!(contacts.data[0].name, "Ada Lovelace");
    assert_eq!(projects_result.data.len(), 1);
    assert_eq!(projects_result.data[0].status, ProjectStatus::Active);
    assert_eq!(projects_result.data[0].contact_ids, vec!["n-1"]);
    assert!(projects_result.metadata.partial_failures.is_empty());
}
