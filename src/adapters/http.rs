use crate::core::{Entity, EntityFilters, HealthProbe, SourceAdapter, SourcePage};
use crate::domain::model::HealthReport;
use crate::domain::sources::{FromSource, SourceKind};
use crate::utils::error::{AggregatorError, Result};
use crate::utils::validation::validate_url;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::time::{Duration, Instant};

/// Keys under which JSON APIs commonly nest their record arrays.
const ITEM_KEYS: [&str; 4] = ["items", "results", "data", "records"];
const TOTAL_KEYS: [&str; 3] = ["total", "count", "totalCount"];

/// Adapter for any source exposing records as JSON over HTTP.
///
/// The source kind decides how each item is decoded. Filters are passed as
/// query parameters; whatever the server ignores is applied after the merge.
pub struct HttpSourceAdapter<E> {
    name: String,
    kind: SourceKind,
    endpoint: String,
    health_endpoint: Option<String>,
    headers: HashMap<String, String>,
    client: Client,
    _entity: PhantomData<fn() -> E>,
}

impl<E> HttpSourceAdapter<E> {
    pub fn new(name: &str, kind: SourceKind, endpoint: &str) -> Result<Self> {
        validate_url("endpoint", endpoint)?;
        Ok(Self {
            name: name.to_string(),
            kind,
            endpoint: endpoint.to_string(),
            health_endpoint: None,
            headers: HashMap::new(),
            client: Client::new(),
            _entity: PhantomData,
        })
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_health_endpoint(mut self, endpoint: &str) -> Result<Self> {
        validate_url("health_endpoint", endpoint)?;
        self.health_endpoint = Some(endpoint.to_string());
        Ok(self)
    }

    /// Per-request timeout enforced by the HTTP client itself.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    fn request(&self, url: &str) -> RequestBuilder {
        let mut request = self.client.get(url);
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }
        request
    }
}

#[async_trait]
impl<E: Entity> HealthProbe for HttpSourceAdapter<E> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn health_check(&self) -> Result<HealthReport> {
        let url = self.health_endpoint.as_deref().unwrap_or(&self.endpoint);
        let started = Instant::now();
        let response = self.request(url).send().await?;
        let status = response.status();
        let latency_ms = started.elapsed().as_millis() as u64;

        if status.is_success() {
            Ok(HealthReport::healthy(Some(serde_json::json!({
                "kind": self.kind.as_str(),
                "statusCode": status.as_u16(),
                "latencyMs": latency_ms,
            }))))
        } else {
            Ok(HealthReport::unhealthy(format!(
                "HTTP {} from {}",
                status.as_u16(),
                url
            )))
        }
    }
}

#[async_trait]
impl<E: Entity + FromSource> SourceAdapter<E> for HttpSourceAdapter<E> {
    async fn fetch(&self, filters: &E::Filters) -> Result<SourcePage<E>> {
        let params = filters.query_params();
        tracing::debug!("📡 {}: GET {} {:?}", self.name, self.endpoint, params);

        let response = self.request(&self.endpoint).query(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AggregatorError::adapter(
                &self.name,
                format!("HTTP {}", status.as_u16()),
            ));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            AggregatorError::adapter(&self.name, format!("response is not JSON: {}", e))
        })?;
        let (raw_items, reported_total) = split_body(&self.name, body)?;

        let items = raw_items
            .into_iter()
            .map(|item| E::from_source(self.kind, &self.name, item))
            .collect::<Result<Vec<E>>>()?;
        let total = reported_total.unwrap_or(items.len());
        Ok(SourcePage { items, total })
    }
}

/// Accepts a bare array, or an object holding the array under a well-known key.
fn split_body(
    source: &str,
    body: serde_json::Value,
) -> Result<(Vec<serde_json::Value>, Option<usize>)> {
    match body {
        serde_json::Value::Array(items) => Ok((items, None)),
        serde_json::Value::Object(mut object) => {
            let total = TOTAL_KEYS
                .iter()
                .find_map(|key| object.get(*key).and_then(|v| v.as_u64()))
                .map(|t| t as usize);
            for key in ITEM_KEYS {
                if let Some(serde_json::Value::Array(items)) = object.remove(key) {
                    return Ok((items, total));
                }
            }
            Err(AggregatorError::adapter(
                source,
                format!(
                    "response object has no record array (expected one of: {})",
                    ITEM_KEYS.join(", ")
                ),
            ))
        }
        other => Err(AggregatorError::adapter(
            source,
            format!("unexpected response shape: {}", type_name(&other)),
        )),
    }
}

fn type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
