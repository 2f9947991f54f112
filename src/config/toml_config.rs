use crate::adapters::{HttpSourceAdapter, LinkedInCsvAdapter};
use crate::core::facade::{AggregationFacade, FacadeSettings};
use crate::core::CacheStore;
use crate::domain::model::EntityKind;
use crate::domain::sources::{FromSource, SourceKind};
use crate::utils::error::{AggregatorError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_range, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    #[serde(default)]
    pub aggregator: AggregatorSettings,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorSettings {
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,
    #[serde(default = "default_adapter_timeout_ms")]
    pub adapter_timeout_ms: u64,
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: default_cache_ttl_seconds(),
            adapter_timeout_ms: default_adapter_timeout_ms(),
            cache_enabled: default_cache_enabled(),
        }
    }
}

fn default_cache_ttl_seconds() -> u64 {
    300
}

fn default_adapter_timeout_ms() -> u64 {
    10_000
}

fn default_cache_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub kind: SourceKind,
    pub entities: Vec<EntityKind>,
    /// One URL per served entity, for HTTP kinds.
    #[serde(default)]
    pub endpoints: SourceEndpoints,
    pub health_endpoint: Option<String>,
    pub headers: Option<HashMap<String, String>>,
    /// CSV export location, for `linkedin` sources.
    pub path: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceEndpoints {
    pub contacts: Option<String>,
    pub projects: Option<String>,
    pub finance: Option<String>,
}

impl SourceEndpoints {
    pub fn for_entity(&self, entity: EntityKind) -> Option<&str> {
        match entity {
            EntityKind::Contacts => self.contacts.as_deref(),
            EntityKind::Projects => self.projects.as_deref(),
            EntityKind::Finance => self.finance.as_deref(),
        }
    }
}

impl AggregatorConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        toml::from_str(&processed_content)
            .map_err(|e| AggregatorError::config(format!("TOML parsing error: {}", e)))
    }

    /// Replaces `${VAR}` with the environment value; unset variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| AggregatorError::config(format!("invalid placeholder pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_range(
            "aggregator.cache_ttl_seconds",
            self.aggregator.cache_ttl_seconds,
            1,
            86_400,
        )?;
        validate_range(
            "aggregator.adapter_timeout_ms",
            self.aggregator.adapter_timeout_ms,
            1,
            300_000,
        )?;

        let mut names = HashSet::new();
        for (index, source) in self.sources.iter().enumerate() {
            let field = |suffix: &str| format!("sources[{}].{}", index, suffix);

            validate_non_empty_string(&field("name"), &source.name)?;
            if !names.insert(source.name.as_str()) {
                return Err(AggregatorError::validation(
                    &field("name"),
                    &source.name,
                    "Source names must be unique",
                ));
            }

            if source.entities.is_empty() {
                return Err(AggregatorError::validation(
                    &field("entities"),
                    "[]",
                    "At least one entity is required",
                ));
            }
            for entity in &source.entities {
                if !source.kind.supports(*entity) {
                    return Err(AggregatorError::validation(
                        &field("entities"),
                        entity,
                        format!("{} sources do not provide {}", source.kind, entity),
                    ));
                }
            }

            match source.kind {
                SourceKind::LinkedIn => {
                    let path = source.path.as_deref().unwrap_or_default();
                    validate_path(&field("path"), path)?;
                }
                _ => {
                    for entity in &source.entities {
                        let endpoint_field = field(&format!("endpoints.{}", entity));
                        let endpoint = source.endpoints.for_entity(*entity).ok_or_else(|| {
                            AggregatorError::validation(
                                &endpoint_field,
                                "",
                                format!("An endpoint is required for {}", entity),
                            )
                        })?;
                        validate_url(&endpoint_field, endpoint)?;
                    }
                    if let Some(health) = &source.health_endpoint {
                        validate_url(&field("health_endpoint"), health)?;
                    }
                }
            }

            if let Some(timeout) = source.timeout_seconds {
                validate_range(&field("timeout_seconds"), timeout, 1, 300)?;
            }
        }

        Ok(())
    }

    pub fn settings(&self) -> FacadeSettings {
        FacadeSettings {
            cache_ttl: Duration::from_secs(self.aggregator.cache_ttl_seconds),
            adapter_timeout: Duration::from_millis(self.aggregator.adapter_timeout_ms),
        }
    }

    /// Validates, then wires one adapter per (source, entity) pair into a facade
    /// using the given cache.
    pub fn build_facade(&self, cache: Arc<dyn CacheStore>) -> Result<AggregationFacade> {
        self.validate_config()?;

        let mut builder = AggregationFacade::builder()
            .settings(self.settings())
            .cache(cache);

        for source in &self.sources {
            for entity in &source.entities {
                builder = match (source.kind, entity) {
                    (SourceKind::LinkedIn, EntityKind::Contacts) => {
                        let path = source.path.clone().unwrap_or_default();
                        builder.contact_source(Arc::new(LinkedInCsvAdapter::new(&source.name, path)))
                    }
                    (_, EntityKind::Contacts) => {
                        builder.contact_source(Arc::new(http_adapter(source, *entity)?))
                    }
                    (_, EntityKind::Projects) => {
                        builder.project_source(Arc::new(http_adapter(source, *entity)?))
                    }
                    (_, EntityKind::Finance) => {
                        builder.finance_source(Arc::new(http_adapter(source, *entity)?))
                    }
                };
                tracing::debug!("Registered source '{}' ({}) for {}", source.name, source.kind, entity);
            }
        }

        builder.build()
    }
}

fn http_adapter<E: FromSource>(
    source: &SourceConfig,
    entity: EntityKind,
) -> Result<HttpSourceAdapter<E>> {
    let endpoint = source.endpoints.for_entity(entity).ok_or_else(|| {
        AggregatorError::config(format!(
            "source '{}' has no {} endpoint",
            source.name, entity
        ))
    })?;

    let mut adapter = HttpSourceAdapter::new(&source.name, source.kind, endpoint)?;
    if let Some(headers) = &source.headers {
        adapter = adapter.with_headers(headers.clone());
    }
    if let Some(health) = &source.health_endpoint {
        adapter = adapter.with_health_endpoint(health)?;
    }
    if let Some(timeout) = source.timeout_seconds {
        adapter = adapter.with_timeout(Duration::from_secs(timeout))?;
    }
    Ok(adapter)
}

impl Validate for AggregatorConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::NoopCache;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[aggregator]
cache_ttl_seconds = 120
adapter_timeout_ms = 2500

[[sources]]
name = "notion"
kind = "notion"
entities = ["contacts", "projects"]

[sources.endpoints]
contacts = "https://notion-proxy.example.org/v1/people"
projects = "https://notion-proxy.example.org/v1/projects"

[sources.headers]
Authorization = "Bearer secret"

[[sources]]
name = "linkedin"
kind = "linkedin"
entities = ["contacts"]
path = "./exports/Connections.csv"

[[sources]]
name = "xero"
kind = "xero"
entities = ["finance"]
endpoints = { finance = "https://xero-proxy.example.org/transactions" }
timeout_seconds = 20
"#;

    #[test]
    fn test_parse_sample_config() {
        let config = AggregatorConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.sources.len(), 3);
        assert_eq!(config.sources[0].kind, SourceKind::Notion);
        assert_eq!(
            config.sources[0].entities,
            vec![EntityKind::Contacts, EntityKind::Projects]
        );
        assert!(config.aggregator.cache_enabled);
        assert_eq!(config.settings().adapter_timeout, Duration::from_millis(2500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_when_aggregator_table_missing() {
        let config = AggregatorConfig::from_toml_str("").unwrap();
        assert_eq!(config.aggregator.cache_ttl_seconds, 300);
        assert_eq!(config.aggregator.adapter_timeout_ms, 10_000);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("PLACEMAT_TEST_SUPABASE_URL", "https://db.example.org/rest/v1/contacts");

        let toml_content = r#"
[[sources]]
name = "supabase"
kind = "supabase"
entities = ["contacts"]
endpoints = { contacts = "${PLACEMAT_TEST_SUPABASE_URL}" }
"#;

        let config = AggregatorConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.sources[0].endpoints.contacts.as_deref(),
            Some("https://db.example.org/rest/v1/contacts")
        );

        std::env::remove_var("PLACEMAT_TEST_SUPABASE_URL");
    }

    #[test]
    fn test_entity_must_match_kind() {
        let toml_content = r#"
[[sources]]
name = "gmail"
kind = "gmail"
entities = ["finance"]
endpoints = { finance = "https://gmail-proxy.example.org" }
"#;
        let config = AggregatorConfig::from_toml_str(toml_content).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("do not provide finance"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let toml_content = r#"
[[sources]]
name = "notion"
kind = "notion"
entities = ["contacts"]
endpoints = { contacts = "https://a.example.org" }

[[sources]]
name = "notion"
kind = "supabase"
entities = ["projects"]
endpoints = { projects = "https://b.example.org" }
"#;
        let config = AggregatorConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_linkedin_requires_path() {
        let toml_content = r#"
[[sources]]
name = "linkedin"
kind = "linkedin"
entities = ["contacts"]
"#;
        let config = AggregatorConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_every_entity_needs_its_own_endpoint() {
        let toml_content = r#"
[[sources]]
name = "supabase"
kind = "supabase"
entities = ["contacts", "projects"]
endpoints = { contacts = "https://db.example.org/rest/v1/contacts" }
"#;
        let config = AggregatorConfig::from_toml_str(toml_content).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sources[0].endpoints.projects"));
    }

    #[test]
    fn test_build_facade_registers_each_entity() {
        let config = AggregatorConfig::from_toml_str(SAMPLE).unwrap();
        let facade = config.build_facade(Arc::new(NoopCache)).unwrap();
        assert_eq!(facade.contact_sources(), vec!["notion", "linkedin"]);
        assert_eq!(facade.project_sources(), vec!["notion"]);
        assert_eq!(facade.finance_sources(), vec!["xero"]);
        assert_eq!(facade.settings().cache_ttl, Duration::from_secs(120));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = AggregatorConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.sources[2].name, "xero");
    }
}
