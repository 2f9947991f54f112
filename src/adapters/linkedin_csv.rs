use crate::core::{Entity, HealthProbe, SourceAdapter, SourcePage};
use crate::domain::filters::ContactFilters;
use crate::domain::model::{HealthReport, UnifiedContact};
use crate::domain::sources::{LinkedInConnection, SourceContact};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;

const HEADER_PREFIX: &str = "First Name";

/// Contacts from a LinkedIn "Connections.csv" data export.
///
/// The file is re-read on every fetch, so replacing the export takes effect
/// without a restart.
pub struct LinkedInCsvAdapter {
    name: String,
    path: PathBuf,
}

impl LinkedInCsvAdapter {
    pub fn new(name: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            path: path.into(),
        }
    }

    async fn load(&self) -> Result<Vec<UnifiedContact>> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        parse_connections(&self.name, &content)
    }
}

/// Parses an export, skipping the notes LinkedIn puts above the header row.
pub fn parse_connections(source: &str, content: &str) -> Result<Vec<UnifiedContact>> {
    let content = content.trim_start_matches('\u{feff}');
    let body = content
        .lines()
        .position(|line| line.trim_start().starts_with(HEADER_PREFIX))
        .map(|index| content.lines().skip(index).collect::<Vec<_>>().join("\n"))
        .unwrap_or_else(|| content.to_string());

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let mut contacts = Vec::new();
    for row in reader.deserialize::<LinkedInConnection>() {
        let row = row?;
        if row.first_name.is_empty() && row.last_name.is_empty() {
            continue;
        }
        contacts.push(SourceContact::LinkedIn(row).into_unified(source));
    }
    Ok(contacts)
}

#[async_trait]
impl HealthProbe for LinkedInCsvAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn health_check(&self) -> Result<HealthReport> {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) if meta.is_file() => Ok(HealthReport::healthy(Some(serde_json::json!({
                "path": self.path.display().to_string(),
                "bytes": meta.len(),
            })))),
            Ok(_) => Ok(HealthReport::unhealthy(format!(
                "{} is not a file",
                self.path.display()
            ))),
            Err(e) => Ok(HealthReport::unhealthy(format!(
                "{}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

#[async_trait]
impl SourceAdapter<UnifiedContact> for LinkedInCsvAdapter {
    async fn fetch(&self, filters: &ContactFilters) -> Result<SourcePage<UnifiedContact>> {
        let contacts = self.load().await?;
        let read = contacts.len();
        let items: Vec<UnifiedContact> = contacts
            .into_iter()
            .filter(|contact| contact.matches(filters))
            .collect();
        tracing::debug!(
            "📂 {}: {} of {} connections match",
            self.name,
            items.len(),
            read
        );
        Ok(SourcePage::new(items))
    }
}
