//! Request filters.
//!
//! Each entity family has a raw `*Query` (what a caller sends, camelCase keys,
//! unknown keys ignored) and a `*Filters` value produced by validating it.
//! Validation happens before any source is contacted; nothing is clamped.

use crate::domain::model::{
    EntityKind, FinanceKind, ProjectStatus, UnifiedContact, UnifiedFinanceRecord, UnifiedProject,
};
use crate::domain::ports::{Entity, EntityFilters, PageRequest};
use crate::utils::error::{AggregatorError, Result};
use crate::utils::validation::{validate_choice, validate_range};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const CONTACT_LIMIT_MAX: i64 = 500;
pub const CONTACT_LIMIT_DEFAULT: i64 = 50;
pub const PROJECT_LIMIT_MAX: i64 = 100;
pub const PROJECT_LIMIT_DEFAULT: i64 = 25;
pub const FINANCE_LIMIT_MAX: i64 = 500;
pub const FINANCE_LIMIT_DEFAULT: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    const CHOICES: [(&'static str, SortOrder); 2] = [("asc", SortOrder::Asc), ("desc", SortOrder::Desc)];

    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

// ---------------------------------------------------------------------------
// Contacts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactQuery {
    pub search: Option<String>,
    pub company: Option<String>,
    pub data_source: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub strategic_value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ContactSortBy {
    Name,
    Email,
    Organization,
    Score,
    LastInteraction,
}

impl ContactSortBy {
    const CHOICES: [(&'static str, ContactSortBy); 5] = [
        ("name", ContactSortBy::Name),
        ("email", ContactSortBy::Email),
        ("organization", ContactSortBy::Organization),
        ("score", ContactSortBy::Score),
        ("lastInteraction", ContactSortBy::LastInteraction),
    ];
}

/// Bands over the enrichment score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategicValue {
    High,
    Medium,
    Low,
}

impl StrategicValue {
    const CHOICES: [(&'static str, StrategicValue); 3] = [
        ("high", StrategicValue::High),
        ("medium", StrategicValue::Medium),
        ("low", StrategicValue::Low),
    ];

    pub fn contains(self, score: f64) -> bool {
        match self {
            StrategicValue::High => score >= 70.0,
            StrategicValue::Medium => (40.0..70.0).contains(&score),
            StrategicValue::Low => score < 40.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategicValue::High => "high",
            StrategicValue::Medium => "medium",
            StrategicValue::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactFilters {
    pub search: Option<String>,
    pub company: Option<String>,
    pub data_source: Option<String>,
    pub sort_by: ContactSortBy,
    pub sort_order: SortOrder,
    pub strategic_value: Option<StrategicValue>,
    #[serde(skip)]
    pub page: PageRequest,
}

impl ContactFilters {
    pub fn from_query(query: ContactQuery, known_sources: &[String]) -> Result<Self> {
        let page = page_request(
            query.limit,
            query.offset,
            CONTACT_LIMIT_DEFAULT,
            CONTACT_LIMIT_MAX,
        )?;
        let sort_by = match text(query.sort_by) {
            Some(value) => validate_choice("sortBy", &value, &ContactSortBy::CHOICES)?,
            None => ContactSortBy::Name,
        };
        let strategic_value = text(query.strategic_value)
            .map(|value| validate_choice("strategicValue", &value, &StrategicValue::CHOICES))
            .transpose()?;

        Ok(Self {
            search: lowered(query.search),
            company: lowered(query.company),
            data_source: data_source(query.data_source, known_sources)?,
            sort_by,
            sort_order: sort_order(query.sort_order, SortOrder::Asc)?,
            strategic_value,
            page,
        })
    }
}

impl EntityFilters for ContactFilters {
    fn page(&self) -> PageRequest {
        self.page
    }

    fn data_source(&self) -> Option<&str> {
        self.data_source.as_deref()
    }

    fn query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        push_param(&mut params, "search", self.search.as_deref());
        push_param(&mut params, "company", self.company.as_deref());
        push_param(
            &mut params,
            "strategicValue",
            self.strategic_value.map(|v| v.as_str()),
        );
        params
    }
}

impl Entity for UnifiedContact {
    type Filters = ContactFilters;

    const KIND: EntityKind = EntityKind::Contacts;

    fn id(&self) -> &str {
        &self.id
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn set_source(&mut self, source: &str) {
        self.source = source.to_string();
    }

    fn matches(&self, filters: &ContactFilters) -> bool {
        if let Some(source) = &filters.data_source {
            if &self.source != source {
                return false;
            }
        }
        if let Some(needle) = &filters.search {
            let hit = contains_ci(&self.name, needle)
                || self.email.as_deref().is_some_and(|e| contains_ci(e, needle))
                || self
                    .organization
                    .as_deref()
                    .is_some_and(|o| contains_ci(o, needle));
            if !hit {
                return false;
            }
        }
        if let Some(company) = &filters.company {
            if !self
                .organization
                .as_deref()
                .is_some_and(|o| contains_ci(o, company))
            {
                return false;
            }
        }
        if let Some(band) = filters.strategic_value {
            return self.score().is_some_and(|score| band.contains(score));
        }
        true
    }

    fn compare(&self, other: &Self, filters: &ContactFilters) -> Ordering {
        let ordering = match filters.sort_by {
            ContactSortBy::Name => cmp_text(&self.name, &other.name),
            ContactSortBy::Email => cmp_opt_text(self.email.as_deref(), other.email.as_deref()),
            ContactSortBy::Organization => cmp_opt_text(
                self.organization.as_deref(),
                other.organization.as_deref(),
            ),
            ContactSortBy::Score => cmp_opt_f64(self.score(), other.score()),
            ContactSortBy::LastInteraction => self.last_interaction().cmp(&other.last_interaction()),
        };
        filters.sort_order.apply(ordering)
    }
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub data_source: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProjectSortBy {
    Name,
    Status,
    Budget,
    Revenue,
}

impl ProjectSortBy {
    const CHOICES: [(&'static str, ProjectSortBy); 4] = [
        ("name", ProjectSortBy::Name),
        ("status", ProjectSortBy::Status),
        ("budget", ProjectSortBy::Budget),
        ("revenue", ProjectSortBy::Revenue),
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFilters {
    pub search: Option<String>,
    pub status: Option<ProjectStatus>,
    pub data_source: Option<String>,
    pub sort_by: ProjectSortBy,
    pub sort_order: SortOrder,
    #[serde(skip)]
    pub page: PageRequest,
}

impl ProjectFilters {
    pub fn from_query(query: ProjectQuery, known_sources: &[String]) -> Result<Self> {
        let page = page_request(
            query.limit,
            query.offset,
            PROJECT_LIMIT_DEFAULT,
            PROJECT_LIMIT_MAX,
        )?;
        let status = text(query.status)
            .map(|value| validate_choice("status", &value, &ProjectStatus::CHOICES))
            .transpose()?;
        let sort_by = match text(query.sort_by) {
            Some(value) => validate_choice("sortBy", &value, &ProjectSortBy::CHOICES)?,
            None => ProjectSortBy::Name,
        };

        Ok(Self {
            search: lowered(query.search),
            status,
            data_source: data_source(query.data_source, known_sources)?,
            sort_by,
            sort_order: sort_order(query.sort_order, SortOrder::Asc)?,
            page,
        })
    }
}

impl EntityFilters for ProjectFilters {
    fn page(&self) -> PageRequest {
        self.page
    }

    fn data_source(&self) -> Option<&str> {
        self.data_source.as_deref()
    }

    fn query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        push_param(&mut params, "search", self.search.as_deref());
        push_param(&mut params, "status", self.status.map(|s| s.as_str()));
        params
    }
}

impl Entity for UnifiedProject {
    type Filters = ProjectFilters;

    const KIND: EntityKind = EntityKind::Projects;

    fn id(&self) -> &str {
        &self.id
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn set_source(&mut self, source: &str) {
        self.source = source.to_string();
    }

    fn matches(&self, filters: &ProjectFilters) -> bool {
        if let Some(source) = &filters.data_source {
            if &self.source != source {
                return false;
            }
        }
        if let Some(status) = filters.status {
            if self.status != status {
                return false;
            }
        }
        match &filters.search {
            Some(needle) => contains_ci(&self.name, needle),
            None => true,
        }
    }

    fn compare(&self, other: &Self, filters: &ProjectFilters) -> Ordering {
        let ordering = match filters.sort_by {
            ProjectSortBy::Name => cmp_text(&self.name, &other.name),
            ProjectSortBy::Status => self.status.cmp(&other.status),
            ProjectSortBy::Budget => cmp_opt_f64(self.budget, other.budget),
            ProjectSortBy::Revenue => cmp_opt_f64(self.revenue_actual, other.revenue_actual),
        };
        filters.sort_order.apply(ordering)
    }
}

// ---------------------------------------------------------------------------
// Finance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceQuery {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub data_source: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FinanceSortBy {
    Date,
    Amount,
}

impl FinanceSortBy {
    const CHOICES: [(&'static str, FinanceSortBy); 2] =
        [("date", FinanceSortBy::Date), ("amount", FinanceSortBy::Amount)];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceFilters {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub kind: Option<FinanceKind>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub data_source: Option<String>,
    pub sort_by: FinanceSortBy,
    pub sort_order: SortOrder,
    #[serde(skip)]
    pub page: PageRequest,
}

impl FinanceFilters {
    pub fn from_query(query: FinanceQuery, known_sources: &[String]) -> Result<Self> {
        let page = page_request(
            query.limit,
            query.offset,
            FINANCE_LIMIT_DEFAULT,
            FINANCE_LIMIT_MAX,
        )?;
        let date_from = text(query.date_from)
            .map(|value| parse_date("dateFrom", &value))
            .transpose()?;
        let date_to = text(query.date_to)
            .map(|value| parse_date("dateTo", &value))
            .transpose()?;
        if let (Some(from), Some(to)) = (date_from, date_to) {
            if from > to {
                return Err(AggregatorError::validation(
                    "dateFrom",
                    from,
                    format!("Must not be after dateTo ({})", to),
                ));
            }
        }
        let kind = text(query.kind)
            .map(|value| validate_choice("type", &value, &FinanceKind::CHOICES))
            .transpose()?;
        let sort_by = match text(query.sort_by) {
            Some(value) => validate_choice("sortBy", &value, &FinanceSortBy::CHOICES)?,
            None => FinanceSortBy::Date,
        };

        Ok(Self {
            date_from,
            date_to,
            kind,
            category: lowered(query.category),
            search: lowered(query.search),
            data_source: data_source(query.data_source, known_sources)?,
            sort_by,
            sort_order: sort_order(query.sort_order, SortOrder::Desc)?,
            page,
        })
    }
}

impl EntityFilters for FinanceFilters {
    fn page(&self) -> PageRequest {
        self.page
    }

    fn data_source(&self) -> Option<&str> {
        self.data_source.as_deref()
    }

    fn query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        let from = self.date_from.map(|d| d.to_string());
        let to = self.date_to.map(|d| d.to_string());
        push_param(&mut params, "dateFrom", from.as_deref());
        push_param(&mut params, "dateTo", to.as_deref());
        push_param(
            &mut params,
            "type",
            self.kind.map(|k| match k {
                FinanceKind::Income => "income",
                FinanceKind::Expense => "expense",
            }),
        );
        push_param(&mut params, "category", self.category.as_deref());
        push_param(&mut params, "search", self.search.as_deref());
        params
    }
}

impl Entity for UnifiedFinanceRecord {
    type Filters = FinanceFilters;

    const KIND: EntityKind = EntityKind::Finance;

    fn id(&self) -> &str {
        &self.id
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn set_source(&mut self, source: &str) {
        self.source = source.to_string();
    }

    fn matches(&self, filters: &FinanceFilters) -> bool {
        if let Some(source) = &filters.data_source {
            if &self.source != source {
                return false;
            }
        }
        if filters.date_from.is_some_and(|from| self.date < from) {
            return false;
        }
        if filters.date_to.is_some_and(|to| self.date > to) {
            return false;
        }
        if filters.kind.is_some_and(|kind| self.kind != kind) {
            return false;
        }
        if let Some(category) = &filters.category {
            if !self.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        match &filters.search {
            Some(needle) => {
                contains_ci(&self.category, needle)
                    || self
                        .counterparty
                        .as_deref()
                        .is_some_and(|c| contains_ci(c, needle))
            }
            None => true,
        }
    }

    fn compare(&self, other: &Self, filters: &FinanceFilters) -> Ordering {
        let ordering = match filters.sort_by {
            FinanceSortBy::Date => self.date.cmp(&other.date),
            FinanceSortBy::Amount => self.amount.value.total_cmp(&other.amount.value),
        };
        filters.sort_order.apply(ordering)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn lowered(value: Option<String>) -> Option<String> {
    text(value).map(|v| v.to_lowercase())
}

fn page_request(
    limit: Option<i64>,
    offset: Option<i64>,
    default_limit: i64,
    max_limit: i64,
) -> Result<PageRequest> {
    let limit = limit.unwrap_or(default_limit);
    validate_range("limit", limit, 1, max_limit)?;
    let offset = offset.unwrap_or(0);
    if offset < 0 {
        return Err(AggregatorError::validation(
            "offset",
            offset,
            "Value must be at least 0",
        ));
    }
    let offset = usize::try_from(offset)
        .map_err(|_| AggregatorError::validation("offset", offset, "Value is too large"))?;
    Ok(PageRequest {
        limit: limit as usize,
        offset,
    })
}

fn sort_order(value: Option<String>, default: SortOrder) -> Result<SortOrder> {
    match text(value) {
        Some(value) => validate_choice("sortOrder", &value, &SortOrder::CHOICES),
        None => Ok(default),
    }
}

fn data_source(value: Option<String>, known_sources: &[String]) -> Result<Option<String>> {
    let Some(value) = text(value) else {
        return Ok(None);
    };
    match known_sources.iter().find(|s| s.eq_ignore_ascii_case(&value)) {
        Some(known) => Ok(Some(known.clone())),
        None => Err(AggregatorError::validation(
            "dataSource",
            &value,
            format!("Must be one of: {}", known_sources.join(", ")),
        )),
    }
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.date_naive())
        .map_err(|_| AggregatorError::validation(field, value, "Expected an ISO 8601 date"))
}

fn push_param(params: &mut Vec<(String, String)>, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        params.push((key.to_string(), value.to_string()));
    }
}

/// `needle` is already lowercased by normalization.
fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

fn cmp_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn cmp_opt_text(a: Option<&str>, b: Option<&str>) -> Ordering {
    a.map(str::to_lowercase).cmp(&b.map(str::to_lowercase))
}

fn cmp_opt_f64(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
