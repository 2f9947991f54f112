//! Per-source record shapes and their mapping onto the unified entities.
//!
//! Every source kind gets its own variant; `into_unified` matches all of them,
//! so adding a source means adding its mapping.

use crate::domain::model::{
    ContactEnrichment, EntityKind, FinanceKind, Money, ProjectStatus, UnifiedContact,
    UnifiedFinanceRecord, UnifiedProject,
};
use crate::utils::error::{AggregatorError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Notion,
    Supabase,
    Gmail,
    #[serde(rename = "linkedin")]
    LinkedIn,
    Xero,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Notion => "notion",
            SourceKind::Supabase => "supabase",
            SourceKind::Gmail => "gmail",
            SourceKind::LinkedIn => "linkedin",
            SourceKind::Xero => "xero",
        }
    }

    pub fn supports(&self, entity: EntityKind) -> bool {
        matches!(
            (self, entity),
            (SourceKind::Notion, EntityKind::Contacts | EntityKind::Projects)
                | (SourceKind::Supabase, EntityKind::Contacts | EntityKind::Projects)
                | (SourceKind::Gmail, EntityKind::Contacts)
                | (SourceKind::LinkedIn, EntityKind::Contacts)
                | (SourceKind::Xero, EntityKind::Finance)
        )
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Contacts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotionPerson {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub company: Option<String>,
    pub role: Option<String>,
    /// "Strong" / "Medium" / "Weak".
    pub relationship: Option<String>,
    pub last_contacted: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailContact {
    pub id: String,
    pub display_name: Option<String>,
    pub email_address: String,
    pub domain: Option<String>,
    #[serde(default)]
    pub thread_count: u32,
    pub last_email_at: Option<DateTime<Utc>>,
}

/// One row of a LinkedIn "Connections.csv" export.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkedInConnection {
    #[serde(rename = "First Name", default)]
    pub first_name: String,
    #[serde(rename = "Last Name", default)]
    pub last_name: String,
    #[serde(rename = "URL", default)]
    pub url: String,
    #[serde(rename = "Email Address", default)]
    pub email_address: String,
    #[serde(rename = "Company", default)]
    pub company: String,
    #[serde(rename = "Position", default)]
    pub position: String,
    #[serde(rename = "Connected On", default)]
    pub connected_on: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseContact {
    pub id: String,
    pub full_name: String,
    pub email: Option<String>,
    pub organization: Option<String>,
    pub title: Option<String>,
    pub strategic_score: Option<f64>,
    pub relationship_strength: Option<f64>,
    pub last_interaction: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub enum SourceContact {
    Notion(NotionPerson),
    Gmail(GmailContact),
    LinkedIn(LinkedInConnection),
    Supabase(SupabaseContact),
}

impl SourceContact {
    pub fn into_unified(self, source: &str) -> UnifiedContact {
        match self {
            SourceContact::Notion(person) => UnifiedContact {
                id: person.id,
                name: person.name,
                email: person.email,
                organization: person.company,
                title: person.role,
                source: source.to_string(),
                enrichment: enrichment(
                    person.relationship.as_deref().and_then(relationship_label),
                    None,
                    person.last_contacted,
                ),
            },
            SourceContact::Gmail(contact) => {
                let name = contact
                    .display_name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| contact.email_address.clone());
                let strength = (contact.thread_count > 0)
                    .then(|| (f64::from(contact.thread_count) / 20.0).min(1.0));
                UnifiedContact {
                    id: contact.id,
                    name,
                    email: Some(contact.email_address),
                    organization: contact.domain,
                    title: None,
                    source: source.to_string(),
                    enrichment: enrichment(strength, None, contact.last_email_at),
                }
            }
            SourceContact::LinkedIn(row) => {
                let name = format!("{} {}", row.first_name.trim(), row.last_name.trim())
                    .trim()
                    .to_string();
                let id = if row.url.trim().is_empty() {
                    format!("linkedin:{}", name.to_lowercase().replace(' ', "-"))
                } else {
                    row.url.trim().to_string()
                };
                UnifiedContact {
                    id,
                    name,
                    email: non_empty(row.email_address),
                    organization: non_empty(row.company),
                    title: non_empty(row.position),
                    source: source.to_string(),
                    enrichment: enrichment(None, None, parse_connected_on(&row.connected_on)),
                }
            }
            SourceContact::Supabase(contact) => UnifiedContact {
                id: contact.id,
                name: contact.full_name,
                email: contact.email,
                organization: contact.organization,
                title: contact.title,
                source: source.to_string(),
                enrichment: enrichment(
                    contact.relationship_strength,
                    contact.strategic_score,
                    contact.last_interaction,
                ),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotionProject {
    pub id: String,
    pub name: String,
    pub status: String,
    pub budget: Option<f64>,
    pub revenue_actual: Option<f64>,
    #[serde(default)]
    pub people: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseProject {
    pub id: String,
    pub name: String,
    pub status: String,
    pub budget: Option<f64>,
    pub revenue_actual: Option<f64>,
    #[serde(default)]
    pub contact_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum SourceProject {
    Notion(NotionProject),
    Supabase(SupabaseProject),
}

impl SourceProject {
    pub fn into_unified(self, source: &str) -> Result<UnifiedProject> {
        let (id, name, status, budget, revenue_actual, contact_ids) = match self {
            SourceProject::Notion(p) => (p.id, p.name, p.status, p.budget, p.revenue_actual, p.people),
            SourceProject::Supabase(p) => {
                (p.id, p.name, p.status, p.budget, p.revenue_actual, p.contact_ids)
            }
        };
        let status = ProjectStatus::from_label(&status).ok_or_else(|| {
            AggregatorError::adapter(
                source,
                format!("project '{}' has unknown status '{}'", id, status),
            )
        })?;
        Ok(UnifiedProject {
            id,
            name,
            status,
            budget,
            revenue_actual,
            contact_ids,
            source: source.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Finance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct XeroTransaction {
    #[serde(rename = "BankTransactionID")]
    pub bank_transaction_id: String,
    pub date: NaiveDate,
    /// Unsigned; direction comes from `type`.
    pub total: f64,
    pub currency_code: String,
    /// "RECEIVE" or "SPEND".
    #[serde(rename = "Type")]
    pub kind: String,
    pub account_name: Option<String>,
    pub contact_name: Option<String>,
}

#[derive(Debug, Clone)]
pub enum SourceFinance {
    Xero(XeroTransaction),
}

impl SourceFinance {
    pub fn into_unified(self, source: &str) -> Result<UnifiedFinanceRecord> {
        match self {
            SourceFinance::Xero(tx) => {
                let kind = match tx.kind.to_ascii_uppercase().as_str() {
                    "RECEIVE" | "RECEIVE-OVERPAYMENT" | "RECEIVE-PREPAYMENT" => FinanceKind::Income,
                    "SPEND" | "SPEND-OVERPAYMENT" | "SPEND-PREPAYMENT" => FinanceKind::Expense,
                    other => {
                        return Err(AggregatorError::adapter(
                            source,
                            format!(
                                "transaction '{}' has unknown type '{}'",
                                tx.bank_transaction_id, other
                            ),
                        ))
                    }
                };
                let magnitude = tx.total.abs();
                let value = match kind {
                    FinanceKind::Income => magnitude,
                    FinanceKind::Expense => -magnitude,
                };
                Ok(UnifiedFinanceRecord {
                    id: tx.bank_transaction_id,
                    date: tx.date,
                    amount: Money {
                        value,
                        currency: tx.currency_code,
                    },
                    category: tx
                        .account_name
                        .unwrap_or_else(|| "Uncategorised".to_string()),
                    kind,
                    counterparty: tx.contact_name,
                    source: source.to_string(),
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Decoding raw JSON items from HTTP sources
// ---------------------------------------------------------------------------

/// Builds a unified entity from one raw item of a given source kind.
pub trait FromSource: Sized {
    fn from_source(kind: SourceKind, source: &str, item: serde_json::Value) -> Result<Self>;
}

impl FromSource for UnifiedContact {
    fn from_source(kind: SourceKind, source: &str, item: serde_json::Value) -> Result<Self> {
        let raw = match kind {
            SourceKind::Notion => SourceContact::Notion(decode(source, item)?),
            SourceKind::Gmail => SourceContact::Gmail(decode(source, item)?),
            SourceKind::LinkedIn => SourceContact::LinkedIn(decode(source, item)?),
            SourceKind::Supabase => SourceContact::Supabase(decode(source, item)?),
            SourceKind::Xero => return Err(unsupported(kind, source, EntityKind::Contacts)),
        };
        Ok(raw.into_unified(source))
    }
}

impl FromSource for UnifiedProject {
    fn from_source(kind: SourceKind, source: &str, item: serde_json::Value) -> Result<Self> {
        let raw = match kind {
            SourceKind::Notion => SourceProject::Notion(decode(source, item)?),
            SourceKind::Supabase => SourceProject::Supabase(decode(source, item)?),
            SourceKind::Gmail | SourceKind::LinkedIn | SourceKind::Xero => {
                return Err(unsupported(kind, source, EntityKind::Projects))
            }
        };
        raw.into_unified(source)
    }
}

impl FromSource for UnifiedFinanceRecord {
    fn from_source(kind: SourceKind, source: &str, item: serde_json::Value) -> Result<Self> {
        let raw = match kind {
            SourceKind::Xero => SourceFinance::Xero(decode(source, item)?),
            SourceKind::Notion | SourceKind::Supabase | SourceKind::Gmail | SourceKind::LinkedIn => {
                return Err(unsupported(kind, source, EntityKind::Finance))
            }
        };
        raw.into_unified(source)
    }
}

fn decode<T: DeserializeOwned>(source: &str, item: serde_json::Value) -> Result<T> {
    serde_json::from_value(item)
        .map_err(|e| AggregatorError::adapter(source, format!("malformed record: {}", e)))
}

fn unsupported(kind: SourceKind, source: &str, entity: EntityKind) -> AggregatorError {
    AggregatorError::adapter(source, format!("{} sources do not provide {}", kind, entity))
}

fn enrichment(
    relationship_strength: Option<f64>,
    score: Option<f64>,
    last_interaction: Option<DateTime<Utc>>,
) -> Option<ContactEnrichment> {
    if relationship_strength.is_none() && score.is_none() && last_interaction.is_none() {
        return None;
    }
    Some(ContactEnrichment {
        relationship_strength,
        score,
        last_interaction,
    })
}

fn relationship_label(label: &str) -> Option<f64> {
    match label.trim().to_ascii_lowercase().as_str() {
        "strong" => Some(0.9),
        "medium" => Some(0.6),
        "weak" => Some(0.3),
        _ => None,
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// LinkedIn writes "12 Mar 2023".
fn parse_connected_on(value: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(value.trim(), "%d %b %Y")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
