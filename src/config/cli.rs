use crate::domain::filters::{ContactQuery, FinanceQuery, ProjectQuery};
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "placemat-aggregator")]
#[command(about = "Query contacts, projects and finance data across every configured source")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "aggregator.toml")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Contacts from every contact source
    Contacts(ContactArgs),
    /// Projects from every project source
    Projects(ProjectArgs),
    /// Income and expense records
    Finance(FinanceArgs),
    /// Probe every configured source
    Health,
}

#[derive(Debug, Clone, Args)]
pub struct ContactArgs {
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long)]
    pub company: Option<String>,
    #[arg(long)]
    pub data_source: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    pub limit: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    pub offset: Option<i64>,
    /// name, email, organization, score or lastInteraction
    #[arg(long)]
    pub sort_by: Option<String>,
    #[arg(long)]
    pub sort_order: Option<String>,
    /// high, medium or low
    #[arg(long)]
    pub strategic_value: Option<String>,
}

impl From<ContactArgs> for ContactQuery {
    fn from(args: ContactArgs) -> Self {
        ContactQuery {
            search: args.search,
            company: args.company,
            data_source: args.data_source,
            limit: args.limit,
            offset: args.offset,
            sort_by: args.sort_by,
            sort_order: args.sort_order,
            strategic_value: args.strategic_value,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ProjectArgs {
    #[arg(long)]
    pub search: Option<String>,
    /// active, completed, paused or cancelled
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub data_source: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    pub limit: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    pub offset: Option<i64>,
    #[arg(long)]
    pub sort_by: Option<String>,
    #[arg(long)]
    pub sort_order: Option<String>,
}

impl From<ProjectArgs> for ProjectQuery {
    fn from(args: ProjectArgs) -> Self {
        ProjectQuery {
            search: args.search,
            status: args.status,
            data_source: args.data_source,
            limit: args.limit,
            offset: args.offset,
            sort_by: args.sort_by,
            sort_order: args.sort_order,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct FinanceArgs {
    /// ISO 8601 date, inclusive
    #[arg(long)]
    pub date_from: Option<String>,
    /// ISO 8601 date, inclusive
    #[arg(long)]
    pub date_to: Option<String>,
    /// income or expense
    #[arg(long = "type")]
    pub kind: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long)]
    pub data_source: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    pub limit: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    pub offset: Option<i64>,
    #[arg(long)]
    pub sort_by: Option<String>,
    #[arg(long)]
    pub sort_order: Option<String>,
}

impl From<FinanceArgs> for FinanceQuery {
    fn from(args: FinanceArgs) -> Self {
        FinanceQuery {
            date_from: args.date_from,
            date_to: args.date_to,
            kind: args.kind,
            category: args.category,
            search: args.search,
            data_source: args.data_source,
            limit: args.limit,
            offset: args.offset,
            sort_by: args.sort_by,
            sort_order: args.sort_order,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_contacts_command() {
        let cli = CliConfig::try_parse_from([
            "placemat-aggregator",
            "--config",
            "prod.toml",
            "contacts",
            "--search",
            "ada",
            "--limit",
            "20",
            "--data-source",
            "notion",
        ])
        .unwrap();
        assert_eq!(cli.config, "prod.toml");
        match cli.command {
            Command::Contacts(args) => {
                let query = ContactQuery::from(args);
                assert_eq!(query.search.as_deref(), Some("ada"));
                assert_eq!(query.limit, Some(20));
                assert_eq!(query.data_source.as_deref(), Some("notion"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_negative_offset_reaches_validation() {
        let cli = CliConfig::try_parse_from([
            "placemat-aggregator",
            "finance",
            "--offset",
            "-3",
            "--type",
            "income",
        ])
        .unwrap();
        match cli.command {
            Command::Finance(args) => {
                assert_eq!(args.offset, Some(-3));
                assert_eq!(args.kind.as_deref(), Some("income"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
