pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::AggregatorConfig;

pub use crate::core::facade::{AggregationFacade, AggregationFacadeBuilder, FacadeSettings};
pub use domain::filters::{ContactQuery, FinanceQuery, ProjectQuery};
pub use domain::model::{
    AggregationResult, HealthStatus, UnifiedContact, UnifiedFinanceRecord, UnifiedProject,
};
pub use utils::error::{AggregatorError, Result};
