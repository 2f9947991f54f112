pub mod facade;
pub mod fan_out;
pub mod merge;

pub use crate::domain::model::{AggregationResult, HealthStatus, SourcePage};
pub use crate::domain::ports::{
    CacheStore, Entity, EntityFilters, HealthProbe, PageRequest, SourceAdapter,
};
pub use crate::utils::error::Result;
