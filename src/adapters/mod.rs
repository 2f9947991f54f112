// Adapters layer: concrete sources and cache backends.

pub mod cache;
pub mod http;
pub mod linkedin_csv;
pub mod memory;

pub use cache::{MemoryCache, NoopCache};
pub use http::HttpSourceAdapter;
pub use linkedin_csv::LinkedInCsvAdapter;
pub use memory::StaticSource;
