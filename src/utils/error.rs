use thiserror::Error;

#[derive(Error, Debug)]
pub enum AggregatorError {
    #[error("Invalid value for '{field}' ({value}): {reason}")]
    Validation {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Source '{source_name}' unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    #[error("All sources failed for {entity}: {}", failures.join("; "))]
    AllSourcesFailed {
        entity: String,
        failures: Vec<String>,
    },

    #[error("No sources configured for {entity}")]
    NoSources { entity: String },

    #[error("Adapter '{source_name}' error: {message}")]
    Adapter {
        source_name: String,
        message: String,
    },

    #[error("Cache error: {message}")]
    Cache { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Who is expected to act on an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad input from the caller; retrying the same request will fail again.
    Client,
    /// One or more upstream systems could not be reached.
    Upstream,
    Internal,
}

impl AggregatorError {
    pub fn validation(field: &str, value: impl ToString, reason: impl Into<String>) -> Self {
        AggregatorError::Validation {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn adapter(source_name: &str, message: impl Into<String>) -> Self {
        AggregatorError::Adapter {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        AggregatorError::Config {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            AggregatorError::Validation { .. } => ErrorCategory::Client,
            AggregatorError::SourceUnavailable { .. }
            | AggregatorError::AllSourcesFailed { .. }
            | AggregatorError::Adapter { .. }
            | AggregatorError::Http(_) => ErrorCategory::Upstream,
            AggregatorError::NoSources { .. }
            | AggregatorError::Cache { .. }
            | AggregatorError::Config { .. }
            | AggregatorError::Csv(_)
            | AggregatorError::Io(_)
            | AggregatorError::Serialization(_) => ErrorCategory::Internal,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.category() == ErrorCategory::Client
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            AggregatorError::Validation { field, reason, .. } => {
                format!("Invalid request parameter '{}': {}", field, reason)
            }
            AggregatorError::SourceUnavailable { source_name, .. } => {
                format!("The '{}' data source is currently unavailable", source_name)
            }
            AggregatorError::AllSourcesFailed { entity, .. } => {
                format!("No data source for {} could be reached", entity)
            }
            AggregatorError::NoSources { entity } => {
                format!("No data sources are configured for {}", entity)
            }
            AggregatorError::Config { message } => format!("Configuration problem: {}", message),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
