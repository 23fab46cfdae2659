use thiserror::Error;

pub type ExportResult<T> = Result<T, ExportError>;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    #[error("no events found for resource ids [{}]", resource_ids.join(", "))]
    NoEventsFound { resource_ids: Vec<String> },
    #[error("data integrity error: {0}")]
    DataIntegrity(String),
    #[error("registry transport error: {0}")]
    Transport(String),
    #[error("event store error: {0}")]
    Store(String),
    #[error("artifact io error: {0}")]
    Io(String),
}

impl ExportError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::InvalidFilter(message.into())
    }

    pub fn data_integrity(message: impl Into<String>) -> Self {
        Self::DataIntegrity(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::InvalidFilter(_) => "invalid_filter",
            Self::NoEventsFound { .. } => "no_events_found",
            Self::DataIntegrity(_) => "data_integrity",
            Self::Transport(_) => "transport",
            Self::Store(_) => "store",
            Self::Io(_) => "io",
        }
    }
}

impl From<rusqlite::Error> for ExportError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Store(error.to_string())
    }
}
