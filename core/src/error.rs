use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RanchoError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parse error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Spreadsheet '{title}' not found")]
    SpreadsheetNotFound { title: String },

    #[error("Worksheet '{title}' not found")]
    WorksheetNotFound { title: String },

    #[error("Column '{column}' not found in '{sheet}'")]
    ColumnNotFound { column: String, sheet: String },

    #[error("No store connection available")]
    NotConnected,

    #[error("Credentials error: {0}")]
    Credentials(String),

    #[error("Store API error: {0}")]
    Api(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Nothing is due for settlement")]
    NothingDue,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type RanchoResult<T> = Result<T, RanchoError>;

/// Failure taxonomy surfaced to the user alongside each error notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Store handle unavailable or credentials rejected.
    Connectivity,
    /// An expected sheet or column is absent.
    Schema,
    /// The store rejected or failed a read/write.
    Api,
    /// Input rejected before touching the store.
    Validation,
}

impl RanchoError {
    pub fn class(&self) -> FailureClass {
        match self {
            Self::NotConnected | Self::Credentials(_) => FailureClass::Connectivity,
            Self::SpreadsheetNotFound { .. }
            | Self::WorksheetNotFound { .. }
            | Self::ColumnNotFound { .. } => FailureClass::Schema,
            Self::Validation(_) | Self::NothingDue => FailureClass::Validation,
            Self::Database(_)
            | Self::Serialization(_)
            | Self::Io(_)
            | Self::DateParse(_)
            | Self::Api(_)
            | Self::Other(_) => FailureClass::Api,
        }
    }
}
