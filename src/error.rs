use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconciliationError {
    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Table '{table}' has no column '{column}'. Columns found: {found:?}")]
    MissingColumn {
        table: String,
        column: String,
        found: Vec<String>,
    },

    #[error("Table '{table}' has {} columns, expected {}. Expected {expected:?}, found {found:?}", .found.len(), .expected.len())]
    SchemaMismatch {
        table: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Invalid month selector '{0}': expected MM/YYYY")]
    InvalidMonth(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Count identity violation on row '{label}': {start} + {entries} - {exits} != {end}")]
    CountIdentityViolation {
        label: String,
        start: i64,
        entries: i64,
        exits: i64,
        end: i64,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReconciliationError>;
