// ⚠️ Ledger Errors
// Every failure the store, CSV codec and sheet sync can report.
// All of them are recoverable: the caller surfaces the message and carries on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Required CSV columns are absent. Nothing was imported.
    #[error("CSV must contain columns: {}", missing.join(", "))]
    Validation { missing: Vec<String> },

    /// A margin/cost cell could not be read as a non-negative integer.
    /// `row` is 1-based and counts data rows only (header excluded).
    #[error("row {row}: column {column} has invalid value {value:?}")]
    DataFormat {
        row: usize,
        column: String,
        value: String,
    },

    /// Credentials or target could not be opened. Local work is unaffected.
    #[error("spreadsheet connection failed: {0}")]
    Connection(String),

    /// The remote table could not be rewritten.
    #[error("spreadsheet sync failed: {0}")]
    Sync(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    pub fn data_format(row: usize, column: &str, value: &str) -> Self {
        LedgerError::DataFormat {
            row,
            column: column.to_string(),
            value: value.to_string(),
        }
    }

    /// Short machine-friendly kind, used by the API envelope and logs
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Validation { .. } => "validation",
            LedgerError::DataFormat { .. } => "data_format",
            LedgerError::Connection(_) => "connection",
            LedgerError::Sync(_) => "sync",
            LedgerError::Csv(_) => "csv",
            LedgerError::Io(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
