use thiserror::Error;

use crate::parser::types::ValidationError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("empty file or no data rows")]
    EmptyFile,

    #[error("first row is not a header row")]
    MissingHeader,

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// The file was well-formed but every data row failed validation.
    #[error("no valid records: {} row error(s)", .errors.len())]
    NoValidRecords { errors: Vec<ValidationError> },

    #[error("invalid alias table: {0}")]
    InvalidAliasTable(String),

    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("import cancelled")]
    Cancelled,

    #[error("no dataset loaded")]
    NoDataset,

    #[error("{0}")]
    Custom(String),
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
