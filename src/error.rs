//! Error types shared by the loader and the aggregation pipeline.

/// Errors raised while loading records or computing aggregate tables.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// A percentage-based aggregation received zero qualifying records.
    #[error("no qualifying records for {operation}")]
    EmptyInput { operation: &'static str },

    /// A required column is absent from the record source header.
    #[error("required column '{column}' is missing from the dataset")]
    MissingColumn { column: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AnalysisError {
    pub(crate) fn empty(operation: &'static str) -> Self {
        Self::EmptyInput { operation }
    }

    /// True for the recoverable "nothing to aggregate" case.
    pub fn is_empty_input(&self) -> bool {
        matches!(self, Self::EmptyInput { .. })
    }
}

/// Alias for Result with [`AnalysisError`]
pub type Result<T> = std::result::Result<T, AnalysisError>;
