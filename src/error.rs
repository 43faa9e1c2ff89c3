//! Error types for rust_dge_report

use thiserror::Error;

/// Main error type for the report pipeline
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Transcript mapping failed for sample {sample}: {reason}")]
    Mapping { sample: String, reason: String },

    #[error("Sample mismatch: {reason}")]
    SampleMismatch { reason: String },

    #[error("Invalid count matrix: {reason}")]
    InvalidCountMatrix { reason: String },

    #[error("Invalid metadata: {reason}")]
    InvalidMetadata { reason: String },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: String, got: String },

    #[error("GLM convergence failed for gene {gene_id}: {reason}")]
    Convergence { gene_id: String, reason: String },

    #[error("Invalid design: {reason}")]
    InvalidDesign { reason: String },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Empty data: {reason}")]
    EmptyData { reason: String },

    #[error("Size factor estimation failed: {reason}")]
    SizeFactorFailed { reason: String },

    #[error("Dispersion trend fitting failed: {reason}")]
    TrendFittingFailed { reason: String },

    #[error("Annotation table error: {reason}")]
    Annotation { reason: String },

    #[error("Ontology error: {reason}")]
    Ontology { reason: String },

    #[error("Rendering {artifact} failed: {reason}")]
    Render { artifact: String, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Formatting error: {0}")]
    FmtError(#[from] std::fmt::Error),
}

impl ReportError {
    /// Input-integrity errors abort the whole run
    pub fn is_input_integrity(&self) -> bool {
        matches!(
            self,
            ReportError::Mapping { .. }
                | ReportError::SampleMismatch { .. }
                | ReportError::InvalidCountMatrix { .. }
                | ReportError::InvalidMetadata { .. }
                | ReportError::DimensionMismatch { .. }
                | ReportError::InvalidDesign { .. }
                | ReportError::InvalidInput { .. }
                | ReportError::EmptyData { .. }
                | ReportError::SizeFactorFailed { .. }
        )
    }
}

/// Result type alias for report operations
pub type Result<T> = std::result::Result<T, ReportError>;
