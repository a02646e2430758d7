//! Error types for the treatment-bench library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing required parameter '{0}'")]
    MissingParameter(String),

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Coefficient '{name}' not found. Available: {available:?}")]
    UnknownCoefficient {
        name: String,
        available: Vec<String>,
    },

    #[error("Covariate adjustment requested but the experiment has no covariate column")]
    CovariateUnavailable,

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Singular design: {0}")]
    SingularDesign(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Estimator '{method}' failed on experiment {experiment_id}: {message}")]
    EstimationFailed {
        experiment_id: u64,
        method: String,
        message: String,
    },
}

impl Error {
    /// Whether this error stems from the regression arithmetic rather than from
    /// how the call was configured.
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            Error::SingularDesign(_) | Error::InsufficientData(_) | Error::Numerical(_)
        )
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;
