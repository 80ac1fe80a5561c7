//! Domain error types.

/// Top-level error type for sigalloc.
#[derive(Debug, thiserror::Error)]
pub enum SigallocError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("dimension mismatch: {what} has {actual} entries, expected {expected}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid covariance: {reason}")]
    InvalidCovariance { reason: String },

    #[error("invalid risk aversion {value}: must be a finite value greater than zero")]
    InvalidRiskAversion { value: f64 },

    #[error("insufficient price history for {ticker}: have {points} points, need {minimum}")]
    InsufficientHistory {
        ticker: String,
        points: usize,
        minimum: usize,
    },

    #[error("invalid price {price} at index {index}: prices must be finite and positive")]
    InvalidPrice { index: usize, price: f64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&SigallocError> for std::process::ExitCode {
    fn from(err: &SigallocError) -> Self {
        let code: u8 = match err {
            SigallocError::Io(_) => 1,
            SigallocError::ConfigParse { .. }
            | SigallocError::ConfigMissing { .. }
            | SigallocError::ConfigInvalid { .. } => 2,
            SigallocError::Data { .. } | SigallocError::InvalidPrice { .. } => 3,
            SigallocError::DimensionMismatch { .. }
            | SigallocError::InvalidCovariance { .. }
            | SigallocError::InvalidRiskAversion { .. } => 4,
            SigallocError::InsufficientHistory { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
