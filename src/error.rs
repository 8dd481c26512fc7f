//! Error taxonomy.
//!
//! Library stages return precise, typed errors so the presentation layer can
//! react differently to each failure (missing column vs. empty series vs. fit
//! failure). The binary collapses all of them into `AppError`, which carries
//! the process exit code:
//!
//! - `2`: usage, configuration, or local IO problems
//! - `3`: schema problems or no valid rows after validation
//! - `4`: fetch or model-fit failures

use thiserror::Error;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Failure retrieving a raw price table.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("request for {symbol} failed: {message}")]
    Request { symbol: String, message: String },

    #[error("request for {symbol} failed with status {status}")]
    Status { symbol: String, status: u16 },

    #[error("could not decode response for {symbol}: {message}")]
    Decode { symbol: String, message: String },

    #[error("no rows returned for {symbol}")]
    Empty { symbol: String },

    #[error("{0}")]
    Io(String),
}

/// The normalized table does not carry a column the pipeline requires.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("required column `{column}` is missing (available: {})", available.join(", "))]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },
}

/// The forecasting capability could not produce a result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("insufficient data to fit: need at least {required} points, got {got}")]
    InsufficientData { required: usize, got: usize },

    #[error("model fit did not converge: {0}")]
    NonConvergent(String),

    #[error("forecast horizon must be a positive number of days, got {0}")]
    InvalidHorizon(i64),
}

/// Terminal failure of a pipeline run.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("no valid rows remain after validation ({dropped} dropped)")]
    ValidationEmpty { dropped: usize },

    #[error(transparent)]
    Fit(#[from] FitError),
}

impl PipelineError {
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Fetch(_) => 4,
            PipelineError::Schema(_) => 3,
            PipelineError::ValidationEmpty { .. } => 3,
            PipelineError::Fit(FitError::InvalidHorizon(_)) => 2,
            PipelineError::Fit(_) => 4,
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        PipelineError::from(err).into()
    }
}

impl From<SchemaError> for AppError {
    fn from(err: SchemaError) -> Self {
        PipelineError::from(err).into()
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        PipelineError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_distinguish_failure_kinds() {
        let missing: AppError = SchemaError::MissingColumn {
            column: "date".to_string(),
            available: vec!["close".to_string()],
        }
        .into();
        assert_eq!(missing.exit_code(), 3);

        let empty: AppError = PipelineError::ValidationEmpty { dropped: 4 }.into();
        assert_eq!(empty.exit_code(), 3);

        let fit: AppError = FitError::InsufficientData { required: 2, got: 0 }.into();
        assert_eq!(fit.exit_code(), 4);

        let fetch: AppError = FetchError::Empty {
            symbol: "TCS.NS".to_string(),
        }
        .into();
        assert_eq!(fetch.exit_code(), 4);
    }

    #[test]
    fn missing_column_message_lists_available_columns() {
        let err = SchemaError::MissingColumn {
            column: "date".to_string(),
            available: vec!["open".to_string(), "close".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "required column `date` is missing (available: open, close)"
        );
    }
}
