use thiserror::Error;

/// Errors raised by ingestion, harmonization, and table assembly.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("retrieval failed: {0}")]
    Retrieval(String),

    #[error("cannot determine the cadence of '{series}': {distinct_months} distinct calendar months (expected 1, 4, or 12)")]
    AmbiguousCadence { series: String, distinct_months: usize },

    #[error("invalid cadence '{0}': expected one of m / q / y")]
    InvalidCadence(String),

    #[error("missing variables: {}", .0.join(", "))]
    MissingVariables(Vec<String>),

    #[error("'{series}' is not published at the requested cadence ({requested}) or the next one along")]
    CadenceUnavailable { series: String, requested: String },

    #[error("series '{0}' has no values to harmonize")]
    EmptySeries(String),

    #[error("unknown source '{0}'")]
    UnknownSource(String),

    #[error("unknown formula '{0}'")]
    UnknownFormula(String),

    #[error("source {source_name} cannot serve request {request}")]
    RequestMismatch { source_name: String, request: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("spline interpolation failed: {0}")]
    Spline(String),

    #[error("date out of calendar range: {0}")]
    DateOutOfRange(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Error surfaced by the binary: a message plus the process exit code.
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

impl From<DataError> for AppError {
    fn from(err: DataError) -> Self {
        let exit_code = match &err {
            DataError::InvalidCadence(_)
            | DataError::UnknownSource(_)
            | DataError::UnknownFormula(_)
            | DataError::RequestMismatch { .. }
            | DataError::InvalidRequest(_)
            | DataError::Config(_) => 2,
            DataError::AmbiguousCadence { .. }
            | DataError::MissingVariables(_)
            | DataError::CadenceUnavailable { .. }
            | DataError::EmptySeries(_)
            | DataError::Spline(_)
            | DataError::DateOutOfRange(_) => 3,
            DataError::Retrieval(_) | DataError::Io(_) | DataError::Csv(_) => 4,
        };
        Self::new(exit_code, err.to_string())
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
