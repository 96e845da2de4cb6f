use indicatif::style::TemplateError;
use thiserror::Error;

pub type SurgeResult<T> = Result<T, SurgeError>;

#[derive(Debug, Error)]
pub enum SurgeError {
    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    System(#[from] SystemError),
}

/// Errors raised while pricing a single ride or deciding its surge.
#[derive(Debug, Error)]
pub enum PricingError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Base price predictor fault: {0}")]
    PredictorFault(String),

    #[error("Invalid surge configuration: {0}")]
    InvalidSurgeConfig(String),
}

/// Errors related to the Gym Environment configuration and execution loop.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("Invalid environment state: {0}")]
    InvalidState(String),

    #[error("Insufficient data: {available} records available, episode needs {required}")]
    InsufficientData { available: usize, required: usize },

    #[error("Invalid environment configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to encode EnvConfig")]
    Encoding(#[from] postcard::Error),

    #[error("Progress bar error")]
    ProgressBar(#[from] TemplateError),
}

/// Errors occurring within Agent logic, training or execution.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Invalid input to agent: {0}")]
    InvalidInput(String),

    #[error("Invalid trainer configuration: {0}")]
    InvalidConfig(String),

    #[error("Agent execution failure: {0}")]
    Execution(String),
}

/// Errors related to ride data loading, parsing and domain types.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Missing column '{0}' in ride data")]
    MissingColumn(String),

    #[error("Missing value in column '{column}' at row {row}")]
    MissingValue { column: String, row: usize },

    #[error("Invalid service category string: '{0}'")]
    InvalidService(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Data frame error: {0}")]
    DataFrame(String),

    #[error("Failed timestamp conversion: {0}")]
    TimestampConversion(String),

    #[error("Failed to parse enum: {0}")]
    ParseEnum(#[from] strum::ParseError),
}

/// Errors related to File I/O and Serialization.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("IO operation failed")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed")]
    Json(#[from] serde_json::Error),

    #[error("Postcard serialization failed")]
    Postcard(#[from] postcard::Error),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Failed to create writer: {0}")]
    WriterCreation(String),

    #[error("Failed to create reader: {0}")]
    ReaderCreation(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
}

/// Errors related to internal system invariants and bugs.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("Index out of bounds: {0}")]
    IndexOutOfBounds(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

pub(crate) fn invalid_input(msg: impl Into<String>) -> SurgeError {
    PricingError::InvalidInput(msg.into()).into()
}
