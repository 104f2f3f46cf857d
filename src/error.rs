#[derive(thiserror::Error, Debug)]
pub enum GridError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Broker error: {0}")]
    BrokerError(String),

    #[error("Invalid broker state: expected {expected}, found {actual}")]
    InvalidBrokerState { expected: String, actual: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Not implemented: {0}")]
    Unimplemented(String),
}

impl From<std::io::Error> for GridError {
    fn from(err: std::io::Error) -> Self {
        GridError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for GridError {
    fn from(err: serde_json::Error) -> Self {
        GridError::SerializationError(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for GridError {
    fn from(err: serde_yaml::Error) -> Self {
        GridError::SerializationError(format!("YAML error: {}", err))
    }
}

impl From<reqwest::Error> for GridError {
    fn from(err: reqwest::Error) -> Self {
        GridError::HttpError(err.to_string())
    }
}

impl From<url::ParseError> for GridError {
    fn from(err: url::ParseError) -> Self {
        GridError::ValidationError(format!("Invalid URL: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, GridError>;
