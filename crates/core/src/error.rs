use thiserror::Error;

pub type StudioResult<T> = Result<T, StudioError>;

#[derive(Error, Debug)]
pub enum StudioError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Customer source error: {0}")]
    CustomerSource(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for StudioError {
    fn from(err: config::ConfigError) -> Self {
        StudioError::Config(err.to_string())
    }
}
