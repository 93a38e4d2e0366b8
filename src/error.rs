use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("Invalid seed: {0}")]
    InvalidSeed(String),
    #[error("Invalid public id: {0}")]
    InvalidPublicId(String),
    #[error("Signing error: {0}")]
    Signing(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<bincode::Error> for ExchangeError {
    fn from(err: bincode::Error) -> Self {
        ExchangeError::Serialization(err.to_string())
    }
}
