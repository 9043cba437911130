use thiserror::Error;

#[derive(Error, Debug)]
pub enum WalletDbError {
    #[error("Precondition failed: {0}")]
    Precondition(String),
    #[error("Wallet database in inconsistent state: {0}")]
    Consistency(String),
    #[error("Error loading wallet record {index}: {reason}")]
    LoadRecord { index: i32, reason: String },
    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Crypto error: {0}")]
    Crypto(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for WalletDbError {
    fn from(err: rocksdb::Error) -> Self {
        WalletDbError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for WalletDbError {
    fn from(err: serde_json::Error) -> Self {
        WalletDbError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WalletDbError>;
