use thiserror::Error;

use crate::db::ConfigStoreError;
use crate::printing::PrintStorageError;

/// Failures that stop the server from starting or serving
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Print job store unavailable: {0}")]
    JobStore(#[from] PrintStorageError),

    #[error("Configuration store unavailable: {0}")]
    ConfigStore(#[from] ConfigStoreError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ServerError>;
