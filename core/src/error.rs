/// Error types for the Circle storage core
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CircleError {
    #[error("Please enter a name")]
    InvalidName,

    #[error("You can only have {max} contacts")]
    CapacityExceeded { max: usize },

    #[error("Contact already exists: {0}")]
    DuplicateName(String),

    #[error("No contact named {0}")]
    UnknownContact(String),

    #[error("Message text is empty")]
    InvalidMessage,

    #[error("Storage read error: {0}")]
    StorageRead(String),

    #[error("Storage write error: {0}")]
    StorageWrite(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CircleError {
    /// Validation failures are shown to the user; everything else is a storage concern.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CircleError::InvalidName
                | CircleError::CapacityExceeded { .. }
                | CircleError::DuplicateName(_)
                | CircleError::UnknownContact(_)
                | CircleError::InvalidMessage
        )
    }
}

pub type Result<T> = std::result::Result<T, CircleError>;
