//! Error types for carfinder-chat

use thiserror::Error;

/// Result type alias using carfinder-chat Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving a chat session
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the API layer
    #[error(transparent)]
    Api(#[from] carfinder_api::Error),

    /// A reply is still streaming; sends are refused until it finishes
    #[error("A reply is still streaming")]
    Busy,

    /// Blank input is never sent
    #[error("Message is empty")]
    EmptyMessage,

    /// A generic session error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Check if the underlying API error is worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Api(e) => e.is_retryable(),
            _ => false,
        }
    }
}
