use crate::dav::DavError;
use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the account model and its collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// A required input was empty or unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Required metadata for a persisted account is missing.
    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The user or the platform aborted a credential lookup.
    #[error("operation canceled")]
    Canceled,

    /// The authenticator could not produce a token for the account.
    #[error("authenticator error: {0}")]
    Authenticator(String),

    /// The account file exists but cannot be decoded or encoded.
    #[error("account store error: {0}")]
    Store(String),

    #[error(transparent)]
    Dav(#[from] DavError),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}
