//! Error types for the draft scanner

use grammers_client::InvocationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse config file: {0}")]
    ConfigParse(String),

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Session is locked by another process")]
    SessionLocked,

    #[error("Failed to acquire session lock: {0}")]
    LockError(String),

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Telegram API error: {0}")]
    TelegramError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::AuthenticationError(_) => 2,
            Error::ConnectionError(_) => 3,
            Error::MissingCredentials(_) | Error::InvalidConfig(_) | Error::ConfigParse(_) => 4,
            _ => 1,
        }
    }
}

// An unauthorized RPC means the session or credentials were rejected;
// anything that never produced an RPC answer is a connectivity failure.
impl From<InvocationError> for Error {
    fn from(err: InvocationError) -> Self {
        match &err {
            InvocationError::Rpc(rpc) if rpc.code == 401 => {
                Error::AuthenticationError(err.to_string())
            }
            InvocationError::Rpc(_) => Error::TelegramError(err.to_string()),
            _ => Error::ConnectionError(err.to_string()),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::ConfigParse(err.to_string())
    }
}
