use std::time::Duration;

use thiserror::Error;

/// Why a provider refresh produced no data. Never surfaced to the user;
/// providers log it and fall back to the cache or omit their segment.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("no oauth token available")]
    NoToken,

    #[error("http error: {0}")]
    Http(String),

    #[error("unexpected http status {0}")]
    Status(u16),

    #[error("`{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}")]
    CommandFailed { command: String, status: String },

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ureq::Error> for ProviderError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => ProviderError::Status(code),
            other => ProviderError::Http(other.to_string()),
        }
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;
