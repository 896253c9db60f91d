use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("token store io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("token store is corrupt: {0}")]
    Corrupt(String),
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to build http client: {0}")]
    Client(String),
    #[error("connection failed: {0}")]
    Connection(String),
}

/// Failures surfaced by [`crate::SessionClient`].
///
/// An expired session is not an error: `authorized_fetch` hands back the
/// server's original 401 response after clearing the tokens.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    RegistrationRejected(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
