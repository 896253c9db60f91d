#![allow(non_snake_case)]

//! Authenticated session client for the school management API.
//!
//! Holds the access/refresh token pair, persists it through a [`TokenStore`]
//! and mediates every authorized request through
//! [`SessionClient::authorized_fetch`], which refreshes the access token at
//! most once when the server answers `401 Unauthorized`.

pub mod error;
pub mod session;
pub mod storage;
pub mod transport;

pub use error::{SessionError, StorageError, TransportError};
pub use session::SessionClient;
pub use storage::{FileStore, MemoryStore, TokenStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};

/// Paths of the authentication endpoints, relative to the API base URL.
pub mod endpoints {
    pub const TOKEN: &str = "/api/auth/token/";
    pub const TOKEN_REFRESH: &str = "/api/auth/token/refresh/";
    pub const REGISTER: &str = "/api/auth/register/";
}

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
