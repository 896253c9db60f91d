use serde::{Deserialize, Serialize};

/// Body of `POST /api/auth/token/`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Token pair issued on a successful login.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Body of a successful `POST /api/auth/token/refresh/`.
///
/// Servers that rotate refresh tokens also send the replacement `refresh`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RefreshedAccess {
    pub access: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// Error body returned by the API on rejected requests.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}
