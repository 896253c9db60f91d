#![allow(non_snake_case)]

//! Typed access to the school management resources.
//!
//! Every call goes through [`SessionClient::authorized_fetch`], so an expired
//! access token is refreshed transparently once per call.

pub mod assignments;
pub mod attendance;
pub mod dashboard;
pub mod overview;
pub mod profiles;
pub mod schools;
pub mod submissions;

use std::sync::Arc;

use http::StatusCode;
use school_session::{ApiRequest, SessionClient, SessionError};
use serde::de::DeserializeOwned;
use thiserror::Error;

pub use dashboard::StudentDashboard;
pub use overview::{SchoolOverview, SchoolStats};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Session(#[from] SessionError),
    /// Non-success response, carrying the `"<status> <reason> - <body>"` line.
    #[error("{message}")]
    Status { status: StatusCode, message: String },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("grade must be between 0 and 100, got {0}")]
    InvalidGrade(f64),
    #[error("no profile found for the current user")]
    NoProfile,
}

impl ClientError {
    /// True when the server still refused the request after any refresh,
    /// i.e. the user has to log in again.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Status { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Clone, Debug)]
pub struct SchoolClient {
    session: Arc<SessionClient>,
}

impl SchoolClient {
    pub fn new(session: Arc<SessionClient>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionClient {
        &self.session
    }

    /// Sends `request` and decodes a successful body; any other status is an
    /// error.
    async fn fetch_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let response = self.session.authorized_fetch(request).await?;
        if !response.is_success() {
            return Err(ClientError::Status {
                status: response.status,
                message: response.error_message(),
            });
        }
        Ok(response.json()?)
    }

    /// Like [`Self::fetch_json`] but a non-success status yields `None`.
    async fn fetch_if_ok<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<Option<T>> {
        let path = request.path.clone();
        let response = self.session.authorized_fetch(request).await?;
        if !response.is_success() {
            tracing::debug!("{path} answered {}, ignoring", response.status);
            return Ok(None);
        }
        Ok(Some(response.json()?))
    }

    /// Sends `request`, discarding a successful body.
    async fn send_expecting_success(&self, request: ApiRequest) -> Result<()> {
        let response = self.session.authorized_fetch(request).await?;
        if !response.is_success() {
            return Err(ClientError::Status {
                status: response.status,
                message: response.error_message(),
            });
        }
        Ok(())
    }
}

fn with_school(request: ApiRequest, school: Option<i64>) -> ApiRequest {
    match school {
        Some(id) => request.with_query("school", id),
        None => request,
    }
}

/// `GET path`, optionally filtered to one school.
fn collection(path: &str, school: Option<i64>) -> ApiRequest {
    with_school(ApiRequest::get(path), school)
}
