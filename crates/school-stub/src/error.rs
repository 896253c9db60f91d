use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use school_types::ErrorBody;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StubError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for StubError {
    fn into_response(self) -> Response {
        let status = match self {
            StubError::Unauthorized | StubError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            StubError::NotFound => StatusCode::NOT_FOUND,
            StubError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        tracing::debug!("responding {status}: {self}");

        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
