use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Request-level failures. Messages are fixed strings: nothing about paths,
/// processes or io errors leaks to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request body could not be read")]
    BodyUnreadable,
    #[error("request body too large")]
    BodyTooLarge,
    #[error("malformed request body")]
    MalformedBody,
    #[error("unknown server")]
    UnknownServer,
    #[error("unknown action")]
    UnknownAction,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BodyUnreadable => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::MalformedBody | ApiError::UnknownServer | ApiError::UnknownAction => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(ErrorBody {
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}
