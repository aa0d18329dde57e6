use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use warden_core::RbacError;

/// Handler error: an [`RbacError`] rendered as a JSON error body.
#[derive(Debug)]
pub struct ApiError(pub RbacError);

impl From<RbacError> for ApiError {
    fn from(err: RbacError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        rbac_error_to_response(self.0)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

pub fn status_for(err: &RbacError) -> StatusCode {
    match err {
        RbacError::Validation(_) => StatusCode::BAD_REQUEST,
        RbacError::Unauthorized => StatusCode::UNAUTHORIZED,
        RbacError::Forbidden(_) => StatusCode::FORBIDDEN,
        RbacError::NotFound(_) => StatusCode::NOT_FOUND,
        RbacError::Conflict(_) => StatusCode::CONFLICT,
        RbacError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
        RbacError::Schema(_) | RbacError::SeedData(_) | RbacError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn rbac_error_to_response(err: RbacError) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }

    let message = match &err {
        // Driver details stay in the log.
        RbacError::Schema(_) | RbacError::SeedData(_) | RbacError::Store(_) => "internal server error".to_string(),
        RbacError::Unauthorized => "invalid credentials".to_string(),
        other => other.to_string(),
    };
    json_error(status, err.code(), message)
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_has_the_documented_status() {
        let cases = [
            (RbacError::validation("x"), StatusCode::BAD_REQUEST),
            (RbacError::Unauthorized, StatusCode::UNAUTHORIZED),
            (RbacError::forbidden("x"), StatusCode::FORBIDDEN),
            (RbacError::not_found("x"), StatusCode::NOT_FOUND),
            (RbacError::conflict("x"), StatusCode::CONFLICT),
            (RbacError::Connection("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (RbacError::Schema("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (RbacError::SeedData("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (RbacError::store("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(status_for(&err), status, "{err:?}");
            assert_eq!(rbac_error_to_response(err).status(), status);
        }
    }
}
