use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use notes_db::StoreError;
use notes_types::api::SimpleResponse;
use serde::Serialize;
use tracing::error;

pub fn success<T: Serialize>(status: StatusCode, message: impl Into<String>, data: T) -> Response {
    (
        status,
        Json(SimpleResponse::with_data(true, status.as_u16(), message, data)),
    )
        .into_response()
}

pub fn message(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(SimpleResponse::message(status.is_success(), status.as_u16(), message)),
    )
        .into_response()
}

/// A request that was understood but not carried out, with the current
/// state attached.
pub fn refused<T: Serialize>(status: StatusCode, message: impl Into<String>, data: T) -> Response {
    (
        status,
        Json(SimpleResponse::with_data(false, status.as_u16(), message, data)),
    )
        .into_response()
}

pub fn status_for(err: &StoreError) -> StatusCode {
    match err {
        StoreError::Conflict(_) => StatusCode::CONFLICT,
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::NotOwner { .. } => StatusCode::FORBIDDEN,
        StoreError::Constraint(_) => StatusCode::BAD_REQUEST,
        StoreError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub fn store_failure(context: &str, err: StoreError) -> Response {
    if err.is_retryable() {
        error!("{}: {}", context, err);
    }
    message(status_for(&err), format!("Error: {}", err))
}
