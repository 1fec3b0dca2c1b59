use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::extract::rejection::JsonRejection;
use serde_json::json;

use stockroom_core::DomainError;
use stockroom_infra::ServiceError;

/// Map a service failure to a 500 carrying `message`.
///
/// Guard failures stay 500 on mutating routes; only `GET /getproduct` turns
/// a missing product into a 404 (see [`not_found_or_server_error`]).
pub fn service_error_to_response(err: ServiceError, message: &str) -> axum::response::Response {
    tracing::error!(error = %err, "{message}");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, service_error_code(&err), message)
}

pub fn not_found_or_server_error(err: ServiceError, message: &str) -> axum::response::Response {
    if err.is_not_found() {
        return json_error(StatusCode::NOT_FOUND, service_error_code(&err), "Product not found");
    }
    service_error_to_response(err, message)
}

fn service_error_code(err: &ServiceError) -> &'static str {
    match err {
        ServiceError::StoreNotFound(_) => "store_not_found",
        ServiceError::ProductNotFound(_) => "product_not_found",
        ServiceError::Persistence(_) => "store_error",
    }
}

pub fn validation_error(err: DomainError) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string())
}

pub fn json_rejection(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
