use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use stockroom_inventory::StockOutcome;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub async fn check_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::CheckStockRequest>, JsonRejection>,
) -> axum::response::Response {
    let product_id = match dto::parse_product_id(&id) {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"),
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection(rejection),
    };
    let attributes = match dto::parse_attributes(body.attributes) {
        Ok(a) => a,
        Err(e) => return errors::validation_error(e),
    };

    match services.check_stock(product_id, &attributes).await {
        Ok(level) => (StatusCode::OK, Json(serde_json::json!({"stock": level.get()}))).into_response(),
        Err(e) => errors::service_error_to_response(e, "Error checking stock"),
    }
}

pub async fn add_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::StockChangeRequest>, JsonRejection>,
) -> axum::response::Response {
    let product_id = match dto::parse_product_id(&id) {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"),
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection(rejection),
    };
    let (attributes, quantity) = match body.into_parts() {
        Ok(parts) => parts,
        Err(e) => return errors::validation_error(e),
    };

    match services.add_stock(product_id, &attributes, quantity).await {
        Ok(outcome @ StockOutcome::Applied(_)) => (
            StatusCode::CREATED,
            Json(dto::stock_outcome_to_json("stock added successfully", &outcome)),
        )
            .into_response(),
        Ok(outcome) => (
            StatusCode::OK,
            Json(dto::stock_outcome_to_json(
                "error adding stock try after sometime",
                &outcome,
            )),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e, "error adding stock"),
    }
}

pub async fn reduce_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::StockChangeRequest>, JsonRejection>,
) -> axum::response::Response {
    let product_id = match dto::parse_product_id(&id) {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"),
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection(rejection),
    };
    let (attributes, quantity) = match body.into_parts() {
        Ok(parts) => parts,
        Err(e) => return errors::validation_error(e),
    };

    match services.reduce_stock(product_id, &attributes, quantity).await {
        Ok(outcome @ StockOutcome::Applied(_)) => (
            StatusCode::OK,
            Json(dto::stock_outcome_to_json("stock reduced successfully", &outcome)),
        )
            .into_response(),
        Ok(outcome) => (
            StatusCode::OK,
            Json(dto::stock_outcome_to_json(
                "no stock found or Not enough stock available",
                &outcome,
            )),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e, "error reducing stock"),
    }
}
