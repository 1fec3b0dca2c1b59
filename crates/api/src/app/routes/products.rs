use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use stockroom_products::ProductDraft;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection(rejection),
    };
    let new_product = match body.into_new_product() {
        Ok(p) => p,
        Err(e) => return errors::validation_error(e),
    };

    match services.create_product(&new_product).await {
        Ok(product) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "message": "Product created successfully",
                "product": dto::product_to_json(&product),
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e, "Error creating product"),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<ProductDraft>, JsonRejection>,
) -> axum::response::Response {
    let product_id = match dto::parse_product_id(&id) {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"),
    };
    let Json(draft) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection(rejection),
    };
    let details = match draft.into_details() {
        Ok(d) => d,
        Err(e) => return errors::validation_error(e),
    };

    match services.update_product(product_id, &details).await {
        Ok(product) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "message": "Product updated successfully",
                "product": dto::product_to_json(&product),
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e, "Error updating product"),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match dto::parse_product_id(&id) {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"),
    };

    match services.delete_product(product_id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({"message": "Product deleted successfully"})),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e, "Error deleting product"),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match dto::parse_product_id(&id) {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "productId is required")
        }
    };

    match services.get_product(product_id).await {
        Ok(product) => (StatusCode::OK, Json(dto::product_to_json(&product))).into_response(),
        Err(e) => errors::not_found_or_server_error(e, "Error getting product by ID"),
    }
}
