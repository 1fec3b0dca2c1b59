use axum::{routing::{delete, get, post, put}, Router};

pub mod products;
pub mod stock;
pub mod system;

/// Router for the catalog and stock endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/createproduct", post(products::create_product))
        .route("/updateproduct/:productId", put(products::update_product))
        .route("/deleteproduct/:productId", delete(products::delete_product))
        .route("/getproduct/:productId", get(products::get_product))
        .route("/checkout/:productId", post(stock::check_stock))
        .route("/addstock/:productId", post(stock::add_stock))
        .route("/deletestock/:productId", post(stock::reduce_stock))
}
