mod health;
mod product_types;
mod products;
mod uploads;

use axum::{Router, routing::get};

use crate::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route(
            "/product",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/product/{id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route(
            "/product-type",
            get(product_types::get_all_product_types).post(product_types::create_product_type),
        )
        .route(
            "/product-type/{id}",
            get(product_types::get_product_type)
                .put(product_types::update_product_type)
                .delete(product_types::delete_product_type),
        )
        .route("/uploads/{file_name}", get(uploads::serve_upload))
}
