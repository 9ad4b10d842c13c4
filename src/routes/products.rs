use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    AppState,
    error::{AppError, Result},
    models::{
        CreateProductRequest, Hydration, ImagePatch, ProductDetail, ProductListResponse,
        ProductPatch, ProductQuery,
    },
    queries::product_queries,
    services::upload_service,
    utils::multipart::MultipartForm,
};

pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ProductQuery>,
) -> Result<Json<ProductListResponse>> {
    let products = product_queries::list_products(&state.db, &params).await?;

    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ProductDetail>> {
    let product = product_queries::get_product(&state.db, id, Hydration::Full)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product with ID {} not found", id)))?;

    Ok(Json(product))
}

pub async fn create_product(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let form = MultipartForm::parse(multipart, "files").await?;

    let request = CreateProductRequest {
        title: form.require_text("title")?.to_string(),
        type_id: form.require_parsed("typeId")?,
        price: form.require_parsed("price")?,
        brand: form.text("brand").map(str::to_string),
        memory_amount: form.parse_text("memoryAmount")?,
        selectable_values: form.json("selectableValues")?,
        color: form.json("color")?,
        short_info: form.json("shortInfo")?.unwrap_or_default(),
        additional_info: form.json("additionalInfo")?.unwrap_or_default(),
    };

    // Files hit the disk only after every one of them passed validation
    let image_urls = upload_service::save_files(&state.upload, &form.files).await?;

    let product = product_queries::create_product(&state.db, request, &image_urls).await?;

    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<ProductDetail>> {
    let form = MultipartForm::parse(multipart, "files").await?;

    let patch = ProductPatch {
        title: form.text("title").map(str::to_string),
        type_id: form.parse_text("typeId")?,
        price: form.parse_text("price")?,
        brand: form.text("brand").map(str::to_string),
        memory_amount: form.parse_text("memoryAmount")?,
        selectable_values: form.json("selectableValues")?,
        color: form.json("color")?,
        short_info: form.json("shortInfo")?,
        additional_info: form.json("additionalInfo")?,
    };

    let images = if !form.files.is_empty() {
        ImagePatch::Replace(upload_service::save_files(&state.upload, &form.files).await?)
    } else if form.flag("clearImages") {
        ImagePatch::Clear
    } else {
        ImagePatch::Keep
    };

    let product = product_queries::update_product(&state.db, id, patch, images).await?;

    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    product_queries::delete_product(&state.db, id).await?;

    Ok(Json(json!({ "message": "Product deleted" })))
}
