use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    AppState,
    error::{AppError, Result},
    models::ProductType,
    queries::product_type_queries,
    services::upload_service,
    utils::multipart::MultipartForm,
};

pub async fn get_all_product_types(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductType>>> {
    let product_types = product_type_queries::get_all(&state.db).await?;

    Ok(Json(product_types))
}

pub async fn get_product_type(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ProductType>> {
    let product_type = product_type_queries::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product type with ID {} not found", id)))?;

    Ok(Json(product_type))
}

pub async fn create_product_type(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let form = MultipartForm::parse(multipart, "file").await?;

    let title = form.require_text("title")?.to_string();

    let icon = form
        .files
        .first()
        .ok_or_else(|| AppError::BadRequest("Field 'file' is required".to_string()))?;

    let icon_url = upload_service::save_file(&state.upload, icon).await?;

    let product_type =
        product_type_queries::create_product_type(&state.db, &title, &icon_url).await?;

    Ok((StatusCode::CREATED, Json(product_type)))
}

pub async fn update_product_type(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<ProductType>> {
    let form = MultipartForm::parse(multipart, "file").await?;

    let title = form.text("title").map(str::to_string);

    // The icon is replaced only when a new file was actually uploaded
    let icon_url = match form.files.first() {
        Some(icon) => Some(upload_service::save_file(&state.upload, icon).await?),
        None => None,
    };

    let product_type =
        product_type_queries::update_product_type(&state.db, id, title.as_deref(), icon_url.as_deref())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product type with ID {} not found", id)))?;

    Ok(Json(product_type))
}

pub async fn delete_product_type(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    product_type_queries::delete_product_type(&state.db, id, state.type_delete_policy).await?;

    Ok(Json(json!({ "message": "Product type deleted" })))
}
