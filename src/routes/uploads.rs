use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    error::{AppError, Result},
};

pub async fn serve_upload(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Response> {
    // Path traversal guard
    if file_name.is_empty()
        || file_name.contains("..")
        || file_name.contains('/')
        || file_name.contains('\\')
    {
        return Err(AppError::BadRequest("Invalid file name".to_string()));
    }

    let path = state.upload.dir.join(&file_name);

    let content = tokio::fs::read(&path)
        .await
        .map_err(|_| AppError::NotFound("File not found".to_string()))?;

    Ok(([(header::CONTENT_TYPE, content_type_for(&file_name))], content).into_response())
}

fn content_type_for(file_name: &str) -> &'static str {
    let extension = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
