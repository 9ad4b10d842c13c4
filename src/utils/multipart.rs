use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartError};
use serde::de::DeserializeOwned;

use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Multipart form split into text fields and uploaded files. Files are
/// collected from the single named field and keep their wire order.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    pub files: Vec<UploadedFile>,
}

impl MultipartForm {
    pub async fn parse(mut multipart: Multipart, file_field: &str) -> Result<Self> {
        let mut fields = HashMap::new();
        let mut files = Vec::new();

        while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
            let Some(name) = field.name().map(|s| s.to_string()) else {
                continue;
            };

            if name == file_field {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(|s| s.to_string());
                let bytes = field.bytes().await.map_err(bad_multipart)?;

                // A nameless empty part is what browsers send for an
                // untouched file input
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }

                if bytes.is_empty() {
                    return Err(AppError::BadRequest(format!(
                        "Uploaded file '{}' is empty",
                        file_name
                    )));
                }

                let content_type = content_type.ok_or_else(|| {
                    AppError::BadRequest(format!(
                        "Uploaded file '{}' is missing a content type",
                        file_name
                    ))
                })?;

                files.push(UploadedFile {
                    file_name,
                    content_type,
                    bytes,
                });
            } else {
                let value = field.text().await.map_err(bad_multipart)?;
                fields.insert(name, value);
            }
        }

        Ok(Self { fields, files })
    }

    /// Text value of a field; empty strings count as absent.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn require_text(&self, name: &str) -> Result<&str> {
        self.text(name)
            .ok_or_else(|| AppError::BadRequest(format!("Field '{}' is required", name)))
    }

    pub fn parse_text<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.text(name) {
            None => Ok(None),
            Some(raw) => raw.parse::<T>().map(Some).map_err(|e| {
                AppError::BadRequest(format!("Field '{}' has an invalid value: {}", name, e))
            }),
        }
    }

    pub fn require_parsed<T>(&self, name: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.parse_text(name)?
            .ok_or_else(|| AppError::BadRequest(format!("Field '{}' is required", name)))
    }

    pub fn json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.text(name) {
            None => Ok(None),
            Some(raw) => serde_json::from_str(raw).map(Some).map_err(|e| {
                AppError::BadRequest(format!("Field '{}' is not valid JSON: {}", name, e))
            }),
        }
    }

    pub fn flag(&self, name: &str) -> bool {
        matches!(self.text(name), Some(v) if v.eq_ignore_ascii_case("true") || v == "1")
    }
}

fn bad_multipart(err: MultipartError) -> AppError {
    AppError::BadRequest(format!("Invalid multipart request: {}", err))
}
