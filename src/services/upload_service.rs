use chrono::Utc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::{
    config::UploadConfig,
    error::{AppError, Result},
    utils::multipart::UploadedFile,
};

const ALLOWED_IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/bmp",
    "image/webp",
];

pub async fn ensure_upload_dir(config: &UploadConfig) -> Result<()> {
    fs::create_dir_all(&config.dir)
        .await
        .map_err(AppError::UploadError)?;

    tracing::info!("Upload directory ready at {}", config.dir.display());

    Ok(())
}

pub fn validate_image(file: &UploadedFile) -> Result<()> {
    if !ALLOWED_IMAGE_TYPES.contains(&file.content_type.as_str()) {
        return Err(AppError::BadRequest(format!(
            "Only images are allowed, got '{}'",
            file.content_type
        )));
    }

    Ok(())
}

/// Store a single validated image and return its public URL.
pub async fn save_file(config: &UploadConfig, file: &UploadedFile) -> Result<String> {
    validate_image(file)?;
    write_file(config, file).await
}

/// Store a batch of images, URLs in input order. Every file is
/// validated before the first byte lands on disk, so a bad MIME type
/// aborts the whole batch without leaving stray files.
pub async fn save_files(config: &UploadConfig, files: &[UploadedFile]) -> Result<Vec<String>> {
    for file in files {
        validate_image(file)?;
    }

    let mut urls = Vec::with_capacity(files.len());
    for file in files {
        urls.push(write_file(config, file).await?);
    }

    Ok(urls)
}

async fn write_file(config: &UploadConfig, file: &UploadedFile) -> Result<String> {
    let timestamp = Utc::now().timestamp_millis();
    let base = sanitize_file_name(&file.file_name);

    // Same-millisecond uploads of one name collide on create_new; bump
    // a counter until the name is free
    let mut attempt = 0u32;
    loop {
        let file_name = if attempt == 0 {
            format!("{}-{}", timestamp, base)
        } else {
            format!("{}-{}-{}", timestamp, attempt, base)
        };
        let path = config.dir.join(&file_name);

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(mut handle) => {
                handle
                    .write_all(&file.bytes)
                    .await
                    .map_err(AppError::UploadError)?;

                return Ok(format!("{}/{}", config.url_prefix, file_name));
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && attempt < 100 => {
                attempt += 1;
            }
            Err(e) => return Err(AppError::UploadError(e)),
        }
    }
}

/// Keep the stored name recognizable but safe: only the final path
/// component survives, anything non-ASCII-alphanumeric becomes an
/// underscore, leading dots go.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches(['.', '-']).to_string();

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use std::path::PathBuf;

    fn image(name: &str, content_type: &str) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content_type: content_type.to_string(),
            bytes: Bytes::from_static(b"fake image bytes"),
        }
    }

    fn config(dir: PathBuf) -> UploadConfig {
        UploadConfig {
            dir,
            url_prefix: "/uploads".to_string(),
        }
    }

    #[test]
    fn sanitize_strips_path_tricks() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("..\\..\\boot.ini"), "boot.ini");
        assert_eq!(sanitize_file_name("a photo (1).jpg"), "a_photo__1_.jpg");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "upload");
    }

    #[test]
    fn rejects_non_image_content_types() {
        assert!(validate_image(&image("a.jpg", "image/jpeg")).is_ok());
        assert!(validate_image(&image("a.webp", "image/webp")).is_ok());
        assert!(validate_image(&image("a.pdf", "application/pdf")).is_err());
        assert!(validate_image(&image("a.svg", "image/svg+xml")).is_err());
    }

    #[tokio::test]
    async fn save_files_preserves_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path().to_path_buf());

        let files = vec![image("a.jpg", "image/jpeg"), image("b.png", "image/png")];
        let urls = save_files(&config, &files).await.unwrap();

        assert_eq!(urls.len(), 2);
        assert!(urls[0].ends_with("-a.jpg"), "got {}", urls[0]);
        assert!(urls[1].ends_with("-b.png"), "got {}", urls[1]);

        for url in &urls {
            let name = url.strip_prefix("/uploads/").unwrap();
            assert!(dir.path().join(name).exists());
        }
    }

    #[tokio::test]
    async fn bad_mime_aborts_batch_before_any_write() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path().to_path_buf());

        let files = vec![image("a.jpg", "image/jpeg"), image("b.txt", "text/plain")];
        let result = save_files(&config, &files).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let written = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(written, 0);
    }

    #[tokio::test]
    async fn same_name_uploads_do_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path().to_path_buf());

        let first = save_file(&config, &image("a.jpg", "image/jpeg"))
            .await
            .unwrap();
        let second = save_file(&config, &image("a.jpg", "image/jpeg"))
            .await
            .unwrap();

        assert_ne!(first, second);
        let written = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(written, 2);
    }
}
