use crate::error::{AppError, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub upload: UploadConfig,
    pub type_delete_policy: TypeDeletePolicy,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_size: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub url_prefix: String,
}

/// What happens to products still referencing a product type when that
/// type is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeDeletePolicy {
    /// Reject the delete with a conflict while references exist.
    Restrict,
    /// Delete the referencing products and their child rows as well.
    Cascade,
}

impl TypeDeletePolicy {
    fn parse(value: &str) -> Result<Self> {
        match value {
            "restrict" => Ok(TypeDeletePolicy::Restrict),
            "cascade" => Ok(TypeDeletePolicy::Cascade),
            other => Err(AppError::ConfigError(format!(
                "Invalid TYPE_DELETE_POLICY value: {}",
                other
            ))),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .map_err(|_| AppError::ConfigError("Invalid PORT value".to_string()))?,
                max_body_size: env::var("MAX_BODY_SIZE")
                    .unwrap_or_else(|_| "10485760".to_string())
                    .parse()
                    .map_err(|_| AppError::ConfigError("Invalid MAX_BODY_SIZE value".to_string()))?,
            },
            database: DatabaseConfig {
                url: env::var("DB_URL")?,
                max_connections: env::var("DB_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .map_err(|_| {
                        AppError::ConfigError("Invalid DB_MAX_CONNECTIONS value".to_string())
                    })?,
            },
            cors: CorsConfig {
                allowed_origins: env::var("FRONTEND_URL")?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
            },
            upload: UploadConfig {
                dir: env::var("UPLOAD_DIR")
                    .unwrap_or_else(|_| "./uploads".to_string())
                    .into(),
                url_prefix: env::var("UPLOAD_URL_PREFIX")
                    .unwrap_or_else(|_| "/uploads".to_string())
                    .trim_end_matches('/')
                    .to_string(),
            },
            type_delete_policy: TypeDeletePolicy::parse(
                &env::var("TYPE_DELETE_POLICY").unwrap_or_else(|_| "restrict".to_string()),
            )?,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
