use std::env;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Runtime configuration, read once at startup from the process environment
/// (after `.env` has been loaded).
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_origin: String,
    /// When set, uploads go to this GCS bucket instead of `upload_dir`.
    pub gcs_bucket: Option<String>,
    pub upload_dir: PathBuf,
    pub public_base_url: String,
    pub session_secret: Option<String>,
    pub admin: Option<AdminSeed>,
}

/// Admin account created at startup when it does not exist yet.
#[derive(Clone, Debug)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let port = match env::var("PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: e.to_string(),
            })?,
            Err(_) => 8000,
        };

        let admin = match (env::var("ADMIN_EMAIL"), env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) if !email.is_empty() && !password.is_empty() => Some(AdminSeed {
                email,
                password,
                name: env::var("ADMIN_NAME").unwrap_or_else(|_| "Admin".to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            port,
            cors_origin: env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string()),
            gcs_bucket: env::var("GCS_BUCKET_NAME").ok().filter(|b| !b.is_empty()),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./uploads")),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", port))
                .trim_end_matches('/')
                .to_string(),
            session_secret: env::var("SESSION_SECRET").ok(),
            admin,
        })
    }
}
