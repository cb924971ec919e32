use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// Which document store backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Firestore REST API, typed-envelope documents.
    Firestore,
    /// Postgres JSONB documents, native values.
    Postgres,
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StorageBackend::Firestore),
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            other => bail!("STORAGE_BACKEND must be firestore or postgres, got {other:?}"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Read-only after startup.
#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub storage_backend: StorageBackend,
    pub firebase_project_id: String,
    pub firestore_base_url: String,
    pub firestore_api_key: Option<String>,
    pub firestore_composite_index: bool,
    pub database_url: Option<String>,

    // Predictor
    pub python_path: String,
    pub predictor_script: PathBuf,
    pub model_version: String,

    // Moderation
    pub queue_scan_limit: usize,

    // Web server
    pub api_host: String,
    pub api_port: u16,
    pub allowed_origin: String,
}

pub const DEFAULT_PROJECT_ID: &str = "deeplearningmilestone3";
pub const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
pub const DEFAULT_MODEL_VERSION: &str = "v1.0.0";
pub const DEFAULT_QUEUE_SCAN_LIMIT: usize = 100;

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let storage_backend = env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "firestore".to_string())
            .parse()?;
        let database_url = optional_env("DATABASE_URL");
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL environment variable is required when STORAGE_BACKEND=postgres");
        }

        let config = Self {
            storage_backend,
            firebase_project_id: env::var("FIREBASE_PROJECT_ID")
                .unwrap_or_else(|_| DEFAULT_PROJECT_ID.to_string()),
            firestore_base_url: env::var("FIRESTORE_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_FIRESTORE_BASE_URL.to_string()),
            firestore_api_key: optional_env("FIRESTORE_API_KEY"),
            firestore_composite_index: parse_flag(
                "FIRESTORE_COMPOSITE_INDEX",
                optional_env("FIRESTORE_COMPOSITE_INDEX").as_deref(),
            )?,
            database_url,
            python_path: optional_env("PYTHON_PATH").unwrap_or_else(find_python),
            predictor_script: optional_env("PREDICTOR_SCRIPT")
                .map(PathBuf::from)
                .unwrap_or_else(default_script_path),
            model_version: env::var("FIRE_MODEL_VERSION")
                .unwrap_or_else(|_| DEFAULT_MODEL_VERSION.to_string()),
            queue_scan_limit: env::var("QUEUE_SCAN_LIMIT")
                .unwrap_or_else(|_| DEFAULT_QUEUE_SCAN_LIMIT.to_string())
                .parse()
                .context("QUEUE_SCAN_LIMIT must be a number")?,
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("API_PORT must be a number")?,
            allowed_origin: env::var("ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        };

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let head: String = val.chars().take(5).collect();
            format!("{head}...({} chars)", val.len())
        }
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => preview(v),
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  STORAGE_BACKEND: {:?}", self.storage_backend);
        tracing::info!("  FIREBASE_PROJECT_ID: {}", self.firebase_project_id);
        tracing::info!("  FIRESTORE_API_KEY: {}", preview_opt(&self.firestore_api_key));
        tracing::info!("  DATABASE_URL: {}", preview_opt(&self.database_url));
        tracing::info!("  PYTHON_PATH: {}", self.python_path);
        tracing::info!("  PREDICTOR_SCRIPT: {}", self.predictor_script.display());
        tracing::info!("  FIRE_MODEL_VERSION: {}", self.model_version);
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// `true`/`false` (any case, surrounding blanks ignored); unset is `false`.
fn parse_flag(key: &str, raw: Option<&str>) -> Result<bool> {
    match raw {
        None => Ok(false),
        Some(value) => value
            .trim()
            .to_ascii_lowercase()
            .parse()
            .with_context(|| format!("{key} must be true or false, got {value:?}")),
    }
}

/// First of `python3`, `python` found on `PATH`; `python3` if neither is.
fn find_python() -> String {
    let path = env::var_os("PATH").unwrap_or_default();
    ["python3", "python"]
        .into_iter()
        .find(|candidate| env::split_paths(&path).any(|dir| dir.join(candidate).is_file()))
        .unwrap_or("python3")
        .to_string()
}

fn default_script_path() -> PathBuf {
    env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("ml")
        .join("predict.py")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_backend_parses_case_insensitively() {
        assert_eq!("Firestore".parse::<StorageBackend>().unwrap(), StorageBackend::Firestore);
        assert_eq!("postgresql".parse::<StorageBackend>().unwrap(), StorageBackend::Postgres);
        assert!("mongo".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn composite_index_flag_defaults_to_false() {
        assert!(!parse_flag("FIRESTORE_COMPOSITE_INDEX", None).unwrap());
        assert!(parse_flag("FIRESTORE_COMPOSITE_INDEX", Some(" TRUE ")).unwrap());
        assert!(!parse_flag("FIRESTORE_COMPOSITE_INDEX", Some("false")).unwrap());
    }

    #[test]
    fn composite_index_flag_rejects_garbage() {
        let err = parse_flag("FIRESTORE_COMPOSITE_INDEX", Some("yes please")).unwrap_err();
        assert!(err.to_string().contains("FIRESTORE_COMPOSITE_INDEX"));
    }
}
