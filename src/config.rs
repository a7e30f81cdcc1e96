use std::path::PathBuf;
use std::{env, io};

use secrecy::SecretString;
use serde::Serialize;
use tracing::debug;

pub const DEFAULT_CACHE_TTL_SECS: i64 = 86_400;
const DEFAULT_PLACES_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PLACES_API_BASE: &str = "https://maps.googleapis.com/maps/api/place";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_file_name: String,
    pub dataset_path: PathBuf,
    pub cache_ttl_secs: i64,
    pub places_timeout_secs: u64,
    pub places_api_base: String,
    pub google_places_api_key: Option<SecretString>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicAppConfig {
    pub database_file_name: String,
    pub dataset_path: String,
    pub cache_ttl_secs: i64,
    pub places_timeout_secs: u64,
    pub places_api_base: String,
    pub has_google_places_key: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        load_dotenv_if_applicable();
        Self {
            database_file_name: env::var("DATABASE_FILE_NAME")
                .unwrap_or_else(|_| "reviews.db".to_string()),
            dataset_path: env::var("REVIEWS_DATASET_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("mock_reviews.json")),
            cache_ttl_secs: parse_i64("GOOGLE_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS).max(0),
            places_timeout_secs: parse_u64("PLACES_HTTP_TIMEOUT_SECS", DEFAULT_PLACES_TIMEOUT_SECS)
                .max(1),
            places_api_base: env::var("PLACES_API_BASE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PLACES_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            google_places_api_key: env::var("GOOGLE_PLACES_API_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(|v| SecretString::new(v.into())),
        }
    }

    pub fn public_profile(&self) -> PublicAppConfig {
        PublicAppConfig {
            database_file_name: self.database_file_name.clone(),
            dataset_path: self.dataset_path.to_string_lossy().to_string(),
            cache_ttl_secs: self.cache_ttl_secs,
            places_timeout_secs: self.places_timeout_secs,
            places_api_base: self.places_api_base.clone(),
            has_google_places_key: self.google_places_api_key.is_some(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_file_name: "reviews.db".to_string(),
            dataset_path: PathBuf::from("mock_reviews.json"),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            places_timeout_secs: DEFAULT_PLACES_TIMEOUT_SECS,
            places_api_base: DEFAULT_PLACES_API_BASE.to_string(),
            google_places_api_key: None,
        }
    }
}

fn load_dotenv_if_applicable() {
    if !should_load_dotenv() {
        debug!("skipping .env load outside dev mode");
        return;
    }

    if let Err(err) = dotenvy::dotenv() {
        match &err {
            dotenvy::Error::Io(io_err) if io_err.kind() == io::ErrorKind::NotFound => {}
            _ => debug!(?err, "unable to load .env file"),
        }
    }
}

fn should_load_dotenv() -> bool {
    cfg!(debug_assertions) || parse_bool("ALLOW_DOTENV", false)
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(default)
}

fn parse_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_i64(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(default)
}
