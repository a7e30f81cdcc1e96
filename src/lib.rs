mod cache;
mod config;
mod dataset;
mod db;
mod errors;
mod models;
mod normalize;
mod places;
mod service;
mod store;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use crate::cache::{bundle_place_reviews, CacheSource, CachedFetch, GoogleReviewCache};
pub use crate::config::{AppConfig, PublicAppConfig, DEFAULT_CACHE_TTL_SECS};
pub use crate::dataset::LocalDataset;
pub use crate::db::{bootstrap, now_timestamp, DatabaseContext};
pub use crate::errors::{AppError, AppResult, ErrorKind};
pub use crate::models::{ApprovalStamp, PlaceSummary, RemoteReviews, Review};
pub use crate::normalize::{normalize_date, normalize_date_text, normalize_local, normalize_remote};
pub use crate::places::{HttpPlacesClient, PlaceDetails, PlaceDetailsLookup, PlacesService};
pub use crate::service::{
    Ack, ApprovalSummary, ApprovalUpdate, ApprovedIds, ApprovedWithTimestamps,
    PlaceMappingPayload, PlaceMappingResponse, ReviewService, ReviewsResponse,
};
pub use crate::store::ReviewStore;

pub struct AppState {
    service: ReviewService,
    db_path: PathBuf,
    config: AppConfig,
    local_review_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    pub db_path: String,
    pub local_review_count: usize,
    pub remote_reviews_enabled: bool,
    pub config: PublicAppConfig,
}

impl AppState {
    /// Reads configuration from the environment and opens the store under
    /// `data_dir`.
    pub fn initialize(data_dir: &Path) -> AppResult<Self> {
        init_tracing();
        Self::with_config(data_dir, AppConfig::from_env())
    }

    pub fn with_config(data_dir: &Path, config: AppConfig) -> AppResult<Self> {
        let DatabaseContext { connection, path } =
            bootstrap(data_dir, &config.database_file_name)?;
        let dataset = LocalDataset::load(&config.dataset_path)?;
        let store = ReviewStore::new(Arc::new(Mutex::new(connection)));
        let places = PlacesService::new(&config)?;
        let cache = GoogleReviewCache::new(store.clone(), places, config.cache_ttl_secs);
        let local_review_count = dataset.len();

        info!(
            db_path = %path.display(),
            local_reviews = local_review_count,
            remote_reviews = cache.is_enabled(),
            "review service initialized"
        );

        Ok(Self {
            service: ReviewService::new(Arc::new(dataset), store, cache),
            db_path: path,
            config,
            local_review_count,
        })
    }

    pub fn service(&self) -> &ReviewService {
        &self.service
    }

    pub fn health(&self) -> ServiceHealth {
        ServiceHealth {
            db_path: self.db_path.to_string_lossy().to_string(),
            local_review_count: self.local_review_count,
            remote_reviews_enabled: self.config.google_places_api_key.is_some(),
            config: self.config.public_profile(),
        }
    }
}

fn init_tracing() {
    static INIT: OnceCell<()> = OnceCell::new();
    let _ = INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,guest_reviews=debug"));
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init();
    });
}
