use tracing::{debug, info, warn};

use crate::errors::{AppError, AppResult};
use crate::models::{PlaceSummary, RemoteReviews};
use crate::normalize::normalize_remote;
use crate::places::{PlaceDetails, PlacesService};
use crate::store::ReviewStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
    Cache,
    Provider,
}

#[derive(Debug, Clone)]
pub struct CachedFetch {
    pub source: CacheSource,
    pub payload: RemoteReviews,
}

/// Serves place reviews from `google_cache` while fresh, otherwise fetches
/// once from the provider and writes the normalized bundle back.
///
/// Failed fetches are neither cached nor retried, and they leave any earlier
/// entry in place. The store lock is only held around the read and the
/// write, never across the provider call.
#[derive(Clone)]
pub struct GoogleReviewCache {
    store: ReviewStore,
    places: Option<PlacesService>,
    ttl_secs: i64,
}

impl GoogleReviewCache {
    pub fn new(store: ReviewStore, places: Option<PlacesService>, ttl_secs: i64) -> Self {
        Self {
            store,
            places,
            ttl_secs,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.places.is_some()
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    pub async fn fetch(&self, place_id: &str) -> AppResult<CachedFetch> {
        let places = self.places.as_ref().ok_or_else(|| {
            AppError::Unavailable("GOOGLE_PLACES_API_KEY is not configured".into())
        })?;

        if let Some(payload) = self.store.get_google_cache(place_id, self.ttl_secs)? {
            debug!(target: "review_cache", place_id, "serving cached place reviews");
            return Ok(CachedFetch {
                source: CacheSource::Cache,
                payload,
            });
        }

        let details = match places.place_details(place_id).await {
            Ok(details) => details,
            Err(err) => {
                warn!(target: "review_cache", place_id, error = %err, "place details fetch failed");
                return Err(err);
            }
        };

        let payload = bundle_place_reviews(details);
        self.store.set_google_cache(place_id, &payload)?;
        info!(
            target: "review_cache",
            place_id,
            reviews = payload.reviews.len(),
            "cached fresh place reviews"
        );
        Ok(CachedFetch {
            source: CacheSource::Provider,
            payload,
        })
    }
}

/// Normalizes every review in response order and attaches the place summary.
/// Remote reviews carry the place name as their listing.
pub fn bundle_place_reviews(details: PlaceDetails) -> RemoteReviews {
    let reviews = details
        .reviews
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let mut review = normalize_remote(raw, index);
            review.listing = details.name.clone();
            review
        })
        .collect();

    RemoteReviews {
        reviews,
        place: PlaceSummary {
            name: details.name,
            address: details.address,
        },
    }
}
