use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cache::GoogleReviewCache;
use crate::dataset::LocalDataset;
use crate::errors::{AppError, AppResult};
use crate::models::{ApprovalStamp, RemoteReviews, Review};
use crate::normalize::normalize_local;
use crate::store::ReviewStore;

#[derive(Debug, Clone, Serialize)]
pub struct ReviewsResponse {
    pub reviews: Vec<Review>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ApprovalUpdate {
    pub id: i64,
    pub approved: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalSummary {
    pub approved_count: usize,
    pub approved: Vec<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApprovedIds {
    pub approved: Vec<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApprovedWithTimestamps {
    pub approved: Vec<ApprovalStamp>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceMappingPayload {
    pub listing: String,
    #[serde(alias = "place_id")]
    pub place_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceMappingResponse {
    pub place_id: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    fn ok() -> Self {
        Self { ok: true }
    }
}

/// Answers the front end's review, moderation and place-mapping queries. Holds
/// no state beyond its collaborators.
#[derive(Clone)]
pub struct ReviewService {
    dataset: Arc<LocalDataset>,
    store: ReviewStore,
    cache: GoogleReviewCache,
}

impl ReviewService {
    pub fn new(dataset: Arc<LocalDataset>, store: ReviewStore, cache: GoogleReviewCache) -> Self {
        Self {
            dataset,
            store,
            cache,
        }
    }

    /// Local reviews, newest first. Dates compare as strings, so records whose
    /// date could not be normalized sort by their raw text.
    pub fn list_local_reviews(&self) -> AppResult<ReviewsResponse> {
        if self.dataset.is_empty() {
            return Err(AppError::not_found("no local reviews available"));
        }
        let mut reviews: Vec<Review> = self.dataset.records().iter().map(normalize_local).collect();
        reviews.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(ReviewsResponse { reviews })
    }

    pub fn set_approvals(&self, updates: &[ApprovalUpdate]) -> AppResult<ApprovalSummary> {
        for update in updates {
            self.store.set_approval(update.id, update.approved)?;
        }
        let approved = self.store.list_approved()?;
        info!(
            target: "moderation",
            updates = updates.len(),
            approved = approved.len(),
            "approvals updated"
        );
        Ok(ApprovalSummary {
            approved_count: approved.len(),
            approved,
        })
    }

    pub fn list_approved_ids(&self) -> AppResult<ApprovedIds> {
        Ok(ApprovedIds {
            approved: self.store.list_approved()?,
        })
    }

    pub fn list_approved_with_timestamps(&self) -> AppResult<ApprovedWithTimestamps> {
        Ok(ApprovedWithTimestamps {
            approved: self.store.list_approved_with_timestamps()?,
        })
    }

    pub fn set_place_mapping(&self, payload: &PlaceMappingPayload) -> AppResult<Ack> {
        self.store
            .set_place_mapping(&payload.listing, &payload.place_id)?;
        Ok(Ack::ok())
    }

    pub fn get_place_mapping(&self, listing: &str) -> AppResult<PlaceMappingResponse> {
        self.store
            .get_place_mapping(listing)?
            .map(|place_id| PlaceMappingResponse { place_id })
            .ok_or_else(|| AppError::not_found(format!("no place mapping for listing '{listing}'")))
    }

    pub fn delete_place_mapping(&self, listing: &str) -> AppResult<Ack> {
        if self.store.delete_place_mapping(listing)? {
            Ok(Ack::ok())
        } else {
            Err(AppError::not_found(format!(
                "no place mapping for listing '{listing}'"
            )))
        }
    }

    pub async fn fetch_remote_reviews(&self, place_id: &str) -> AppResult<RemoteReviews> {
        Ok(self.cache.fetch(place_id).await?.payload)
    }

    /// Resolves the listing's mapped place id, then fetches its reviews.
    pub async fn fetch_remote_reviews_for_listing(&self, listing: &str) -> AppResult<RemoteReviews> {
        let mapping = self.get_place_mapping(listing)?;
        self.fetch_remote_reviews(&mapping.place_id).await
    }
}
