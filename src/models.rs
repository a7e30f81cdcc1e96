use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const LOCAL_CHANNEL: &str = "Hostaway";
pub const REMOTE_CHANNEL: &str = "Google";

/// Canonical review shape shared by every source. Never persisted on its
/// own; remote reviews only survive inside a cached [`RemoteReviews`] bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Option<i64>,
    pub listing: Option<String>,
    #[serde(rename = "type")]
    pub review_type: Option<String>,
    pub channel: String,
    pub date: Option<String>,
    pub review_text: Option<String>,
    #[serde(default)]
    pub categories: BTreeMap<String, i64>,
    pub rating: Option<i64>,
    pub status: Option<String>,
    pub guest_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceSummary {
    pub name: Option<String>,
    pub address: Option<String>,
}

/// Payload stored in `google_cache` and returned by remote fetches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteReviews {
    pub reviews: Vec<Review>,
    pub place: PlaceSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalStamp {
    pub id: i64,
    pub updated_at: i64,
}
