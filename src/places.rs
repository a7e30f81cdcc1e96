use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};

const DETAILS_FIELDS: &str = "reviews,formatted_address,name";
const STATUS_OK: &str = "OK";

/// Place-details response reduced to what the review cache consumes. Reviews
/// stay raw so each one is normalized independently.
#[derive(Debug, Clone, Default)]
pub struct PlaceDetails {
    pub name: Option<String>,
    pub address: Option<String>,
    pub reviews: Vec<Value>,
}

#[async_trait]
pub trait PlaceDetailsLookup: Send + Sync {
    async fn place_details(&self, place_id: &str) -> AppResult<PlaceDetails>;
}

#[derive(Clone)]
pub struct PlacesService {
    inner: Arc<dyn PlaceDetailsLookup>,
}

impl PlacesService {
    /// `None` when no API key is configured; remote fetches are then disabled.
    pub fn new(config: &AppConfig) -> AppResult<Option<Self>> {
        let Some(key) = config.google_places_api_key.clone() else {
            debug!(target: "places", "no places api key configured; remote reviews disabled");
            return Ok(None);
        };
        let client = HttpPlacesClient::new(
            key,
            &config.places_api_base,
            Duration::from_secs(config.places_timeout_secs),
        )?;
        Ok(Some(Self {
            inner: Arc::new(client),
        }))
    }

    pub fn from_lookup(lookup: Arc<dyn PlaceDetailsLookup>) -> Self {
        Self { inner: lookup }
    }

    pub async fn place_details(&self, place_id: &str) -> AppResult<PlaceDetails> {
        self.inner.place_details(place_id).await
    }
}

pub struct HttpPlacesClient {
    http: reqwest::Client,
    api_key: SecretString,
    details_endpoint: String,
}

impl HttpPlacesClient {
    pub fn new(api_key: SecretString, api_base: &str, timeout: Duration) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("guest-reviews/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            api_key,
            details_endpoint: format!("{}/details/json", api_base.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl PlaceDetailsLookup for HttpPlacesClient {
    async fn place_details(&self, place_id: &str) -> AppResult<PlaceDetails> {
        #[derive(Deserialize)]
        struct Response {
            status: Option<String>,
            error_message: Option<String>,
            result: Option<ResponseResult>,
        }

        #[derive(Deserialize)]
        struct ResponseResult {
            name: Option<String>,
            formatted_address: Option<String>,
            reviews: Option<Value>,
        }

        let response = self
            .http
            .get(&self.details_endpoint)
            .query(&[
                ("place_id", place_id),
                ("fields", DETAILS_FIELDS),
                ("key", self.api_key.expose_secret()),
            ])
            .send()
            .await
            .map_err(redact_url)?;

        let http_status = response.status();
        if !http_status.is_success() {
            warn!(
                target: "places",
                place_id,
                status = %http_status,
                "place details request returned an error status"
            );
            return Err(AppError::not_found(format!(
                "place '{place_id}' could not be resolved (HTTP {})",
                http_status.as_u16()
            )));
        }

        let parsed: Response = response.json().await.map_err(redact_url)?;
        let status = parsed.status.unwrap_or_default();
        if status != STATUS_OK {
            warn!(
                target: "places",
                place_id,
                status = %status,
                message = parsed.error_message.as_deref().unwrap_or(""),
                "place details request rejected"
            );
            return Err(AppError::not_found(format!(
                "place '{place_id}' could not be resolved ({status})"
            )));
        }

        let result = parsed.result.unwrap_or(ResponseResult {
            name: None,
            formatted_address: None,
            reviews: None,
        });
        let reviews = match result.reviews {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };

        Ok(PlaceDetails {
            name: result.name,
            address: result.formatted_address,
            reviews,
        })
    }
}

/// The details endpoint takes the key as a query parameter, so request URLs
/// are dropped from errors before they reach logs or callers.
fn redact_url(err: reqwest::Error) -> AppError {
    AppError::Provider(err.without_url())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_without_api_key() {
        let config = AppConfig::default();
        assert!(PlacesService::new(&config).unwrap().is_none());
    }

    #[test]
    fn builds_details_endpoint_from_base() {
        let client = HttpPlacesClient::new(
            SecretString::new("key".into()),
            "http://127.0.0.1:9/place/",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.details_endpoint, "http://127.0.0.1:9/place/details/json");
    }
}
