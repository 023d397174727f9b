//! Zip code to "City, ST" resolution via the Google Geocoding API.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::batch::BatchRunner;
use crate::config::{self, ConfigError};
use crate::model::is_trivial;
use crate::telemetry::PipelineObserver;

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Outcome of a single zip resolution. Never an error: on any failure
/// `city_state` carries a best-effort fallback string instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocodeResult {
    /// "City, ST" on success; the original zip (or "N/A" for trivial
    /// input) otherwise.
    pub city_state: String,
    pub resolved: bool,
}

impl GeocodeResult {
    fn unresolved(fallback: impl Into<String>) -> Self {
        Self {
            city_state: fallback.into(),
            resolved: false,
        }
    }
}

/// Seam between the pipeline and the geocoding backend.
#[async_trait]
pub trait ZipResolver: Send + Sync {
    /// Resolve many zips, output order matching input order.
    async fn resolve_many(&self, zips: &[String]) -> Vec<GeocodeResult>;
}

/// Geocoding client with chunked batch resolution.
pub struct GeoResolver {
    http: reqwest::Client,
    api_key: String,
    runner: BatchRunner,
    observer: Arc<dyn PipelineObserver>,
}

impl GeoResolver {
    /// Reads the Maps API key from the environment. Missing key is a hard
    /// error up front rather than a silent per-lookup fallback.
    pub fn from_env(observer: Arc<dyn PipelineObserver>) -> Result<Self, ConfigError> {
        Ok(Self {
            http: reqwest::Client::new(),
            api_key: config::maps_api_key()?,
            runner: BatchRunner::default(),
            observer,
        })
    }

    /// Resolve one zip. Trivial input short-circuits without a network
    /// call; lookup failures fall back to the zip itself so the caller
    /// always gets a usable location string.
    pub async fn resolve_one(&self, zip: &str) -> GeocodeResult {
        if is_trivial(zip) {
            return GeocodeResult::unresolved("N/A");
        }
        let zip = zip.trim();

        match self.lookup(zip).await {
            Ok(Some(city_state)) => {
                tracing::debug!(zip, %city_state, "geocoded");
                GeocodeResult {
                    city_state,
                    resolved: true,
                }
            }
            Ok(None) => {
                self.observer.lookup_failed("geocode", "no_results");
                GeocodeResult::unresolved(zip)
            }
            Err(err) => {
                self.observer.lookup_failed("geocode", "upstream_error");
                tracing::warn!(zip, error = %err, "geocoding failed, passing zip through");
                GeocodeResult::unresolved(zip)
            }
        }
    }

    async fn lookup(&self, zip: &str) -> Result<Option<String>, reqwest::Error> {
        let response = self
            .http
            .get(GEOCODE_URL)
            .query(&[("address", format!("{zip}, USA")), ("key", self.api_key.clone())])
            .send()
            .await?
            .error_for_status()?;

        let body: GeocodeResponse = response.json().await?;
        Ok(city_state_from(&body))
    }
}

#[async_trait]
impl ZipResolver for GeoResolver {
    async fn resolve_many(&self, zips: &[String]) -> Vec<GeocodeResult> {
        self.observer.batch_started("geocode", zips.len());
        let results = self
            .runner
            .run(zips.to_vec(), |zip| async move { self.resolve_one(&zip).await })
            .await;
        let succeeded = results.iter().filter(|r| r.resolved).count();
        self.observer.batch_finished("geocode", succeeded, results.len());
        results
    }
}

/// Pull "City, ST" out of a geocoding response: locality long name plus
/// administrative_area_level_1 short name, both required.
fn city_state_from(body: &GeocodeResponse) -> Option<String> {
    if body.status != "OK" {
        return None;
    }
    let result = body.results.first()?;

    let mut city = None;
    let mut state = None;
    for component in &result.address_components {
        if component.types.iter().any(|t| t == "locality") {
            city = Some(component.long_name.as_str());
        }
        if component.types.iter().any(|t| t == "administrative_area_level_1") {
            state = Some(component.short_name.as_str());
        }
    }

    match (city, state) {
        (Some(city), Some(state)) => Some(format!("{city}, {state}")),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeEntry>,
}

#[derive(Debug, Deserialize)]
struct GeocodeEntry {
    address_components: Vec<AddressComponent>,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    long_name: String,
    short_name: String,
    types: Vec<String>,
}
