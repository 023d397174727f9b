//! Driving distance and duration lookups via the Google Distance Matrix
//! API, fronted by a persistent pair-keyed cache.

pub mod cache;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;

use crate::batch::BatchRunner;
use crate::config::{self, ConfigError};
use crate::model::is_trivial;
use crate::telemetry::PipelineObserver;
use cache::{cache_key, CacheEntry, RouteCache};

const DISTANCE_MATRIX_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";
const MILES_PER_METER: f64 = 0.000621371;
const SECONDS_PER_HOUR: f64 = 3600.0;

/// An origin/destination pair to resolve. Both are free-text locations
/// ("City, ST" or a bare zip).
#[derive(Debug, Clone)]
pub struct RoutePair {
    pub origin: String,
    pub destination: String,
}

/// A successfully resolved route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteLeg {
    pub distance_miles: u32,
    pub duration_hours: f64,
    pub formatted_distance: String,
    pub formatted_duration: String,
}

/// Outcome of a route lookup. Callers pattern-match instead of checking a
/// success flag.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteResult {
    /// Distance and duration are known.
    Resolved(RouteLeg),
    /// The provider found no driving route (NOT_FOUND / ZERO_RESULTS).
    /// A legitimate business outcome, not an error.
    NoRoute,
    /// Origin or destination was "N/A"; nothing was looked up.
    MissingLocation,
    /// The upstream call failed; recovered per-item inside a batch.
    Failed,
}

impl RouteResult {
    pub fn leg(&self) -> Option<&RouteLeg> {
        match self {
            Self::Resolved(leg) => Some(leg),
            _ => None,
        }
    }
}

/// Hard failures from a single distance lookup. `NoRoute` and
/// `MissingLocation` are not errors and never appear here.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("distance matrix request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("distance matrix API error: {status} ({message})")]
    Upstream { status: String, message: String },
    #[error("unexpected element status: {0}")]
    Element(String),
    #[error("distance matrix response had no elements")]
    Malformed,
}

/// Seam between the pipeline and the routing backend.
#[async_trait]
pub trait RoutePlanner: Send + Sync {
    /// Resolve many pairs, output order matching input order. Hard errors
    /// are recovered to [`RouteResult::Failed`] so one bad pair cannot
    /// abort the batch.
    async fn batch_distances(&self, pairs: &[RoutePair]) -> Vec<RouteResult>;
}

/// Upstream seam: one distance matrix call. Lets tests resolve against a
/// canned body instead of the live API.
#[async_trait]
trait DistanceMatrixApi: Send + Sync {
    async fn fetch(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<DistanceMatrixResponse, RouteError>;
}

struct GoogleMatrixApi {
    http: reqwest::Client,
    api_key: String,
}

#[async_trait]
impl DistanceMatrixApi for GoogleMatrixApi {
    async fn fetch(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<DistanceMatrixResponse, RouteError> {
        let response = self
            .http
            .get(DISTANCE_MATRIX_URL)
            .query(&[
                ("origins", origin),
                ("destinations", destination),
                ("units", "imperial"),
                ("mode", "driving"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

/// Distance Matrix client with cache-first lookups.
pub struct RouteService {
    api: Arc<dyn DistanceMatrixApi>,
    cache: Arc<RouteCache>,
    runner: BatchRunner,
    observer: Arc<dyn PipelineObserver>,
}

impl RouteService {
    /// Reads the Maps API key from the environment; missing key fails
    /// fast here rather than on the first lookup.
    pub fn from_env(
        cache: Arc<RouteCache>,
        observer: Arc<dyn PipelineObserver>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            api: Arc::new(GoogleMatrixApi {
                http: reqwest::Client::new(),
                api_key: config::maps_api_key()?,
            }),
            cache,
            runner: BatchRunner::default(),
            observer,
        })
    }

    /// Resolve one pair: trivial-input short-circuit, then cache, then the
    /// live API. Cache read/write failures are logged and ignored; the
    /// cache is an optimization, never a correctness dependency.
    pub async fn distance(&self, origin: &str, destination: &str) -> Result<RouteResult, RouteError> {
        if is_trivial(origin) || is_trivial(destination) {
            return Ok(RouteResult::MissingLocation);
        }

        let key = cache_key(origin, destination);
        match self.cache.find(&key) {
            Ok(Some(entry)) => {
                self.observer.cache_hit(&key);
                return Ok(RouteResult::Resolved(RouteLeg {
                    distance_miles: entry.distance_miles,
                    duration_hours: entry.duration_hours,
                    formatted_distance: entry.formatted_distance,
                    formatted_duration: entry.formatted_duration,
                }));
            }
            Ok(None) => self.observer.cache_miss(&key),
            Err(err) => self.observer.cache_error("find", &err.to_string()),
        }

        let body = self.api.fetch(origin, destination).await?;
        let outcome = route_from_body(&body)?;

        match &outcome {
            RouteResult::Resolved(leg) => {
                tracing::debug!(
                    origin,
                    destination,
                    miles = leg.distance_miles,
                    "route resolved"
                );
                let entry = CacheEntry {
                    cache_key: key,
                    origin: origin.trim().to_string(),
                    destination: destination.trim().to_string(),
                    distance_miles: leg.distance_miles,
                    duration_hours: leg.duration_hours,
                    formatted_distance: leg.formatted_distance.clone(),
                    formatted_duration: leg.formatted_duration.clone(),
                    created_at: Utc::now(),
                };
                if let Err(err) = self.cache.insert(entry) {
                    self.observer.cache_error("insert", &err.to_string());
                }
            }
            RouteResult::NoRoute => {
                self.observer.lookup_failed("route", "no_route");
            }
            _ => {}
        }

        Ok(outcome)
    }
}

#[async_trait]
impl RoutePlanner for RouteService {
    async fn batch_distances(&self, pairs: &[RoutePair]) -> Vec<RouteResult> {
        self.observer.batch_started("route", pairs.len());
        let results = self
            .runner
            .run(pairs.to_vec(), |pair| async move {
                match self.distance(&pair.origin, &pair.destination).await {
                    Ok(result) => result,
                    Err(err) => {
                        self.observer.lookup_failed("route", "upstream_error");
                        tracing::warn!(
                            origin = %pair.origin,
                            destination = %pair.destination,
                            error = %err,
                            "route lookup failed"
                        );
                        RouteResult::Failed
                    }
                }
            })
            .await;
        let succeeded = results.iter().filter(|r| r.leg().is_some()).count();
        self.observer.batch_finished("route", succeeded, results.len());
        results
    }
}

/// Interpret a distance matrix body. Top-level non-OK status and unknown
/// element statuses are hard errors; NOT_FOUND/ZERO_RESULTS map to
/// [`RouteResult::NoRoute`].
fn route_from_body(body: &DistanceMatrixResponse) -> Result<RouteResult, RouteError> {
    if body.status != "OK" {
        return Err(RouteError::Upstream {
            status: body.status.clone(),
            message: body
                .error_message
                .clone()
                .unwrap_or_else(|| "no details".to_string()),
        });
    }

    let element = body
        .rows
        .first()
        .and_then(|row| row.elements.first())
        .ok_or(RouteError::Malformed)?;

    match element.status.as_str() {
        "OK" => {
            let (distance, duration) = match (&element.distance, &element.duration) {
                (Some(d), Some(t)) => (d, t),
                _ => return Err(RouteError::Malformed),
            };
            let distance_miles = (distance.value * MILES_PER_METER).round() as u32;
            let duration_hours = duration.value / SECONDS_PER_HOUR;
            Ok(RouteResult::Resolved(RouteLeg {
                distance_miles,
                duration_hours,
                formatted_distance: distance.text.clone(),
                formatted_duration: duration.text.clone(),
            }))
        }
        "NOT_FOUND" | "ZERO_RESULTS" => Ok(RouteResult::NoRoute),
        other => Err(RouteError::Element(other.to_string())),
    }
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    #[serde(default)]
    distance: Option<MatrixValue>,
    #[serde(default)]
    duration: Option<MatrixValue>,
}

#[derive(Debug, Deserialize)]
struct MatrixValue {
    /// Meters for distance, seconds for duration.
    value: f64,
    text: String,
}
