//! # Tide Extremum Stores
//!
//! The [`ExtremumStore`] trait is the only thing the query controller knows
//! about where tide data comes from. This module also ships the stores the
//! binary uses.
//!
//! ## Stores
//! - [`HttpExtremumStore`]: queries a WorldTides-compatible JSON endpoint for
//!   a day of extremes and caches each response on disk
//! - [`OfflineStore`]: derives extrema from the harmonic model in
//!   [`crate::fallback`]; never fails
//! - [`WithFallback`]: asks a primary store and, if it cannot be reached, a
//!   secondary one
//!
//! ## Wire Format
//! ```text
//! GET {api_url}?extremes&lat=43.66&lon=-70.25&date=2024-06-16&days=1&key=...
//!
//! {"status": 200,
//!  "extremes": [{"dt": 1718524800, "height": 0.31, "type": "Low"}, ...]}
//! ```
//! A `status` other than 200 is reported as a network error carrying the
//! service's `error` message. A body that does not decode, or an extreme of
//! unknown `type`, is malformed data.
//!
//! ## Caching Strategy
//! - **Location**: one JSON file per (lat, lon, date) under the cache directory
//! - **TTL**: file modification time checked before loading
//! - **Failures**: a corrupt or stale file is ignored; a failed write is logged
//!   and otherwise ignored

use crate::fallback::{self, DEFAULT_STEP_MINUTES};
use crate::query::QueryOptions;
use crate::{TideExtremum, TideKind, TideSummary};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

/// Errors a store can report.
///
/// Errors are cloneable so the query controller can keep the latest one in
/// its state; transport errors are captured as text for the same reason.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Transport failure or an error reported by the tide service
    #[error("network error: {0}")]
    Network(String),

    /// Response could not be turned into tide extrema
    #[error("malformed tide data: {0}")]
    MalformedData(String),

    /// Request exceeded the controller's deadline
    #[error("tide fetch timed out after {0:?}")]
    TimedOut(Duration),

    /// The fetch task ended without producing a result
    #[error("tide fetch aborted: {0}")]
    Aborted(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

/// Source of one day of tide extrema for a location.
#[async_trait]
pub trait ExtremumStore: Send + Sync {
    async fn fetch_day_summary(
        &self,
        lat: f64,
        lon: f64,
        options: &QueryOptions,
    ) -> Result<TideSummary, FetchError>;
}

// -- HTTP --

#[derive(Debug, Deserialize)]
struct ExtremesResponse {
    status: u16,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    extremes: Vec<RawExtreme>,
}

#[derive(Debug, Deserialize)]
struct RawExtreme {
    dt: i64,
    height: f64,
    #[serde(rename = "type")]
    kind: String,
}

/// Decode an extremes response body.
pub fn parse_extremes(body: &str) -> Result<TideSummary, FetchError> {
    let response: ExtremesResponse =
        serde_json::from_str(body).map_err(|err| FetchError::MalformedData(err.to_string()))?;

    if response.status != 200 {
        let message = response
            .error
            .unwrap_or_else(|| format!("service status {}", response.status));
        return Err(FetchError::Network(message));
    }

    let extrema = response
        .extremes
        .into_iter()
        .map(|raw| {
            let time = DateTime::<Utc>::from_timestamp(raw.dt, 0).ok_or_else(|| {
                FetchError::MalformedData(format!("timestamp {} out of range", raw.dt))
            })?;
            let kind = match raw.kind.as_str() {
                "High" => TideKind::High,
                "Low" => TideKind::Low,
                other => {
                    return Err(FetchError::MalformedData(format!(
                        "unknown extreme type {other:?}"
                    )))
                }
            };
            Ok(TideExtremum {
                time,
                height: raw.height,
                kind,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TideSummary::new(extrema))
}

/// On-disk cache of day summaries with a time-to-live.
#[derive(Clone, Debug)]
pub struct SummaryCache {
    dir: PathBuf,
    ttl: Duration,
}

impl SummaryCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    pub fn path_for(&self, lat: f64, lon: f64, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("tide_{lat:.4}_{lon:.4}_{}.json", date.format("%Y%m%d")))
    }

    /// Load a cached summary; stale, missing or corrupt files are errors.
    pub async fn load(
        &self,
        lat: f64,
        lon: f64,
        date: NaiveDate,
    ) -> Result<TideSummary, io::Error> {
        let path = self.path_for(lat, lon, date);
        let meta = fs::metadata(&path).await?;

        let age = SystemTime::now()
            .duration_since(meta.modified()?)
            .map_err(|_| io::Error::other("time error"))?;
        if age > self.ttl {
            return Err(io::Error::other("stale"));
        }

        let data = fs::read(&path).await?;
        let summary = serde_json::from_slice(&data)?;
        Ok(summary)
    }

    pub async fn save(
        &self,
        lat: f64,
        lon: f64,
        date: NaiveDate,
        summary: &TideSummary,
    ) -> Result<(), io::Error> {
        fs::create_dir_all(&self.dir).await?;
        let data = serde_json::to_vec(summary)?;
        fs::write(self.path_for(lat, lon, date), data).await?;
        Ok(())
    }
}

/// Store backed by a WorldTides-compatible HTTP endpoint.
///
/// Only `reference_instant` (which day to ask for) is honoured from
/// [`QueryOptions`]; the service computes extremes itself.
pub struct HttpExtremumStore {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    cache: Option<SummaryCache>,
}

impl HttpExtremumStore {
    pub fn new(api_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: SummaryCache) -> Self {
        self.cache = Some(cache);
        self
    }

    async fn request(&self, lat: f64, lon: f64, date: NaiveDate) -> Result<String, FetchError> {
        let mut params = vec![
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("date", date.format("%Y-%m-%d").to_string()),
            ("days", "1".to_string()),
        ];
        if let Some(key) = &self.api_key {
            params.push(("key", key.clone()));
        }

        let response = self
            .client
            .get(format!("{}?extremes", self.api_url))
            .query(&params)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        // the service reports its own errors in the body; prefer those
        if !status.is_success() && serde_json::from_str::<ExtremesResponse>(&body).is_err() {
            return Err(FetchError::Network(format!("HTTP {status}")));
        }
        Ok(body)
    }
}

#[async_trait]
impl ExtremumStore for HttpExtremumStore {
    async fn fetch_day_summary(
        &self,
        lat: f64,
        lon: f64,
        options: &QueryOptions,
    ) -> Result<TideSummary, FetchError> {
        let date = options.day();

        if let Some(cache) = &self.cache {
            if let Ok(summary) = cache.load(lat, lon, date).await {
                debug!(lat, lon, %date, "tide cache hit");
                return Ok(summary);
            }
        }

        let body = self.request(lat, lon, date).await?;
        let summary = parse_extremes(&body)?;
        info!(lat, lon, %date, extrema = summary.len(), "fetched tide extremes");

        if let Some(cache) = &self.cache {
            if let Err(err) = cache.save(lat, lon, date, &summary).await {
                warn!(error = %err, "could not write tide cache");
            }
        }

        Ok(summary)
    }
}

// -- Offline --

/// Store that approximates extrema from the harmonic model.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineStore;

#[async_trait]
impl ExtremumStore for OfflineStore {
    async fn fetch_day_summary(
        &self,
        _lat: f64,
        lon: f64,
        options: &QueryOptions,
    ) -> Result<TideSummary, FetchError> {
        Ok(fallback::approximate_day(
            options.day(),
            lon,
            options.step_minutes.unwrap_or(DEFAULT_STEP_MINUTES),
            options.smooth_window_minutes,
        ))
    }
}

// -- Composition --

/// Try `primary`; when it reports a [`FetchError::Network`] failure answer
/// from `secondary` instead.
///
/// Malformed data is passed through, so a broken service response still
/// surfaces as a failure rather than being papered over by the model.
pub struct WithFallback<P, F> {
    primary: P,
    secondary: F,
}

impl<P, F> WithFallback<P, F> {
    pub fn new(primary: P, secondary: F) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl<P, F> ExtremumStore for WithFallback<P, F>
where
    P: ExtremumStore,
    F: ExtremumStore,
{
    async fn fetch_day_summary(
        &self,
        lat: f64,
        lon: f64,
        options: &QueryOptions,
    ) -> Result<TideSummary, FetchError> {
        match self.primary.fetch_day_summary(lat, lon, options).await {
            Err(err @ FetchError::Network(_)) => {
                warn!(error = %err, "primary tide store unreachable, using fallback");
                self.secondary.fetch_day_summary(lat, lon, options).await
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use tempfile::TempDir;

    const BODY: &str = r#"{
        "status": 200,
        "extremes": [
            {"dt": 1718546400, "date": "2024-06-16T14:00+0000", "height": 2.1, "type": "High"},
            {"dt": 1718524800, "date": "2024-06-16T08:00+0000", "height": 0.3, "type": "Low"}
        ]
    }"#;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 16).unwrap()
    }

    #[test]
    fn parses_and_sorts_extremes() {
        let summary = parse_extremes(BODY).unwrap();
        let extrema = summary.extrema();
        assert_eq!(extrema.len(), 2);
        assert_eq!(extrema[0].kind, TideKind::Low);
        assert_eq!(
            extrema[0].time,
            Utc.with_ymd_and_hms(2024, 6, 16, 8, 0, 0).unwrap()
        );
        assert_eq!(extrema[1].height, 2.1);
    }

    #[test]
    fn service_errors_are_network_errors() {
        let body = r#"{"status": 400, "error": "Invalid api key"}"#;
        assert_eq!(
            parse_extremes(body),
            Err(FetchError::Network("Invalid api key".to_string()))
        );
    }

    #[test]
    fn bad_bodies_are_malformed() {
        assert!(matches!(
            parse_extremes("<html>"),
            Err(FetchError::MalformedData(_))
        ));
        let body = r#"{"status": 200, "extremes": [{"dt": 0, "height": 1.0, "type": "Slack"}]}"#;
        assert!(matches!(
            parse_extremes(body),
            Err(FetchError::MalformedData(msg)) if msg.contains("Slack")
        ));
    }

    #[test]
    fn empty_extremes_are_an_empty_summary() {
        let summary = parse_extremes(r#"{"status": 200}"#).unwrap();
        assert!(summary.is_empty());
    }

    #[tokio::test]
    async fn cache_roundtrip() {
        let dir = TempDir::new().unwrap();
        let cache = SummaryCache::new(dir.path(), Duration::from_secs(1800));
        let summary = parse_extremes(BODY).unwrap();

        cache.save(43.66, -70.25, date(), &summary).await.unwrap();
        let loaded = cache.load(43.66, -70.25, date()).await.unwrap();
        assert_eq!(loaded, summary);

        // different location misses
        assert!(cache.load(43.67, -70.25, date()).await.is_err());
    }

    #[tokio::test]
    async fn stale_cache_is_ignored() {
        let dir = TempDir::new().unwrap();
        let cache = SummaryCache::new(dir.path(), Duration::ZERO);
        let summary = parse_extremes(BODY).unwrap();
        cache.save(43.66, -70.25, date(), &summary).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(cache.load(43.66, -70.25, date()).await.is_err());
    }

    #[tokio::test]
    async fn corrupt_cache_is_an_error() {
        let dir = TempDir::new().unwrap();
        let cache = SummaryCache::new(dir.path(), Duration::from_secs(1800));
        std::fs::write(cache.path_for(1.0, 2.0, date()), b"not json").unwrap();
        assert!(cache.load(1.0, 2.0, date()).await.is_err());
    }

    struct Failing(FetchError);

    #[async_trait]
    impl ExtremumStore for Failing {
        async fn fetch_day_summary(
            &self,
            _lat: f64,
            _lon: f64,
            _options: &QueryOptions,
        ) -> Result<TideSummary, FetchError> {
            Err(self.0.clone())
        }
    }

    fn noon_options() -> QueryOptions {
        QueryOptions {
            reference_instant: Some(Utc.with_ymd_and_hms(2024, 6, 16, 12, 0, 0).unwrap()),
            ..QueryOptions::default()
        }
    }

    #[tokio::test]
    async fn fallback_answers_when_primary_is_unreachable() {
        let store = WithFallback::new(
            Failing(FetchError::Network("unreachable".to_string())),
            OfflineStore,
        );
        let summary = store
            .fetch_day_summary(43.66, -70.25, &noon_options())
            .await
            .unwrap();
        assert!(summary.len() >= 3);
        assert!(summary.extrema().iter().all(|e| e.time.date_naive() == date()));
    }

    #[tokio::test]
    async fn malformed_primary_data_is_not_replaced() {
        let malformed = FetchError::MalformedData("unknown extreme type".to_string());
        let store = WithFallback::new(Failing(malformed.clone()), OfflineStore);
        let result = store.fetch_day_summary(43.66, -70.25, &noon_options()).await;
        assert_eq!(result, Err(malformed));
    }

    #[tokio::test]
    async fn offline_store_honours_step_option() {
        let coarse = QueryOptions {
            step_minutes: Some(60),
            reference_instant: Some(Utc.with_ymd_and_hms(2024, 6, 16, 12, 0, 0).unwrap()),
            ..QueryOptions::default()
        };
        let summary = OfflineStore
            .fetch_day_summary(43.66, -70.25, &coarse)
            .await
            .unwrap();
        assert!(summary.extrema().iter().all(|e| e.time.minute() == 0));
    }
}
