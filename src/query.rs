//! # Query Lifecycle Controller
//!
//! Owns the fetch-and-commit cycle that feeds the interpolation engine. A
//! consumer calls [`QueryController::observe`] with its current [`Query`] as
//! often as it likes (every render is fine); the controller only talks to the
//! [`ExtremumStore`] when the query changes *by value*.
//!
//! ## Relevance Filtering
//! Every issued request gets a generation number. Issuing a newer request, or
//! tearing the current one down, bumps the controller's generation and so
//! cancels every older [`CancelToken`]. A finished request checks its token
//! while holding the state slot's write lock, which makes the check and the
//! write a single step: a superseded result can never overwrite
//! [`QueryState`], whatever order the requests finish in. Superseded results
//! are dropped without a trace.
//!
//! The underlying I/O is never aborted; cancellation is cooperative.
//!
//! A store that panics still settles its request: the fetch runs in its own
//! task and a failed join is committed as [`FetchError::Aborted`].
//!
//! ## Observers
//! State lives in a `tokio::sync::watch` channel owned by the controller.
//! [`QueryController::subscribe`] hands out receivers, so any number of
//! consumers can follow state changes without a shared global slot.

use crate::extremum_store::{ExtremumStore, FetchError};
use crate::TideSummary;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Per-query knobs forwarded to the extremum store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Moving-average window applied by stores that derive extrema from a
    /// sampled curve
    pub smooth_window_minutes: Option<u32>,
    /// Sampling resolution for stores that derive extrema from a curve
    pub step_minutes: Option<u32>,
    /// Instant whose UTC calendar day is requested; `None` means today
    pub reference_instant: Option<DateTime<Utc>>,
}

impl QueryOptions {
    /// The UTC day a store should return extrema for.
    pub fn day(&self) -> NaiveDate {
        self.reference_instant.unwrap_or_else(Utc::now).date_naive()
    }
}

/// A request for one day of tide extrema at a location.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub lat: f64,
    pub lon: f64,
    pub options: QueryOptions,
}

impl Query {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            options: QueryOptions::default(),
        }
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// Finite coordinates within `[-90, 90]` x `[-180, 180]`.
    pub fn has_valid_location(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    pub fn key(&self) -> QueryKey {
        QueryKey {
            lat_bits: self.lat.to_bits(),
            lon_bits: self.lon.to_bits(),
            options: self.options.clone(),
        }
    }
}

/// Canonical identity of a [`Query`].
///
/// Coordinates compare by bit pattern, so equality is total and hashable.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QueryKey {
    lat_bits: u64,
    lon_bits: u64,
    options: QueryOptions,
}

/// What a consumer sees for its current query.
///
/// `data` absent with `loading == false` and no `error` means "no data yet";
/// the three fields together tell "no data", "loading" and "failed" apart.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryState {
    pub data: Option<Arc<TideSummary>>,
    pub loading: bool,
    pub error: Option<FetchError>,
}

/// Cancellation handle for one issued request.
#[derive(Clone, Debug)]
pub struct CancelToken {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl CancelToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True once a newer request was issued or this one was torn down.
    pub fn is_cancelled(&self) -> bool {
        self.current.load(Ordering::SeqCst) != self.generation
    }
}

/// Drives fetches for the latest query and publishes [`QueryState`].
///
/// Requests are spawned onto the ambient Tokio runtime, so
/// [`observe`](Self::observe) must be called from within one.
pub struct QueryController<S> {
    store: Arc<S>,
    fetch_timeout: Option<Duration>,
    active: Option<QueryKey>,
    generation: Arc<AtomicU64>,
    state: Arc<watch::Sender<QueryState>>,
    tasks: Vec<JoinHandle<()>>,
}

impl<S> QueryController<S>
where
    S: ExtremumStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        let (state, _) = watch::channel(QueryState::default());
        Self {
            store,
            fetch_timeout: None,
            active: None,
            generation: Arc::new(AtomicU64::new(0)),
            state: Arc::new(state),
            tasks: Vec::new(),
        }
    }

    /// Fail requests that take longer than `timeout` with [`FetchError::TimedOut`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Report state for `query`, issuing a fetch if it differs from the last one.
    ///
    /// `None`, or a query without a valid location, tears down any in-flight
    /// request and issues nothing; previously committed data is kept.
    pub fn observe(&mut self, query: Option<&Query>) -> QueryState {
        let query = query.filter(|q| q.has_valid_location());
        let key = query.map(Query::key);
        if key != self.active {
            self.active = key;
            match query {
                Some(query) => self.issue(query.clone()),
                None => self.cancel_in_flight(),
            }
        }
        self.snapshot()
    }

    pub fn snapshot(&self) -> QueryState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState> {
        self.state.subscribe()
    }

    /// Wait for every request issued so far to finish, committed or discarded.
    pub async fn settle(&mut self) {
        for task in self.tasks.drain(..) {
            if let Err(err) = task.await {
                warn!(error = %err, "tide fetch task did not complete");
            }
        }
    }

    fn issue(&mut self, query: Query) {
        let current = Arc::clone(&self.generation);
        let mut generation = 0;
        self.state.send_modify(|state| {
            generation = current.fetch_add(1, Ordering::SeqCst) + 1;
            state.loading = true;
            state.error = None;
        });
        debug!(lat = query.lat, lon = query.lon, generation, "issuing tide fetch");

        let token = CancelToken {
            generation,
            current,
        };
        let store = Arc::clone(&self.store);
        let slot = Arc::clone(&self.state);
        let timeout = self.fetch_timeout;

        let request = tokio::spawn(async move { fetch(store.as_ref(), &query, timeout).await });

        self.tasks.retain(|task| !task.is_finished());
        self.tasks.push(tokio::spawn(async move {
            let outcome = request
                .await
                .unwrap_or_else(|err| Err(FetchError::Aborted(err.to_string())));
            commit(&slot, &token, outcome);
        }));
    }

    fn cancel_in_flight(&mut self) {
        cancel(&self.state, &self.generation);
    }
}

impl<S> Drop for QueryController<S> {
    fn drop(&mut self) {
        cancel(&self.state, &self.generation);
    }
}

fn cancel(slot: &watch::Sender<QueryState>, generation: &AtomicU64) {
    slot.send_if_modified(|state| {
        generation.fetch_add(1, Ordering::SeqCst);
        std::mem::replace(&mut state.loading, false)
    });
}

async fn fetch<S>(
    store: &S,
    query: &Query,
    timeout: Option<Duration>,
) -> Result<TideSummary, FetchError>
where
    S: ExtremumStore + ?Sized,
{
    let request = store.fetch_day_summary(query.lat, query.lon, &query.options);
    match timeout {
        Some(limit) => tokio::time::timeout(limit, request)
            .await
            .map_err(|_| FetchError::TimedOut(limit))?,
        None => request.await,
    }
}

fn commit(
    slot: &watch::Sender<QueryState>,
    token: &CancelToken,
    outcome: Result<TideSummary, FetchError>,
) {
    slot.send_if_modified(|state| {
        if token.is_cancelled() {
            return false;
        }
        match outcome {
            Ok(summary) => {
                debug!(
                    generation = token.generation(),
                    extrema = summary.len(),
                    "committed tide summary"
                );
                state.data = Some(Arc::new(summary));
                state.error = None;
            }
            Err(err) => {
                warn!(generation = token.generation(), error = %err, "tide fetch failed");
                state.error = Some(err);
            }
        }
        state.loading = false;
        true
    });
}
