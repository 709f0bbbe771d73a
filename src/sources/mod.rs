//! Event sources for the fetch pipeline.
//!
//! This module defines the polymorphic source abstraction the pipeline is
//! built on, allowing heterogeneous knowledge bases to be queried through one
//! contract.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  EventPipeline (services::pipeline)                     │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  EventSource / CityResolver traits (this module)        │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────┼──────────────────┐
//!     │               │                  │
//! ┌───▼─────────┐ ┌───▼──────────┐ ┌─────▼────────┐
//! │  Wikidata   │ │  Wikipedia   │ │   Fixture    │
//! │  (SPARQL)   │ │ (search API) │ │ (in-memory)  │
//! └─────────────┘ └──────────────┘ └──────────────┘
//! ```
//!
//! The module includes:
//! - `error`: the source error taxonomy with retryability context
//! - `wikidata`: SPARQL client for city resolution and structured events
//! - `wikipedia`: search/extract client emitting events from article text
//! - `fixture`: in-memory source for tests and the offline demo

pub mod error;
pub mod fixture;
pub mod wikidata;
pub mod wikipedia;

pub use error::{ErrorContext, SourceError, SourceResult};
pub use fixture::{FixtureResolver, FixtureSource};
pub use wikidata::WikidataClient;
pub use wikipedia::WikipediaClient;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::{CityId, GeoPoint};
use crate::models::event::{EventOrigin, HistoricalEvent};
use crate::models::time::TimeRange;

/// City name resolved to a stable knowledge-base identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedCity {
    /// The name the user typed, as resolved against.
    pub name: String,
    /// Stable knowledge-base identifier.
    pub id: CityId,
    /// The city's own coordinates, when the knowledge base provides them.
    /// Used as the marker fallback for events without a geo-tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<GeoPoint>,
}

impl ResolvedCity {
    pub fn new(name: impl Into<String>, id: CityId) -> Self {
        Self {
            name: name.into(),
            id,
            coordinates: None,
        }
    }

    pub fn with_coordinates(mut self, coordinates: GeoPoint) -> Self {
        self.coordinates = Some(coordinates);
        self
    }
}

/// Source of normalized historical events for a city and year range.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Origin tag stamped on every record this source produces.
    fn origin(&self) -> EventOrigin;

    /// Fetch events for a resolved city within a year range.
    ///
    /// # Arguments
    /// * `city` - The resolved city to query for
    /// * `range` - Inclusive year range constraint
    ///
    /// # Returns
    /// * `Ok(Vec<HistoricalEvent>)` - Normalized events; empty is a valid result
    /// * `Err(SourceError)` - If the source fails after its own retries
    async fn fetch_events(
        &self,
        city: &ResolvedCity,
        range: TimeRange,
    ) -> SourceResult<Vec<HistoricalEvent>>;
}

/// Resolver from a free-text city name to a stable identifier.
#[async_trait]
pub trait CityResolver: Send + Sync {
    /// Resolve a city name.
    ///
    /// # Returns
    /// * `Ok(ResolvedCity)` - The identifier and, when known, the city's coordinates
    /// * `Err(SourceError::CityNotFound)` - If no identifier matches the name
    async fn resolve(&self, name: &str) -> SourceResult<ResolvedCity>;
}

/// Session-scoped city lookup cache over a resolver.
///
/// One network lookup per distinct name string; changing the city string is a
/// cache miss by construction since entries are keyed by the exact name.
pub struct CityDirectory {
    resolver: Arc<dyn CityResolver>,
    cache: RwLock<HashMap<String, ResolvedCity>>,
}

impl CityDirectory {
    pub fn new(resolver: Arc<dyn CityResolver>) -> Self {
        Self {
            resolver,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a name, serving repeats from the session cache.
    pub async fn resolve(&self, name: &str) -> SourceResult<ResolvedCity> {
        if let Some(hit) = self.cache.read().get(name).cloned() {
            debug!(city = name, id = %hit.id, "City lookup served from cache");
            return Ok(hit);
        }

        let resolved = self.resolver.resolve(name).await?;

        // First writer wins: a concurrent lookup for the same name keeps the
        // entry it stored, and both callers observe that entry.
        let stored = self
            .cache
            .write()
            .entry(name.to_string())
            .or_insert(resolved)
            .clone();
        Ok(stored)
    }

    /// Number of distinct names resolved this session.
    pub fn cached_count(&self) -> usize {
        self.cache.read().len()
    }
}

/// Run `call` until it succeeds, a non-retryable error occurs, or
/// `max_retries` extra attempts are used up.
///
/// Backoff is linear: attempt `n` sleeps `backoff * n` before retrying.
/// Exhausted retries surface as a terminal `Unavailable` error.
pub async fn with_retries<T, F, Fut>(
    operation: &str,
    max_retries: u32,
    backoff: Duration,
    mut call: F,
) -> SourceResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SourceResult<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < max_retries => {
                attempt += 1;
                warn!(
                    operation,
                    attempt,
                    error = %err,
                    "Transient source error, backing off"
                );
                tokio::time::sleep(backoff * attempt).await;
            }
            Err(err) if err.is_retryable() => {
                return Err(SourceError::unavailable(format!(
                    "giving up after {} attempts: {}",
                    attempt + 1,
                    err
                ))
                .with_operation(operation));
            }
            Err(err) => return Err(err.with_operation(operation)),
        }
    }
}

/// Enforce a deadline on `future`, converting expiry into a retryable
/// timeout error.
pub async fn with_timeout<T, Fut>(
    operation: &str,
    duration: Duration,
    future: Fut,
) -> SourceResult<T>
where
    Fut: Future<Output = SourceResult<T>>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(
            SourceError::timeout(format!("no response within {}s", duration.as_secs()))
                .with_operation(operation),
        ),
    }
}
