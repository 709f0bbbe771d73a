//! Wikidata SPARQL client.
//!
//! Resolves city names to entity identifiers and fetches geo-tagged events
//! through the public SPARQL endpoint. Response parsing is kept in pure
//! functions so it can be tested without a network.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::api::CityId;
use crate::config::WikidataConfig;
use crate::extract::coords::parse_point;
use crate::models::event::{display_date_from_iso, EventOrigin, HistoricalEvent};
use crate::models::time::TimeRange;
use crate::sources::{
    with_retries, with_timeout, CityResolver, EventSource, ResolvedCity, SourceError, SourceResult,
};

/// One SPARQL result row: variable name to bound value.
pub type Binding = HashMap<String, SparqlValue>;

#[derive(Debug, Deserialize)]
pub struct SparqlValue {
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    bindings: Vec<Binding>,
}

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

// ── query builders ──────────────────────────────────────────────────────

/// Escape a string for use inside a double-quoted SPARQL literal.
pub fn escape_literal(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Query resolving a Russian city label to its entity.
///
/// Matches direct instances of "city" as well as instances of its
/// subclasses, so towns and federal cities resolve too.
pub fn city_lookup_query(name: &str) -> String {
    format!(
        "SELECT ?city WHERE {{\n  \
           ?city wdt:P31/wdt:P279* wd:Q515;\n        \
                 rdfs:label \"{}\"@ru.\n\
         }} LIMIT 1",
        escape_literal(name)
    )
}

/// Query for a city's own coordinate literal.
pub fn city_coordinates_query(id: &CityId) -> String {
    format!(
        "SELECT ?coord WHERE {{ wd:{} wdt:P625 ?coord. }} LIMIT 1",
        id.value()
    )
}

/// Query for dated events located in the city or any area within it.
///
/// Both the location chain (`P276/P131*`) and the year filter run on the
/// endpoint, so only rows inside the requested range come back.
pub fn events_query(id: &CityId, range: TimeRange, limit: u32) -> String {
    format!(
        "SELECT DISTINCT ?event ?eventLabel ?date ?coord ?description WHERE {{\n  \
           ?event wdt:P276/wdt:P131* wd:{id};\n         \
                  wdt:P585 ?date.\n  \
           OPTIONAL {{ ?event wdt:P625 ?coord. }}\n  \
           OPTIONAL {{ ?event schema:description ?description.\n             \
                       FILTER(LANG(?description) = \"ru\") }}\n  \
           FILTER(YEAR(?date) >= {start} && YEAR(?date) <= {end})\n  \
           SERVICE wikibase:label {{ bd:serviceParam wikibase:language \"ru\". }}\n\
         }}\n\
         ORDER BY ?date\n\
         LIMIT {limit}",
        id = id.value(),
        start = range.start_year,
        end = range.end_year,
        limit = limit,
    )
}

// ── response parsing ────────────────────────────────────────────────────

fn bare_entity_label() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^Q\d+$").expect("entity label regex"))
}

/// Trailing path segment of an entity URI, if it looks like an entity id.
pub fn entity_id_from_uri(uri: &str) -> Option<CityId> {
    let segment = uri.rsplit('/').next()?;
    if bare_entity_label().is_match(segment) {
        Some(CityId::new(segment))
    } else {
        None
    }
}

/// Convert SPARQL result rows into normalized events.
///
/// Rows without a date are skipped, as are rows whose label is a bare
/// entity id (the label service echoes the id when no Russian label
/// exists). Duplicate (title, date) rows keep their first occurrence.
pub fn events_from_bindings(bindings: &[Binding]) -> Vec<HistoricalEvent> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut events = Vec::new();

    for binding in bindings {
        let Some(label) = binding.get("eventLabel").map(|v| v.value.trim()) else {
            continue;
        };
        if label.is_empty() || bare_entity_label().is_match(label) {
            continue;
        }
        let Some(raw_date) = binding.get("date").map(|v| v.value.as_str()) else {
            continue;
        };

        let date = display_date_from_iso(raw_date);
        if !seen.insert((label.to_string(), date.clone())) {
            continue;
        }

        let mut event = HistoricalEvent::new(label, date, EventOrigin::Wikidata);
        if let Some(description) = binding.get("description") {
            event = event.with_description(&description.value);
        }
        if let Some(point) = binding
            .get("coord")
            .and_then(|v| parse_point(&v.value))
        {
            event = event.with_coordinates(point);
        }
        if let Some(uri) = binding.get("event") {
            event = event.with_source_url(uri.value.clone());
        }
        events.push(event);
    }

    events
}

// ── client ──────────────────────────────────────────────────────────────

/// Client for the Wikidata Query Service.
pub struct WikidataClient {
    client: reqwest::Client,
    config: WikidataConfig,
}

impl WikidataClient {
    pub fn new(config: WikidataConfig) -> SourceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| SourceError::unavailable(format!("HTTP client setup failed: {e}")))?;
        Ok(Self { client, config })
    }

    fn backoff(&self) -> Duration {
        Duration::from_secs(self.config.backoff_secs)
    }

    fn deadline(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    async fn run_sparql(&self, query: &str) -> SourceResult<Vec<Binding>> {
        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&[("query", query), ("format", "json")])
            .send()
            .await?
            .error_for_status()?;

        let parsed: SparqlResponse = response
            .json()
            .await
            .map_err(|e| SourceError::malformed(format!("SPARQL response: {e}")))?;
        Ok(parsed.results.bindings)
    }

    async fn lookup_city_coordinates(&self, id: &CityId) -> SourceResult<Vec<Binding>> {
        let query = city_coordinates_query(id);
        self.run_sparql(&query).await
    }
}

#[async_trait]
impl CityResolver for WikidataClient {
    async fn resolve(&self, name: &str) -> SourceResult<ResolvedCity> {
        let query = city_lookup_query(name);
        let bindings = with_timeout(
            "wikidata.city_lookup",
            self.deadline(),
            with_retries(
                "wikidata.city_lookup",
                self.config.max_retries,
                self.backoff(),
                || self.run_sparql(&query),
            ),
        )
        .await
        .map_err(|e| e.with_source("wikidata"))?;

        let id = bindings
            .first()
            .and_then(|b| b.get("city"))
            .and_then(|v| entity_id_from_uri(&v.value))
            .ok_or_else(|| SourceError::city_not_found(name).with_source("wikidata"))?;
        info!(city = name, id = %id, "Resolved city");

        let mut resolved = ResolvedCity::new(name, id.clone());
        // The city centre is only a marker fallback, so a failed lookup
        // degrades to no coordinates rather than failing resolution.
        match self.lookup_city_coordinates(&id).await {
            Ok(bindings) => {
                if let Some(point) = bindings
                    .first()
                    .and_then(|b| b.get("coord"))
                    .and_then(|v| parse_point(&v.value))
                {
                    resolved = resolved.with_coordinates(point);
                }
            }
            Err(err) => {
                warn!(city = name, error = %err, "City coordinate lookup failed");
            }
        }
        Ok(resolved)
    }
}

#[async_trait]
impl EventSource for WikidataClient {
    fn origin(&self) -> EventOrigin {
        EventOrigin::Wikidata
    }

    async fn fetch_events(
        &self,
        city: &ResolvedCity,
        range: TimeRange,
    ) -> SourceResult<Vec<HistoricalEvent>> {
        let query = events_query(&city.id, range, self.config.event_limit);
        debug!(city = %city.id, %range, "Running event query");

        let bindings = with_timeout(
            "wikidata.events",
            self.deadline(),
            with_retries(
                "wikidata.events",
                self.config.max_retries,
                self.backoff(),
                || self.run_sparql(&query),
            ),
        )
        .await
        .map_err(|e| e.with_source("wikidata"))?;

        let events = events_from_bindings(&bindings);
        info!(
            city = %city.id,
            rows = bindings.len(),
            events = events.len(),
            "Wikidata fetch complete"
        );
        Ok(events)
    }
}
