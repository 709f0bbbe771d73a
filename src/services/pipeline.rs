//! End-to-end event fetch pipeline.
//!
//! One parameterized path from (city name, year range) to a merged, sorted,
//! enriched event list: validate input, resolve the city, query both sources
//! concurrently, aggregate, enrich. Every run reports its phases through the
//! fetch tracker.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::AppConfig;
use crate::models::event::HistoricalEvent;
use crate::models::time::TimeRange;
use crate::services::aggregator;
use crate::services::enrichment::{enrich_events, Enricher, SupplementalCache};
use crate::services::tracker::{FetchTracker, Phase};
use crate::sources::{
    CityDirectory, CityResolver, EventSource, FixtureResolver, FixtureSource, ResolvedCity,
    SourceError, SourceResult, WikidataClient, WikipediaClient,
};

/// Per-source record counts of one run, before and after merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SourceCounts {
    pub wikidata: usize,
    pub wikipedia: usize,
    pub merged: usize,
}

/// Result of one pipeline run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PipelineOutcome {
    pub city: ResolvedCity,
    pub range: TimeRange,
    pub counts: SourceCounts,
    pub events: Vec<HistoricalEvent>,
}

/// Reject input before any network call: the city must be a non-empty
/// plain-text name.
pub fn validate_city_name(name: &str) -> SourceResult<()> {
    if name.is_empty() {
        return Err(SourceError::invalid_input("city name is empty"));
    }
    if name.chars().any(char::is_control) {
        return Err(SourceError::invalid_input(
            "city name contains control characters",
        ));
    }
    Ok(())
}

/// The fetch pipeline. Construct once, run per request.
pub struct EventPipeline {
    directory: CityDirectory,
    wikidata: Arc<dyn EventSource>,
    wikipedia: Arc<dyn EventSource>,
    enricher: Option<Enricher>,
    tracker: FetchTracker,
}

impl EventPipeline {
    pub fn new(
        resolver: Arc<dyn CityResolver>,
        wikidata: Arc<dyn EventSource>,
        wikipedia: Arc<dyn EventSource>,
    ) -> Self {
        Self {
            directory: CityDirectory::new(resolver),
            wikidata,
            wikipedia,
            enricher: None,
            tracker: FetchTracker::new(),
        }
    }

    /// Pipeline over the live Wikidata and Wikipedia clients, with
    /// enrichment backed by a fresh shared cache.
    pub fn from_config(config: &AppConfig) -> SourceResult<Self> {
        let wikidata = Arc::new(WikidataClient::new(config.wikidata.clone())?);
        let wikipedia = Arc::new(WikipediaClient::new(config.wikipedia.clone())?);
        let enricher = Enricher::new(
            config.enrichment.clone(),
            Arc::new(SupplementalCache::new()),
        )?;
        Ok(Self::new(wikidata.clone(), wikidata, wikipedia).with_enricher(enricher))
    }

    /// Pipeline over the in-memory sample catalogue; no network at all.
    pub fn offline_demo() -> Self {
        Self::new(
            Arc::new(FixtureResolver::sample()),
            Arc::new(FixtureSource::sample()),
            Arc::new(FixtureSource::new(
                crate::models::event::EventOrigin::Wikipedia,
                Vec::new(),
            )),
        )
    }

    pub fn with_enricher(mut self, enricher: Enricher) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// Skip supplemental lookups; source fetches are unaffected.
    pub fn without_enricher(mut self) -> Self {
        self.enricher = None;
        self
    }

    pub fn tracker(&self) -> &FetchTracker {
        &self.tracker
    }

    /// Run the pipeline for a city name and year range.
    ///
    /// Failure policy: invalid input and city resolution failures abort the
    /// run; one source failing degrades the run to the other source's
    /// events; both failing is `Unavailable`. Enrichment never fails a run.
    pub async fn run(&self, city_name: &str, range: TimeRange) -> SourceResult<PipelineOutcome> {
        let city_name = city_name.trim();
        validate_city_name(city_name)?;
        info!(city = city_name, %range, "Pipeline run started");

        // Step 1: resolve the city.
        self.tracker.begin(Phase::CityLookup);
        let city = match self.directory.resolve(city_name).await {
            Ok(city) => {
                self.tracker.complete(Phase::CityLookup, 1);
                city
            }
            Err(err) => {
                self.tracker.fail(Phase::CityLookup, err.to_string());
                return Err(err);
            }
        };

        // Step 2: query both sources concurrently.
        self.tracker.begin(Phase::WikidataFetch);
        self.tracker.begin(Phase::WikipediaFetch);
        let (wikidata_result, wikipedia_result) = tokio::join!(
            self.wikidata.fetch_events(&city, range),
            self.wikipedia.fetch_events(&city, range),
        );

        let wikidata_events = self.settle(Phase::WikidataFetch, wikidata_result);
        let wikipedia_events = self.settle(Phase::WikipediaFetch, wikipedia_result);
        let (wikidata_events, wikipedia_events) = match (wikidata_events, wikipedia_events) {
            (None, None) => {
                return Err(SourceError::unavailable("both event sources failed")
                    .with_operation("pipeline.fetch"));
            }
            (wd, wp) => (wd.unwrap_or_default(), wp.unwrap_or_default()),
        };
        let counts_before = (wikidata_events.len(), wikipedia_events.len());

        // Step 3: merge and order.
        self.tracker.begin(Phase::Aggregation);
        let merged = aggregator::merge(wikidata_events, wikipedia_events);
        self.tracker.complete(Phase::Aggregation, merged.len());

        // Step 4: attach supplemental info.
        let events = match &self.enricher {
            Some(enricher) => {
                self.tracker.begin(Phase::Enrichment);
                let enriched = enrich_events(enricher, merged).await;
                let hits = enriched
                    .iter()
                    .filter(|event| event.supplemental.is_some())
                    .count();
                self.tracker.complete(Phase::Enrichment, hits);
                enriched
            }
            None => merged,
        };

        let counts = SourceCounts {
            wikidata: counts_before.0,
            wikipedia: counts_before.1,
            merged: events.len(),
        };
        info!(
            city = %city.id,
            wikidata = counts.wikidata,
            wikipedia = counts.wikipedia,
            merged = counts.merged,
            "Pipeline run finished"
        );

        Ok(PipelineOutcome {
            city,
            range,
            counts,
            events,
        })
    }

    /// Record one source's outcome. `None` marks a failed source so the
    /// caller can tell "failed" from "returned nothing".
    fn settle(
        &self,
        phase: Phase,
        result: SourceResult<Vec<HistoricalEvent>>,
    ) -> Option<Vec<HistoricalEvent>> {
        match result {
            Ok(events) => {
                self.tracker.complete(phase, events.len());
                Some(events)
            }
            Err(err) => {
                warn!(%phase, error = %err, "Event source failed, degrading");
                self.tracker.fail(phase, err.to_string());
                None
            }
        }
    }
}
