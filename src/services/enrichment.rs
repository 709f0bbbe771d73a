//! Supplemental article info for events.
//!
//! Looks up each event title in the encyclopedia and attaches a summary
//! extract, page URL, last-modified timestamp and an illustration. Results
//! are memoized in a shared cache keyed by exact title, including misses,
//! so one title costs at most one successful lookup per run.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::EnrichmentConfig;
use crate::models::event::{HistoricalEvent, Supplemental};
use crate::sources::wikipedia::{ordered_pages, PageInfo, PagesResponse, SearchResponse};
use crate::sources::{SourceError, SourceResult};

const TARGET_ASPECT: f64 = 16.0 / 9.0;

/// Shared supplemental-info cache.
///
/// First writer wins: concurrent lookups for one title may both hit the
/// network, but the entry stored first is what every caller observes.
#[derive(Default)]
pub struct SupplementalCache {
    entries: RwLock<HashMap<String, Option<Supplemental>>>,
}

impl SupplementalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value for a title. The outer `None` means "never looked up";
    /// the inner `None` is a memoized miss.
    pub fn get(&self, title: &str) -> Option<Option<Supplemental>> {
        self.entries.read().get(title).cloned()
    }

    /// Store a value unless one is already present, returning the entry
    /// that ended up stored.
    pub fn insert_first_wins(
        &self,
        title: &str,
        value: Option<Supplemental>,
    ) -> Option<Supplemental> {
        self.entries
            .write()
            .entry(title.to_string())
            .or_insert(value)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

// ── image policy ────────────────────────────────────────────────────────

/// Candidate illustration with its reported dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageCandidate {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub size: u64,
}

fn aspect_distance(candidate: &ImageCandidate) -> f64 {
    let aspect = f64::from(candidate.width) / f64::from(candidate.height);
    (aspect - TARGET_ASPECT).abs()
}

/// Candidate whose aspect ratio is closest to 16:9; ties go to the larger
/// file. Candidates without dimensions are ignored.
pub fn pick_best_image(candidates: &[ImageCandidate]) -> Option<&ImageCandidate> {
    candidates
        .iter()
        .filter(|c| c.width > 0 && c.height > 0)
        .min_by(|a, b| {
            aspect_distance(a)
                .total_cmp(&aspect_distance(b))
                .then_with(|| b.size.cmp(&a.size))
        })
}

fn is_photo_file(title: &str) -> bool {
    let lower = title.to_lowercase();
    lower.ends_with(".jpg") || lower.ends_with(".jpeg") || lower.ends_with(".png")
}

fn parse_touched(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ── imageinfo response shapes ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ImageInfoResponse {
    #[serde(default)]
    query: Option<ImageInfoQuery>,
}

#[derive(Debug, Deserialize)]
struct ImageInfoQuery {
    #[serde(default)]
    pages: HashMap<String, ImageInfoPage>,
}

#[derive(Debug, Deserialize)]
struct ImageInfoPage {
    #[serde(default)]
    imageinfo: Vec<ImageInfoEntry>,
}

#[derive(Debug, Deserialize)]
struct ImageInfoEntry {
    url: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

// ── enricher ────────────────────────────────────────────────────────────

/// Looks up supplemental info through the encyclopedia search API.
pub struct Enricher {
    client: reqwest::Client,
    config: EnrichmentConfig,
    cache: Arc<SupplementalCache>,
}

impl Enricher {
    pub fn new(config: EnrichmentConfig, cache: Arc<SupplementalCache>) -> SourceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| SourceError::unavailable(format!("HTTP client setup failed: {e}")))?;
        Ok(Self {
            client,
            config,
            cache,
        })
    }

    pub fn concurrency(&self) -> usize {
        self.config.concurrency
    }

    pub fn cache(&self) -> &Arc<SupplementalCache> {
        &self.cache
    }

    /// Supplemental info for a title, read through the cache.
    ///
    /// Lookup errors degrade to `None` and are not memoized, so a later
    /// run can try again.
    pub async fn lookup(&self, title: &str) -> Option<Supplemental> {
        if let Some(cached) = self.cache.get(title) {
            debug!(title, "Supplemental served from cache");
            return cached;
        }
        match self.fetch_supplemental(title).await {
            Ok(value) => self.cache.insert_first_wins(title, value),
            Err(err) => {
                warn!(title, error = %err, "Supplemental lookup failed");
                None
            }
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        params: &[(&str, String)],
    ) -> SourceResult<T> {
        let response = self
            .client
            .get(&self.config.endpoint)
            .query(params)
            .send()
            .await?
            .error_for_status()?;
        response
            .json()
            .await
            .map_err(|e| SourceError::malformed(format!("Wikipedia response: {e}")))
    }

    async fn fetch_supplemental(&self, title: &str) -> SourceResult<Option<Supplemental>> {
        let Some(pageid) = self.search_first(title).await? else {
            debug!(title, "No article found");
            return Ok(None);
        };
        let Some(page) = self.fetch_page(pageid).await? else {
            return Ok(None);
        };

        let image_url = match &page.thumbnail {
            Some(thumbnail) => Some(thumbnail.source.clone()),
            None => self.resolve_image(&page).await,
        };

        Ok(Some(Supplemental {
            extract: page.extract.as_deref().unwrap_or("").trim().to_string(),
            url: page.fullurl.clone(),
            image_url,
            last_modified: page.touched.as_deref().and_then(parse_touched),
        }))
    }

    async fn search_first(&self, title: &str) -> SourceResult<Option<u64>> {
        let params = [
            ("action", "query".to_string()),
            ("format", "json".to_string()),
            ("list", "search".to_string()),
            ("srsearch", title.to_string()),
            ("srlimit", "1".to_string()),
            ("srnamespace", "0".to_string()),
        ];
        let response: SearchResponse = self.get_json(&params).await?;
        Ok(response
            .query
            .and_then(|q| q.search.into_iter().next())
            .map(|hit| hit.pageid))
    }

    async fn fetch_page(&self, pageid: u64) -> SourceResult<Option<PageInfo>> {
        let params = [
            ("action", "query".to_string()),
            ("format", "json".to_string()),
            ("pageids", pageid.to_string()),
            ("prop", "extracts|pageimages|images|info".to_string()),
            ("exintro", "1".to_string()),
            ("explaintext", "1".to_string()),
            ("inprop", "url".to_string()),
            ("piprop", "thumbnail".to_string()),
            ("pithumbsize", self.config.thumbnail_width.to_string()),
            ("imlimit", "50".to_string()),
        ];
        let response: PagesResponse = self.get_json(&params).await?;
        Ok(ordered_pages(response)
            .into_iter()
            .find(|page| page.missing.is_none() && page.invalid.is_none()))
    }

    /// No thumbnail: inspect the first few photo files listed on the page
    /// and keep the one closest to 16:9. Failures degrade to no image.
    async fn resolve_image(&self, page: &PageInfo) -> Option<String> {
        let titles: Vec<String> = page
            .images
            .iter()
            .map(|image| image.title.clone())
            .filter(|title| is_photo_file(title))
            .take(self.config.image_candidates)
            .collect();
        if titles.is_empty() {
            return None;
        }

        let params = [
            ("action", "query".to_string()),
            ("format", "json".to_string()),
            ("titles", titles.join("|")),
            ("prop", "imageinfo".to_string()),
            ("iiprop", "url|size".to_string()),
        ];
        let response: ImageInfoResponse = match self.get_json(&params).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "Image info lookup failed");
                return None;
            }
        };

        let candidates: Vec<ImageCandidate> = response
            .query
            .map(|q| q.pages.into_values().collect::<Vec<_>>())
            .unwrap_or_default()
            .into_iter()
            .flat_map(|page| page.imageinfo)
            .map(|entry| ImageCandidate {
                url: entry.url,
                width: entry.width,
                height: entry.height,
                size: entry.size,
            })
            .collect();
        pick_best_image(&candidates).map(|best| best.url.clone())
    }
}

/// Attach supplemental info to every event, preserving list order.
///
/// Lookups run as a bounded fan-out; an event that already carries
/// supplemental info is left alone.
pub async fn enrich_events(
    enricher: &Enricher,
    events: Vec<HistoricalEvent>,
) -> Vec<HistoricalEvent> {
    let concurrency = enricher.concurrency().max(1);
    stream::iter(events)
        .map(|mut event| async move {
            if event.supplemental.is_none() {
                if let Some(info) = enricher.lookup(&event.title).await {
                    event = event.with_supplemental(info);
                }
            }
            event
        })
        .buffered(concurrency)
        .collect()
        .await
}
