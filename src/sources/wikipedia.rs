//! Russian Wikipedia search client.
//!
//! Turns full-text search results into events: search for city + history
//! keyword combinations, bulk-fetch article extracts, keep articles that look
//! like event coverage, then emit one event per date found in the extract.
//! Page assessment is pure so the filter heuristics are testable without a
//! network.

use std::collections::{HashSet, VecDeque};
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::WikipediaConfig;
use crate::extract::dates::DateScanner;
use crate::models::event::{EventOrigin, HistoricalEvent};
use crate::models::time::TimeRange;
use crate::sources::{EventSource, ResolvedCity, SourceError, SourceResult};

/// Title keywords marking index/meta pages rather than events.
pub const NON_EVENT_TITLE_KEYWORDS: &[&str] = &[
    "список",
    "категория",
    "шаблон",
    "проект",
    "портал",
    "википедия",
    "российская империя",
    "история россии",
    "хронология",
    "эпоха",
    "период",
    "век",
    "годы",
    "года",
    "году",
    "годах",
];

/// Category keywords marking event coverage.
pub const EVENT_CATEGORY_KEYWORDS: &[&str] = &[
    "исторические события",
    "события по годам",
    "события по месяцам",
    "события по дням",
    "исторические даты",
    "важные события",
    "знаменательные события",
    "исторические факты",
];

/// Title keywords marking a concrete event. Substring matching covers the
/// feminine and neuter participle forms.
pub const EVENT_TITLE_KEYWORDS: &[&str] = &[
    "событие",
    "сражение",
    "битва",
    "война",
    "революция",
    "восстание",
    "пожар",
    "наводнение",
    "открытие",
    "основание",
    "создание",
    "построен",
    "заложен",
    "учрежден",
];

const LINK_BATCH_LIMIT: u32 = 500;

// ── response shapes ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub(crate) query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchQuery {
    #[serde(default)]
    pub(crate) search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
pub struct SearchHit {
    pub pageid: u64,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PagesResponse {
    #[serde(default)]
    pub(crate) query: Option<PagesQuery>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PagesQuery {
    #[serde(default)]
    pub(crate) pages: std::collections::HashMap<String, PageInfo>,
}

/// One article as returned by `prop=` queries. All fields are optional
/// since missing/invalid pages come back as stubs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageInfo {
    #[serde(default)]
    pub pageid: Option<u64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub extract: Option<String>,
    #[serde(default)]
    pub fullurl: Option<String>,
    #[serde(default)]
    pub categories: Vec<CategoryEntry>,
    #[serde(default)]
    pub links: Vec<LinkEntry>,
    #[serde(default)]
    pub thumbnail: Option<Thumbnail>,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    /// Last-touched timestamp, RFC 3339.
    #[serde(default)]
    pub touched: Option<String>,
    #[serde(default)]
    pub missing: Option<Value>,
    #[serde(default)]
    pub invalid: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryEntry {
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkEntry {
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    pub source: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageRef {
    pub title: String,
}

// ── page assessment ─────────────────────────────────────────────────────

/// Filter verdict for one article, with any events it yielded.
#[derive(Debug, Default)]
pub struct PageAssessment {
    /// Passed the relevance filter; qualifying pages feed link expansion.
    pub qualifies: bool,
    pub events: Vec<HistoricalEvent>,
}

pub fn is_non_event_title(title_lower: &str) -> bool {
    NON_EVENT_TITLE_KEYWORDS
        .iter()
        .any(|keyword| title_lower.contains(keyword))
}

pub fn has_event_category(categories_lower: &[String]) -> bool {
    categories_lower.iter().any(|category| {
        EVENT_CATEGORY_KEYWORDS
            .iter()
            .any(|keyword| category.contains(keyword))
    })
}

pub fn has_event_title(title_lower: &str) -> bool {
    EVENT_TITLE_KEYWORDS
        .iter()
        .any(|keyword| title_lower.contains(keyword))
}

fn year_mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{3,4})\b").expect("year mention regex"))
}

/// Whether the text mentions any year inside the range.
pub fn mentions_year_in_range(text: &str, range: TimeRange) -> bool {
    year_mention_re()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<i32>().ok())
        .any(|year| range.contains_year(year))
}

/// Decide whether an article describes events for the city and extract
/// them.
///
/// Acceptance requires at least two of three indicators (event category,
/// event title keyword, dates found in range) plus at least one mention of
/// the city in the extract. Meta pages are rejected by title keyword up
/// front. Accepted articles emit one event per extracted date; articles
/// with an event title but no parseable date fall back to a single event
/// dated to the start of the range when a year from the range appears in
/// the text.
pub fn assess_page(
    page: &PageInfo,
    city: &ResolvedCity,
    range: TimeRange,
    scanner: &DateScanner,
) -> PageAssessment {
    let title = page.title.trim();
    if title.is_empty() {
        return PageAssessment::default();
    }
    let title_lower = title.to_lowercase();
    if is_non_event_title(&title_lower) {
        debug!(title, "Page skipped, meta title");
        return PageAssessment::default();
    }

    let extract = page.extract.as_deref().unwrap_or("");
    let text_lower = extract.to_lowercase();
    let categories_lower: Vec<String> = page
        .categories
        .iter()
        .map(|c| c.title.to_lowercase())
        .collect();

    let dates = scanner.extract(extract, range);
    let indicators = [
        has_event_category(&categories_lower),
        has_event_title(&title_lower),
        !dates.is_empty(),
    ];
    if indicators.iter().filter(|hit| **hit).count() < 2 {
        debug!(title, "Page skipped, not enough event indicators");
        return PageAssessment::default();
    }
    if !text_lower.contains(&city.name.to_lowercase()) {
        debug!(title, "Page skipped, city not mentioned");
        return PageAssessment::default();
    }

    let mut events = Vec::new();
    let build = |date: String| {
        let mut event =
            HistoricalEvent::new(title, date, EventOrigin::Wikipedia).with_description(extract);
        if let Some(point) = city.coordinates {
            event = event.with_coordinates(point);
        }
        if let Some(url) = &page.fullurl {
            event = event.with_source_url(url.clone());
        }
        event
    };

    if dates.is_empty() {
        // Category plus title matched but no full date in the intro. Anchor
        // the event to the start of the range when a year is at least
        // mentioned.
        if has_event_title(&title_lower) && mentions_year_in_range(&text_lower, range) {
            events.push(build(format!("01.01.{:04}", range.start_year)));
        }
    } else {
        for date in dates {
            events.push(build(date));
        }
    }

    PageAssessment {
        qualifies: true,
        events,
    }
}

// ── client ──────────────────────────────────────────────────────────────

/// Client for the MediaWiki action API of Russian Wikipedia.
pub struct WikipediaClient {
    client: reqwest::Client,
    config: WikipediaConfig,
    scanner: DateScanner,
}

impl WikipediaClient {
    pub fn new(config: WikipediaConfig) -> SourceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| SourceError::unavailable(format!("HTTP client setup failed: {e}")))?;
        Ok(Self {
            client,
            config,
            scanner: DateScanner::new(),
        })
    }

    fn search_queries(city: &str, range: TimeRange) -> Vec<String> {
        vec![
            format!("{city} история {}-{}", range.start_year, range.end_year),
            format!("{city} события"),
            format!("{city} исторические события"),
        ]
    }

    async fn pause(&self) {
        tokio::time::sleep(Duration::from_millis(self.config.request_delay_ms)).await;
    }

    /// GET with one bounded retry after a rate-limit response. Rate limits
    /// back off and continue; they never abort the fetch.
    async fn get_json<T: DeserializeOwned>(&self, params: &[(&str, String)]) -> SourceResult<T> {
        let mut retried = false;
        loop {
            let response = self
                .client
                .get(&self.config.endpoint)
                .query(params)
                .send()
                .await?;
            if response.status() == StatusCode::TOO_MANY_REQUESTS && !retried {
                retried = true;
                warn!(
                    backoff_secs = self.config.rate_limit_backoff_secs,
                    "Rate limited, backing off"
                );
                tokio::time::sleep(Duration::from_secs(self.config.rate_limit_backoff_secs)).await;
                continue;
            }
            let response = response.error_for_status()?;
            return response
                .json()
                .await
                .map_err(|e| SourceError::malformed(format!("Wikipedia response: {e}")));
        }
    }

    async fn search(&self, query: &str) -> SourceResult<Vec<SearchHit>> {
        let params = [
            ("action", "query".to_string()),
            ("format", "json".to_string()),
            ("list", "search".to_string()),
            ("srsearch", query.to_string()),
            ("srlimit", self.config.search_limit.to_string()),
            ("srprop", "snippet|title".to_string()),
            ("srnamespace", "0".to_string()),
        ];
        let response: SearchResponse = self.get_json(&params).await?;
        Ok(response.query.map(|q| q.search).unwrap_or_default())
    }

    async fn fetch_page_batch(&self, selector: (&str, String)) -> SourceResult<Vec<PageInfo>> {
        let params = [
            ("action", "query".to_string()),
            ("format", "json".to_string()),
            selector,
            (
                "prop",
                "extracts|pageimages|images|info|categories".to_string(),
            ),
            ("exintro", "1".to_string()),
            ("explaintext", "1".to_string()),
            ("inprop", "url".to_string()),
            ("cllimit", "50".to_string()),
            ("redirects", "1".to_string()),
        ];
        let response: PagesResponse = self.get_json(&params).await?;
        Ok(ordered_pages(response))
    }

    async fn fetch_links(&self, pageids: &[u64]) -> SourceResult<Vec<String>> {
        let params = [
            ("action", "query".to_string()),
            ("format", "json".to_string()),
            ("pageids", join_ids(pageids)),
            ("prop", "links".to_string()),
            ("plnamespace", "0".to_string()),
            ("pllimit", LINK_BATCH_LIMIT.to_string()),
        ];
        let response: PagesResponse = self.get_json(&params).await?;
        Ok(ordered_pages(response)
            .into_iter()
            .flat_map(|page| page.links.into_iter().map(|link| link.title))
            .collect())
    }

    /// Run all search queries and return candidate page ids in discovery
    /// order, deduplicated. Fails only when every query fails.
    async fn collect_candidates(&self, city: &str, range: TimeRange) -> SourceResult<Vec<u64>> {
        let queries = Self::search_queries(city, range);
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        let mut failures = 0;

        for query in &queries {
            match self.search(query).await {
                Ok(hits) => {
                    debug!(query, hits = hits.len(), "Search query done");
                    for hit in hits {
                        if seen.insert(hit.pageid) {
                            ordered.push(hit.pageid);
                        }
                    }
                }
                Err(err) => {
                    failures += 1;
                    warn!(query, error = %err, "Search query failed, skipping");
                }
            }
            self.pause().await;
        }

        if failures == queries.len() {
            return Err(SourceError::unavailable("all search queries failed")
                .with_source("wikipedia")
                .with_operation("wikipedia.search"));
        }
        Ok(ordered)
    }
}

fn join_ids(pageids: &[u64]) -> String {
    pageids
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join("|")
}

fn join_titles(titles: &[String]) -> String {
    titles.join("|")
}

/// Pages of a batch response in stable pageid order. The JSON object keyed
/// by pageid has no order of its own.
pub(crate) fn ordered_pages(response: PagesResponse) -> Vec<PageInfo> {
    let mut pages: Vec<PageInfo> = response
        .query
        .map(|q| q.pages.into_values().collect())
        .unwrap_or_default();
    pages.sort_by_key(|page| page.pageid.unwrap_or(u64::MAX));
    pages
}

#[async_trait]
impl EventSource for WikipediaClient {
    fn origin(&self) -> EventOrigin {
        EventOrigin::Wikipedia
    }

    async fn fetch_events(
        &self,
        city: &ResolvedCity,
        range: TimeRange,
    ) -> SourceResult<Vec<HistoricalEvent>> {
        let mut pending_ids: VecDeque<u64> =
            self.collect_candidates(&city.name, range).await?.into();
        info!(
            city = %city.name,
            candidates = pending_ids.len(),
            "Wikipedia search phase complete"
        );

        let mut pending_titles: VecDeque<String> = VecDeque::new();
        let mut processed_ids: HashSet<u64> = HashSet::new();
        let mut processed_titles: HashSet<String> = HashSet::new();
        let mut events = Vec::new();

        while processed_ids.len() < self.config.max_pages {
            let budget = self.config.max_pages - processed_ids.len();
            let batch_size = self.config.batch_size.min(budget);

            let batch_ids: Vec<u64> = drain_unprocessed(&mut pending_ids, &processed_ids, batch_size);
            let selector = if !batch_ids.is_empty() {
                ("pageids", join_ids(&batch_ids))
            } else {
                let batch_titles =
                    drain_unprocessed(&mut pending_titles, &processed_titles, batch_size);
                if batch_titles.is_empty() {
                    break;
                }
                ("titles", join_titles(&batch_titles))
            };

            let pages = match self.fetch_page_batch(selector).await {
                Ok(pages) => pages,
                Err(err) => {
                    warn!(error = %err, "Page batch failed, skipping");
                    self.pause().await;
                    continue;
                }
            };

            let mut qualifying_ids = Vec::new();
            for page in &pages {
                let Some(pageid) = page.pageid else { continue };
                if page.missing.is_some() || page.invalid.is_some() {
                    debug!(pageid, title = %page.title, "Page missing or invalid");
                    continue;
                }
                if !processed_ids.insert(pageid) || !processed_titles.insert(page.title.clone()) {
                    continue;
                }

                let assessment = assess_page(page, city, range, &self.scanner);
                if assessment.qualifies {
                    qualifying_ids.push(pageid);
                    events.extend(assessment.events);
                }
                if processed_ids.len() >= self.config.max_pages {
                    break;
                }
            }
            self.pause().await;

            // One expansion request per batch of qualifying pages; linked
            // titles join the queue unless already handled.
            if !qualifying_ids.is_empty() && processed_ids.len() < self.config.max_pages {
                match self.fetch_links(&qualifying_ids).await {
                    Ok(titles) => {
                        for title in titles {
                            if !processed_titles.contains(&title) {
                                pending_titles.push_back(title);
                            }
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "Link expansion failed, skipping");
                    }
                }
                self.pause().await;
            }
        }

        info!(
            city = %city.name,
            pages = processed_ids.len(),
            events = events.len(),
            "Wikipedia fetch complete"
        );
        Ok(events)
    }
}

fn drain_unprocessed<T: Clone + Eq + std::hash::Hash>(
    pending: &mut VecDeque<T>,
    processed: &HashSet<T>,
    limit: usize,
) -> Vec<T> {
    let mut batch = Vec::new();
    while batch.len() < limit {
        let Some(item) = pending.pop_front() else { break };
        if !processed.contains(&item) && !batch.contains(&item) {
            batch.push(item);
        }
    }
    batch
}
