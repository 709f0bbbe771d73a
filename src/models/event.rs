//! Event domain types shared by every fetcher and the aggregator.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::GeoPoint;

/// Shown when a source record carries no description text.
pub const DESCRIPTION_PLACEHOLDER: &str = "Описание отсутствует";

/// Longer descriptions are cut at this many characters.
pub const DESCRIPTION_MAX_CHARS: usize = 500;

/// Display format for parseable event dates.
pub const DISPLAY_DATE_FORMAT: &str = "%d.%m.%Y";

/// Which fetcher produced an event record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOrigin {
    Wikidata,
    Wikipedia,
}

impl std::fmt::Display for EventOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventOrigin::Wikidata => write!(f, "wikidata"),
            EventOrigin::Wikipedia => write!(f, "wikipedia"),
        }
    }
}

/// Secondary-source enrichment attached to an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supplemental {
    /// Long-form summary extract.
    pub extract: String,
    /// Canonical page URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Best-available image URL per the selection policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Last modification timestamp reported by the encyclopedia.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,
}

/// One real-world occurrence surfaced to the user.
///
/// `date` holds the display string. It is DD.MM.YYYY whenever the source date
/// was parseable; free-text extraction can leave other shapes behind, so
/// consumers must go through [`HistoricalEvent::parsed_date`] rather than
/// assume the format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalEvent {
    pub title: String,
    pub description: String,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplemental: Option<Supplemental>,
    pub origin: EventOrigin,
}

impl HistoricalEvent {
    pub fn new(title: impl Into<String>, date: impl Into<String>, origin: EventOrigin) -> Self {
        Self {
            title: title.into(),
            description: DESCRIPTION_PLACEHOLDER.to_string(),
            date: date.into(),
            coordinates: None,
            source_url: None,
            supplemental: None,
            origin,
        }
    }

    /// Set the description, applying the placeholder/truncation policy.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = normalize_description(description);
        self
    }

    pub fn with_coordinates(mut self, coordinates: GeoPoint) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn with_supplemental(mut self, supplemental: Supplemental) -> Self {
        self.supplemental = Some(supplemental);
        self
    }

    /// The display date as a calendar date, when it is one.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, DISPLAY_DATE_FORMAT).ok()
    }
}

/// Apply the description policy: placeholder for empty text, truncation with
/// a trailing ellipsis past [`DESCRIPTION_MAX_CHARS`] characters.
pub fn normalize_description(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return DESCRIPTION_PLACEHOLDER.to_string();
    }
    if trimmed.chars().count() <= DESCRIPTION_MAX_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(DESCRIPTION_MAX_CHARS).collect();
    format!("{}...", cut)
}

/// Rewrite an ISO date or datetime string (`1703-05-27` or
/// `1703-05-27T00:00:00Z`) to the DD.MM.YYYY display form. Unparseable input
/// is passed through unchanged.
pub fn display_date_from_iso(raw: &str) -> String {
    let date_part = raw.split('T').next().unwrap_or(raw);
    match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        Ok(date) => date.format(DISPLAY_DATE_FORMAT).to_string(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        display_date_from_iso, normalize_description, EventOrigin, HistoricalEvent,
        DESCRIPTION_MAX_CHARS, DESCRIPTION_PLACEHOLDER,
    };
    use crate::api::GeoPoint;
    use chrono::NaiveDate;

    #[test]
    fn test_new_event_uses_placeholder() {
        let event = HistoricalEvent::new("Основание города", "27.05.1703", EventOrigin::Wikidata);
        assert_eq!(event.description, DESCRIPTION_PLACEHOLDER);
        assert!(event.coordinates.is_none());
        assert!(event.supplemental.is_none());
    }

    #[test]
    fn test_with_description_keeps_short_text() {
        let event = HistoricalEvent::new("X", "01.01.1900", EventOrigin::Wikipedia)
            .with_description("Краткое описание события.");
        assert_eq!(event.description, "Краткое описание события.");
    }

    #[test]
    fn test_with_description_empty_falls_back() {
        let event = HistoricalEvent::new("X", "01.01.1900", EventOrigin::Wikipedia)
            .with_description("   ");
        assert_eq!(event.description, DESCRIPTION_PLACEHOLDER);
    }

    #[test]
    fn test_normalize_description_truncates_long_text() {
        // Multi-byte characters must not break the cut.
        let long: String = "я".repeat(DESCRIPTION_MAX_CHARS + 50);
        let normalized = normalize_description(&long);
        assert!(normalized.ends_with("..."));
        assert_eq!(normalized.chars().count(), DESCRIPTION_MAX_CHARS + 3);
    }

    #[test]
    fn test_normalize_description_exact_limit_untouched() {
        let exact: String = "a".repeat(DESCRIPTION_MAX_CHARS);
        assert_eq!(normalize_description(&exact), exact);
    }

    #[test]
    fn test_parsed_date_valid() {
        let event = HistoricalEvent::new("X", "27.05.1703", EventOrigin::Wikidata);
        assert_eq!(
            event.parsed_date(),
            NaiveDate::from_ymd_opt(1703, 5, 27)
        );
    }

    #[test]
    fn test_parsed_date_free_form() {
        let event = HistoricalEvent::new("X", "май 1703 года", EventOrigin::Wikipedia);
        assert!(event.parsed_date().is_none());
    }

    #[test]
    fn test_display_date_from_iso_datetime() {
        assert_eq!(display_date_from_iso("1703-05-27T00:00:00Z"), "27.05.1703");
    }

    #[test]
    fn test_display_date_from_iso_date_only() {
        assert_eq!(display_date_from_iso("1824-11-19"), "19.11.1824");
    }

    #[test]
    fn test_display_date_from_iso_passthrough() {
        assert_eq!(display_date_from_iso("circa 1700"), "circa 1700");
    }

    #[test]
    fn test_origin_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&EventOrigin::Wikidata).unwrap(),
            "\"wikidata\""
        );
        let parsed: EventOrigin = serde_json::from_str("\"wikipedia\"").unwrap();
        assert_eq!(parsed, EventOrigin::Wikipedia);
    }

    #[test]
    fn test_event_round_trips_through_json() {
        let event = HistoricalEvent::new("Основание города", "27.05.1703", EventOrigin::Wikidata)
            .with_coordinates(GeoPoint::new(59.9343, 30.3351).unwrap())
            .with_source_url("http://www.wikidata.org/entity/Q656");
        let json = serde_json::to_string(&event).unwrap();
        let back: HistoricalEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
