//! User profile persistence and per-session state.
//!
//! The profile is one JSON object under a fixed path; it supplies the city
//! and the initial year range. A session can also start from a shared deep
//! link carrying a single synthetic event, which is handed to the caller at
//! most once.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::GeoPoint;
use crate::models::event::{EventOrigin, HistoricalEvent};
use crate::models::time::{range_for_preset, TimeRange};

/// Registered visitor profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// City whose events the visitor wants to see.
    pub city: String,
    /// Era preset name; the default range applies when absent or unknown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_period: Option<String>,
}

impl UserProfile {
    /// Year range selected by the profile's era preset.
    pub fn range(&self) -> TimeRange {
        self.time_period
            .as_deref()
            .map(range_for_preset)
            .unwrap_or_default()
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let raw = fs::read_to_string(path)
            .map_err(|e| format!("cannot read profile {}: {e}", path.display()))?;
        serde_json::from_str(&raw).map_err(|e| format!("invalid profile {}: {e}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        let raw = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, raw).map_err(|e| format!("cannot write profile {}: {e}", path.display()))
    }
}

/// Parameters of a shared deep link.
#[derive(Debug, Clone, PartialEq)]
pub struct DeepLink {
    pub event: String,
    pub date: Option<String>,
    pub city: Option<String>,
    pub coordinates: Option<GeoPoint>,
}

impl DeepLink {
    /// Parse a percent-encoded query string like
    /// `event=...&date=...&city=...&lat=...&lon=...`.
    ///
    /// Returns `None` without an `event` parameter. Pairs that fail to
    /// decode are skipped; coordinates require both `lat` and `lon` to be
    /// valid.
    pub fn parse(query: &str) -> Option<Self> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut fields: HashMap<&str, String> = HashMap::new();

        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let Some((key, raw_value)) = pair.split_once('=') else {
                continue;
            };
            // Form encoding spells spaces as '+'.
            let raw_value = raw_value.replace('+', " ");
            let Ok(value) = urlencoding::decode(&raw_value) else {
                debug!(key, "Skipping undecodable deep-link parameter");
                continue;
            };
            match key {
                "event" | "date" | "city" | "lat" | "lon" => {
                    fields.insert(key, value.into_owned());
                }
                _ => {}
            }
        }

        let event = fields.remove("event")?;
        let coordinates = match (
            fields.get("lat").and_then(|v| v.parse::<f64>().ok()),
            fields.get("lon").and_then(|v| v.parse::<f64>().ok()),
        ) {
            (Some(lat), Some(lon)) => GeoPoint::new(lat, lon).ok(),
            _ => None,
        };

        Some(Self {
            event,
            date: fields.remove("date"),
            city: fields.remove("city"),
            coordinates,
        })
    }

    /// Synthetic event shown without running the pipeline.
    pub fn into_event(self) -> HistoricalEvent {
        let date = self.date.unwrap_or_else(|| "Дата неизвестна".to_string());
        let mut event = HistoricalEvent::new(self.event, date, EventOrigin::Wikidata);
        if let Some(point) = self.coordinates {
            event = event.with_coordinates(point);
        }
        event
    }
}

/// Session state: the signed-in profile plus the one-shot deep link.
#[derive(Default)]
pub struct AppState {
    profile: Option<UserProfile>,
    deep_link: Option<DeepLink>,
    deep_link_consumed: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_profile(&mut self, profile: UserProfile) {
        self.profile = Some(profile);
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    /// Install a deep link for this session. Ignored once a link has been
    /// consumed.
    pub fn set_deep_link(&mut self, link: DeepLink) {
        if self.deep_link_consumed {
            debug!("Deep link ignored, one was already consumed this session");
            return;
        }
        self.deep_link = Some(link);
    }

    /// The deep-link event, delivered at most once per session.
    pub fn take_deep_link_event(&mut self) -> Option<HistoricalEvent> {
        let link = self.deep_link.take()?;
        self.deep_link_consumed = true;
        Some(link.into_event())
    }
}
