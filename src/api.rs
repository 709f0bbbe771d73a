//! Public API surface for the event pipeline.
//!
//! This file consolidates the shared identifier types and the DTO types
//! handed to presentation consumers. All types derive Serialize/Deserialize
//! for JSON serialization.

pub use crate::models::event::EventOrigin;
pub use crate::models::event::HistoricalEvent;
pub use crate::models::event::Supplemental;
pub use crate::models::time::Era;
pub use crate::models::time::TimeRange;
pub use crate::services::pipeline::PipelineOutcome;
pub use crate::sources::ResolvedCity;

use serde::{Deserialize, Serialize};

/// City identifier (Wikidata Q-id, e.g. `Q656`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CityId(pub String);

impl CityId {
    pub fn new(value: impl Into<String>) -> Self {
        CityId(value.into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }

    /// Entity URI on the knowledge base.
    pub fn entity_uri(&self) -> String {
        format!("http://www.wikidata.org/entity/{}", self.0)
    }
}

impl std::fmt::Display for CityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Geographic point (latitude, longitude).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    /// Latitude in decimal degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in decimal degrees (-180 to 180)
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, String> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err("Latitude must be between -90 and 90 degrees".to_string());
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err("Longitude must be between -180 and 180 degrees".to_string());
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// One map marker produced from an aggregated event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MapMarker {
    pub latitude: f64,
    pub longitude: f64,
    pub title: String,
    pub date: String,
}

/// One row of the chronological event listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingEntry {
    pub title: String,
    pub date: String,
    pub description: String,
    pub origin: EventOrigin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

/// Presentation view over one pipeline run: map markers plus the listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapView {
    pub city: String,
    pub range: TimeRange,
    pub markers: Vec<MapMarker>,
    pub listing: Vec<ListingEntry>,
}

impl MapView {
    /// Build the presentation view from an aggregated, sorted event list.
    pub fn from_events(city: impl Into<String>, range: TimeRange, events: &[HistoricalEvent]) -> Self {
        let markers = events
            .iter()
            .filter_map(|event| {
                event.coordinates.map(|point| MapMarker {
                    latitude: point.latitude,
                    longitude: point.longitude,
                    title: event.title.clone(),
                    date: event.date.clone(),
                })
            })
            .collect();

        let listing = events
            .iter()
            .map(|event| ListingEntry {
                title: event.title.clone(),
                date: event.date.clone(),
                description: event.description.clone(),
                origin: event.origin,
                source_url: event.source_url.clone(),
            })
            .collect();

        Self {
            city: city.into(),
            range,
            markers,
            listing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CityId, GeoPoint, MapView};
    use crate::models::event::{EventOrigin, HistoricalEvent};
    use crate::models::time::TimeRange;

    #[test]
    fn test_city_id_new() {
        let id = CityId::new("Q656");
        assert_eq!(id.value(), "Q656");
    }

    #[test]
    fn test_city_id_equality() {
        let id1 = CityId::new("Q656");
        let id2 = CityId::new("Q656");
        let id3 = CityId::new("Q649");

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_city_id_entity_uri() {
        let id = CityId::new("Q656");
        assert_eq!(id.entity_uri(), "http://www.wikidata.org/entity/Q656");
    }

    #[test]
    fn test_city_id_display() {
        let id = CityId::new("Q649");
        assert_eq!(id.to_string(), "Q649");
    }

    #[test]
    fn test_city_id_hash() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(CityId::new("Q656"));
        set.insert(CityId::new("Q649"));
        set.insert(CityId::new("Q656")); // Duplicate

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_geo_point_valid() {
        let point = GeoPoint::new(59.9343, 30.3351).unwrap();
        assert_eq!(point.latitude, 59.9343);
        assert_eq!(point.longitude, 30.3351);
    }

    #[test]
    fn test_geo_point_latitude_out_of_range() {
        assert!(GeoPoint::new(90.1, 0.0).is_err());
        assert!(GeoPoint::new(-90.1, 0.0).is_err());
    }

    #[test]
    fn test_geo_point_longitude_out_of_range() {
        assert!(GeoPoint::new(0.0, 180.1).is_err());
        assert!(GeoPoint::new(0.0, -180.1).is_err());
    }

    #[test]
    fn test_geo_point_boundaries() {
        assert!(GeoPoint::new(90.0, 180.0).is_ok());
        assert!(GeoPoint::new(-90.0, -180.0).is_ok());
    }

    #[test]
    fn test_map_view_markers_skip_events_without_coordinates() {
        let range = TimeRange::clamped(1700, 2000, 1000, 2100);
        let with_coords = HistoricalEvent::new("Основание города", "27.05.1703", EventOrigin::Wikidata)
            .with_coordinates(GeoPoint::new(59.9343, 30.3351).unwrap());
        let without_coords = HistoricalEvent::new("Наводнение", "19.11.1824", EventOrigin::Wikipedia);

        let view = MapView::from_events("Санкт-Петербург", range, &[with_coords, without_coords]);

        assert_eq!(view.markers.len(), 1);
        assert_eq!(view.listing.len(), 2);
        assert_eq!(view.markers[0].title, "Основание города");
    }
}
