//! In-memory source backed by a fixed event list.
//!
//! Backs the CLI demo mode and tests, so pipeline behavior can be exercised
//! without a network.

use async_trait::async_trait;

use crate::api::{CityId, GeoPoint};
use crate::models::event::{EventOrigin, HistoricalEvent};
use crate::models::time::TimeRange;
use crate::sources::{CityResolver, EventSource, ResolvedCity, SourceError, SourceResult};

/// Event source serving a pre-built list, filtered to the requested range.
pub struct FixtureSource {
    origin: EventOrigin,
    events: Vec<HistoricalEvent>,
}

impl FixtureSource {
    pub fn new(origin: EventOrigin, events: Vec<HistoricalEvent>) -> Self {
        Self { origin, events }
    }

    /// Sample catalogue used by the demo mode.
    pub fn sample() -> Self {
        let point = |lat: f64, lon: f64| GeoPoint::new(lat, lon).ok();
        let events = vec![
            HistoricalEvent::new(
                "Основание Санкт-Петербурга",
                "27.05.1703",
                EventOrigin::Wikidata,
            )
            .with_description("Закладка Петропавловской крепости на Заячьем острове.")
            .with_source_url("http://www.wikidata.org/entity/Q656".to_string())
            .with_coordinates(point(59.9502, 30.3165).unwrap()),
            HistoricalEvent::new("Наводнение 1824 года", "19.11.1824", EventOrigin::Wikidata)
                .with_description("Самое разрушительное наводнение за историю города.")
                .with_coordinates(point(59.9343, 30.3351).unwrap()),
            HistoricalEvent::new(
                "Восстание декабристов",
                "26.12.1825",
                EventOrigin::Wikidata,
            )
            .with_description("Выступление на Сенатской площади.")
            .with_coordinates(point(59.9365, 30.3088).unwrap()),
            HistoricalEvent::new(
                "Перенос столицы в Москву",
                "12.03.1918",
                EventOrigin::Wikipedia,
            ),
            HistoricalEvent::new(
                "Расцвет классицизма",
                "конец XVIII века",
                EventOrigin::Wikipedia,
            ),
        ];
        Self::new(EventOrigin::Wikidata, events)
    }
}

#[async_trait]
impl EventSource for FixtureSource {
    fn origin(&self) -> EventOrigin {
        self.origin
    }

    async fn fetch_events(
        &self,
        _city: &ResolvedCity,
        range: TimeRange,
    ) -> SourceResult<Vec<HistoricalEvent>> {
        // Events whose dates cannot be parsed stay in: the range filter
        // cannot judge them.
        Ok(self
            .events
            .iter()
            .filter(|event| match event.parsed_date() {
                Some(date) => range.contains_year(chrono::Datelike::year(&date)),
                None => true,
            })
            .cloned()
            .collect())
    }
}

/// Resolver over a fixed list of known cities.
pub struct FixtureResolver {
    cities: Vec<ResolvedCity>,
}

impl FixtureResolver {
    pub fn new(cities: Vec<ResolvedCity>) -> Self {
        Self { cities }
    }

    pub fn sample() -> Self {
        Self::new(vec![
            ResolvedCity::new("Санкт-Петербург", CityId::new("Q656"))
                .with_coordinates(GeoPoint::new(59.9343, 30.3351).unwrap()),
            ResolvedCity::new("Москва", CityId::new("Q649"))
                .with_coordinates(GeoPoint::new(55.7558, 37.6173).unwrap()),
        ])
    }
}

#[async_trait]
impl CityResolver for FixtureResolver {
    async fn resolve(&self, name: &str) -> SourceResult<ResolvedCity> {
        self.cities
            .iter()
            .find(|city| city.name == name)
            .cloned()
            .ok_or_else(|| SourceError::city_not_found(name).with_source("fixture"))
    }
}
