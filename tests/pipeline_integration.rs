use std::sync::Arc;

use async_trait::async_trait;

use chronomap::api::{GeoPoint, MapView};
use chronomap::models::event::{EventOrigin, HistoricalEvent};
use chronomap::models::time::TimeRange;
use chronomap::services::{EventPipeline, Phase, PhaseStatus};
use chronomap::sources::{
    EventSource, FixtureResolver, FixtureSource, ResolvedCity, SourceError, SourceResult,
};

struct FailingSource(EventOrigin);

#[async_trait]
impl EventSource for FailingSource {
    fn origin(&self) -> EventOrigin {
        self.0
    }

    async fn fetch_events(
        &self,
        _city: &ResolvedCity,
        _range: TimeRange,
    ) -> SourceResult<Vec<HistoricalEvent>> {
        Err(SourceError::transport("connection refused"))
    }
}

fn event(title: &str, date: &str, origin: EventOrigin) -> HistoricalEvent {
    HistoricalEvent::new(title, date, origin)
}

fn pipeline_with(
    wikidata: Vec<HistoricalEvent>,
    wikipedia: Vec<HistoricalEvent>,
) -> EventPipeline {
    EventPipeline::new(
        Arc::new(FixtureResolver::sample()),
        Arc::new(FixtureSource::new(EventOrigin::Wikidata, wikidata)),
        Arc::new(FixtureSource::new(EventOrigin::Wikipedia, wikipedia)),
    )
}

#[tokio::test]
async fn test_demo_run_returns_sorted_catalogue() {
    let pipeline = EventPipeline::offline_demo();
    let range = TimeRange::new(1700, 2000).unwrap();

    let outcome = pipeline.run("Санкт-Петербург", range).await.unwrap();

    assert_eq!(outcome.city.id.value(), "Q656");
    assert_eq!(outcome.counts.wikidata, 5);
    assert_eq!(outcome.counts.wikipedia, 0);
    assert_eq!(outcome.counts.merged, 5);

    let dates: Vec<&str> = outcome.events.iter().map(|e| e.date.as_str()).collect();
    assert_eq!(
        dates,
        vec![
            "27.05.1703",
            "19.11.1824",
            "26.12.1825",
            "12.03.1918",
            // No parseable date, so it sorts after everything dated.
            "конец XVIII века",
        ]
    );
}

#[tokio::test]
async fn test_range_narrows_results() {
    let pipeline = EventPipeline::offline_demo();
    let range = TimeRange::new(1800, 1850).unwrap();

    let outcome = pipeline.run("Санкт-Петербург", range).await.unwrap();

    let titles: Vec<&str> = outcome.events.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Наводнение 1824 года",
            "Восстание декабристов",
            "Расцвет классицизма",
        ]
    );
}

#[tokio::test]
async fn test_whitespace_around_city_name_is_ignored() {
    let pipeline = EventPipeline::offline_demo();
    let range = TimeRange::new(1800, 1850).unwrap();

    let outcome = pipeline.run("  Санкт-Петербург  ", range).await.unwrap();
    assert_eq!(outcome.city.name, "Санкт-Петербург");
}

#[tokio::test]
async fn test_empty_city_name_rejected_before_lookup() {
    let pipeline = EventPipeline::offline_demo();

    let err = pipeline
        .run("   ", TimeRange::default())
        .await
        .unwrap_err();

    assert!(matches!(err, SourceError::InvalidInput { .. }));
    // Rejected before any phase started.
    assert!(pipeline.tracker().records().is_empty());
}

#[tokio::test]
async fn test_unknown_city_aborts_run() {
    let pipeline = EventPipeline::offline_demo();

    let err = pipeline
        .run("Атлантида", TimeRange::default())
        .await
        .unwrap_err();

    assert!(matches!(err, SourceError::CityNotFound { .. }));
    let record = pipeline.tracker().record(Phase::CityLookup).unwrap();
    assert_eq!(record.status, PhaseStatus::Failed);
    assert!(pipeline.tracker().record(Phase::WikidataFetch).is_none());
}

#[tokio::test]
async fn test_cross_source_title_duplicate_collapses() {
    let pipeline = pipeline_with(
        vec![event(
            "Основание Санкт-Петербурга",
            "27.05.1703",
            EventOrigin::Wikidata,
        )],
        vec![event(
            "Основание Санкт-Петербурга",
            "16.05.1703",
            EventOrigin::Wikipedia,
        )],
    );

    let outcome = pipeline
        .run("Санкт-Петербург", TimeRange::new(1700, 1750).unwrap())
        .await
        .unwrap();

    assert_eq!(outcome.counts.wikidata, 1);
    assert_eq!(outcome.counts.wikipedia, 1);
    assert_eq!(outcome.counts.merged, 1);
    assert_eq!(outcome.events[0].origin, EventOrigin::Wikidata);
}

#[tokio::test]
async fn test_cross_source_same_day_duplicate_collapses() {
    let pipeline = pipeline_with(
        vec![event("Основание города", "27.05.1703", EventOrigin::Wikidata)],
        vec![event(
            "Закладка Петропавловской крепости",
            "27.05.1703",
            EventOrigin::Wikipedia,
        )],
    );

    let outcome = pipeline
        .run("Санкт-Петербург", TimeRange::new(1700, 1750).unwrap())
        .await
        .unwrap();

    assert_eq!(outcome.counts.merged, 1);
    assert_eq!(outcome.events[0].title, "Основание города");
}

#[tokio::test]
async fn test_one_source_down_degrades_to_the_other() {
    let pipeline = EventPipeline::new(
        Arc::new(FixtureResolver::sample()),
        Arc::new(FixtureSource::sample()),
        Arc::new(FailingSource(EventOrigin::Wikipedia)),
    );

    let outcome = pipeline
        .run("Санкт-Петербург", TimeRange::new(1700, 2000).unwrap())
        .await
        .unwrap();

    assert_eq!(outcome.counts.wikidata, 5);
    assert_eq!(outcome.counts.wikipedia, 0);
    assert_eq!(
        pipeline.tracker().record(Phase::WikipediaFetch).unwrap().status,
        PhaseStatus::Failed
    );
    assert_eq!(
        pipeline.tracker().record(Phase::WikidataFetch).unwrap().status,
        PhaseStatus::Completed
    );
}

#[tokio::test]
async fn test_both_sources_down_is_unavailable() {
    let pipeline = EventPipeline::new(
        Arc::new(FixtureResolver::sample()),
        Arc::new(FailingSource(EventOrigin::Wikidata)),
        Arc::new(FailingSource(EventOrigin::Wikipedia)),
    );

    let err = pipeline
        .run("Санкт-Петербург", TimeRange::default())
        .await
        .unwrap_err();

    assert!(matches!(err, SourceError::Unavailable { .. }));
    assert_eq!(
        err.context().operation.as_deref(),
        Some("pipeline.fetch")
    );
}

#[tokio::test]
async fn test_successful_run_tracks_every_phase() {
    let pipeline = EventPipeline::offline_demo();
    pipeline
        .run("Санкт-Петербург", TimeRange::new(1700, 2000).unwrap())
        .await
        .unwrap();

    let records = pipeline.tracker().records();
    let phases: Vec<Phase> = records.iter().map(|r| r.phase).collect();
    // No enricher in demo mode, so no enrichment phase.
    assert_eq!(
        phases,
        vec![
            Phase::CityLookup,
            Phase::WikidataFetch,
            Phase::WikipediaFetch,
            Phase::Aggregation,
        ]
    );
    assert!(records.iter().all(|r| r.status == PhaseStatus::Completed));
}

#[tokio::test]
async fn test_map_view_renders_only_located_events_as_markers() {
    let pipeline = EventPipeline::offline_demo();
    let range = TimeRange::new(1700, 2000).unwrap();
    let outcome = pipeline.run("Санкт-Петербург", range).await.unwrap();

    let view = MapView::from_events(outcome.city.name.clone(), range, &outcome.events);
    assert_eq!(view.listing.len(), 5);
    assert_eq!(view.markers.len(), 3);
    assert!(view
        .markers
        .iter()
        .all(|m| GeoPoint::new(m.latitude, m.longitude).is_ok()));
}

#[tokio::test]
async fn test_events_without_dates_survive_the_whole_run() {
    let pipeline = pipeline_with(
        vec![event("Дата известна", "01.01.1901", EventOrigin::Wikidata)],
        vec![event("Эпоха без даты", "начало века", EventOrigin::Wikipedia)],
    );

    let outcome = pipeline
        .run("Москва", TimeRange::new(1900, 1950).unwrap())
        .await
        .unwrap();

    assert_eq!(outcome.counts.merged, 2);
    assert_eq!(outcome.events[1].title, "Эпоха без даты");
}
