//! Merging and ordering of events from both sources.
//!
//! Wikidata is the structured source and wins conflicts: a Wikipedia record
//! is dropped when it duplicates a Wikidata record by title or by calendar
//! day. Duplicate checks run against the Wikidata list only, so the merge
//! result does not depend on the order Wikipedia records arrive in.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::models::event::HistoricalEvent;

/// Merge the source lists and sort for display.
pub fn merge(
    wikidata: Vec<HistoricalEvent>,
    wikipedia: Vec<HistoricalEvent>,
) -> Vec<HistoricalEvent> {
    let mut combined = wikidata;
    let base_len = combined.len();
    let mut appended: HashSet<(String, String)> = HashSet::new();

    for event in wikipedia {
        if duplicates_base(&event, &combined[..base_len]) {
            continue;
        }
        // Identical records inside the Wikipedia list itself collapse to
        // their first occurrence.
        if !appended.insert((event.title.clone(), event.date.clone())) {
            continue;
        }
        combined.push(event);
    }

    sort_for_display(&mut combined);
    combined
}

/// A candidate duplicates a base record when titles match exactly, or when
/// both dates parse to the same calendar day.
fn duplicates_base(candidate: &HistoricalEvent, base: &[HistoricalEvent]) -> bool {
    let candidate_date = candidate.parsed_date();
    base.iter().any(|existing| {
        if existing.title == candidate.title {
            return true;
        }
        matches!(
            (existing.parsed_date(), candidate_date),
            (Some(a), Some(b)) if a == b
        )
    })
}

/// Sort events for display: parseable dates ascending, then all events
/// whose dates do not parse, in discovery order.
pub fn sort_for_display(events: &mut [HistoricalEvent]) {
    // sort_by is stable, which keeps discovery order inside equal keys.
    events.sort_by(compare_events);
}

fn compare_events(a: &HistoricalEvent, b: &HistoricalEvent) -> Ordering {
    match (a.parsed_date(), b.parsed_date()) {
        (Some(da), Some(db)) => da.cmp(&db),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
#[path = "aggregator_tests.rs"]
mod aggregator_tests;
