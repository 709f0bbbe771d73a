//! Stored-profile and shared-link session flows.

use std::fs;

use chronomap::api::MapView;
use chronomap::models::time::{Era, TimeRange};
use chronomap::session::{AppState, DeepLink, UserProfile};

fn profile(time_period: Option<&str>) -> UserProfile {
    UserProfile {
        first_name: "Анна".to_string(),
        last_name: "Петрова".to_string(),
        email: "anna@example.com".to_string(),
        city: "Санкт-Петербург".to_string(),
        time_period: time_period.map(str::to_string),
    }
}

#[test]
fn test_saved_profile_drives_the_query_range() {
    let path = std::env::temp_dir().join("chronomap_profile_flow_test.json");
    profile(Some("imperial")).save(&path).unwrap();

    let mut state = AppState::new();
    state.set_profile(UserProfile::load(&path).unwrap());

    let signed_in = state.profile().unwrap();
    assert_eq!(signed_in.city, "Санкт-Петербург");
    assert_eq!(signed_in.range(), Era::Imperial.range());

    fs::remove_file(&path).ok();
}

#[test]
fn test_profile_without_preset_gets_the_default_window() {
    let loaded = profile(None);
    assert_eq!(loaded.range().start_year, 1900);
    assert_eq!(loaded.range().end_year, 2000);
}

#[test]
fn test_shared_link_lands_on_the_map() {
    let link = DeepLink::parse(
        "?event=%D0%9D%D0%B0%D0%B2%D0%BE%D0%B4%D0%BD%D0%B5%D0%BD%D0%B8%D0%B5\
         &date=19.11.1824&lat=59.9343&lon=30.3351",
    )
    .unwrap();

    let mut state = AppState::new();
    state.set_deep_link(link);
    let event = state.take_deep_link_event().unwrap();
    assert_eq!(event.title, "Наводнение");
    assert_eq!(event.date, "19.11.1824");

    let view = MapView::from_events(
        "Санкт-Петербург",
        TimeRange::new(1800, 1850).unwrap(),
        &[event],
    );
    assert_eq!(view.markers.len(), 1);
    assert_eq!(view.listing.len(), 1);
}

#[test]
fn test_shared_link_is_delivered_exactly_once() {
    let link = DeepLink::parse("event=Пожар&date=17.12.1837").unwrap();

    let mut state = AppState::new();
    state.set_deep_link(link.clone());
    assert!(state.take_deep_link_event().is_some());
    assert!(state.take_deep_link_event().is_none());

    // A link arriving after the first delivery is ignored for the session.
    state.set_deep_link(link);
    assert!(state.take_deep_link_event().is_none());
}
