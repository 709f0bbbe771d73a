//! Point-literal coordinate parsing.
//!
//! Wikidata serializes geo-tags as well-known-text literals of the form
//! `Point(<longitude> <latitude>)`. Malformed input of any kind yields
//! `None`, never a panic: a record without usable coordinates simply gets no
//! map marker.

use std::sync::OnceLock;

use regex::Regex;

use crate::api::GeoPoint;

static POINT_RE: OnceLock<Regex> = OnceLock::new();

fn point_re() -> &'static Regex {
    // Longitude first in the literal, one separating space.
    POINT_RE.get_or_init(|| Regex::new(r"^Point\(([-\d.]+) ([-\d.]+)\)$").expect("point regex"))
}

/// Parse a `Point(<lon> <lat>)` literal into a validated point.
///
/// Returns `None` for missing parentheses, non-numeric tokens, extra
/// whitespace, or out-of-range values.
pub fn parse_point(raw: &str) -> Option<GeoPoint> {
    let captures = point_re().captures(raw.trim())?;
    let longitude: f64 = captures.get(1)?.as_str().parse().ok()?;
    let latitude: f64 = captures.get(2)?.as_str().parse().ok()?;
    GeoPoint::new(latitude, longitude).ok()
}
