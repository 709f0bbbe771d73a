//! Date extraction from free-text article extracts.
//!
//! Four textual shapes are recognized and rewritten to one canonical
//! `DD.MM.YYYY` form: numeric `D.M.YYYY`, `D <месяц> YYYY` with the Russian
//! genitive month names, bare `YYYY год`, and the prepositional `в YYYY
//! году`. Bare years normalize to January 1st. A candidate survives only if
//! it is a real calendar date whose year lies inside the requested range.
//!
//! A match here says nothing about whether the date belongs to the article's
//! main subject; a year mentioned in passing still produces a candidate.
//! Callers that need precision must filter upstream.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::NaiveDate;
use regex::{Captures, Regex};

use crate::models::time::TimeRange;

// ── Scanner ──────────────────────────────────────────────────────────

pub struct DateScanner {
    re_numeric: Regex,
    re_month_name: Regex,
    re_bare_year: Regex,
    re_prepositional: Regex,
}

/// Russian genitive month name → month number (1–12).
fn month_number(name: &str) -> Option<u32> {
    match name {
        "января" => Some(1),
        "февраля" => Some(2),
        "марта" => Some(3),
        "апреля" => Some(4),
        "мая" => Some(5),
        "июня" => Some(6),
        "июля" => Some(7),
        "августа" => Some(8),
        "сентября" => Some(9),
        "октября" => Some(10),
        "ноября" => Some(11),
        "декабря" => Some(12),
        _ => None,
    }
}

fn group<T: FromStr>(caps: &Captures<'_>, index: usize) -> Option<T> {
    caps.get(index).and_then(|m| m.as_str().parse().ok())
}

impl DateScanner {
    pub fn new() -> Self {
        // Numeric: 27.05.1703 or 1.1.1703
        let re_numeric =
            Regex::new(r"\b(\d{1,2})\.(\d{1,2})\.(\d{4})\b").expect("numeric date regex");

        // Spelled-out: 27 мая 1703
        let re_month_name = Regex::new(
            r"\b(\d{1,2})\s+(января|февраля|марта|апреля|мая|июня|июля|августа|сентября|октября|ноября|декабря)\s+(\d{3,4})\b",
        )
        .expect("month name regex");

        // Bare year: 1703 год (the inflected forms году/года are left to the
        // prepositional pattern and the month-name pattern respectively)
        let re_bare_year = Regex::new(r"\b(\d{3,4})\s+год\b").expect("bare year regex");

        // Prepositional: в 1703 году
        let re_prepositional =
            Regex::new(r"\b[вВ]\s+(\d{3,4})\s+году\b").expect("prepositional year regex");

        Self {
            re_numeric,
            re_month_name,
            re_bare_year,
            re_prepositional,
        }
    }

    /// Scan `text` and return the distinct normalized dates inside `range`,
    /// in discovery order.
    pub fn extract(&self, text: &str, range: TimeRange) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut found: Vec<String> = Vec::new();

        for caps in self.re_numeric.captures_iter(text) {
            if let (Some(day), Some(month), Some(year)) =
                (group(&caps, 1), group(&caps, 2), group(&caps, 3))
            {
                push_candidate(day, month, year, range, &mut seen, &mut found);
            }
        }

        for caps in self.re_month_name.captures_iter(text) {
            let month = caps.get(2).and_then(|m| month_number(m.as_str()));
            if let (Some(day), Some(month), Some(year)) = (group(&caps, 1), month, group(&caps, 3))
            {
                push_candidate(day, month, year, range, &mut seen, &mut found);
            }
        }

        for caps in self.re_bare_year.captures_iter(text) {
            if let Some(year) = group(&caps, 1) {
                push_candidate(1, 1, year, range, &mut seen, &mut found);
            }
        }

        for caps in self.re_prepositional.captures_iter(text) {
            if let Some(year) = group(&caps, 1) {
                push_candidate(1, 1, year, range, &mut seen, &mut found);
            }
        }

        found
    }
}

impl Default for DateScanner {
    fn default() -> Self {
        Self::new()
    }
}

fn push_candidate(
    day: u32,
    month: u32,
    year: i32,
    range: TimeRange,
    seen: &mut HashSet<String>,
    found: &mut Vec<String>,
) {
    if !range.contains_year(year) {
        return;
    }
    // Rejects impossible calendar combinations such as 31.02.
    if NaiveDate::from_ymd_opt(year, month, day).is_none() {
        return;
    }
    let formatted = format!("{:02}.{:02}.{:04}", day, month, year);
    if seen.insert(formatted.clone()) {
        found.push(formatted);
    }
}

#[cfg(test)]
#[path = "dates_tests.rs"]
mod dates_tests;
