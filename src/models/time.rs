use chrono::Datelike;
use serde::*;

/// Lower bound for query years across the whole pipeline. Wide enough to
/// cover every era preset.
pub const MIN_QUERY_YEAR: i32 = 500;

/// Current calendar year (UTC).
pub fn current_year() -> i32 {
    chrono::Utc::now().year()
}

/// Inclusive year range driving the event queries.
///
/// Invariant: `start_year <= end_year`. The checked constructors enforce it;
/// [`TimeRange::clamped`] restores it by swapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start_year: i32,
    pub end_year: i32,
}

impl TimeRange {
    /// Create a range, rejecting inverted bounds.
    pub fn new(start_year: i32, end_year: i32) -> Result<Self, String> {
        if start_year > end_year {
            return Err(format!(
                "Invalid year range: start {} is after end {}",
                start_year, end_year
            ));
        }
        Ok(Self {
            start_year,
            end_year,
        })
    }

    /// Create a range validated against an outer bound (both years inclusive).
    pub fn bounded(start_year: i32, end_year: i32, min: i32, max: i32) -> Result<Self, String> {
        let range = Self::new(start_year, end_year)?;
        if range.start_year < min || range.end_year > max {
            return Err(format!(
                "Year range {}-{} exceeds the allowed bound {}-{}",
                range.start_year, range.end_year, min, max
            ));
        }
        Ok(range)
    }

    /// Total constructor: orders the pair and clamps both years into `[min, max]`.
    pub fn clamped(start_year: i32, end_year: i32, min: i32, max: i32) -> Self {
        let (lo, hi) = if start_year <= end_year {
            (start_year, end_year)
        } else {
            (end_year, start_year)
        };
        Self {
            start_year: lo.clamp(min, max),
            end_year: hi.clamp(min, max),
        }
    }

    pub fn contains_year(&self, year: i32) -> bool {
        year >= self.start_year && year <= self.end_year
    }

    /// Number of years covered, inclusive of both ends.
    pub fn span_years(&self) -> i32 {
        self.end_year - self.start_year + 1
    }
}

impl Default for TimeRange {
    /// Fallback query window used when no preset or explicit range is given.
    fn default() -> Self {
        Self {
            start_year: 1900,
            end_year: 2000,
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start_year, self.end_year)
    }
}

/// Named period presets selectable from the CLI and the stored profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Era {
    AncientRus,
    TsarRus,
    Imperial,
    Soviet,
    Modern,
    MiddleAges,
    Renaissance,
    Industrial,
    TwentiethCentury,
}

impl Era {
    pub const ALL: [Era; 9] = [
        Era::AncientRus,
        Era::TsarRus,
        Era::Imperial,
        Era::Soviet,
        Era::Modern,
        Era::MiddleAges,
        Era::Renaissance,
        Era::Industrial,
        Era::TwentiethCentury,
    ];

    /// Kebab-case name used on the CLI and in the profile JSON.
    pub fn name(&self) -> &'static str {
        match self {
            Era::AncientRus => "ancient-rus",
            Era::TsarRus => "tsar-rus",
            Era::Imperial => "imperial",
            Era::Soviet => "soviet",
            Era::Modern => "modern",
            Era::MiddleAges => "middle-ages",
            Era::Renaissance => "renaissance",
            Era::Industrial => "industrial",
            Era::TwentiethCentury => "twentieth-century",
        }
    }

    /// Human-readable label.
    pub fn title(&self) -> &'static str {
        match self {
            Era::AncientRus => "Древняя Русь",
            Era::TsarRus => "Царская Русь",
            Era::Imperial => "Имперская Россия",
            Era::Soviet => "Советский период",
            Era::Modern => "Современная Россия",
            Era::MiddleAges => "Средневековье",
            Era::Renaissance => "Эпоха Возрождения",
            Era::Industrial => "Промышленная революция",
            Era::TwentiethCentury => "XX век",
        }
    }

    /// Year range the preset stands for.
    pub fn range(&self) -> TimeRange {
        let (start, end) = match self {
            Era::AncientRus => (800, 1547),
            Era::TsarRus => (1547, 1721),
            Era::Imperial => (1721, 1917),
            Era::Soviet => (1917, 1991),
            Era::Modern => (1991, current_year()),
            Era::MiddleAges => (500, 1500),
            Era::Renaissance => (1300, 1600),
            Era::Industrial => (1760, 1840),
            Era::TwentiethCentury => (1901, 2000),
        };
        TimeRange {
            start_year: start,
            end_year: end,
        }
    }
}

impl std::str::FromStr for Era {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Era::ALL
            .iter()
            .find(|era| era.name() == s)
            .copied()
            .ok_or_else(|| format!("Unknown era preset '{}'", s))
    }
}

impl std::fmt::Display for Era {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Resolve a preset name to its range, falling back to the default window
/// when the name is unknown or empty.
pub fn range_for_preset(name: &str) -> TimeRange {
    name.parse::<Era>()
        .map(|era| era.range())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::{current_year, range_for_preset, Era, TimeRange};

    #[test]
    fn test_range_new_valid() {
        let range = TimeRange::new(1700, 2000).unwrap();
        assert_eq!(range.start_year, 1700);
        assert_eq!(range.end_year, 2000);
    }

    #[test]
    fn test_range_new_single_year() {
        let range = TimeRange::new(1917, 1917).unwrap();
        assert_eq!(range.span_years(), 1);
    }

    #[test]
    fn test_range_new_inverted() {
        assert!(TimeRange::new(2000, 1700).is_err());
    }

    #[test]
    fn test_range_bounded_rejects_out_of_bound() {
        assert!(TimeRange::bounded(800, 1500, 1000, 2100).is_err());
        assert!(TimeRange::bounded(1500, 2200, 1000, 2100).is_err());
        assert!(TimeRange::bounded(1500, 1600, 1000, 2100).is_ok());
    }

    #[test]
    fn test_range_clamped_orders_and_clamps() {
        let range = TimeRange::clamped(2500, 900, 1000, 2100);
        assert_eq!(range.start_year, 1000);
        assert_eq!(range.end_year, 2100);
    }

    #[test]
    fn test_range_contains_year() {
        let range = TimeRange::new(1700, 2000).unwrap();
        assert!(range.contains_year(1700));
        assert!(range.contains_year(2000));
        assert!(range.contains_year(1824));
        assert!(!range.contains_year(1699));
        assert!(!range.contains_year(2001));
    }

    #[test]
    fn test_range_default_window() {
        let range = TimeRange::default();
        assert_eq!(range.start_year, 1900);
        assert_eq!(range.end_year, 2000);
    }

    #[test]
    fn test_range_display() {
        let range = TimeRange::new(1700, 2000).unwrap();
        assert_eq!(range.to_string(), "1700-2000");
    }

    #[test]
    fn test_era_table() {
        assert_eq!(Era::AncientRus.range(), TimeRange::new(800, 1547).unwrap());
        assert_eq!(Era::TsarRus.range(), TimeRange::new(1547, 1721).unwrap());
        assert_eq!(Era::Imperial.range(), TimeRange::new(1721, 1917).unwrap());
        assert_eq!(Era::Soviet.range(), TimeRange::new(1917, 1991).unwrap());
        assert_eq!(Era::MiddleAges.range(), TimeRange::new(500, 1500).unwrap());
        assert_eq!(Era::Renaissance.range(), TimeRange::new(1300, 1600).unwrap());
        assert_eq!(Era::Industrial.range(), TimeRange::new(1760, 1840).unwrap());
        assert_eq!(
            Era::TwentiethCentury.range(),
            TimeRange::new(1901, 2000).unwrap()
        );
    }

    #[test]
    fn test_era_modern_ends_now() {
        let range = Era::Modern.range();
        assert_eq!(range.start_year, 1991);
        assert_eq!(range.end_year, current_year());
    }

    #[test]
    fn test_era_parse_round_trip() {
        for era in Era::ALL {
            let parsed: Era = era.name().parse().unwrap();
            assert_eq!(parsed, era);
        }
    }

    #[test]
    fn test_era_parse_unknown() {
        assert!("bronze-age".parse::<Era>().is_err());
    }

    #[test]
    fn test_range_for_preset_fallback() {
        assert_eq!(range_for_preset("soviet"), Era::Soviet.range());
        assert_eq!(range_for_preset("bronze-age"), TimeRange::default());
        assert_eq!(range_for_preset(""), TimeRange::default());
    }

    #[test]
    fn test_era_serde_kebab_case() {
        let json = serde_json::to_string(&Era::TwentiethCentury).unwrap();
        assert_eq!(json, "\"twentieth-century\"");
        let parsed: Era = serde_json::from_str("\"ancient-rus\"").unwrap();
        assert_eq!(parsed, Era::AncientRus);
    }
}
