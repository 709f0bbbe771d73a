//! Field extraction from raw source text.
//!
//! Fetchers hand these helpers the raw strings they get back from the
//! knowledge bases: well-known-text point literals for coordinates and
//! free-text article extracts for dates.

pub mod coords;
pub mod dates;

pub use coords::parse_point;
pub use dates::DateScanner;
