//! # Chronomap
//!
//! City-history event pipeline over public knowledge bases.
//!
//! This crate resolves a free-text city name against Wikidata, fetches
//! historical events for that city from two heterogeneous sources (the
//! Wikidata SPARQL endpoint and the Wikipedia search/extract API), normalizes
//! the raw records into one event shape, merges and deduplicates them, and
//! optionally enriches each event with a supplemental encyclopedia extract and
//! image. The result feeds a map-marker/listing presentation layer (the
//! bundled CLI renders it as text).
//!
//! ## Features
//!
//! - **City resolution**: free-text city name to a stable Wikidata identifier,
//!   cached per session
//! - **Event fetching**: polymorphic async sources behind one trait, with
//!   timeout, retry, and rate-limit handling
//! - **Normalization**: point-literal coordinate parsing and free-text date
//!   extraction to a single DD.MM.YYYY form
//! - **Aggregation**: near-duplicate removal across sources and a total
//!   chronological ordering
//! - **Enrichment**: per-title supplemental info with an in-memory
//!   first-writer-wins cache
//! - **Timeline control**: a two-handle range slider state machine mapping
//!   pixels to years
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`api`]: shared identifiers and presentation DTOs
//! - [`models`]: the event and time-range domain types
//! - [`extract`]: coordinate and date parsing from raw source text
//! - [`sources`]: the `EventSource` trait and its Wikidata/Wikipedia/fixture
//!   implementations
//! - [`services`]: aggregation, enrichment, fetch tracking, and the pipeline
//!   orchestrating them
//! - [`session`]: application state, user profile, and deep links
//! - [`timeline`]: the range control state machine
//! - [`config`]: endpoint and tuning configuration

pub mod api;

pub mod config;
pub mod models;

pub mod extract;

pub mod sources;

pub mod services;

pub mod session;
pub mod timeline;
