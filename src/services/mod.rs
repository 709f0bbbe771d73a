//! Service layer for fetching, merging and enriching events.
//!
//! Services sit between the source clients and the callers: the pipeline
//! orchestrates one run, the aggregator merges and orders the results,
//! enrichment attaches encyclopedia info, and the tracker records progress.

pub mod aggregator;

pub mod enrichment;

pub mod pipeline;

pub mod tracker;

pub use enrichment::{enrich_events, Enricher, SupplementalCache};
pub use pipeline::{validate_city_name, EventPipeline, PipelineOutcome, SourceCounts};
pub use tracker::{FetchTracker, Phase, PhaseRecord, PhaseStatus};
