//! Fetch progress tracking.
//!
//! One pipeline run passes through a fixed set of phases. The tracker keeps
//! a structured record per phase so callers can render progress or inspect
//! where a run degraded, instead of scraping log output.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// Phases of one pipeline run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    CityLookup,
    WikidataFetch,
    WikipediaFetch,
    Aggregation,
    Enrichment,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::CityLookup,
        Phase::WikidataFetch,
        Phase::WikipediaFetch,
        Phase::Aggregation,
        Phase::Enrichment,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Phase::CityLookup => "city-lookup",
            Phase::WikidataFetch => "wikidata-fetch",
            Phase::WikipediaFetch => "wikipedia-fetch",
            Phase::Aggregation => "aggregation",
            Phase::Enrichment => "enrichment",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    Running,
    Completed,
    Failed,
}

/// Progress record for one phase.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PhaseRecord {
    pub phase: Phase,
    pub status: PhaseStatus,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Items the phase produced, when it completed.
    pub items: Option<usize>,
    /// Failure message, when it failed.
    pub error: Option<String>,
}

/// In-memory phase tracker, cheaply cloneable and shared across tasks.
#[derive(Clone)]
pub struct FetchTracker {
    records: Arc<RwLock<HashMap<Phase, PhaseRecord>>>,
}

impl FetchTracker {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Mark a phase as started. Re-running a phase replaces its record.
    pub fn begin(&self, phase: Phase) {
        self.records.write().insert(
            phase,
            PhaseRecord {
                phase,
                status: PhaseStatus::Running,
                started_at: chrono::Utc::now(),
                completed_at: None,
                items: None,
                error: None,
            },
        );
    }

    /// Mark a phase as completed with its item count.
    pub fn complete(&self, phase: Phase, items: usize) {
        let mut records = self.records.write();
        if let Some(record) = records.get_mut(&phase) {
            record.status = PhaseStatus::Completed;
            record.completed_at = Some(chrono::Utc::now());
            record.items = Some(items);
        }
    }

    /// Mark a phase as failed.
    pub fn fail(&self, phase: Phase, error: impl Into<String>) {
        let mut records = self.records.write();
        if let Some(record) = records.get_mut(&phase) {
            record.status = PhaseStatus::Failed;
            record.completed_at = Some(chrono::Utc::now());
            record.error = Some(error.into());
        }
    }

    pub fn record(&self, phase: Phase) -> Option<PhaseRecord> {
        self.records.read().get(&phase).cloned()
    }

    /// Records of all phases seen so far, in execution order.
    pub fn records(&self) -> Vec<PhaseRecord> {
        let records = self.records.read();
        Phase::ALL
            .iter()
            .filter_map(|phase| records.get(phase).cloned())
            .collect()
    }

    /// One line per phase, for CLI output.
    pub fn summary(&self) -> String {
        self.records()
            .iter()
            .map(|record| match record.status {
                PhaseStatus::Running => format!("{}: running", record.phase),
                PhaseStatus::Completed => format!(
                    "{}: completed ({} items)",
                    record.phase,
                    record.items.unwrap_or(0)
                ),
                PhaseStatus::Failed => format!(
                    "{}: failed ({})",
                    record.phase,
                    record.error.as_deref().unwrap_or("unknown error")
                ),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for FetchTracker {
    fn default() -> Self {
        Self::new()
    }
}
