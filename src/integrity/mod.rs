//! Read-only consumer of the room authority's event stream: collection,
//! behavior metrics, rule-based detectors, and per-table risk reports.
//! Nothing in this module tree ever mutates authority, economy, or session
//! state; everything here is a pure function over an immutable event
//! snapshot, safe to run off the critical path and in parallel across
//! tables (per the concurrency model's "integrity collector is
//! write-serialized per session; readers operate on immutable snapshots").

pub mod authority_abuse;
pub mod collector;
pub mod collusion;
pub mod events;
pub mod ingest;
pub mod metrics;
pub mod risk;
pub mod signal;
pub mod softplay;

pub use collector::EventCollector;
pub use events::{IntegrityEvent, IntegrityEventType, RecordedAction};
pub use ingest::WireEventTranslator;
pub use metrics::PlayerMetrics;
pub use risk::{RiskLevel, RiskReportEngine, TableRiskReport};
pub use signal::{DetectionIndicator, DetectionSignal, Severity};
