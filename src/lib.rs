//! Study Pulse - Offline heuristic engine for study-progress tracking
//!
//! Pulse turns raw student telemetry into decisions without any network or model
//! dependency. Three independent, pure components run over an in-memory snapshot:
//!
//! - **Schedule Synthesizer**: routine anchors → ordered, labeled day blocks
//! - **Telemetry Aggregator**: topics and tests → accuracy, efficiency, application
//!   gap, simulated rank and a per-topic ledger
//! - **Risk Classifier**: twelve self-report dimensions → wellness profile with
//!   tactical actions
//!
//! [`IntelligenceEngine`] combines the three into a single study report.

pub mod baseline;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod risk;
pub mod schedule;
pub mod telemetry;
pub mod types;
pub mod validation;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use baseline::{WellnessBaselineStore, WellnessTrend};
pub use config::{EngineConfig, LedgerSort, MockGapPolicy};
pub use error::ComputeError;
pub use pipeline::{
    aggregate_telemetry, classify_wellness, synthesize_schedule, IntelligenceEngine,
    StudentSnapshot, StudyReport,
};
pub use validation::ValidationError;

/// Pulse version embedded in every report
pub const PULSE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "study-pulse";
