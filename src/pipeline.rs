//! Engine entry points
//!
//! This module provides the public API for Study Pulse: the three component entry
//! points, their JSON string-in/string-out variants, and a stateful engine that
//! combines them into one study report.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::baseline::{WellnessBaselineStore, WellnessTrend};
use crate::config::EngineConfig;
use crate::error::ComputeError;
use crate::risk::RiskClassifier;
use crate::schedule::{RoutineIssue, ScheduleSynthesizer};
use crate::telemetry::{query_ledger, LedgerQuery, TelemetryAggregator};
use crate::types::{
    AggregateReport, LedgerRow, RoutineConfig, Subject, TestAttempt, TimeSlot, TopicRecord,
    WellnessAssessment, WellnessSample,
};
use crate::validation::validate_telemetry;
use crate::{PRODUCER_NAME, PULSE_VERSION};

/// Topic and test collections handed to the aggregator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySnapshot {
    pub topics: Vec<TopicRecord>,
    pub tests: Vec<TestAttempt>,
}

/// Everything the engine knows about one student at one moment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StudentSnapshot {
    pub routine: Option<RoutineConfig>,
    pub topics: Vec<TopicRecord>,
    pub tests: Vec<TestAttempt>,
    /// Append-only, oldest first
    pub wellness_history: Vec<WellnessSample>,
}

/// Report producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Combined output of all three components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyReport {
    pub producer: ReportProducer,
    pub telemetry: AggregateReport,
    pub schedule: Option<Vec<TimeSlot>>,
    pub routine_issues: Vec<RoutineIssue>,
    pub wellness: Option<WellnessAssessment>,
    pub trend: Option<WellnessTrend>,
}

/// Synthesize a day schedule.
///
/// # Arguments
/// * `routine` - The student's six routine anchors
/// * `weak_subject` - Subject the morning deep-work block should target, if known
///
/// # Example
/// ```ignore
/// let slots = synthesize_schedule(&routine, Some(Subject::Physics));
/// ```
pub fn synthesize_schedule(routine: &RoutineConfig, weak_subject: Option<Subject>) -> Vec<TimeSlot> {
    ScheduleSynthesizer::synthesize(routine, weak_subject)
}

/// Aggregate telemetry with the default engine configuration.
///
/// Empty collections are valid and produce a zeroed report.
pub fn aggregate_telemetry(
    topics: &[TopicRecord],
    tests: &[TestAttempt],
    subject_filter: Option<Subject>,
) -> AggregateReport {
    TelemetryAggregator::default().aggregate(topics, tests, subject_filter)
}

/// Classify a wellness sample, rejecting out-of-range dimensions first.
pub fn classify_wellness(sample: &WellnessSample) -> Result<WellnessAssessment, ComputeError> {
    sample.validate()?;
    Ok(RiskClassifier::classify(sample))
}

/// JSON variant of [`synthesize_schedule`]. Malformed times are rejected while parsing.
pub fn synthesize_schedule_json(
    routine_json: &str,
    weak_subject: Option<Subject>,
) -> Result<String, ComputeError> {
    let routine: RoutineConfig = serde_json::from_str(routine_json)?;
    let slots = synthesize_schedule(&routine, weak_subject);
    Ok(serde_json::to_string(&slots)?)
}

/// JSON variant of [`aggregate_telemetry`], taking a [`TelemetrySnapshot`].
pub fn aggregate_telemetry_json(
    snapshot_json: &str,
    subject_filter: Option<Subject>,
) -> Result<String, ComputeError> {
    let snapshot: TelemetrySnapshot = serde_json::from_str(snapshot_json)?;
    validate_telemetry(&snapshot.topics, &snapshot.tests)?;
    let report = aggregate_telemetry(&snapshot.topics, &snapshot.tests, subject_filter);
    Ok(serde_json::to_string(&report)?)
}

/// JSON variant of [`classify_wellness`].
pub fn classify_wellness_json(sample_json: &str) -> Result<String, ComputeError> {
    let sample: WellnessSample = serde_json::from_str(sample_json)?;
    let assessment = classify_wellness(&sample)?;
    Ok(serde_json::to_string(&assessment)?)
}

/// Stateful engine holding configuration and a persistent wellness baseline.
///
/// [`IntelligenceEngine::report`] is a pure function of the snapshot; only
/// [`IntelligenceEngine::record_wellness`] touches the stored baseline.
pub struct IntelligenceEngine {
    config: EngineConfig,
    aggregator: TelemetryAggregator,
    baseline_store: WellnessBaselineStore,
    instance_id: String,
}

impl Default for IntelligenceEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl IntelligenceEngine {
    /// Create a new engine with default settings
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            aggregator: TelemetryAggregator::new(&config),
            baseline_store: WellnessBaselineStore::new(config.wellness_baseline_window),
            instance_id: Uuid::new_v4().to_string(),
            config,
        }
    }

    /// Create an engine from a TOML configuration document
    pub fn from_config_toml(toml: &str) -> Result<Self, ComputeError> {
        Ok(Self::with_config(EngineConfig::from_toml_str(toml)?))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build a combined report for one student snapshot.
    ///
    /// The weakest subject from the aggregate report is fed to the synthesizer as its
    /// weak-subject hint. Wellness is assessed on the latest history sample.
    pub fn report(
        &self,
        snapshot: &StudentSnapshot,
        subject_filter: Option<Subject>,
    ) -> Result<StudyReport, ComputeError> {
        validate_telemetry(&snapshot.topics, &snapshot.tests)?;
        for sample in &snapshot.wellness_history {
            sample.validate()?;
        }

        let telemetry = self
            .aggregator
            .aggregate(&snapshot.topics, &snapshot.tests, subject_filter);

        let (schedule, routine_issues) = match &snapshot.routine {
            Some(routine) => (
                Some(ScheduleSynthesizer::synthesize(
                    routine,
                    telemetry.weakest_subject,
                )),
                routine.consistency_issues(),
            ),
            None => (None, Vec::new()),
        };

        let wellness = snapshot
            .wellness_history
            .last()
            .map(RiskClassifier::classify);
        let trend = WellnessTrend::from_history(
            &snapshot.wellness_history,
            self.config.wellness_baseline_window,
        );

        Ok(StudyReport {
            producer: self.producer(),
            telemetry,
            schedule,
            routine_issues,
            wellness,
            trend,
        })
    }

    /// JSON variant of [`IntelligenceEngine::report`]
    pub fn report_json(
        &self,
        snapshot_json: &str,
        subject_filter: Option<Subject>,
    ) -> Result<String, ComputeError> {
        let snapshot: StudentSnapshot = serde_json::from_str(snapshot_json)?;
        let report = self.report(&snapshot, subject_filter)?;
        serde_json::to_string_pretty(&report).map_err(ComputeError::JsonError)
    }

    /// Re-query an aggregate ledger with a caller-chosen search and sort
    pub fn ledger(&self, report: &AggregateReport, query: &LedgerQuery) -> Vec<LedgerRow> {
        query_ledger(&report.ranked_ledger, query)
    }

    /// Classify a newly recorded sample and fold it into the persistent baseline
    pub fn record_wellness(
        &mut self,
        sample: &WellnessSample,
    ) -> Result<(WellnessAssessment, WellnessTrend), ComputeError> {
        let assessment = classify_wellness(sample)?;
        let trend = self.baseline_store.update_and_contextualize(sample);
        Ok((assessment, trend))
    }

    /// Save baseline state to JSON for persistence
    pub fn save_baselines(&self) -> Result<String, ComputeError> {
        self.baseline_store
            .to_json()
            .map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    /// Load baseline state from JSON. The configured window wins over the
    /// persisted one.
    pub fn load_baselines(&mut self, json: &str) -> Result<(), ComputeError> {
        let mut store = WellnessBaselineStore::from_json(json)
            .map_err(|e| ComputeError::ParseError(e.to_string()))?;
        store.set_window_size(self.config.wellness_baseline_window);
        self.baseline_store = store;
        Ok(())
    }

    /// Number of samples currently in the baseline
    pub fn baseline_sample_count(&self) -> usize {
        self.baseline_store.sample_count()
    }

    /// Drop all baseline samples
    pub fn clear_baselines(&mut self) {
        self.baseline_store.clear();
    }

    fn producer(&self) -> ReportProducer {
        ReportProducer {
            name: PRODUCER_NAME.to_string(),
            version: PULSE_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        }
    }
}
