//! Core types for the Study Pulse engine
//!
//! This module defines the records handed to the engine by the surrounding
//! application (routines, topics, test attempts, wellness samples) and the
//! derived report values each component produces.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::validation::ValidationError;

/// Minutes in one calendar day
pub const MINUTES_PER_DAY: u32 = 1440;

/// Syllabus subject used to partition per-subject aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    #[serde(alias = "PHYSICS")]
    Physics,
    #[serde(alias = "CHEMISTRY")]
    Chemistry,
    #[serde(alias = "MATH", alias = "mathematics")]
    Math,
}

impl Subject {
    /// All subjects in canonical order
    pub const ALL: [Subject; 3] = [Subject::Physics, Subject::Chemistry, Subject::Math];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Physics => "physics",
            Subject::Chemistry => "chemistry",
            Subject::Math => "math",
        }
    }

    /// Human-facing name used in schedule labels
    pub fn display_name(&self) -> &'static str {
        match self {
            Subject::Physics => "Physics",
            Subject::Chemistry => "Chemistry",
            Subject::Math => "Mathematics",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subject {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "physics" => Ok(Subject::Physics),
            "chemistry" => Ok(Subject::Chemistry),
            "math" | "maths" | "mathematics" => Ok(Subject::Math),
            other => Err(ValidationError::UnknownSubject(other.to_string())),
        }
    }
}

/// Wall-clock time of day.
///
/// Only constructible through [`TimeOfDay::new`] or by parsing `"HH:MM"`, so every
/// value in circulation satisfies `hour <= 23` and `minute <= 59`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Result<Self, ValidationError> {
        if hour > 23 || minute > 59 {
            return Err(ValidationError::TimeOutOfRange { hour, minute });
        }
        Ok(Self { hour, minute })
    }

    /// Build from any minute count, wrapping past midnight
    pub fn from_minutes(minutes: u32) -> Self {
        let minutes = minutes % MINUTES_PER_DAY;
        Self {
            hour: (minutes / 60) as u8,
            minute: (minutes % 60) as u8,
        }
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Minutes since midnight (0-1439)
    pub fn minutes(&self) -> u32 {
        u32::from(self.hour) * 60 + u32::from(self.minute)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ValidationError::MalformedTime(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(malformed)?;
        let hour: u8 = h.parse().map_err(|_| malformed())?;
        let minute: u8 = m.parse().map_err(|_| malformed())?;
        TimeOfDay::new(hour, minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

/// The six daily anchors of a student's routine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineConfig {
    pub wake_up: TimeOfDay,
    pub sleep: TimeOfDay,
    pub school_start: TimeOfDay,
    pub school_end: TimeOfDay,
    pub coaching_start: TimeOfDay,
    pub coaching_end: TimeOfDay,
}

/// Schedule block category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotCategory {
    Fixed,
    DeepWork,
    Rest,
    Review,
}

/// One labeled block of a synthesized day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start_time: TimeOfDay,
    pub label: String,
    pub category: SlotCategory,
    /// Minutes until the next block starts (the last block runs until the next wake-up)
    pub duration_minutes: u32,
}

/// Time invested per study activity (seconds)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityTime {
    pub theory: u64,
    pub video: u64,
    pub practice: u64,
    pub test: u64,
}

impl ActivityTime {
    /// Saturates at `u64::MAX`
    pub fn total(&self) -> u64 {
        self.theory
            .saturating_add(self.video)
            .saturating_add(self.practice)
            .saturating_add(self.test)
    }

    pub fn accumulate(&mut self, other: &ActivityTime) {
        self.theory = self.theory.saturating_add(other.theory);
        self.video = self.video.saturating_add(other.video);
        self.practice = self.practice.saturating_add(other.practice);
        self.test = self.test.saturating_add(other.test);
    }
}

/// Tracking status of a chapter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    NeedsRevision,
}

/// A syllabus chapter with tracked progress, accuracy and time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub subject: Subject,
    /// Syllabus progress (0-100)
    #[serde(default)]
    pub progress_pct: f64,
    /// Practice accuracy (0-100)
    #[serde(default)]
    pub accuracy_pct: f64,
    #[serde(default)]
    pub time_spent_seconds: u64,
    #[serde(default)]
    pub time_by_activity: ActivityTime,
    #[serde(default)]
    pub status: TopicStatus,
}

/// One mock/test attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestAttempt {
    pub test_id: String,
    /// Topics the test covers; subject linkage is resolved through these
    #[serde(default)]
    pub topic_ids: Vec<String>,
    #[serde(default)]
    pub accuracy_pct: f64,
    #[serde(default)]
    pub score_raw: f64,
    #[serde(default)]
    pub total_possible: f64,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// Twelve 0-10 self-report dimensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WellnessSample {
    pub stress: u8,
    pub focus: u8,
    pub motivation: u8,
    pub exam_fear: u8,
    pub fatigue: u8,
    pub sleep: u8,
    pub consistency: u8,
    pub confidence: u8,
    pub social_support: u8,
    pub vitality: u8,
    pub backlog_guilt: u8,
    pub subject_dread: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl WellnessSample {
    /// Named view over every dimension, in declaration order
    pub fn dimensions(&self) -> [(&'static str, u8); 12] {
        [
            ("stress", self.stress),
            ("focus", self.focus),
            ("motivation", self.motivation),
            ("exam_fear", self.exam_fear),
            ("fatigue", self.fatigue),
            ("sleep", self.sleep),
            ("consistency", self.consistency),
            ("confidence", self.confidence),
            ("social_support", self.social_support),
            ("vitality", self.vitality),
            ("backlog_guilt", self.backlog_guilt),
            ("subject_dread", self.subject_dread),
        ]
    }
}

/// Where a subject's mock accuracy came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapSource {
    /// Averaged from real test attempts
    Empirical,
    /// Placeholder derived from practice accuracy
    Simulated,
    /// No attempt covers this subject
    InsufficientData,
}

/// Practice-vs-exam comparison for one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectGap {
    pub practice_acc: f64,
    pub mock_acc: Option<f64>,
    pub gap: Option<f64>,
    pub source: GapSource,
    pub mock_attempts: usize,
    pub last_mock_date: Option<NaiveDate>,
}

/// One row of the per-topic ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub topic_id: String,
    pub name: String,
    pub subject: Subject,
    pub accuracy_pct: f64,
    pub progress_pct: f64,
    pub time_spent_seconds: u64,
    pub hours: f64,
    pub return_on_time: f64,
    /// Position of the topic in the aggregated input; breaks sort ties
    #[serde(default)]
    pub input_index: usize,
}

/// Aggregator output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub subject_filter: Option<Subject>,
    pub topic_count: usize,
    pub avg_accuracy: f64,
    pub avg_progress: f64,
    pub total_time_seconds: u64,
    pub time_by_activity: ActivityTime,
    pub efficiency_index: f64,
    pub per_subject_gap: BTreeMap<Subject, SubjectGap>,
    /// Subject with the lowest practice accuracy among those with topics
    pub weakest_subject: Option<Subject>,
    pub percentile: f64,
    pub estimated_rank: u64,
    pub ranked_ledger: Vec<LedgerRow>,
}

/// Composite scores derived from a wellness sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeScores {
    pub burnout: f64,
    pub drive: f64,
    pub anxiety: f64,
}

/// Discrete wellness label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WellnessProfile {
    BurnoutCritical,
    PerformanceBlock,
    MotivationDrift,
    PeakFlow,
}

impl WellnessProfile {
    pub fn risk_level(&self) -> RiskLevel {
        match self {
            WellnessProfile::BurnoutCritical => RiskLevel::High,
            WellnessProfile::PerformanceBlock | WellnessProfile::MotivationDrift => {
                RiskLevel::Medium
            }
            WellnessProfile::PeakFlow => RiskLevel::Optimal,
        }
    }
}

/// Risk tier attached to a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    High,
    Medium,
    Optimal,
}

/// Classifier output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellnessAssessment {
    pub profile: WellnessProfile,
    pub risk_level: RiskLevel,
    pub scores: CompositeScores,
    pub narrative: String,
    pub tactical_actions: Vec<String>,
    pub parent_advisory: String,
}
