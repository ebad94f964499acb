//! Boundary validation
//!
//! The components themselves are total over their documented domains. These checks
//! reject records that fall outside those domains before a component sees them.

use crate::types::{TestAttempt, TopicRecord, WellnessSample};

/// Upper bound of every wellness dimension
pub const MAX_DIMENSION: u8 = 10;

/// Input-contract violations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Time out of range: {hour:02}:{minute:02}")]
    TimeOutOfRange { hour: u8, minute: u8 },

    #[error("Malformed time (expected HH:MM): {0}")]
    MalformedTime(String),

    #[error("Wellness dimension {dimension} out of range 0-10: {value}")]
    DimensionOutOfRange { dimension: &'static str, value: u8 },

    #[error("{field} out of range 0-100 for {record}: {value}")]
    PercentOutOfRange {
        record: String,
        field: &'static str,
        value: f64,
    },

    #[error("Unknown subject: {0}")]
    UnknownSubject(String),
}

impl WellnessSample {
    /// Reject samples with any dimension above 10
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (dimension, value) in self.dimensions() {
            if value > MAX_DIMENSION {
                return Err(ValidationError::DimensionOutOfRange { dimension, value });
            }
        }
        Ok(())
    }
}

impl TopicRecord {
    /// Reject percentages outside 0-100 (including NaN)
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_percent(&self.id, "progress_pct", self.progress_pct)?;
        check_percent(&self.id, "accuracy_pct", self.accuracy_pct)
    }
}

impl TestAttempt {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_percent(&self.test_id, "accuracy_pct", self.accuracy_pct)
    }
}

fn check_percent(record: &str, field: &'static str, value: f64) -> Result<(), ValidationError> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::PercentOutOfRange {
            record: record.to_string(),
            field,
            value,
        })
    }
}

/// Validate a whole telemetry snapshot, stopping at the first violation
pub fn validate_telemetry(
    topics: &[TopicRecord],
    tests: &[TestAttempt],
) -> Result<(), ValidationError> {
    topics.iter().try_for_each(TopicRecord::validate)?;
    tests.iter().try_for_each(TestAttempt::validate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Subject;

    fn uniform_sample(value: u8) -> WellnessSample {
        WellnessSample {
            stress: value,
            focus: value,
            motivation: value,
            exam_fear: value,
            fatigue: value,
            sleep: value,
            consistency: value,
            confidence: value,
            social_support: value,
            vitality: value,
            backlog_guilt: value,
            subject_dread: value,
            recorded_at: None,
        }
    }

    #[test]
    fn test_sample_within_range() {
        assert!(uniform_sample(0).validate().is_ok());
        assert!(uniform_sample(10).validate().is_ok());
    }

    #[test]
    fn test_sample_dimension_out_of_range() {
        let mut sample = uniform_sample(5);
        sample.backlog_guilt = 11;
        assert_eq!(
            sample.validate(),
            Err(ValidationError::DimensionOutOfRange {
                dimension: "backlog_guilt",
                value: 11
            })
        );
    }

    #[test]
    fn test_topic_percent_checks() {
        let mut topic = TopicRecord {
            id: "kinematics".to_string(),
            name: "Kinematics".to_string(),
            subject: Subject::Physics,
            progress_pct: 100.0,
            accuracy_pct: 80.0,
            time_spent_seconds: 0,
            time_by_activity: Default::default(),
            status: Default::default(),
        };
        assert!(topic.validate().is_ok());

        topic.accuracy_pct = f64::NAN;
        assert!(topic.validate().is_err());

        topic.accuracy_pct = 101.0;
        assert!(validate_telemetry(&[topic], &[]).is_err());
    }

    #[test]
    fn test_empty_telemetry_is_valid() {
        assert!(validate_telemetry(&[], &[]).is_ok());
    }
}
