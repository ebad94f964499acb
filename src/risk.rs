//! Wellness risk classification
//!
//! Twelve 0-10 self-report dimensions reduce to three composites:
//! - burnout: fatigue, sleep debt and stress
//! - drive: motivation, confidence and consistency
//! - anxiety: exam fear, backlog guilt and subject dread
//!
//! The composites feed an ordered rule table; the first matching rule picks the
//! profile. Tactical actions are read straight off individual dimensions.

use tracing::debug;

use crate::types::{CompositeScores, RiskLevel, WellnessAssessment, WellnessProfile, WellnessSample};

/// Composite above which burnout is critical
pub const BURNOUT_THRESHOLD: f64 = 7.0;
/// Composite above which anxiety blocks performance
pub const ANXIETY_THRESHOLD: f64 = 7.0;
/// Composite below which drive is drifting
pub const DRIVE_THRESHOLD: f64 = 4.0;

/// One row of the decision table
pub struct ClassificationRule {
    pub profile: WellnessProfile,
    pub applies: fn(&CompositeScores) -> bool,
}

/// Evaluated top to bottom; the last row always matches
pub const CLASSIFICATION_RULES: [ClassificationRule; 4] = [
    ClassificationRule {
        profile: WellnessProfile::BurnoutCritical,
        applies: burnout_critical,
    },
    ClassificationRule {
        profile: WellnessProfile::PerformanceBlock,
        applies: anxiety_blocking,
    },
    ClassificationRule {
        profile: WellnessProfile::MotivationDrift,
        applies: drive_drifting,
    },
    ClassificationRule {
        profile: WellnessProfile::PeakFlow,
        applies: always,
    },
];

fn burnout_critical(scores: &CompositeScores) -> bool {
    scores.burnout > BURNOUT_THRESHOLD
}

fn anxiety_blocking(scores: &CompositeScores) -> bool {
    scores.anxiety > ANXIETY_THRESHOLD
}

fn drive_drifting(scores: &CompositeScores) -> bool {
    scores.drive < DRIVE_THRESHOLD
}

fn always(_: &CompositeScores) -> bool {
    true
}

/// Dimension level above which a tactical check fires
const ACTION_HIGH: u8 = 7;
/// Sleep level below which the sleep check fires
const ACTION_LOW_SLEEP: u8 = 5;

/// Classifier for wellness samples
pub struct RiskClassifier;

impl RiskClassifier {
    /// Classify a sample. Total over 0-10 on every dimension.
    pub fn classify(sample: &WellnessSample) -> WellnessAssessment {
        let scores = Self::composite_scores(sample);
        let profile = Self::profile_for(&scores);
        let risk_level = profile.risk_level();

        debug!(
            burnout = scores.burnout,
            drive = scores.drive,
            anxiety = scores.anxiety,
            ?profile,
            "classified wellness sample"
        );

        WellnessAssessment {
            profile,
            risk_level,
            scores,
            narrative: narrative(profile).to_string(),
            tactical_actions: tactical_actions(sample),
            parent_advisory: parent_advisory(risk_level).to_string(),
        }
    }

    pub fn composite_scores(sample: &WellnessSample) -> CompositeScores {
        let sleep_debt = 10u8.saturating_sub(sample.sleep);
        CompositeScores {
            burnout: mean3(sample.fatigue, sleep_debt, sample.stress),
            drive: mean3(sample.motivation, sample.confidence, sample.consistency),
            anxiety: mean3(sample.exam_fear, sample.backlog_guilt, sample.subject_dread),
        }
    }

    pub fn profile_for(scores: &CompositeScores) -> WellnessProfile {
        CLASSIFICATION_RULES
            .iter()
            .find(|rule| (rule.applies)(scores))
            .map(|rule| rule.profile)
            .unwrap_or(WellnessProfile::PeakFlow)
    }
}

fn mean3(a: u8, b: u8, c: u8) -> f64 {
    (f64::from(a) + f64::from(b) + f64::from(c)) / 3.0
}

fn narrative(profile: WellnessProfile) -> &'static str {
    match profile {
        WellnessProfile::BurnoutCritical => {
            "Physiological reserves are depleted. Sustained fatigue, sleep debt and stress \
             are compounding; further volume will cost more than it returns until recovery \
             is restored."
        }
        WellnessProfile::PerformanceBlock => {
            "Capability is intact but exam fear, backlog guilt and subject dread are \
             crowding out execution. Performance under pressure is the bottleneck, not \
             knowledge."
        }
        WellnessProfile::MotivationDrift => {
            "Energy is available but direction is fading. Motivation, confidence and \
             consistency have slipped together, so study sessions are losing momentum."
        }
        WellnessProfile::PeakFlow => {
            "Recovery, drive and composure are in balance. Current habits are sustaining \
             high-quality study; protect the routine and keep pushing difficulty."
        }
    }
}

fn parent_advisory(risk_level: RiskLevel) -> &'static str {
    match risk_level {
        RiskLevel::High => {
            "Immediate attention recommended: reduce academic pressure for the next few \
             days, prioritise sleep and rest, and check in without discussing scores."
        }
        RiskLevel::Medium | RiskLevel::Optimal => {
            "Keep offering steady encouragement and a calm study environment; review \
             progress together weekly rather than daily."
        }
    }
}

fn tactical_actions(sample: &WellnessSample) -> Vec<String> {
    let dread = if sample.subject_dread > ACTION_HIGH {
        "Prioritize weak-subject integration drill"
    } else {
        "Maintain high-yield formula recall cadence"
    };
    let sleep = if sample.sleep < ACTION_LOW_SLEEP {
        "Enforce a hard digital cutoff before sleep"
    } else {
        "Maintain current sleep cycle"
    };
    let backlog = if sample.backlog_guilt > ACTION_HIGH {
        "Allocate a fixed daily block to exactly one backlog topic"
    } else {
        "Continue on the current syllabus sequence"
    };

    vec![dread.to_string(), sleep.to_string(), backlog.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

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
    fn test_composite_scores() {
        let mut sample = uniform_sample(5);
        sample.fatigue = 9;
        sample.sleep = 2;
        sample.stress = 9;

        let scores = RiskClassifier::composite_scores(&sample);
        assert!((scores.burnout - 26.0 / 3.0).abs() < 1e-9);
        assert_eq!(scores.drive, 5.0);
        assert_eq!(scores.anxiety, 5.0);
    }

    #[test]
    fn test_burnout_wins_regardless_of_other_dimensions() {
        for other in [0, 5, 10] {
            let mut sample = uniform_sample(other);
            sample.fatigue = 9;
            sample.sleep = 2;
            sample.stress = 9;

            let assessment = RiskClassifier::classify(&sample);
            assert_eq!(assessment.profile, WellnessProfile::BurnoutCritical);
            assert_eq!(assessment.risk_level, RiskLevel::High);
        }
    }

    #[test]
    fn test_performance_block() {
        let mut sample = uniform_sample(5);
        sample.exam_fear = 8;
        sample.backlog_guilt = 8;
        sample.subject_dread = 8;

        let assessment = RiskClassifier::classify(&sample);
        assert_eq!(assessment.profile, WellnessProfile::PerformanceBlock);
        assert_eq!(assessment.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_motivation_drift() {
        let mut sample = uniform_sample(5);
        sample.motivation = 2;
        sample.confidence = 2;
        sample.consistency = 2;

        let assessment = RiskClassifier::classify(&sample);
        assert_eq!(assessment.profile, WellnessProfile::MotivationDrift);
        assert_eq!(assessment.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_peak_flow() {
        let assessment = RiskClassifier::classify(&uniform_sample(5));
        assert_eq!(assessment.profile, WellnessProfile::PeakFlow);
        assert_eq!(assessment.risk_level, RiskLevel::Optimal);
    }

    #[test]
    fn test_thresholds_are_strict() {
        // burnout exactly 7 and anxiety exactly 7 do not fire; drive exactly 4 does not drift
        let scores = CompositeScores {
            burnout: 7.0,
            drive: 4.0,
            anxiety: 7.0,
        };
        assert_eq!(RiskClassifier::profile_for(&scores), WellnessProfile::PeakFlow);
    }

    #[test]
    fn test_rule_priority() {
        let all_bad = CompositeScores {
            burnout: 9.0,
            drive: 1.0,
            anxiety: 9.0,
        };
        assert_eq!(
            RiskClassifier::profile_for(&all_bad),
            WellnessProfile::BurnoutCritical
        );

        let anxious_and_flat = CompositeScores {
            burnout: 3.0,
            drive: 1.0,
            anxiety: 9.0,
        };
        assert_eq!(
            RiskClassifier::profile_for(&anxious_and_flat),
            WellnessProfile::PerformanceBlock
        );
    }

    #[test]
    fn test_rule_table_shape() {
        let profiles: Vec<WellnessProfile> =
            CLASSIFICATION_RULES.iter().map(|r| r.profile).collect();
        assert_eq!(
            profiles,
            vec![
                WellnessProfile::BurnoutCritical,
                WellnessProfile::PerformanceBlock,
                WellnessProfile::MotivationDrift,
                WellnessProfile::PeakFlow,
            ]
        );
        let neutral = CompositeScores {
            burnout: 0.0,
            drive: 10.0,
            anxiety: 0.0,
        };
        assert!((CLASSIFICATION_RULES[3].applies)(&neutral));
    }

    #[test]
    fn test_tactical_actions_default_branch() {
        let assessment = RiskClassifier::classify(&uniform_sample(5));
        assert_eq!(
            assessment.tactical_actions,
            vec![
                "Maintain high-yield formula recall cadence",
                "Maintain current sleep cycle",
                "Continue on the current syllabus sequence",
            ]
        );
    }

    #[test]
    fn test_tactical_actions_fire_independently() {
        let mut sample = uniform_sample(5);
        sample.subject_dread = 8;
        sample.sleep = 4;
        sample.backlog_guilt = 8;

        let actions = RiskClassifier::classify(&sample).tactical_actions;
        assert_eq!(
            actions,
            vec![
                "Prioritize weak-subject integration drill",
                "Enforce a hard digital cutoff before sleep",
                "Allocate a fixed daily block to exactly one backlog topic",
            ]
        );
    }

    #[test]
    fn test_tactical_action_edges() {
        let mut sample = uniform_sample(5);
        sample.subject_dread = 7;
        sample.sleep = 5;
        sample.backlog_guilt = 7;

        let actions = RiskClassifier::classify(&sample).tactical_actions;
        assert_eq!(actions[0], "Maintain high-yield formula recall cadence");
        assert_eq!(actions[1], "Maintain current sleep cycle");
        assert_eq!(actions[2], "Continue on the current syllabus sequence");
    }

    #[test]
    fn test_parent_advisory_branches_on_risk() {
        let mut burnt = uniform_sample(10);
        burnt.sleep = 0;
        let high = RiskClassifier::classify(&burnt);
        let calm = RiskClassifier::classify(&uniform_sample(5));

        let mut drifting = uniform_sample(5);
        drifting.motivation = 1;
        drifting.confidence = 1;
        drifting.consistency = 1;
        let medium = RiskClassifier::classify(&drifting);

        assert_ne!(high.parent_advisory, calm.parent_advisory);
        assert_eq!(medium.parent_advisory, calm.parent_advisory);
    }

    #[test]
    fn test_each_profile_has_distinct_narrative() {
        let narratives: Vec<&str> = CLASSIFICATION_RULES
            .iter()
            .map(|r| narrative(r.profile))
            .collect();
        for (i, a) in narratives.iter().enumerate() {
            for b in &narratives[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_classification_is_total_over_domain() {
        for value in 0..=10 {
            let assessment = RiskClassifier::classify(&uniform_sample(value));
            assert_eq!(assessment.tactical_actions.len(), 3);
            assert_eq!(assessment.risk_level, assessment.profile.risk_level());
        }
    }
}
