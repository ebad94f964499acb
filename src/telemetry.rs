//! Telemetry aggregation
//!
//! This module reduces topic records and test attempts into summary metrics:
//! - Mean accuracy/progress and total invested time
//! - Efficiency index (accuracy per hour)
//! - Per-subject application gap (practice vs. mock accuracy)
//! - Simulated percentile and rank
//! - A per-topic ledger with return-on-time
//!
//! Empty inputs are valid and reduce to zeros.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::config::{EngineConfig, LedgerSort, MockGapPolicy};
use crate::types::{
    ActivityTime, AggregateReport, GapSource, LedgerRow, Subject, SubjectGap, TestAttempt,
    TopicRecord,
};

/// Floor on invested hours when computing the efficiency index
pub const EFFICIENCY_EPSILON_HOURS: f64 = 0.1;
/// Hours added to each topic before computing return on time
pub const RETURN_ON_TIME_OFFSET_HOURS: f64 = 0.1;

/// Size of the simulated candidate pool
pub const RANK_POOL: f64 = 1_000_000.0;
/// Share of the pool the best possible student can overtake
pub const RANK_SCALING: f64 = 0.99;
/// Best rank the simulation will hand out
pub const RANK_FLOOR: u64 = 120;

/// Caller-supplied ledger view: name filter plus sort key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerQuery {
    /// Case-insensitive substring matched against topic names
    pub search: Option<String>,
    pub sort: LedgerSort,
}

/// Aggregator for study telemetry
#[derive(Debug, Clone)]
pub struct TelemetryAggregator {
    mock_gap_policy: MockGapPolicy,
    simulated_gap_offset: f64,
    default_sort: LedgerSort,
}

impl Default for TelemetryAggregator {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl TelemetryAggregator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            mock_gap_policy: config.mock_gap_policy,
            simulated_gap_offset: config.simulated_gap_offset,
            default_sort: config.default_ledger_sort,
        }
    }

    /// Aggregate a telemetry snapshot, optionally scoped to one subject
    pub fn aggregate(
        &self,
        topics: &[TopicRecord],
        tests: &[TestAttempt],
        subject_filter: Option<Subject>,
    ) -> AggregateReport {
        let scoped: Vec<&TopicRecord> = topics
            .iter()
            .filter(|t| subject_filter.map_or(true, |s| t.subject == s))
            .collect();

        let avg_accuracy = mean(scoped.iter().map(|t| t.accuracy_pct));
        let avg_progress = mean(scoped.iter().map(|t| t.progress_pct));
        let total_time_seconds = scoped
            .iter()
            .fold(0u64, |acc, t| acc.saturating_add(t.time_spent_seconds));

        let mut time_by_activity = ActivityTime::default();
        for topic in &scoped {
            time_by_activity.accumulate(&topic.time_by_activity);
        }

        let efficiency_index = compute_efficiency_index(avg_accuracy, total_time_seconds);
        let per_subject_gap = self.compute_subject_gaps(&scoped, topics, tests);
        let weakest_subject = weakest_subject(&per_subject_gap);
        let (estimated_rank, percentile) = simulate_rank(avg_accuracy, avg_progress);

        let rows: Vec<LedgerRow> = scoped
            .iter()
            .enumerate()
            .map(|(i, t)| ledger_row(t, i))
            .collect();
        let ranked_ledger = query_ledger(
            &rows,
            &LedgerQuery {
                search: None,
                sort: self.default_sort,
            },
        );

        debug!(
            topics = scoped.len(),
            tests = tests.len(),
            avg_accuracy,
            efficiency_index,
            estimated_rank,
            "aggregated telemetry"
        );

        AggregateReport {
            subject_filter,
            topic_count: scoped.len(),
            avg_accuracy,
            avg_progress,
            total_time_seconds,
            time_by_activity,
            efficiency_index,
            per_subject_gap,
            weakest_subject,
            percentile,
            estimated_rank,
            ranked_ledger,
        }
    }

    /// Practice/mock comparison for every subject in scope.
    ///
    /// Tests are linked to subjects through `all_topics`, so a test whose topics
    /// fall outside the scope still resolves.
    fn compute_subject_gaps(
        &self,
        scoped: &[&TopicRecord],
        all_topics: &[TopicRecord],
        tests: &[TestAttempt],
    ) -> BTreeMap<Subject, SubjectGap> {
        let topic_subjects: HashMap<&str, Subject> = all_topics
            .iter()
            .map(|t| (t.id.as_str(), t.subject))
            .collect();

        let mut gaps = BTreeMap::new();

        for subject in Subject::ALL {
            let subject_topics: Vec<&&TopicRecord> =
                scoped.iter().filter(|t| t.subject == subject).collect();
            if subject_topics.is_empty() {
                continue;
            }

            let practice_acc = mean(subject_topics.iter().map(|t| t.accuracy_pct));

            let attempts: Vec<&TestAttempt> = tests
                .iter()
                .filter(|test| {
                    test.topic_ids
                        .iter()
                        .any(|id| topic_subjects.get(id.as_str()) == Some(&subject))
                })
                .collect();

            let gap = if attempts.is_empty() {
                self.fallback_gap(subject, practice_acc)
            } else {
                let mock_acc = mean(attempts.iter().map(|a| a.accuracy_pct));
                SubjectGap {
                    practice_acc,
                    mock_acc: Some(mock_acc),
                    gap: Some(practice_acc - mock_acc),
                    source: GapSource::Empirical,
                    mock_attempts: attempts.len(),
                    last_mock_date: attempts.iter().filter_map(|a| a.date).max(),
                }
            };

            gaps.insert(subject, gap);
        }

        gaps
    }

    fn fallback_gap(&self, subject: Subject, practice_acc: f64) -> SubjectGap {
        match self.mock_gap_policy {
            MockGapPolicy::ReportInsufficient => {
                debug!(%subject, "no mock attempts cover subject");
                SubjectGap {
                    practice_acc,
                    mock_acc: None,
                    gap: None,
                    source: GapSource::InsufficientData,
                    mock_attempts: 0,
                    last_mock_date: None,
                }
            }
            MockGapPolicy::Simulate => {
                warn!(%subject, "no mock attempts, simulating application gap");
                let mock_acc = practice_acc - self.simulated_gap_offset;
                SubjectGap {
                    practice_acc,
                    mock_acc: Some(mock_acc),
                    gap: Some(practice_acc - mock_acc),
                    source: GapSource::Simulated,
                    mock_attempts: 0,
                    last_mock_date: None,
                }
            }
        }
    }
}

/// Filter and sort ledger rows.
///
/// Ties keep the order of the topics the report was aggregated from, however
/// `rows` itself is ordered, so re-querying a ranked ledger is safe.
pub fn query_ledger(rows: &[LedgerRow], query: &LedgerQuery) -> Vec<LedgerRow> {
    let needle = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut selected: Vec<LedgerRow> = rows
        .iter()
        .filter(|row| {
            needle
                .as_deref()
                .map_or(true, |n| row.name.to_lowercase().contains(n))
        })
        .cloned()
        .collect();

    selected.sort_by(|a, b| {
        let primary = match query.sort {
            LedgerSort::Accuracy => desc(a.accuracy_pct, b.accuracy_pct),
            LedgerSort::TimeSpent => b.time_spent_seconds.cmp(&a.time_spent_seconds),
            LedgerSort::ReturnOnTime => desc(a.return_on_time, b.return_on_time),
        };
        primary.then(a.input_index.cmp(&b.input_index))
    });

    selected
}

fn ledger_row(topic: &TopicRecord, input_index: usize) -> LedgerRow {
    let hours = topic.time_spent_seconds as f64 / 3600.0;
    LedgerRow {
        topic_id: topic.id.clone(),
        name: topic.name.clone(),
        subject: topic.subject,
        accuracy_pct: topic.accuracy_pct,
        progress_pct: topic.progress_pct,
        time_spent_seconds: topic.time_spent_seconds,
        hours,
        return_on_time: topic.accuracy_pct / (hours + RETURN_ON_TIME_OFFSET_HOURS),
        input_index,
    }
}

/// Accuracy per invested hour, one decimal
fn compute_efficiency_index(avg_accuracy: f64, total_time_seconds: u64) -> f64 {
    let total_hours = total_time_seconds as f64 / 3600.0;
    round_to(avg_accuracy / total_hours.max(EFFICIENCY_EPSILON_HOURS), 1)
}

/// Heuristic rank within a fixed pool. Returns (rank, percentile to two decimals).
fn simulate_rank(avg_accuracy: f64, avg_progress: f64) -> (u64, f64) {
    let factor = (avg_accuracy / 100.0) * (avg_progress / 100.0);
    let raw_rank = (RANK_POOL * (1.0 - factor * RANK_SCALING)).round().max(0.0) as u64;
    let estimated_rank = raw_rank.max(RANK_FLOOR);
    let percentile = round_to(100.0 - (estimated_rank as f64 / RANK_POOL) * 100.0, 2);
    (estimated_rank, percentile)
}

/// Lowest practice accuracy; ties go to the earlier subject
fn weakest_subject(gaps: &BTreeMap<Subject, SubjectGap>) -> Option<Subject> {
    let mut weakest: Option<(Subject, f64)> = None;
    for (subject, gap) in gaps {
        match weakest {
            Some((_, acc)) if gap.practice_acc >= acc => {}
            _ => weakest = Some((*subject, gap.practice_acc)),
        }
    }
    weakest.map(|(subject, _)| subject)
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn make_topic(id: &str, subject: Subject, accuracy: f64, progress: f64, secs: u64) -> TopicRecord {
        TopicRecord {
            id: id.to_string(),
            name: id.replace('-', " "),
            subject,
            progress_pct: progress,
            accuracy_pct: accuracy,
            time_spent_seconds: secs,
            time_by_activity: ActivityTime {
                theory: secs / 2,
                practice: secs / 2,
                ..Default::default()
            },
            status: Default::default(),
        }
    }

    fn make_test(id: &str, topic_ids: &[&str], accuracy: f64, date: Option<&str>) -> TestAttempt {
        TestAttempt {
            test_id: id.to_string(),
            topic_ids: topic_ids.iter().map(|s| s.to_string()).collect(),
            accuracy_pct: accuracy,
            score_raw: accuracy * 3.0,
            total_possible: 300.0,
            date: date.map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()),
        }
    }

    fn sample_topics() -> Vec<TopicRecord> {
        vec![
            make_topic("kinematics", Subject::Physics, 80.0, 100.0, 3600),
            make_topic("rotational-motion", Subject::Physics, 70.0, 60.0, 7200),
            make_topic("organic-basics", Subject::Chemistry, 90.0, 80.0, 1800),
            make_topic("calculus", Subject::Math, 60.0, 50.0, 10800),
        ]
    }

    #[test]
    fn test_empty_snapshot_reduces_to_zeros() {
        let report = TelemetryAggregator::default().aggregate(&[], &[], None);

        assert_eq!(report.avg_accuracy, 0.0);
        assert_eq!(report.avg_progress, 0.0);
        assert_eq!(report.efficiency_index, 0.0);
        assert_eq!(report.total_time_seconds, 0);
        assert!(report.ranked_ledger.is_empty());
        assert!(report.per_subject_gap.is_empty());
        assert_eq!(report.weakest_subject, None);
        assert_eq!(report.estimated_rank, 1_000_000);
        assert_eq!(report.percentile, 0.0);
    }

    #[test]
    fn test_single_topic_efficiency() {
        let topics = vec![make_topic("kinematics", Subject::Physics, 80.0, 100.0, 3600)];
        let report = TelemetryAggregator::default().aggregate(&topics, &[], None);
        assert_eq!(report.efficiency_index, 80.0);
    }

    #[test]
    fn test_efficiency_without_logged_time_is_bounded() {
        let topics = vec![make_topic("kinematics", Subject::Physics, 80.0, 100.0, 0)];
        let report = TelemetryAggregator::default().aggregate(&topics, &[], None);
        assert_eq!(report.efficiency_index, 800.0);
    }

    #[test]
    fn test_averages_and_time_totals() {
        let report = TelemetryAggregator::default().aggregate(&sample_topics(), &[], None);

        assert_eq!(report.topic_count, 4);
        assert_eq!(report.avg_accuracy, 75.0);
        assert_eq!(report.avg_progress, 72.5);
        assert_eq!(report.total_time_seconds, 23400);
        assert_eq!(report.time_by_activity.theory, 11700);
        assert_eq!(report.time_by_activity.total(), 23400);
        // 75 / 6.5h
        assert_eq!(report.efficiency_index, 11.5);
    }

    #[test]
    fn test_percentile_at_full_marks() {
        let topics = vec![make_topic("kinematics", Subject::Physics, 100.0, 100.0, 3600)];
        let report = TelemetryAggregator::default().aggregate(&topics, &[], None);
        assert_eq!(report.estimated_rank, 10000);
        assert_eq!(report.percentile, 99.0);
    }

    #[test]
    fn test_percentile_partial() {
        let topics = vec![make_topic("kinematics", Subject::Physics, 80.0, 100.0, 3600)];
        let report = TelemetryAggregator::default().aggregate(&topics, &[], None);
        // factor 0.8 -> 1e6 * (1 - 0.792)
        assert_eq!(report.estimated_rank, 208000);
        assert_eq!(report.percentile, 79.2);
    }

    #[test]
    fn test_rank_floor() {
        assert_eq!(simulate_rank(110.0, 100.0).0, RANK_FLOOR);
    }

    #[test]
    fn test_subject_filter_scopes_everything() {
        let report =
            TelemetryAggregator::default().aggregate(&sample_topics(), &[], Some(Subject::Physics));

        assert_eq!(report.subject_filter, Some(Subject::Physics));
        assert_eq!(report.topic_count, 2);
        assert_eq!(report.avg_accuracy, 75.0);
        assert_eq!(report.avg_progress, 80.0);
        assert_eq!(report.total_time_seconds, 10800);
        assert_eq!(
            report.per_subject_gap.keys().copied().collect::<Vec<_>>(),
            vec![Subject::Physics]
        );
        assert!(report
            .ranked_ledger
            .iter()
            .all(|row| row.subject == Subject::Physics));
    }

    #[test]
    fn test_empirical_gap() {
        let tests = vec![
            make_test("mock-1", &["kinematics"], 60.0, Some("2024-03-01")),
            make_test("mock-2", &["rotational-motion", "calculus"], 50.0, Some("2024-03-08")),
        ];
        let report = TelemetryAggregator::default().aggregate(&sample_topics(), &tests, None);

        let physics = &report.per_subject_gap[&Subject::Physics];
        assert_eq!(physics.source, GapSource::Empirical);
        assert_eq!(physics.practice_acc, 75.0);
        assert_eq!(physics.mock_acc, Some(55.0));
        assert_eq!(physics.gap, Some(20.0));
        assert_eq!(physics.mock_attempts, 2);
        assert_eq!(
            physics.last_mock_date,
            NaiveDate::from_ymd_opt(2024, 3, 8)
        );

        let math = &report.per_subject_gap[&Subject::Math];
        assert_eq!(math.mock_acc, Some(50.0));
        assert_eq!(math.gap, Some(10.0));
    }

    #[test]
    fn test_missing_mock_data_is_reported() {
        let report = TelemetryAggregator::default().aggregate(&sample_topics(), &[], None);
        let chemistry = &report.per_subject_gap[&Subject::Chemistry];

        assert_eq!(chemistry.source, GapSource::InsufficientData);
        assert_eq!(chemistry.mock_acc, None);
        assert_eq!(chemistry.gap, None);
    }

    #[test]
    fn test_simulated_gap_policy() {
        let config = EngineConfig {
            mock_gap_policy: MockGapPolicy::Simulate,
            ..Default::default()
        };
        let report = TelemetryAggregator::new(&config).aggregate(&sample_topics(), &[], None);
        let chemistry = &report.per_subject_gap[&Subject::Chemistry];

        assert_eq!(chemistry.source, GapSource::Simulated);
        assert_eq!(chemistry.mock_acc, Some(82.0));
        assert_eq!(chemistry.gap, Some(8.0));
    }

    #[test]
    fn test_unknown_topic_ids_do_not_link() {
        let tests = vec![make_test("mock-x", &["not-a-topic"], 40.0, None)];
        let report = TelemetryAggregator::default().aggregate(&sample_topics(), &tests, None);
        assert!(report
            .per_subject_gap
            .values()
            .all(|g| g.source == GapSource::InsufficientData));
    }

    #[test]
    fn test_weakest_subject() {
        let report = TelemetryAggregator::default().aggregate(&sample_topics(), &[], None);
        assert_eq!(report.weakest_subject, Some(Subject::Math));

        let tied = vec![
            make_topic("optics", Subject::Physics, 50.0, 10.0, 60),
            make_topic("algebra", Subject::Math, 50.0, 10.0, 60),
        ];
        let report = TelemetryAggregator::default().aggregate(&tied, &[], None);
        assert_eq!(report.weakest_subject, Some(Subject::Physics));
    }

    #[test]
    fn test_ledger_return_on_time() {
        let topics = vec![make_topic("kinematics", Subject::Physics, 80.0, 100.0, 3600)];
        let report = TelemetryAggregator::default().aggregate(&topics, &[], None);
        let row = &report.ranked_ledger[0];

        assert_eq!(row.hours, 1.0);
        assert!((row.return_on_time - 80.0 / 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_ledger_sorting() {
        let report = TelemetryAggregator::default().aggregate(&sample_topics(), &[], None);
        let ids = |rows: &[LedgerRow]| rows.iter().map(|r| r.topic_id.clone()).collect::<Vec<_>>();

        // Default: return on time
        assert_eq!(
            ids(&report.ranked_ledger),
            vec!["organic-basics", "kinematics", "rotational-motion", "calculus"]
        );

        let by_accuracy = query_ledger(
            &report.ranked_ledger,
            &LedgerQuery {
                search: None,
                sort: LedgerSort::Accuracy,
            },
        );
        assert_eq!(
            ids(&by_accuracy),
            vec!["organic-basics", "kinematics", "rotational-motion", "calculus"]
        );

        let by_time = query_ledger(
            &report.ranked_ledger,
            &LedgerQuery {
                search: None,
                sort: LedgerSort::TimeSpent,
            },
        );
        assert_eq!(
            ids(&by_time),
            vec!["calculus", "rotational-motion", "kinematics", "organic-basics"]
        );
    }

    #[test]
    fn test_ledger_search_is_case_insensitive() {
        let report = TelemetryAggregator::default().aggregate(&sample_topics(), &[], None);
        let hits = query_ledger(
            &report.ranked_ledger,
            &LedgerQuery {
                search: Some("MOTION".to_string()),
                sort: LedgerSort::Accuracy,
            },
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].topic_id, "rotational-motion");

        let blank = query_ledger(
            &report.ranked_ledger,
            &LedgerQuery {
                search: Some("   ".to_string()),
                sort: LedgerSort::Accuracy,
            },
        );
        assert_eq!(blank.len(), 4);
    }

    #[test]
    fn test_ledger_ties_are_stable() {
        let topics = vec![
            make_topic("first", Subject::Physics, 70.0, 10.0, 600),
            make_topic("second", Subject::Chemistry, 70.0, 10.0, 1200),
            make_topic("third", Subject::Math, 70.0, 10.0, 300),
        ];
        let report = TelemetryAggregator::default().aggregate(&topics, &[], None);
        let by_accuracy = query_ledger(
            &report.ranked_ledger,
            &LedgerQuery {
                search: None,
                sort: LedgerSort::Accuracy,
            },
        );
        let order: Vec<&str> = by_accuracy.iter().map(|r| r.topic_id.as_str()).collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_ledger_ties_survive_reversed_rows() {
        let topics = vec![
            make_topic("first", Subject::Physics, 70.0, 10.0, 600),
            make_topic("second", Subject::Physics, 70.0, 10.0, 600),
            make_topic("third", Subject::Physics, 90.0, 10.0, 600),
        ];
        let report = TelemetryAggregator::default().aggregate(&topics, &[], None);
        let mut rows = report.ranked_ledger.clone();
        rows.reverse();

        let by_time = query_ledger(
            &rows,
            &LedgerQuery {
                search: None,
                sort: LedgerSort::TimeSpent,
            },
        );
        let order: Vec<&str> = by_time.iter().map(|r| r.topic_id.as_str()).collect();
        assert_eq!(order, vec!["first", "second", "third"]);

        let ids: Vec<&str> = report.ranked_ledger.iter().map(|r| r.topic_id.as_str()).collect();
        assert_eq!(ids, vec!["third", "first", "second"]);
    }

    #[test]
    fn test_huge_time_totals_saturate() {
        let topics = vec![
            make_topic("marathon", Subject::Physics, 80.0, 100.0, u64::MAX),
            make_topic("sprint", Subject::Physics, 60.0, 100.0, 10),
        ];
        let report = TelemetryAggregator::default().aggregate(&topics, &[], None);

        assert_eq!(report.total_time_seconds, u64::MAX);
        assert_eq!(report.time_by_activity.theory, u64::MAX / 2 + 5);
        assert_eq!(report.time_by_activity.total(), u64::MAX);
        assert!(report.efficiency_index >= 0.0);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let aggregator = TelemetryAggregator::default();
        let tests = vec![make_test("mock-1", &["kinematics"], 60.0, None)];
        let first = serde_json::to_string(&aggregator.aggregate(&sample_topics(), &tests, None));
        let second = serde_json::to_string(&aggregator.aggregate(&sample_topics(), &tests, None));
        assert_eq!(first.unwrap(), second.unwrap());
    }
}
