//! Schedule synthesis
//!
//! This module turns the six routine anchors into an ordered day of labeled blocks:
//! - Fixed anchors for school, coaching, wake-up and sleep
//! - Deep-work blocks inserted into long enough morning/afternoon gaps
//! - A review block ahead of sleep
//!
//! `sleep` earlier than `wake_up` is read as after midnight. Ordering works on the
//! wrap-normalized minute value and emitted start times are folded back into 0-1439.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::{RoutineConfig, SlotCategory, Subject, TimeOfDay, TimeSlot, MINUTES_PER_DAY};

/// Morning gap (wake-up to school) above which a deep-work block is inserted
pub const MORNING_GAP_THRESHOLD_MIN: u32 = 60;
/// Offset of the morning deep-work block after wake-up
pub const MORNING_BLOCK_OFFSET_MIN: u32 = 30;
/// Afternoon gap (school end to coaching) above which a revision block is inserted
pub const AFTERNOON_GAP_THRESHOLD_MIN: u32 = 90;
/// Offset of the afternoon revision block after school end
pub const AFTERNOON_BLOCK_OFFSET_MIN: u32 = 45;
/// Lead time of the review block before sleep
pub const REVIEW_LEAD_MIN: u32 = 45;

/// Ordering problems in a routine. Reported, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutineIssue {
    SchoolEndsBeforeStart,
    CoachingEndsBeforeStart,
    CoachingOverlapsSchool,
    SchoolBeforeWakeUp,
    NoRoomForReview,
}

impl RoutineConfig {
    /// Effective sleep minute, pushed past midnight when it precedes wake-up
    pub fn effective_sleep_minutes(&self) -> u32 {
        let sleep = self.sleep.minutes();
        if sleep < self.wake_up.minutes() {
            sleep + MINUTES_PER_DAY
        } else {
            sleep
        }
    }

    /// Review block start on the same wrap-normalized scale as
    /// [`RoutineConfig::effective_sleep_minutes`]. A sleep time less than
    /// `REVIEW_LEAD_MIN` past midnight puts review late on the same day.
    pub fn review_minutes(&self) -> u32 {
        let sleep = self.effective_sleep_minutes();
        if sleep >= REVIEW_LEAD_MIN {
            sleep - REVIEW_LEAD_MIN
        } else {
            sleep + MINUTES_PER_DAY - REVIEW_LEAD_MIN
        }
    }

    /// List fixed-window ordering violations
    pub fn consistency_issues(&self) -> Vec<RoutineIssue> {
        let mut issues = Vec::new();

        if self.school_start < self.wake_up {
            issues.push(RoutineIssue::SchoolBeforeWakeUp);
        }
        if self.school_end < self.school_start {
            issues.push(RoutineIssue::SchoolEndsBeforeStart);
        }
        if self.coaching_end < self.coaching_start {
            issues.push(RoutineIssue::CoachingEndsBeforeStart);
        }
        if self.coaching_start < self.school_end {
            issues.push(RoutineIssue::CoachingOverlapsSchool);
        }
        let review_at = self.review_minutes();
        if review_at < self.coaching_end.minutes() {
            issues.push(RoutineIssue::NoRoomForReview);
        }

        issues
    }
}

/// A block before sorting, with its wrap-normalized start
struct PendingSlot {
    effective_minutes: u32,
    label: String,
    category: SlotCategory,
}

impl PendingSlot {
    fn new(effective_minutes: u32, label: impl Into<String>, category: SlotCategory) -> Self {
        Self {
            effective_minutes,
            label: label.into(),
            category,
        }
    }
}

/// Synthesizer for daily study schedules
pub struct ScheduleSynthesizer;

impl ScheduleSynthesizer {
    /// Build the day's blocks.
    ///
    /// `weak_subject` names the subject the morning deep-work block should target;
    /// without it the block gets a generic label. Always returns, even for
    /// contradictory routines: block order then exposes the inconsistency.
    pub fn synthesize(routine: &RoutineConfig, weak_subject: Option<Subject>) -> Vec<TimeSlot> {
        let issues = routine.consistency_issues();
        if !issues.is_empty() {
            warn!(?issues, "routine violates fixed-window ordering");
        }

        let wake = routine.wake_up.minutes();
        let school_start = routine.school_start.minutes();
        let school_end = routine.school_end.minutes();
        let coaching_start = routine.coaching_start.minutes();
        let coaching_end = routine.coaching_end.minutes();
        let sleep = routine.effective_sleep_minutes();

        let mut pending = Vec::with_capacity(9);

        pending.push(PendingSlot::new(wake, "Activation Cycle", SlotCategory::Rest));

        if minutes_between(wake, school_start) > i64::from(MORNING_GAP_THRESHOLD_MIN) {
            let label = match weak_subject {
                Some(subject) => format!("Prime Focus: {}", subject.display_name()),
                None => "Prime Focus".to_string(),
            };
            pending.push(PendingSlot::new(
                wake + MORNING_BLOCK_OFFSET_MIN,
                label,
                SlotCategory::DeepWork,
            ));
        }

        pending.push(PendingSlot::new(
            school_start,
            "School Academic Session",
            SlotCategory::Fixed,
        ));
        pending.push(PendingSlot::new(
            school_end,
            "Physiological Recovery",
            SlotCategory::Rest,
        ));

        if minutes_between(school_end, coaching_start) > i64::from(AFTERNOON_GAP_THRESHOLD_MIN) {
            pending.push(PendingSlot::new(
                school_end + AFTERNOON_BLOCK_OFFSET_MIN,
                "Quick Revision",
                SlotCategory::DeepWork,
            ));
        }

        pending.push(PendingSlot::new(
            coaching_start,
            "Coaching Stream",
            SlotCategory::Fixed,
        ));
        pending.push(PendingSlot::new(
            coaching_end,
            "Self Study: Problem Sets",
            SlotCategory::DeepWork,
        ));
        pending.push(PendingSlot::new(
            routine.review_minutes(),
            "Mistake Log & Plan Sync",
            SlotCategory::Review,
        ));
        pending.push(PendingSlot::new(sleep, "Restorative Sleep", SlotCategory::Rest));

        // Stable: equal starts keep emission order
        pending.sort_by_key(|slot| slot.effective_minutes);

        let next_wake = wake + MINUTES_PER_DAY;
        let slots: Vec<TimeSlot> = pending
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                let next_start = pending
                    .get(i + 1)
                    .map(|next| next.effective_minutes)
                    .unwrap_or(next_wake);
                TimeSlot {
                    start_time: TimeOfDay::from_minutes(slot.effective_minutes),
                    label: slot.label.clone(),
                    category: slot.category,
                    duration_minutes: next_start.saturating_sub(slot.effective_minutes),
                }
            })
            .collect();

        debug!(blocks = slots.len(), "synthesized schedule");
        slots
    }
}

fn minutes_between(from: u32, to: u32) -> i64 {
    i64::from(to) - i64::from(from)
}
