//! Wellness baseline management
//!
//! This module keeps rolling baselines of the burnout, drive and anxiety composites
//! across a student's append-only sample history, so a new sample can be read
//! relative to the student's own recent norm.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::risk::RiskClassifier;
use crate::types::{CompositeScores, WellnessSample};

/// Default baseline window in samples
pub const DEFAULT_BASELINE_WINDOW: usize = 14;

/// A sample's composites compared against the preceding baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellnessTrend {
    pub current: CompositeScores,
    /// Mean composites of the window before this sample, if any
    pub baseline: Option<CompositeScores>,
    /// `current - baseline` per composite
    pub burnout_delta: Option<f64>,
    pub drive_delta: Option<f64>,
    pub anxiety_delta: Option<f64>,
    /// Samples in the window after this update
    pub samples_in_baseline: usize,
}

impl WellnessTrend {
    /// Trend of the last sample in `history` against the samples before it
    pub fn from_history(history: &[WellnessSample], window_size: usize) -> Option<Self> {
        let (latest, earlier) = history.split_last()?;
        let mut store = WellnessBaselineStore::new(window_size);
        for sample in earlier {
            store.push(RiskClassifier::composite_scores(sample));
        }
        Some(store.update_and_contextualize(latest))
    }
}

/// Baseline store for rolling composite averages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WellnessBaselineStore {
    burnout_values: VecDeque<f64>,
    drive_values: VecDeque<f64>,
    anxiety_values: VecDeque<f64>,
    window_size: usize,
}

impl Default for WellnessBaselineStore {
    fn default() -> Self {
        Self::new(DEFAULT_BASELINE_WINDOW)
    }
}

impl WellnessBaselineStore {
    /// Create a new store; a zero window is treated as one sample
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            burnout_values: VecDeque::with_capacity(window_size),
            drive_values: VecDeque::with_capacity(window_size),
            anxiety_values: VecDeque::with_capacity(window_size),
            window_size,
        }
    }

    /// Add a sample and return its trend against the baseline before the update
    pub fn update_and_contextualize(&mut self, sample: &WellnessSample) -> WellnessTrend {
        let current = RiskClassifier::composite_scores(sample);
        let baseline = self.get_baseline();

        self.push(current);

        WellnessTrend {
            current,
            baseline,
            burnout_delta: baseline.map(|b| current.burnout - b.burnout),
            drive_delta: baseline.map(|b| current.drive - b.drive),
            anxiety_delta: baseline.map(|b| current.anxiety - b.anxiety),
            samples_in_baseline: self.sample_count(),
        }
    }

    /// Current baseline composites
    pub fn get_baseline(&self) -> Option<CompositeScores> {
        Some(CompositeScores {
            burnout: Self::rolling_average(&self.burnout_values)?,
            drive: Self::rolling_average(&self.drive_values)?,
            anxiety: Self::rolling_average(&self.anxiety_values)?,
        })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Change the window, dropping the oldest samples that no longer fit.
    /// A zero window is treated as one sample.
    pub fn set_window_size(&mut self, window_size: usize) {
        self.window_size = window_size.max(1);
        let window_size = self.window_size;
        for queue in [
            &mut self.burnout_values,
            &mut self.drive_values,
            &mut self.anxiety_values,
        ] {
            while queue.len() > window_size {
                queue.pop_front();
            }
        }
    }

    pub fn sample_count(&self) -> usize {
        self.burnout_values.len()
    }

    pub fn clear(&mut self) {
        self.burnout_values.clear();
        self.drive_values.clear();
        self.anxiety_values.clear();
    }

    fn push(&mut self, scores: CompositeScores) {
        let window_size = self.window_size;
        for (queue, value) in [
            (&mut self.burnout_values, scores.burnout),
            (&mut self.drive_values, scores.drive),
            (&mut self.anxiety_values, scores.anxiety),
        ] {
            queue.push_back(value);
            while queue.len() > window_size {
                queue.pop_front();
            }
        }
    }

    fn rolling_average(queue: &VecDeque<f64>) -> Option<f64> {
        if queue.is_empty() {
            return None;
        }
        let sum: f64 = queue.iter().sum();
        Some(sum / queue.len() as f64)
    }

    /// Load baseline store from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut store: Self = serde_json::from_str(json)?;
        let window_size = store.window_size;
        store.set_window_size(window_size);
        Ok(store)
    }

    /// Serialize baseline store to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
