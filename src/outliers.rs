//! Sliding-window outlier detection for measurement exports.
//!
//! One [`OutlierTransform`] serves one ordered stream of a single sensor's
//! measurements. Once the window is full, each incoming value is tested
//! against the current window (before it is added) with a median absolute
//! deviation rule: values outside `median ± 3·MAD` are outliers. In replace
//! mode an outlier is emitted as the window mean and that mean enters the
//! window instead of the raw value.

use std::collections::VecDeque;

use crate::error::OutlierConfigError;
use crate::models::{ExportedMeasurement, StoredMeasurement};

pub const MIN_WINDOW: usize = 1;
pub const MAX_WINDOW: usize = 50;
pub const DEFAULT_WINDOW: usize = 15;

const MAD_FACTOR: f64 = 3.0;

// ---

/// Validated export parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierConfig {
    window: usize,
    replace: bool,
}

impl OutlierConfig {
    pub fn new(window: usize, replace: bool) -> Result<Self, OutlierConfigError> {
        // ---
        if !(MIN_WINDOW..=MAX_WINDOW).contains(&window) {
            return Err(OutlierConfigError::WindowOutOfRange(window.to_string()));
        }
        Ok(Self { window, replace })
    }

    /// Build from raw query parameters: `outliers=mark|replace` and an
    /// optional `outlier-window`. Returns `None` when no mode is requested.
    pub fn from_query(
        mode: Option<&str>,
        window: Option<&str>,
    ) -> Result<Option<Self>, OutlierConfigError> {
        // ---
        let Some(mode) = mode else {
            return Ok(None);
        };
        let replace = match mode {
            "mark" => false,
            "replace" => true,
            other => return Err(OutlierConfigError::InvalidMode(other.to_string())),
        };
        let window = match window {
            None => DEFAULT_WINDOW,
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| OutlierConfigError::WindowOutOfRange(raw.to_string()))?,
        };
        Self::new(window, replace).map(Some)
    }

    #[cfg(test)]
    pub fn window(&self) -> usize {
        self.window
    }

    #[cfg(test)]
    pub fn replace(&self) -> bool {
        self.replace
    }
}

/// Classification of one incoming value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub is_outlier: bool,
    /// Value to emit downstream; the window mean when an outlier was replaced.
    pub value: f64,
}

/// Per-stream state: the last `window` values and their running sum.
#[derive(Debug)]
pub struct OutlierTransform {
    config: OutlierConfig,
    buffer: VecDeque<f64>,
    sum: f64,
}

impl OutlierTransform {
    pub fn new(config: OutlierConfig) -> Self {
        // ---
        Self {
            config,
            buffer: VecDeque::with_capacity(config.window),
            sum: 0.0,
        }
    }

    pub fn is_full(&self) -> bool {
        self.buffer.len() == self.config.window
    }

    pub fn mean(&self) -> Option<f64> {
        // ---
        (!self.buffer.is_empty()).then(|| self.sum / self.buffer.len() as f64)
    }

    /// Classify `value` against the current window, then slide it in.
    pub fn push_value(&mut self, value: f64) -> Verdict {
        // ---
        let is_outlier = self.is_full() && {
            let (median, mad) = median_and_mad(&self.buffer);
            let spread = MAD_FACTOR * mad;
            value < median - spread || value > median + spread
        };

        let value = match self.mean() {
            Some(mean) if is_outlier && self.config.replace => mean,
            _ => value,
        };

        if self.is_full() {
            if let Some(evicted) = self.buffer.pop_front() {
                self.sum -= evicted;
            }
        }
        self.buffer.push_back(value);
        self.sum += value;

        Verdict { is_outlier, value }
    }

    /// Apply the transform to one stored row.
    ///
    /// Rows whose value is not numeric pass through untouched and do not
    /// enter the window.
    pub fn apply(&mut self, stored: StoredMeasurement) -> ExportedMeasurement {
        // ---
        let parsed = stored.value.trim().parse::<f64>().ok().filter(|v| v.is_finite());
        let mut exported = ExportedMeasurement::from(stored);

        let Some(raw) = parsed else {
            tracing::debug!("Skipping non-numeric value '{}' in outlier window", exported.value);
            exported.is_outlier = Some(false);
            return exported;
        };

        let verdict = self.push_value(raw);
        if verdict.is_outlier && self.config.replace {
            exported.value = verdict.value.to_string();
        }
        exported.is_outlier = Some(verdict.is_outlier);
        exported
    }
}

fn median(sorted: &[f64]) -> f64 {
    // ---
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Median and median absolute deviation of a non-empty window.
fn median_and_mad(values: &VecDeque<f64>) -> (f64, f64) {
    // ---
    let mut sorted: Vec<f64> = values.iter().copied().collect();
    sorted.sort_by(f64::total_cmp);
    let center = median(&sorted);

    let mut deviations: Vec<f64> = sorted.iter().map(|v| (v - center).abs()).collect();
    deviations.sort_by(f64::total_cmp);

    (center, median(&deviations))
}
