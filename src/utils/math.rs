// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Math utilities

/// Check if two floats are approximately equal
pub fn approx_eq(a: f32, b: f32, epsilon: f32) -> bool {
    (a - b).abs() < epsilon
}

/// Clamp a value into `[0, 1]`
pub fn clamp01(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

/// Convert degrees to radians
pub fn deg_to_rad(deg: f32) -> f32 {
    deg * std::f32::consts::PI / 180.0
}

/// Convert radians to degrees
pub fn rad_to_deg(rad: f32) -> f32 {
    rad * 180.0 / std::f32::consts::PI
}

/// Arithmetic mean; 0 for an empty slice
pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

/// Population variance; 0 for an empty slice
pub fn variance(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean(values);
    values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / values.len() as f32
}

/// `(min, max)` of a slice; `(0, 0)` when empty
pub fn min_max(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

/// Mean, min, max and variance of a metric array
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stats {
    pub mean: f32,
    pub min: f32,
    pub max: f32,
    pub variance: f32,
}

impl Stats {
    pub fn of(values: &[f32]) -> Self {
        let (min, max) = min_max(values);
        Self {
            mean: mean(values),
            min,
            max,
            variance: variance(values),
        }
    }

    pub fn std_dev(&self) -> f32 {
        self.variance.sqrt()
    }

    /// Indices of values above `mean + stddev` and below `mean - stddev`
    pub fn outliers(&self, values: &[f32]) -> (Vec<usize>, Vec<usize>) {
        let (upper, lower) = (self.mean + self.std_dev(), self.mean - self.std_dev());
        let high = (0..values.len()).filter(|&i| values[i] > upper).collect();
        let low = (0..values.len()).filter(|&i| values[i] < lower).collect();
        (high, low)
    }
}
