// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Slicing parameters derived from an evaluation

use super::TopologyEvaluation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Slicing strategy label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlicingStrategy {
    Adaptive,
    VariableLayerHeight,
    Uniform,
}

impl SlicingStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Adaptive => "Use adaptive slicing with feature detection",
            Self::VariableLayerHeight => "Use variable layer height based on curvature",
            Self::Uniform => "Standard uniform layer slicing",
        }
    }
}

impl fmt::Display for SlicingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Recommended slicer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlicingRecommendations {
    /// Millimetres
    pub layer_height: f32,
    /// Fraction in `[0, 1]`
    pub infill_density: f32,
    pub shells: u32,
    /// Millimetres per second
    pub print_speed: f32,
    pub strategy: SlicingStrategy,
}

impl SlicingRecommendations {
    /// Pick settings from threshold bands over the evaluation's metrics.
    ///
    /// Blocks that were not computed read as 0.
    pub fn from_evaluation(evaluation: &TopologyEvaluation) -> Self {
        let curvature = evaluation.curvature.as_ref().map_or(0.0, |c| c.mean);
        let richness = evaluation
            .features
            .as_ref()
            .map_or(0.0, |f| f.feature_richness);
        let quality = evaluation.quality.as_ref().map_or(0.0, |q| q.mean);
        let complexity = evaluation.complexity;

        let layer_height = if curvature > 0.1 {
            0.1
        } else if curvature > 0.05 {
            0.2
        } else {
            0.3
        };

        let infill_density = if richness > 0.1 {
            0.8
        } else if richness > 0.05 {
            0.6
        } else {
            0.4
        };

        let shells = if quality < 0.5 {
            3
        } else if quality < 0.7 {
            2
        } else {
            1
        };

        let print_speed = if complexity > 0.7 {
            30.0
        } else if complexity > 0.4 {
            60.0
        } else {
            90.0
        };

        let strategy = if richness > 0.15 {
            SlicingStrategy::Adaptive
        } else if curvature > 0.08 {
            SlicingStrategy::VariableLayerHeight
        } else {
            SlicingStrategy::Uniform
        };

        Self {
            layer_height,
            infill_density,
            shells,
            print_speed,
            strategy,
        }
    }
}

impl fmt::Display for SlicingRecommendations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Slicing recommendations:")?;
        writeln!(f, "  layer height: {:.2} mm", self.layer_height)?;
        writeln!(f, "  infill density: {:.1}%", self.infill_density * 100.0)?;
        writeln!(f, "  shells: {}", self.shells)?;
        writeln!(f, "  print speed: {:.1} mm/s", self.print_speed)?;
        writeln!(f, "  strategy: {}", self.strategy)
    }
}
