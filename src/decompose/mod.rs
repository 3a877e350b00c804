// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Convex decomposition of a triangle soup into box-hulled parts
//!
//! All strategies produce a partition of the mesh's triangle indices, except
//! [`DecompositionStrategy::Voxel`], which drops the triangles of voxels below
//! the occupancy threshold and reports how many it dropped.

mod part;
mod split;
mod voxel;

pub use part::{ConvexPart, VOLUME_PER_TRIANGLE};
pub use split::MIN_SPLIT_TRIANGLES;
pub use voxel::{grid_dimensions, Cell, VoxelGrid};

use crate::error::{try_vec, MeshError, Result};
use crate::geometry::TriangleMesh;
use crate::utils::math::variance;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Decomposition strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DecompositionStrategy {
    /// Concavity-driven splitting bounded by `max_parts`
    #[default]
    Approximate,
    /// Runs the approximate algorithm; recorded as `Exact` on the result
    Exact,
    /// Depth-driven splitting bounded by `max_depth`
    Hierarchical,
    /// Uniform grid bucketing
    Voxel,
}

/// Decomposition parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecompositionParams {
    pub strategy: DecompositionStrategy,
    pub max_parts: usize,
    pub max_depth: usize,
    /// Minimum acceptable quality, reported by [`Decomposition::meets_quality`]
    pub quality_threshold: f32,
    pub concavity_tolerance: f32,
    pub voxel_size: f32,
    pub min_triangles_per_voxel: usize,
}

impl Default for DecompositionParams {
    fn default() -> Self {
        Self {
            strategy: DecompositionStrategy::Approximate,
            max_parts: 8,
            max_depth: 8,
            quality_threshold: 0.5,
            concavity_tolerance: 0.1,
            voxel_size: 1.0,
            min_triangles_per_voxel: 10,
        }
    }
}

impl DecompositionParams {
    pub fn with_strategy(strategy: DecompositionStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_parts == 0 {
            return Err(MeshError::invalid("max_parts", "must be at least 1"));
        }
        if self.strategy == DecompositionStrategy::Voxel
            && !(self.voxel_size.is_finite() && self.voxel_size > 0.0)
        {
            return Err(MeshError::invalid(
                "voxel_size",
                format!("must be positive and finite, got {}", self.voxel_size),
            ));
        }
        Ok(())
    }
}

/// Result of one decomposition call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decomposition {
    pub parts: Vec<ConvexPart>,
    /// The strategy that was requested
    pub strategy: DecompositionStrategy,
    pub total_volume: f32,
    /// Spread of part volumes, `1 / (1 + variance)`
    pub quality: f32,
    /// Triangles left out by the voxel strategy
    pub dropped_triangles: usize,
    quality_threshold: f32,
}

impl Decomposition {
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Every triangle index held by some part, ascending
    pub fn covered_triangles(&self) -> Vec<usize> {
        let mut covered: Vec<usize> = self
            .parts
            .iter()
            .flat_map(|part| part.triangles.iter().copied())
            .collect();
        covered.sort_unstable();
        covered
    }

    pub fn meets_quality(&self) -> bool {
        self.quality >= self.quality_threshold
    }
}

/// Split `mesh` into near-convex parts
pub fn decompose(mesh: &TriangleMesh, params: &DecompositionParams) -> Result<Decomposition> {
    params.validate()?;
    if mesh.is_empty() {
        return Err(MeshError::EmptyMesh);
    }

    debug!(
        triangles = mesh.triangle_count(),
        strategy = ?params.strategy,
        "decomposing mesh"
    );

    let mut all = try_vec(mesh.triangle_count())?;
    all.extend(0..mesh.triangle_count());

    let (parts, dropped_triangles) = match params.strategy {
        DecompositionStrategy::Approximate | DecompositionStrategy::Exact => (
            split::approximate(mesh, all, params.max_parts, params.concavity_tolerance)?,
            0,
        ),
        DecompositionStrategy::Hierarchical => {
            (split::hierarchical(mesh, all, params.max_depth)?, 0)
        }
        DecompositionStrategy::Voxel => voxel::voxelize(
            mesh,
            params.voxel_size,
            params.min_triangles_per_voxel,
        )?,
    };

    let volumes: Vec<f32> = parts.iter().map(|part| part.volume).collect();
    let quality = if parts.is_empty() {
        0.0
    } else {
        1.0 / (1.0 + variance(&volumes))
    };

    let result = Decomposition {
        total_volume: volumes.iter().sum(),
        parts,
        strategy: params.strategy,
        quality,
        dropped_triangles,
        quality_threshold: params.quality_threshold,
    };
    debug!(
        parts = result.part_count(),
        quality = result.quality,
        dropped = result.dropped_triangles,
        "decomposition finished"
    );
    Ok(result)
}

impl fmt::Display for Decomposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Convex decomposition ({:?})", self.strategy)?;
        writeln!(f, "  parts: {}", self.part_count())?;
        writeln!(f, "  total volume: {:.3}", self.total_volume)?;
        writeln!(f, "  quality: {:.3}", self.quality)?;
        if self.dropped_triangles > 0 {
            writeln!(f, "  dropped triangles: {}", self.dropped_triangles)?;
        }
        for (i, part) in self.parts.iter().enumerate() {
            writeln!(f, "  part {i}: {part}")?;
        }
        Ok(())
    }
}
