// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Uniform grid bucketing of triangle centroids

use super::ConvexPart;
use crate::error::{MeshError, Result};
use crate::geometry::TriangleMesh;
use nalgebra::Point3;
use std::collections::BTreeMap;
use tracing::trace;

/// Voxel coordinates, compared lexicographically as `(x, y, z)`
pub type Cell = (usize, usize, usize);

/// Uniform grid anchored at the mesh box minimum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelGrid {
    origin: Point3<f32>,
    voxel_size: f32,
    dims: [usize; 3],
}

impl VoxelGrid {
    /// Grid of `voxel_size` cells over the mesh box.
    ///
    /// Fails when an axis would need more cells than a `usize` can count.
    pub fn new(mesh: &TriangleMesh, voxel_size: f32) -> Result<Self> {
        let bounds = mesh.bounding_box();
        let size = bounds.size();

        let mut dims = [1; 3];
        for axis in 0..3 {
            let cells = (size[axis] / voxel_size).floor();
            if !(cells >= 0.0 && cells < usize::MAX as f32) {
                return Err(MeshError::invalid(
                    "voxel_size",
                    format!(
                        "{voxel_size} is too small for a mesh extent of {}",
                        size[axis]
                    ),
                ));
            }
            dims[axis] = cells as usize + 1;
        }

        Ok(Self {
            origin: bounds.min,
            voxel_size,
            dims,
        })
    }

    /// `floor(extent / size) + 1` on each axis
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Cell holding `point`, clamped into the grid
    pub fn cell_of(&self, point: &Point3<f32>) -> Cell {
        let [x, y, z] = [0, 1, 2].map(|axis| {
            let offset = ((point[axis] - self.origin[axis]) / self.voxel_size).floor() as usize;
            offset.min(self.dims[axis] - 1)
        });
        (x, y, z)
    }
}

/// Grid dimensions `floor(extent / size) + 1` on each axis
pub fn grid_dimensions(mesh: &TriangleMesh, voxel_size: f32) -> Result<[usize; 3]> {
    Ok(VoxelGrid::new(mesh, voxel_size)?.dims())
}

/// Bucket every triangle into the voxel of its centroid.
///
/// Returns the parts of voxels holding at least `min_triangles` triangles in
/// `(x, y, z)` order, plus the number of triangles dropped with the sparse
/// voxels.
pub(crate) fn voxelize(
    mesh: &TriangleMesh,
    voxel_size: f32,
    min_triangles: usize,
) -> Result<(Vec<ConvexPart>, usize)> {
    let grid = VoxelGrid::new(mesh, voxel_size)?;

    let mut cells: BTreeMap<Cell, Vec<usize>> = BTreeMap::new();
    for (index, triangle) in mesh.triangles().iter().enumerate() {
        cells
            .entry(grid.cell_of(&triangle.centroid()))
            .or_default()
            .push(index);
    }

    trace!(dims = ?grid.dims(), occupied = cells.len(), "voxel grid filled");

    let mut dropped = 0;
    let parts = cells
        .into_values()
        .filter_map(|triangles| {
            if triangles.len() >= min_triangles {
                Some(ConvexPart::new(mesh, triangles))
            } else {
                dropped += triangles.len();
                None
            }
        })
        .collect();

    Ok((parts, dropped))
}
