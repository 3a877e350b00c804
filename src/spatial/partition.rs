// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Flat spatial partition of a mesh into contiguous X bands

use super::Bvh;
use crate::error::{try_vec, MeshError, Result};
use crate::geometry::{BoundingBox, TriangleMesh};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Leaf size of the index every partition carries
pub const PARTITION_LEAF_SIZE: usize = 10;

/// Axis ordering requested for a partition.
///
/// Recorded on the partition for downstream consumers; bands are always
/// laid out along X.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortAxis {
    X,
    Y,
    Z,
    XY,
    XZ,
    YZ,
    #[default]
    XYZ,
}

/// Mapping from triangle index to one of `N` equal-width X bands
#[derive(Debug, Clone)]
pub struct SpatialPartition {
    partition_ids: Vec<usize>,
    bounds: Vec<BoundingBox>,
    sort_axis: SortAxis,
    bvh: Bvh,
}

impl SpatialPartition {
    pub fn create(mesh: &TriangleMesh, num_partitions: usize, sort_axis: SortAxis) -> Result<Self> {
        if num_partitions == 0 {
            return Err(MeshError::invalid("num_partitions", "must be at least 1"));
        }
        if mesh.is_empty() {
            return Err(MeshError::EmptyMesh);
        }

        debug!(
            triangles = mesh.triangle_count(),
            num_partitions,
            ?sort_axis,
            "creating spatial partition"
        );

        let bvh = Bvh::build(mesh, PARTITION_LEAF_SIZE)?;
        let mesh_bounds = mesh.bounding_box();
        let width = mesh_bounds.size().x / num_partitions as f32;

        let mut bounds = try_vec(num_partitions)?;
        bounds.extend((0..num_partitions).map(|i| {
            BoundingBox::new(
                Point3::new(
                    mesh_bounds.min.x + i as f32 * width,
                    mesh_bounds.min.y,
                    mesh_bounds.min.z,
                ),
                Point3::new(
                    mesh_bounds.min.x + (i + 1) as f32 * width,
                    mesh_bounds.max.y,
                    mesh_bounds.max.z,
                ),
            )
        }));

        let mut partition_ids = try_vec(mesh.triangle_count())?;
        partition_ids.extend(
            mesh.triangles()
                .iter()
                .map(|t| band_of(&bounds, t.centroid().x)),
        );

        let partition = Self {
            partition_ids,
            bounds,
            sort_axis,
            bvh,
        };
        debug!(counts = ?partition.partition_counts(), "spatial partition created");
        Ok(partition)
    }

    pub fn num_partitions(&self) -> usize {
        self.bounds.len()
    }

    pub fn sort_axis(&self) -> SortAxis {
        self.sort_axis
    }

    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    /// Partition id of every triangle, in triangle order
    pub fn partition_ids(&self) -> &[usize] {
        &self.partition_ids
    }

    pub fn partition_of(&self, triangle: usize) -> usize {
        self.partition_ids[triangle]
    }

    pub fn partition_bounds(&self, id: usize) -> &BoundingBox {
        &self.bounds[id]
    }

    pub fn all_bounds(&self) -> &[BoundingBox] {
        &self.bounds
    }

    /// Triangles assigned to band `id`, ascending
    pub fn triangles_in_partition(&self, id: usize) -> Vec<usize> {
        (0..self.partition_ids.len())
            .filter(|&t| self.partition_ids[t] == id)
            .collect()
    }

    pub fn partition_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.num_partitions()];
        for &id in &self.partition_ids {
            counts[id] += 1;
        }
        counts
    }

    /// Triangles of `mesh` whose bounds intersect `region`, via the owned BVH
    pub fn triangles_in_region(&self, mesh: &TriangleMesh, region: &BoundingBox) -> Vec<usize> {
        self.bvh.query_region(mesh, region)
    }
}

/// First band whose half-open X range holds `x`; the last band otherwise
fn band_of(bands: &[BoundingBox], x: f32) -> usize {
    bands
        .iter()
        .position(|band| x >= band.min.x && x < band.max.x)
        .unwrap_or(bands.len() - 1)
}

impl fmt::Display for SpatialPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Spatial partition: {} triangles in {} bands ({:?})",
            self.partition_ids.len(),
            self.num_partitions(),
            self.sort_axis
        )?;
        for (id, count) in self.partition_counts().into_iter().enumerate() {
            writeln!(f, "  band {id}: {count} triangles, {}", self.bounds[id])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Primitive, Triangle};
    use nalgebra::Vector3;

    fn strip(xs: &[f32]) -> TriangleMesh {
        // One small triangle per entry with its centroid at the given x
        TriangleMesh::new(
            xs.iter()
                .map(|&x| {
                    Triangle::from_points(
                        Point3::new(x - 0.1, 0.0, 0.0),
                        Point3::new(x + 0.1, 0.0, 0.0),
                        Point3::new(x, 0.3, 0.0),
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn test_band_assignment() {
        let mesh = strip(&[0.1, 3.0, 5.5, 7.6, 9.9]);
        let partition = SpatialPartition::create(&mesh, 4, SortAxis::X).unwrap();

        // X extent is [0, 10], bands are 2.5 wide and half-open
        assert_eq!(partition.partition_ids(), &[0, 1, 2, 3, 3]);
        assert_eq!(partition.partition_counts(), vec![1, 1, 1, 2]);
        assert_eq!(partition.sort_axis(), SortAxis::X);
    }

    #[test]
    fn test_max_x_falls_in_last_band() {
        // Centroids at the mesh extremes: the right one sits on the last edge
        let tri_a = Triangle::from_points(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        );
        let tri_b = Triangle::from_points(
            Point3::new(4.0, 0.0, 0.0),
            Point3::new(4.0, 1.0, 0.0),
            Point3::new(4.0, 0.0, 1.0),
        );
        let mesh = TriangleMesh::new(vec![tri_a, tri_b]);
        let partition = SpatialPartition::create(&mesh, 2, SortAxis::XYZ).unwrap();

        assert_eq!(partition.partition_ids(), &[0, 1]);
    }

    #[test]
    fn test_zero_width_mesh() {
        let tri = Triangle::from_points(
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, 0.0, 1.0),
        );
        let mesh = TriangleMesh::new(vec![tri; 3]);
        let partition = SpatialPartition::create(&mesh, 3, SortAxis::X).unwrap();

        assert_eq!(partition.partition_counts(), vec![0, 0, 3]);
    }

    #[test]
    fn test_band_bounds() {
        let mesh = Primitive::cube(Vector3::new(4.0, 2.0, 1.0), false).to_mesh();
        let partition = SpatialPartition::create(&mesh, 4, SortAxis::XYZ).unwrap();

        assert_eq!(
            partition.partition_bounds(1).to_array(),
            [1.0, 0.0, 0.0, 2.0, 2.0, 1.0]
        );
        let total: usize = partition.partition_counts().iter().sum();
        assert_eq!(total, 12);

        // Bands tile the mesh box and hold their own centroids
        let bands = partition.all_bounds();
        assert_eq!(bands.len(), 4);
        let tiled = bands.iter().fold(BoundingBox::empty(), |acc, b| acc.union(b));
        assert!(tiled.approx_eq(&mesh.bounding_box(), 1e-6));
        for (t, triangle) in mesh.triangles().iter().enumerate() {
            assert!(bands[partition.partition_of(t)].contains_point(&triangle.centroid()));
        }
    }

    #[test]
    fn test_region_query() {
        let mesh = strip(&[0.1, 3.0, 5.5, 7.6, 9.9]);
        let partition = SpatialPartition::create(&mesh, 2, SortAxis::X).unwrap();

        let region = BoundingBox::from_array([2.0, -1.0, -1.0, 5.5, 1.0, 1.0]);
        assert_eq!(partition.triangles_in_region(&mesh, &region), vec![1, 2]);
        assert_eq!(partition.triangles_in_partition(1), vec![2, 3, 4]);
    }

    #[test]
    fn test_invalid_input() {
        let mesh = strip(&[1.0]);
        assert!(matches!(
            SpatialPartition::create(&mesh, 0, SortAxis::X),
            Err(MeshError::InvalidParameter { .. })
        ));
        assert!(matches!(
            SpatialPartition::create(&TriangleMesh::empty(), 2, SortAxis::X),
            Err(MeshError::EmptyMesh)
        ));
    }
}
