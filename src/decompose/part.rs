// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Near-convex part approximated by its bounding box

use crate::geometry::{BoundingBox, TriangleMesh};
use crate::utils::math::clamp01;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Volume credited to a part per member triangle
pub const VOLUME_PER_TRIANGLE: f32 = 0.1;

/// Subset of mesh triangles with a box hull
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvexPart {
    /// Member triangle indices into the source mesh
    pub triangles: Vec<usize>,
    /// The eight corners of `bounds`
    pub hull_vertices: [Point3<f32>; 8],
    pub bounds: BoundingBox,
    /// Coarse proxy of `VOLUME_PER_TRIANGLE * triangle count`
    pub volume: f32,
    /// Mean of the member triangles' vertices
    pub centroid: Point3<f32>,
}

impl ConvexPart {
    pub fn new(mesh: &TriangleMesh, triangles: Vec<usize>) -> Self {
        let bounds = mesh.bounds_of(&triangles);

        let sum = triangles
            .iter()
            .flat_map(|&t| mesh.triangle(t).vertices.iter())
            .fold(Vector3::zeros(), |acc, v| acc + v.coords);
        let centroid = if triangles.is_empty() {
            Point3::origin()
        } else {
            Point3::from(sum / (3 * triangles.len()) as f32)
        };

        Self {
            volume: VOLUME_PER_TRIANGLE * triangles.len() as f32,
            hull_vertices: bounds.corners(),
            bounds,
            centroid,
            triangles,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Normalized shortfall of the volume proxy against the hull volume
    pub fn concavity(&self) -> f32 {
        let hull_volume = self.bounds.volume();
        if hull_volume <= 0.0 {
            return 0.0;
        }
        clamp01((hull_volume - self.volume) / hull_volume)
    }
}

impl fmt::Display for ConvexPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} triangles, volume {:.3}, concavity {:.3}, centroid ({:.3}, {:.3}, {:.3}), {}",
            self.triangle_count(),
            self.volume,
            self.concavity(),
            self.centroid.x,
            self.centroid.y,
            self.centroid.z,
            self.bounds
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use approx::assert_relative_eq;

    #[test]
    fn test_part_properties() {
        let mesh = Primitive::cube(Vector3::new(2.0, 2.0, 2.0), false).to_mesh();
        let part = ConvexPart::new(&mesh, (0..12).collect());

        assert_relative_eq!(part.volume, 1.2, epsilon = 1e-6);
        assert_eq!(part.bounds.to_array(), [0.0, 0.0, 0.0, 2.0, 2.0, 2.0]);
        assert_eq!(part.hull_vertices[6], Point3::new(2.0, 2.0, 2.0));
        // (8 - 1.2) / 8
        assert_relative_eq!(part.concavity(), 0.85, epsilon = 1e-6);
    }

    #[test]
    fn test_flat_part_has_no_concavity() {
        let mesh = Primitive::cube(Vector3::new(1.0, 1.0, 1.0), false).to_mesh();
        // Triangles 0 and 1 form the top face, whose box has no volume
        let part = ConvexPart::new(&mesh, vec![0, 1]);
        assert_eq!(part.concavity(), 0.0);
        assert_relative_eq!(part.centroid.z, 1.0);
    }

    #[test]
    fn test_concavity_clamps() {
        let mesh = Primitive::cube(Vector3::new(0.1, 0.1, 0.1), false).to_mesh();
        let part = ConvexPart::new(&mesh, (0..12).collect());
        assert_eq!(part.concavity(), 0.0);
    }
}
