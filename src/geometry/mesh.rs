// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Triangle soup mesh representation

use super::BoundingBox;
use crate::error::Result;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek};

/// Triangle with its three corners and the normal supplied by the reader
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    pub vertices: [Point3<f32>; 3],
    pub normal: Vector3<f32>,
}

impl Triangle {
    pub fn new(vertices: [Point3<f32>; 3], normal: Vector3<f32>) -> Self {
        Self { vertices, normal }
    }

    /// Triangle whose normal is derived from the winding of its corners
    pub fn from_points(v0: Point3<f32>, v1: Point3<f32>, v2: Point3<f32>) -> Self {
        let mut triangle = Self::new([v0, v1, v2], Vector3::zeros());
        triangle.normal = triangle.unit_normal();
        triangle
    }

    pub fn centroid(&self) -> Point3<f32> {
        let [v0, v1, v2] = self.vertices;
        Point3::from((v0.coords + v1.coords + v2.coords) / 3.0)
    }

    /// Unnormalised `(v1 - v0) x (v2 - v0)`
    pub fn cross(&self) -> Vector3<f32> {
        let [v0, v1, v2] = self.vertices;
        (v1 - v0).cross(&(v2 - v0))
    }

    /// Geometric unit normal; the zero vector for degenerate triangles
    pub fn unit_normal(&self) -> Vector3<f32> {
        self.cross().try_normalize(0.0).unwrap_or_else(Vector3::zeros)
    }

    pub fn area(&self) -> f32 {
        self.cross().norm() / 2.0
    }

    /// Lengths of the edges `(0,1)`, `(1,2)`, `(2,0)`
    pub fn edge_lengths(&self) -> [f32; 3] {
        let [v0, v1, v2] = self.vertices;
        [
            nalgebra::distance(&v0, &v1),
            nalgebra::distance(&v1, &v2),
            nalgebra::distance(&v2, &v0),
        ]
    }

    pub fn perimeter(&self) -> f32 {
        self.edge_lengths().iter().sum()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.vertices)
    }
}

/// Immutable triangle soup with its bounding box.
///
/// No connectivity is assumed: shared corners are stored once per triangle.
/// The [`crate::topology`] pass reconstructs the shared vertices and edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriangleMesh {
    triangles: Vec<Triangle>,
    bounds: BoundingBox,
}

impl TriangleMesh {
    pub fn new(triangles: Vec<Triangle>) -> Self {
        let bounds = BoundingBox::from_points(triangles.iter().flat_map(|t| t.vertices.iter()));
        Self { triangles, bounds }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Convert the output of the `stl_io` reader into a triangle soup
    pub fn from_stl(mesh: &stl_io::IndexedMesh) -> Self {
        let point = |index: usize| {
            let v = mesh.vertices[index];
            Point3::new(v[0], v[1], v[2])
        };

        let triangles = mesh
            .faces
            .iter()
            .map(|face| {
                let n = face.normal;
                Triangle::new(
                    [
                        point(face.vertices[0]),
                        point(face.vertices[1]),
                        point(face.vertices[2]),
                    ],
                    Vector3::new(n[0], n[1], n[2]),
                )
            })
            .collect();

        Self::new(triangles)
    }

    /// Read an ASCII or binary STL stream
    pub fn read_stl<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let mesh = stl_io::read_stl(reader)?;
        Ok(Self::from_stl(&mesh))
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn triangle(&self, index: usize) -> &Triangle {
        &self.triangles[index]
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Bounding box of every corner; [`BoundingBox::empty`] for an empty mesh
    pub fn bounding_box(&self) -> BoundingBox {
        self.bounds
    }

    /// Bounding box of a subset of triangles
    pub fn bounds_of(&self, indices: &[usize]) -> BoundingBox {
        BoundingBox::from_points(indices.iter().flat_map(|&i| self.triangles[i].vertices.iter()))
    }

    pub fn surface_area(&self) -> f32 {
        self.triangles.iter().map(Triangle::area).sum()
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<Triangle>> for TriangleMesh {
    fn from(triangles: Vec<Triangle>) -> Self {
        Self::new(triangles)
    }
}
