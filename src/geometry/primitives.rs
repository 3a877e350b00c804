// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Primitive triangle soups used for fixtures and benchmarks

use super::{Triangle, TriangleMesh};
use nalgebra::{Point3, Vector3};
use std::f32::consts::PI;

/// Geometric primitives
pub enum Primitive {
    Cube { size: Vector3<f32>, center: bool },
    Sphere { r: f32, fn_: u32 },
    Cylinder { h: f32, r: f32, fn_: u32 },
}

impl Primitive {
    pub fn cube(size: Vector3<f32>, center: bool) -> Self {
        Self::Cube { size, center }
    }

    pub fn sphere(r: f32, fn_: u32) -> Self {
        let segments = if fn_ > 0 { fn_.max(3) } else { 32 };
        Self::Sphere { r, fn_: segments }
    }

    pub fn cylinder(h: f32, r: f32, fn_: u32) -> Self {
        let segments = if fn_ > 0 { fn_.max(3) } else { 32 };
        Self::Cylinder {
            h,
            r,
            fn_: segments,
        }
    }

    pub fn to_mesh(&self) -> TriangleMesh {
        match self {
            Self::Cube { size, center } => generate_cube_mesh(*size, *center),
            Self::Sphere { r, fn_ } => generate_sphere_mesh(*r, *fn_),
            Self::Cylinder { h, r, fn_ } => generate_cylinder_mesh(*h, *r, *fn_),
        }
    }
}

fn generate_cube_mesh(size: Vector3<f32>, center: bool) -> TriangleMesh {
    let offset = if center { -size / 2.0 } else { Vector3::zeros() };
    let (min, max) = (Point3::from(offset), Point3::from(offset + size));

    // 8 corners of the cube
    let positions = [
        Point3::new(min.x, min.y, min.z),
        Point3::new(max.x, min.y, min.z),
        Point3::new(max.x, max.y, min.z),
        Point3::new(min.x, max.y, min.z),
        Point3::new(min.x, min.y, max.z),
        Point3::new(max.x, min.y, max.z),
        Point3::new(max.x, max.y, max.z),
        Point3::new(min.x, max.y, max.z),
    ];

    // 6 faces, two triangles each, outward winding
    let faces = [
        ([4, 5, 6], Vector3::z()),
        ([4, 6, 7], Vector3::z()),
        ([1, 0, 3], -Vector3::z()),
        ([1, 3, 2], -Vector3::z()),
        ([5, 1, 2], Vector3::x()),
        ([5, 2, 6], Vector3::x()),
        ([0, 4, 7], -Vector3::x()),
        ([0, 7, 3], -Vector3::x()),
        ([7, 6, 2], Vector3::y()),
        ([7, 2, 3], Vector3::y()),
        ([0, 1, 5], -Vector3::y()),
        ([0, 5, 4], -Vector3::y()),
    ];

    let triangles = faces
        .iter()
        .map(|(indices, normal)| Triangle::new(indices.map(|i| positions[i]), *normal))
        .collect();

    TriangleMesh::new(triangles)
}

fn generate_sphere_mesh(r: f32, segments: u32) -> TriangleMesh {
    let rings = (segments / 2).max(2);
    let point = |ring: u32, segment: u32| {
        let theta = PI * ring as f32 / rings as f32;
        let phi = 2.0 * PI * (segment % segments) as f32 / segments as f32;
        Point3::new(
            r * theta.sin() * phi.cos(),
            r * theta.sin() * phi.sin(),
            r * theta.cos(),
        )
    };

    let mut triangles = Vec::with_capacity((2 * segments * (rings - 1)) as usize);
    for ring in 0..rings {
        for segment in 0..segments {
            let (a, b) = (point(ring, segment), point(ring, segment + 1));
            let (c, d) = (point(ring + 1, segment), point(ring + 1, segment + 1));

            // Pole rings collapse one edge, so they only get a single triangle
            if ring != 0 {
                triangles.push(Triangle::from_points(a, c, b));
            }
            if ring != rings - 1 {
                triangles.push(Triangle::from_points(b, c, d));
            }
        }
    }

    TriangleMesh::new(triangles)
}

fn generate_cylinder_mesh(h: f32, r: f32, segments: u32) -> TriangleMesh {
    let rim = |segment: u32, z: f32| {
        let phi = 2.0 * PI * (segment % segments) as f32 / segments as f32;
        Point3::new(r * phi.cos(), r * phi.sin(), z)
    };
    let (bottom, top) = (Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, h));

    let mut triangles = Vec::with_capacity((4 * segments) as usize);
    for segment in 0..segments {
        let (b0, b1) = (rim(segment, 0.0), rim(segment + 1, 0.0));
        let (t0, t1) = (rim(segment, h), rim(segment + 1, h));

        triangles.push(Triangle::from_points(bottom, b1, b0));
        triangles.push(Triangle::from_points(top, t0, t1));
        triangles.push(Triangle::from_points(b0, b1, t1));
        triangles.push(Triangle::from_points(b0, t1, t0));
    }

    TriangleMesh::new(triangles)
}
