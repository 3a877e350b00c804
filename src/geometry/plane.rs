// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Horizontal plane / triangle intersection

use super::{Triangle, TriangleMesh};
use nalgebra::Point3;

/// Line segment where a triangle crosses a horizontal plane
pub type Segment = [Point3<f32>; 2];

/// Intersect one triangle with the plane `z = height`.
///
/// A corner counts as above the plane when its z is strictly greater than
/// `height`, so a triangle touching the plane with a single corner yields no
/// segment.
pub fn plane_triangle_intersection(triangle: &Triangle, height: f32) -> Option<Segment> {
    let [v0, v1, v2] = triangle.vertices;

    // Offsetting by the height turns the crossing test into a sign test
    let (a, b, c) = (v0.z - height, v1.z - height, v2.z - height);
    let (a_pos, b_pos, c_pos) = (a > 0.0, b > 0.0, c > 0.0);

    let mut out = [Point3::origin(); 2];
    let mut n = 0;

    let mut push_intersection = |a: f32, b: f32, v0: Point3<f32>, v1: Point3<f32>| {
        let t = a / (a - b);
        out[n] = v0 + (v1 - v0) * t;
        n += 1;
    };

    (a_pos ^ b_pos).then(|| push_intersection(a, b, v0, v1));
    (b_pos ^ c_pos).then(|| push_intersection(b, c, v1, v2));
    (c_pos ^ a_pos).then(|| push_intersection(c, a, v2, v0));

    (n == 2).then_some(out)
}

/// Every contour segment of the mesh at `z = height`, in triangle order
pub fn contour_segments(mesh: &TriangleMesh, height: f32) -> Vec<Segment> {
    mesh.triangles()
        .iter()
        .filter_map(|triangle| plane_triangle_intersection(triangle, height))
        .collect()
}
