// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Longest-axis midpoint splitting shared by the approximate and
//! hierarchical strategies

use super::ConvexPart;
use crate::error::{try_vec, Result};
use crate::geometry::TriangleMesh;
use tracing::trace;

/// Parts below this many triangles are never split
pub const MIN_SPLIT_TRIANGLES: usize = 10;

/// Split a part at the midpoint of its longest box axis.
///
/// Triangles whose centroid lies strictly below the midpoint go left. Either
/// side may come back empty.
pub(crate) fn split_part(
    mesh: &TriangleMesh,
    part: &ConvexPart,
) -> Result<(Vec<usize>, Vec<usize>)> {
    let axis = part.bounds.longest_axis();
    let mid = part.bounds.center()[axis];

    let mut left = try_vec(part.triangle_count())?;
    let mut right = try_vec(part.triangle_count())?;
    for &t in &part.triangles {
        if mesh.triangle(t).centroid()[axis] < mid {
            left.push(t);
        } else {
            right.push(t);
        }
    }

    trace!(
        axis,
        mid,
        left = left.len(),
        right = right.len(),
        "split part"
    );
    Ok((left, right))
}

/// Concavity-driven splitting bounded by `max_parts`
pub(crate) fn approximate(
    mesh: &TriangleMesh,
    all: Vec<usize>,
    max_parts: usize,
    concavity_tolerance: f32,
) -> Result<Vec<ConvexPart>> {
    let mut parts = Vec::new();
    let mut stack = vec![ConvexPart::new(mesh, all)];

    while let Some(part) = stack.pop() {
        // Splitting turns one pending part into two
        let room = parts.len() + stack.len() + 1 < max_parts;
        if !room
            || part.triangle_count() < MIN_SPLIT_TRIANGLES
            || part.concavity() <= concavity_tolerance
        {
            parts.try_reserve(1)?;
            parts.push(part);
            continue;
        }

        let (left, right) = split_part(mesh, &part)?;
        if left.is_empty() || right.is_empty() {
            parts.try_reserve(1)?;
            parts.push(part);
            continue;
        }

        stack.try_reserve(2)?;
        stack.push(ConvexPart::new(mesh, right));
        stack.push(ConvexPart::new(mesh, left));
    }

    Ok(parts)
}

/// Depth-driven splitting, concavity is ignored
pub(crate) fn hierarchical(
    mesh: &TriangleMesh,
    all: Vec<usize>,
    max_depth: usize,
) -> Result<Vec<ConvexPart>> {
    let mut parts = Vec::new();
    let mut stack = vec![(ConvexPart::new(mesh, all), 0)];

    while let Some((part, depth)) = stack.pop() {
        if depth >= max_depth || part.triangle_count() < MIN_SPLIT_TRIANGLES {
            parts.try_reserve(1)?;
            parts.push(part);
            continue;
        }

        let (left, right) = split_part(mesh, &part)?;
        stack.try_reserve(2)?;
        for half in [right, left] {
            if !half.is_empty() {
                stack.push((ConvexPart::new(mesh, half), depth + 1));
            }
        }
    }

    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use nalgebra::Vector3;

    fn grid() -> TriangleMesh {
        // 4 x 1 x 1 row of unit cubes, 48 triangles
        let cubes = (0..4).flat_map(|i| {
            Primitive::cube(Vector3::new(1.0, 1.0, 1.0), false)
                .to_mesh()
                .triangles()
                .iter()
                .map(|t| {
                    let mut t = *t;
                    t.vertices.iter_mut().for_each(|v| v.x += 2.0 * i as f32);
                    t
                })
                .collect::<Vec<_>>()
        });
        TriangleMesh::new(cubes.collect())
    }

    #[test]
    fn test_split_part_by_midpoint() {
        let mesh = grid();
        let part = ConvexPart::new(&mesh, (0..48).collect());
        let (left, right) = split_part(&mesh, &part).unwrap();

        // Box is [0, 7] along X, so the midpoint 3.5 separates two cubes each side
        assert_eq!(left, (0..24).collect::<Vec<_>>());
        assert_eq!(right, (24..48).collect::<Vec<_>>());
    }

    #[test]
    fn test_approximate_respects_max_parts() {
        let mesh = grid();
        for max_parts in 1..=6 {
            let parts = approximate(&mesh, (0..48).collect(), max_parts, 0.0).unwrap();
            assert!(parts.len() <= max_parts);
        }

        let parts = approximate(&mesh, (0..48).collect(), 4, 0.0).unwrap();
        assert_eq!(parts.len(), 4);
        // Left halves come out first
        assert!(parts[0].centroid.x < parts[1].centroid.x);
    }

    #[test]
    fn test_approximate_stops_below_tolerance() {
        let mesh = grid();
        let parts = approximate(&mesh, (0..48).collect(), 8, 1.0).unwrap();
        assert_eq!(parts.len(), 1);
    }

    #[test]
    fn test_hierarchical_depth() {
        let mesh = grid();
        assert_eq!(hierarchical(&mesh, (0..48).collect(), 0).unwrap().len(), 1);
        assert_eq!(hierarchical(&mesh, (0..48).collect(), 1).unwrap().len(), 2);

        // Single cubes hold 12 triangles and split once more into faces
        let deep = hierarchical(&mesh, (0..48).collect(), 8).unwrap();
        assert!(deep.iter().all(|p| p.triangle_count() < MIN_SPLIT_TRIANGLES));
        assert_eq!(deep.iter().map(|p| p.triangle_count()).sum::<usize>(), 48);
    }
}
