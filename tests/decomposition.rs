// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Convex decomposition properties across strategies

use anyhow::Result;
use meshprep::decompose::{
    decompose, grid_dimensions, Cell, DecompositionParams, DecompositionStrategy, VoxelGrid,
    VOLUME_PER_TRIANGLE,
};
use meshprep::geometry::{Primitive, Triangle, TriangleMesh};
use meshprep::MeshError;
use nalgebra::{Point3, Vector3};
use std::collections::HashMap;

/// Sphere and cube side by side along X
fn scene() -> TriangleMesh {
    let mut triangles = Primitive::sphere(2.0, 16).to_mesh().triangles().to_vec();
    let offset = Vector3::new(6.0, 0.0, 0.0);
    triangles.extend(
        Primitive::cube(Vector3::new(2.0, 2.0, 2.0), true)
            .to_mesh()
            .triangles()
            .iter()
            .map(|t| Triangle::new(t.vertices.map(|v| v + offset), t.normal)),
    );
    TriangleMesh::new(triangles)
}

const STRATEGIES: [DecompositionStrategy; 4] = [
    DecompositionStrategy::Approximate,
    DecompositionStrategy::Exact,
    DecompositionStrategy::Hierarchical,
    DecompositionStrategy::Voxel,
];

#[test]
fn test_parts_partition_the_mesh() -> Result<()> {
    let mesh = scene();
    let all: Vec<usize> = (0..mesh.triangle_count()).collect();

    for strategy in STRATEGIES {
        let params = DecompositionParams {
            min_triangles_per_voxel: 4,
            ..DecompositionParams::with_strategy(strategy)
        };
        let result = decompose(&mesh, &params)?;
        let covered = result.covered_triangles();

        let mut unique = covered.clone();
        unique.dedup();
        assert_eq!(unique, covered, "{strategy:?} assigned a triangle twice");

        if strategy == DecompositionStrategy::Voxel {
            assert_eq!(covered.len() + result.dropped_triangles, all.len());
            assert!(result.parts.iter().all(|p| p.triangle_count() >= 4));

            // Every omitted triangle sits in a voxel below the threshold
            let grid = VoxelGrid::new(&mesh, params.voxel_size)?;
            let cell_of = |t: usize| grid.cell_of(&mesh.triangle(t).centroid());
            let mut occupancy: HashMap<Cell, usize> = HashMap::new();
            for &t in &all {
                *occupancy.entry(cell_of(t)).or_default() += 1;
            }
            let omitted: Vec<usize> = all
                .iter()
                .copied()
                .filter(|t| covered.binary_search(t).is_err())
                .collect();
            assert_eq!(omitted.len(), result.dropped_triangles);
            for t in omitted {
                assert!(occupancy[&cell_of(t)] < params.min_triangles_per_voxel);
            }
        } else {
            assert_eq!(covered, all, "{strategy:?} lost triangles");
            assert_eq!(result.dropped_triangles, 0);
        }
        assert_eq!(result.strategy, strategy);
    }
    Ok(())
}

#[test]
fn test_part_count_bounded_by_max_parts() -> Result<()> {
    let mesh = scene();
    for max_parts in [1, 2, 3, 5, 8] {
        for tolerance in [0.0, 0.1, 10.0] {
            let params = DecompositionParams {
                max_parts,
                concavity_tolerance: tolerance,
                ..DecompositionParams::default()
            };
            let result = decompose(&mesh, &params)?;
            assert!(result.part_count() <= max_parts);
            assert!(result.part_count() >= 1);
        }
    }
    Ok(())
}

#[test]
fn test_single_part_holds_everything() -> Result<()> {
    let mesh = scene();
    let params = DecompositionParams {
        max_parts: 1,
        concavity_tolerance: 0.0,
        ..DecompositionParams::default()
    };
    let result = decompose(&mesh, &params)?;

    assert_eq!(result.part_count(), 1);
    assert_eq!(result.parts[0].triangle_count(), mesh.triangle_count());
    assert_eq!(result.quality, 1.0);
    assert!(result.meets_quality());
    Ok(())
}

#[test]
fn test_coarse_voxel_grid() -> Result<()> {
    let mesh = Primitive::cube(Vector3::new(1.0, 1.0, 1.0), false).to_mesh();
    assert_eq!(grid_dimensions(&mesh, 2.0)?, [1, 1, 1]);

    let params = DecompositionParams {
        voxel_size: 2.0,
        min_triangles_per_voxel: 1,
        ..DecompositionParams::with_strategy(DecompositionStrategy::Voxel)
    };
    let result = decompose(&mesh, &params)?;

    assert_eq!(result.part_count(), 1);
    assert_eq!(result.parts[0].triangle_count(), 12);
    assert!((result.total_volume - 12.0 * VOLUME_PER_TRIANGLE).abs() < 1e-6);
    Ok(())
}

#[test]
fn test_tiny_voxel_size_is_rejected() {
    let mesh = TriangleMesh::new(vec![Triangle::from_points(
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
    )]);
    let params = DecompositionParams {
        voxel_size: 1e-30,
        min_triangles_per_voxel: 1,
        ..DecompositionParams::with_strategy(DecompositionStrategy::Voxel)
    };
    assert!(matches!(
        decompose(&mesh, &params),
        Err(MeshError::InvalidParameter {
            name: "voxel_size",
            ..
        })
    ));
}

#[test]
fn test_hierarchical_respects_depth() -> Result<()> {
    let mesh = scene();
    for max_depth in 0..4 {
        let params = DecompositionParams {
            max_depth,
            ..DecompositionParams::with_strategy(DecompositionStrategy::Hierarchical)
        };
        let result = decompose(&mesh, &params)?;
        assert!(result.part_count() <= 1 << max_depth);
    }
    Ok(())
}

#[test]
fn test_invalid_params() {
    let mesh = scene();
    let zero_parts = DecompositionParams {
        max_parts: 0,
        ..DecompositionParams::default()
    };
    assert!(matches!(
        decompose(&mesh, &zero_parts),
        Err(MeshError::InvalidParameter { name: "max_parts", .. })
    ));

    let bad_voxel = DecompositionParams {
        voxel_size: 0.0,
        ..DecompositionParams::with_strategy(DecompositionStrategy::Voxel)
    };
    assert!(decompose(&mesh, &bad_voxel).is_err());

    let empty = TriangleMesh::empty();
    assert!(matches!(
        decompose(&empty, &DecompositionParams::default()),
        Err(MeshError::EmptyMesh)
    ));
}
