// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Bounding Volume Hierarchy (BVH) over the triangles of a mesh
//!
//! Nodes live in a flat arena and refer to their children by index. The tree
//! is partitioned with a fixed round-robin axis (`depth % 3`) and a median
//! split, and is built with an explicit work stack so pathological inputs
//! cannot exhaust the call stack.

use crate::accel::Executor;
use crate::error::{try_vec, MeshError, Result};
use crate::geometry::{BoundingBox, TriangleMesh};
use nalgebra::Point3;
use std::fmt;
use tracing::{debug, trace};

/// Hard cap on tree depth; nodes at this depth become leaves regardless of size
pub const MAX_DEPTH: usize = 20;

/// BVH node
#[derive(Debug, Clone, PartialEq)]
pub enum BvhNode {
    Leaf {
        triangles: Vec<usize>,
        bounds: BoundingBox,
    },
    Internal {
        left: usize,
        right: usize,
        bounds: BoundingBox,
    },
}

impl BvhNode {
    pub fn bounds(&self) -> &BoundingBox {
        match self {
            BvhNode::Leaf { bounds, .. } | BvhNode::Internal { bounds, .. } => bounds,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, BvhNode::Leaf { .. })
    }

    /// Triangle indices of a leaf; empty for internal nodes
    pub fn triangles(&self) -> &[usize] {
        match self {
            BvhNode::Leaf { triangles, .. } => triangles,
            BvhNode::Internal { .. } => &[],
        }
    }

    /// Arena indices of the two children of an internal node
    pub fn children(&self) -> Option<(usize, usize)> {
        match self {
            BvhNode::Internal { left, right, .. } => Some((*left, *right)),
            BvhNode::Leaf { .. } => None,
        }
    }

    fn placeholder() -> Self {
        BvhNode::Leaf {
            triangles: Vec::new(),
            bounds: BoundingBox::empty(),
        }
    }
}

enum Task {
    Build {
        slot: usize,
        triangles: Vec<usize>,
        depth: usize,
    },
    Join {
        slot: usize,
        left: usize,
        right: usize,
    },
}

/// Bounding Volume Hierarchy for triangle meshes
#[derive(Debug, Clone)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    max_triangles_per_leaf: usize,
    depth: usize,
    triangle_count: usize,
}

impl Bvh {
    /// Build a BVH sequentially
    pub fn build(mesh: &TriangleMesh, max_triangles_per_leaf: usize) -> Result<Self> {
        Self::build_with(mesh, max_triangles_per_leaf, &Executor::cpu())
    }

    /// Build a BVH, letting the executor's accelerator sort the split keys
    pub fn build_with(
        mesh: &TriangleMesh,
        max_triangles_per_leaf: usize,
        executor: &Executor,
    ) -> Result<Self> {
        if mesh.is_empty() {
            return Err(MeshError::EmptyMesh);
        }
        if max_triangles_per_leaf == 0 {
            return Err(MeshError::invalid(
                "max_triangles_per_leaf",
                "must be at least 1",
            ));
        }

        let count = mesh.triangle_count();
        debug!(triangles = count, max_triangles_per_leaf, "building BVH");

        let mut centroids: Vec<Point3<f32>> = try_vec(count)?;
        centroids.extend(mesh.triangles().iter().map(|t| t.centroid()));

        let mut all = try_vec(count)?;
        all.extend(0..count);

        let mut nodes = try_vec(2 * count / max_triangles_per_leaf.max(1) + 1)?;
        nodes.push(BvhNode::placeholder());

        let mut depth = 0;
        let mut stack = vec![Task::Build {
            slot: 0,
            triangles: all,
            depth: 0,
        }];

        while let Some(task) = stack.pop() {
            match task {
                Task::Build {
                    slot,
                    mut triangles,
                    depth: level,
                } => {
                    if triangles.len() <= max_triangles_per_leaf || level >= MAX_DEPTH {
                        depth = depth.max(level);
                        let bounds = mesh.bounds_of(&triangles);
                        nodes[slot] = BvhNode::Leaf { triangles, bounds };
                        continue;
                    }

                    let axis = level % 3;
                    executor
                        .try_accelerated(count, "sort_by_axis", |accel| {
                            accel.try_sort_by_axis(&centroids, &mut triangles, axis)
                        })
                        .unwrap_or_else(|| sort_by_axis(&centroids, &mut triangles, axis));

                    let right_half = triangles.split_off(triangles.len() / 2);
                    trace!(
                        level,
                        axis,
                        left = triangles.len(),
                        right = right_half.len(),
                        "splitting node"
                    );

                    nodes.try_reserve(2)?;
                    let (left, right) = (nodes.len(), nodes.len() + 1);
                    nodes.push(BvhNode::placeholder());
                    nodes.push(BvhNode::placeholder());

                    // Join runs after both subtrees, the left subtree first
                    stack.try_reserve(3)?;
                    stack.push(Task::Join { slot, left, right });
                    stack.push(Task::Build {
                        slot: right,
                        triangles: right_half,
                        depth: level + 1,
                    });
                    stack.push(Task::Build {
                        slot: left,
                        triangles,
                        depth: level + 1,
                    });
                }
                Task::Join { slot, left, right } => {
                    let bounds = nodes[left].bounds().union(nodes[right].bounds());
                    nodes[slot] = BvhNode::Internal {
                        left,
                        right,
                        bounds,
                    };
                }
            }
        }

        let bvh = Self {
            nodes,
            max_triangles_per_leaf,
            depth,
            triangle_count: count,
        };
        debug!(
            nodes = bvh.node_count(),
            leaves = bvh.leaf_count(),
            depth = bvh.depth,
            "BVH built"
        );
        Ok(bvh)
    }

    /// Arena index of the root, always 0
    pub fn root(&self) -> usize {
        0
    }

    pub fn node(&self, index: usize) -> &BvhNode {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    pub fn bounds(&self) -> &BoundingBox {
        self.nodes[self.root()].bounds()
    }

    pub fn leaves(&self) -> impl Iterator<Item = &BvhNode> {
        self.nodes.iter().filter(|node| node.is_leaf())
    }

    /// Depth of the deepest leaf; 0 when the root is a leaf
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().count()
    }

    pub fn max_triangles_per_leaf(&self) -> usize {
        self.max_triangles_per_leaf
    }

    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }

    /// Triangles whose own bounds intersect `region`, ascending and unique
    pub fn query_region(&self, mesh: &TriangleMesh, region: &BoundingBox) -> Vec<usize> {
        let mut result = Vec::new();
        let mut stack = vec![self.root()];

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if !node.bounds().intersects(region) {
                continue;
            }

            match node {
                BvhNode::Leaf { triangles, .. } => result.extend(
                    triangles
                        .iter()
                        .copied()
                        .filter(|&t| mesh.triangle(t).bounding_box().intersects(region)),
                ),
                BvhNode::Internal { left, right, .. } => {
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }

        result.sort_unstable();
        result.dedup();
        result
    }

    /// Check the structural invariants against the mesh the tree was built from.
    ///
    /// Internal bounds must equal the union of their children, leaf bounds the
    /// extent of their triangles, leaves must respect the size limit unless at
    /// [`MAX_DEPTH`], and every triangle must sit in exactly one leaf.
    pub fn validate(&self, mesh: &TriangleMesh) -> bool {
        if mesh.triangle_count() != self.triangle_count {
            return false;
        }

        let mut seen = vec![false; self.triangle_count];
        let mut stack = vec![(self.root(), 0)];

        while let Some((index, level)) = stack.pop() {
            match &self.nodes[index] {
                BvhNode::Leaf { triangles, bounds } => {
                    if triangles.len() > self.max_triangles_per_leaf && level < MAX_DEPTH {
                        return false;
                    }
                    if *bounds != mesh.bounds_of(triangles) {
                        return false;
                    }
                    for &t in triangles {
                        if t >= seen.len() || seen[t] {
                            return false;
                        }
                        seen[t] = true;
                    }
                }
                BvhNode::Internal {
                    left,
                    right,
                    bounds,
                } => {
                    let union = self.nodes[*left].bounds().union(self.nodes[*right].bounds());
                    if *bounds != union {
                        return false;
                    }
                    stack.push((*left, level + 1));
                    stack.push((*right, level + 1));
                }
            }
        }

        seen.into_iter().all(|s| s)
    }
}

/// Stable sort of triangle indices by centroid coordinate
pub(crate) fn sort_by_axis(centroids: &[Point3<f32>], triangles: &mut [usize], axis: usize) {
    triangles.sort_by(|&a, &b| centroids[a][axis].total_cmp(&centroids[b][axis]));
}

impl fmt::Display for Bvh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "BVH: {} triangles, {} nodes, {} leaves, depth {}",
            self.triangle_count,
            self.node_count(),
            self.leaf_count(),
            self.depth
        )?;

        let mut stack = vec![(self.root(), 0)];
        while let Some((index, level)) = stack.pop() {
            let indent = "  ".repeat(level);
            match &self.nodes[index] {
                BvhNode::Leaf { triangles, bounds } => {
                    writeln!(f, "{indent}leaf [{} triangles] {bounds}", triangles.len())?
                }
                BvhNode::Internal {
                    left,
                    right,
                    bounds,
                } => {
                    writeln!(f, "{indent}node {bounds}")?;
                    stack.push((*right, level + 1));
                    stack.push((*left, level + 1));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Primitive, Triangle};
    use nalgebra::Vector3;

    fn unit_cube() -> TriangleMesh {
        Primitive::cube(Vector3::new(1.0, 1.0, 1.0), false).to_mesh()
    }

    #[test]
    fn test_bvh_build() {
        let mesh = unit_cube();
        let bvh = Bvh::build(&mesh, 2).unwrap();

        assert_eq!(bvh.bounds().to_array(), [0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        assert!(bvh.leaves().all(|leaf| leaf.triangles().len() <= 2));
        assert!(bvh.validate(&mesh));
    }

    #[test]
    fn test_single_leaf() {
        let mesh = unit_cube();
        let bvh = Bvh::build(&mesh, 12).unwrap();

        assert_eq!(bvh.node_count(), 1);
        assert_eq!(bvh.depth(), 0);
        assert_eq!(bvh.node(bvh.root()).triangles().len(), 12);
    }

    #[test]
    fn test_median_split_sizes() {
        let mesh = unit_cube();
        let bvh = Bvh::build(&mesh, 3).unwrap();

        // 12 triangles split 6/6 then 3/3 on every branch
        assert_eq!(bvh.leaf_count(), 4);
        assert_eq!(bvh.depth(), 2);
        assert!(bvh.leaves().all(|leaf| leaf.triangles().len() == 3));
    }

    #[test]
    fn test_identical_centroids() {
        // Equal sort keys still split by index position
        let tri = Triangle::from_points(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        let mesh = TriangleMesh::new(vec![tri; 64]);
        let bvh = Bvh::build(&mesh, 1).unwrap();

        assert_eq!(bvh.depth(), 6);
        assert_eq!(bvh.leaf_count(), 64);
        assert!(bvh.validate(&mesh));
    }

    #[test]
    fn test_invalid_input() {
        assert!(matches!(
            Bvh::build(&TriangleMesh::empty(), 4),
            Err(MeshError::EmptyMesh)
        ));
        assert!(matches!(
            Bvh::build(&unit_cube(), 0),
            Err(MeshError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_bvh_query() {
        let mesh = Primitive::cube(Vector3::new(10.0, 10.0, 10.0), false).to_mesh();
        let bvh = Bvh::build(&mesh, 2).unwrap();

        let all = bvh.query_region(&mesh, &mesh.bounding_box());
        assert_eq!(all, (0..12).collect::<Vec<_>>());

        // A thin slab just inside the top face only touches the top triangles
        // and the side triangles reaching z = 10
        let slab = BoundingBox::from_array([1.0, 1.0, 9.9, 9.0, 9.0, 11.0]);
        let hits = bvh.query_region(&mesh, &slab);
        assert!(hits.contains(&0) && hits.contains(&1));
        assert!(!hits.contains(&2) && !hits.contains(&3));

        let outside = BoundingBox::from_array([20.0, 20.0, 20.0, 30.0, 30.0, 30.0]);
        assert!(bvh.query_region(&mesh, &outside).is_empty());
    }

    #[test]
    fn test_display() {
        let bvh = Bvh::build(&unit_cube(), 6).unwrap();
        let dump = bvh.to_string();

        assert!(dump.starts_with("BVH: 12 triangles, 3 nodes, 2 leaves, depth 1"));
        assert_eq!(dump.matches("leaf [6 triangles]").count(), 2);
    }
}
