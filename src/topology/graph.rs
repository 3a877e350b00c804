// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Connectivity reconstructed from a triangle soup
//!
//! Corners are welded into unique vertices within a tolerance, then the three
//! edges of every triangle are matched on their unordered vertex pair.

use crate::error::{try_vec, MeshError, Result};
use crate::geometry::TriangleMesh;
use ahash::AHashMap;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Unique welded position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Point3<f32>,
    /// Unique neighbour vertices, in discovery order
    pub adjacent: Vec<usize>,
    /// Incident triangles, ascending
    pub triangles: Vec<usize>,
    pub curvature: f32,
}

impl Vertex {
    fn new(position: Point3<f32>) -> Self {
        Self {
            position,
            adjacent: Vec::new(),
            triangles: Vec::new(),
            curvature: 0.0,
        }
    }

    /// Number of incident triangles
    pub fn valence(&self) -> usize {
        self.triangles.len()
    }
}

/// Undirected edge between two welded vertices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub vertices: [usize; 2],
    pub first_triangle: usize,
    /// Absent for boundary edges
    pub second_triangle: Option<usize>,
    /// Every triangle using this edge; above 2 the edge is non-manifold
    pub incident_count: usize,
    pub length: f32,
    /// Angle between the unit normals of the first two triangles, radians
    pub dihedral_angle: f32,
}

impl Edge {
    pub fn is_boundary(&self) -> bool {
        self.second_triangle.is_none()
    }

    pub fn is_non_manifold(&self) -> bool {
        self.incident_count > 2
    }
}

/// Triangle expressed over welded vertices and matched edges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyTriangle {
    pub vertices: [usize; 3],
    pub edges: [usize; 3],
    pub area: f32,
    /// Unit geometric normal, zero for degenerate triangles
    pub normal: Vector3<f32>,
    /// Shortest over longest edge; 0 when every edge has zero length
    pub aspect_ratio: f32,
}

type Cell = (i64, i64, i64);

/// Tolerance-based vertex deduplication backed by a spatial hash.
///
/// Cells are one tolerance wide, so every accepted vertex closer than the
/// tolerance to a query lies in one of the 27 cells around it. Among those
/// the lowest index wins, which makes the result independent of hashing.
#[derive(Debug, Clone)]
pub struct VertexWelder {
    tolerance: f32,
    positions: Vec<Point3<f32>>,
    cells: AHashMap<Cell, Vec<usize>>,
}

impl VertexWelder {
    pub fn new(tolerance: f32) -> Result<Self> {
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(MeshError::invalid(
                "weld_tolerance",
                format!("must be positive and finite, got {tolerance}"),
            ));
        }
        Ok(Self {
            tolerance,
            positions: Vec::new(),
            cells: AHashMap::new(),
        })
    }

    /// Saturates for coordinates beyond the `i64` cell range
    fn cell(&self, point: &Point3<f32>) -> Cell {
        let coord = |v: f32| (f64::from(v) / f64::from(self.tolerance)).floor() as i64;
        (coord(point.x), coord(point.y), coord(point.z))
    }

    /// Index of the lowest accepted vertex within tolerance, if any
    pub fn find(&self, point: &Point3<f32>) -> Option<usize> {
        let (cx, cy, cz) = self.cell(point);
        let mut best: Option<usize> = None;

        // Neighbours past the ends of the cell range do not exist
        let around = |c: i64| (-1..=1).filter_map(move |d: i64| c.checked_add(d));

        for x in around(cx) {
            for y in around(cy) {
                for z in around(cz) {
                    let Some(bucket) = self.cells.get(&(x, y, z)) else {
                        continue;
                    };
                    for &index in bucket {
                        if nalgebra::distance(&self.positions[index], point) < self.tolerance
                            && best.map_or(true, |b| index < b)
                        {
                            best = Some(index);
                        }
                    }
                }
            }
        }

        best
    }

    /// Index of the welded vertex for `point`, accepting it when new
    pub fn insert(&mut self, point: Point3<f32>) -> Result<usize> {
        if let Some(index) = self.find(&point) {
            return Ok(index);
        }

        let index = self.positions.len();
        self.positions.try_reserve(1)?;
        self.positions.push(point);
        let cell = self.cell(&point);
        self.cells.entry(cell).or_default().push(index);
        Ok(index)
    }

    pub fn positions(&self) -> &[Point3<f32>] {
        &self.positions
    }

    pub fn into_positions(self) -> Vec<Point3<f32>> {
        self.positions
    }
}

/// Weld `points`, returning the unique positions and the index of each input
pub fn weld_vertices(
    points: &[Point3<f32>],
    tolerance: f32,
) -> Result<(Vec<Point3<f32>>, Vec<usize>)> {
    let mut welder = VertexWelder::new(tolerance)?;
    let mut indices = try_vec(points.len())?;
    for point in points {
        indices.push(welder.insert(*point)?);
    }
    Ok((welder.into_positions(), indices))
}

/// Vertices, edges and triangles of a welded mesh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyGraph {
    pub vertices: Vec<Vertex>,
    pub edges: Vec<Edge>,
    pub triangles: Vec<TopologyTriangle>,
    /// Triangles with zero area
    pub degenerate_triangles: usize,
    /// Edges whose endpoints welded together or coincide
    pub zero_length_edges: usize,
}

impl TopologyGraph {
    pub fn build(mesh: &TriangleMesh, tolerance: f32) -> Result<Self> {
        let mut welder = VertexWelder::new(tolerance)?;
        let mut corners = try_vec(mesh.triangle_count())?;
        for triangle in mesh.triangles() {
            let [a, b, c] = triangle.vertices;
            corners.push([welder.insert(a)?, welder.insert(b)?, welder.insert(c)?]);
        }

        let mut vertices = try_vec(welder.positions().len())?;
        vertices.extend(welder.into_positions().into_iter().map(Vertex::new));

        let mut edges: Vec<Edge> = try_vec(mesh.triangle_count() * 3 / 2 + 1)?;
        let mut edge_lookup: AHashMap<(usize, usize), usize> = AHashMap::new();
        let mut triangles = try_vec(mesh.triangle_count())?;
        let mut degenerate_triangles = 0;

        for (index, (triangle, corner)) in mesh.triangles().iter().zip(&corners).enumerate() {
            let normal = triangle.unit_normal();
            let mut edge_ids = [0; 3];

            for (slot, (i, j)) in [(0, 1), (1, 2), (2, 0)].into_iter().enumerate() {
                let (a, b) = (corner[i], corner[j]);
                let key = (a.min(b), a.max(b));

                edge_ids[slot] = match edge_lookup.get(&key) {
                    Some(&id) => {
                        let edge = &mut edges[id];
                        edge.incident_count += 1;
                        if edge.second_triangle.is_none() {
                            let first = mesh.triangle(edge.first_triangle).unit_normal();
                            edge.second_triangle = Some(index);
                            edge.dihedral_angle = first.dot(&normal).clamp(-1.0, 1.0).acos();
                        }
                        id
                    }
                    None => {
                        let id = edges.len();
                        edges.try_reserve(1)?;
                        edges.push(Edge {
                            vertices: [key.0, key.1],
                            first_triangle: index,
                            second_triangle: None,
                            incident_count: 1,
                            length: nalgebra::distance(&triangle.vertices[i], &triangle.vertices[j]),
                            dihedral_angle: 0.0,
                        });
                        edge_lookup.insert(key, id);
                        id
                    }
                };

                if a != b {
                    for (from, to) in [(a, b), (b, a)] {
                        let adjacent = &mut vertices[from].adjacent;
                        if !adjacent.contains(&to) {
                            adjacent.push(to);
                        }
                    }
                }
            }

            for (k, &v) in corner.iter().enumerate() {
                // A corner welded onto an earlier corner of the same triangle
                if !corner[..k].contains(&v) {
                    vertices[v].triangles.push(index);
                }
            }

            let area = triangle.area();
            if area == 0.0 {
                degenerate_triangles += 1;
            }

            let lengths = triangle.edge_lengths();
            let (min, max) = lengths
                .iter()
                .fold((f32::INFINITY, 0.0f32), |(lo, hi), &l| (lo.min(l), hi.max(l)));

            triangles.push(TopologyTriangle {
                vertices: *corner,
                edges: edge_ids,
                area,
                normal,
                aspect_ratio: if max > 0.0 { min / max } else { 0.0 },
            });
        }

        let zero_length_edges = edges
            .iter()
            .filter(|e| e.vertices[0] == e.vertices[1] || e.length == 0.0)
            .count();

        Ok(Self {
            vertices,
            edges,
            triangles,
            degenerate_triangles,
            zero_length_edges,
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn boundary_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|e| e.is_boundary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Primitive, Triangle};
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    const TOLERANCE: f32 = 1e-6;

    #[test]
    fn test_cube_graph() {
        let mesh = Primitive::cube(Vector3::new(1.0, 1.0, 1.0), false).to_mesh();
        let graph = TopologyGraph::build(&mesh, TOLERANCE).unwrap();

        assert_eq!(graph.vertex_count(), 8);
        assert_eq!(graph.edge_count(), 18);
        assert_eq!(graph.boundary_edges().count(), 0);
        assert!(graph.edges.iter().all(|e| e.incident_count == 2));
        assert_eq!(graph.degenerate_triangles, 0);

        let valence: usize = graph.vertices.iter().map(Vertex::valence).sum();
        assert_eq!(valence, 36);
    }

    #[test]
    fn test_dihedral_angles() {
        let mesh = Primitive::cube(Vector3::new(1.0, 1.0, 1.0), false).to_mesh();
        let graph = TopologyGraph::build(&mesh, TOLERANCE).unwrap();

        // 12 cube edges fold by 90 degrees, 6 face diagonals are flat
        let folded = graph
            .edges
            .iter()
            .filter(|e| (e.dihedral_angle - FRAC_PI_2).abs() < 1e-4)
            .count();
        let flat = graph
            .edges
            .iter()
            .filter(|e| e.dihedral_angle.abs() < 1e-4)
            .count();
        assert_eq!((folded, flat), (12, 6));
    }

    #[test]
    fn test_open_triangle() {
        let tri = Triangle::from_points(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        let graph = TopologyGraph::build(&TriangleMesh::new(vec![tri]), TOLERANCE).unwrap();

        assert_eq!(graph.boundary_edges().count(), 3);
        assert!(graph.vertices.iter().all(|v| v.adjacent.len() == 2));
        assert_relative_eq!(graph.triangles[0].aspect_ratio, 1.0 / 2.0f32.sqrt());
    }

    #[test]
    fn test_non_manifold_edge() {
        let (a, b) = (Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0));
        let fins = [
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, -1.0, 0.0),
            Point3::new(0.5, 0.0, 1.0),
        ];
        let mesh = TriangleMesh::new(fins.iter().map(|&c| Triangle::from_points(a, b, c)).collect());
        let graph = TopologyGraph::build(&mesh, TOLERANCE).unwrap();

        let shared = &graph.edges[graph.triangles[0].edges[0]];
        assert_eq!(shared.incident_count, 3);
        assert_eq!(shared.second_triangle, Some(1));
        assert!(shared.is_non_manifold() && !shared.is_boundary());
    }

    #[test]
    fn test_degenerate_triangle() {
        let p = Point3::new(1.0, 1.0, 1.0);
        let mesh = TriangleMesh::new(vec![Triangle::from_points(p, p, p)]);
        let graph = TopologyGraph::build(&mesh, TOLERANCE).unwrap();

        assert_eq!(graph.vertex_count(), 1);
        assert_eq!(graph.vertices[0].valence(), 1);
        assert_eq!(graph.degenerate_triangles, 1);
        assert_eq!(graph.zero_length_edges, 1);
        assert_eq!(graph.triangles[0].aspect_ratio, 0.0);
    }

    #[test]
    fn test_weld_lowest_index_wins() {
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(4e-7, 0.0, 0.0),
            Point3::new(1.0, 5e-7, 0.0),
        ];
        let (unique, indices) = weld_vertices(&points, TOLERANCE).unwrap();

        assert_eq!(unique.len(), 2);
        assert_eq!(indices, vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_weld_idempotent() {
        let points: Vec<_> = (0..50)
            .map(|i| Point3::new(i as f32 * 0.1, (i % 7) as f32, (i % 3) as f32))
            .collect();
        let (once, _) = weld_vertices(&points, TOLERANCE).unwrap();
        let (twice, indices) = weld_vertices(&once, TOLERANCE).unwrap();

        assert_eq!(once, twice);
        assert_eq!(indices, (0..once.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_weld_far_from_origin() {
        let mut welder = VertexWelder::new(TOLERANCE).unwrap();
        let far = Point3::new(1e13, 0.0, 0.0);

        assert_eq!(welder.insert(far).unwrap(), 0);
        assert_eq!(welder.insert(Point3::new(1e13, 1.0, 0.0)).unwrap(), 1);
        assert_eq!(welder.insert(far).unwrap(), 0);
        assert_eq!(welder.insert(Point3::new(-1e30, -1e30, 1e30)).unwrap(), 2);
        assert!(welder.insert(Point3::new(f32::INFINITY, 0.0, 0.0)).is_ok());
        assert!(welder.insert(Point3::new(f32::NEG_INFINITY, 0.0, 0.0)).is_ok());
    }

    #[test]
    fn test_invalid_tolerance() {
        assert!(VertexWelder::new(0.0).is_err());
        assert!(VertexWelder::new(f32::NAN).is_err());
    }
}
