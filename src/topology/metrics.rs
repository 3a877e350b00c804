// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Per-element metrics and the analysis blocks aggregated from them

use super::{TopologyGraph, TopologyThresholds};
use crate::geometry::{Triangle, TriangleMesh};
use crate::utils::math::deg_to_rad;
use crate::utils::Stats;
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_3;
use std::fmt;

/// Mean over incident triangles of the unit normal's length
pub fn vertex_curvature(mesh: &TriangleMesh, graph: &TopologyGraph, vertex: usize) -> f32 {
    let triangles = &graph.vertices[vertex].triangles;
    if triangles.is_empty() {
        return 0.0;
    }
    let total: f32 = triangles
        .iter()
        .map(|&t| mesh.triangle(t).unit_normal().norm())
        .sum();
    total / triangles.len() as f32
}

/// `area / perimeter^2`, 0 for a zero perimeter
pub fn triangle_curvature(triangle: &Triangle) -> f32 {
    let perimeter = triangle.perimeter();
    if perimeter > 0.0 {
        triangle.area() / (perimeter * perimeter)
    } else {
        0.0
    }
}

/// Inverse area, 0 for degenerate triangles
pub fn triangle_density(area: f32) -> f32 {
    if area > 0.0 {
        1.0 / area
    } else {
        0.0
    }
}

/// Interior angle at corner `i`, radians; 0 when an adjacent edge is degenerate
fn interior_angle(triangle: &Triangle, i: usize) -> f32 {
    let v = triangle.vertices;
    let (a, b) = (v[(i + 1) % 3] - v[i], v[(i + 2) % 3] - v[i]);
    let denom = a.norm() * b.norm();
    if denom > 0.0 {
        (a.dot(&b) / denom).clamp(-1.0, 1.0).acos()
    } else {
        0.0
    }
}

/// Mean of the edge-length ratio and the product of the angle deviations from 60°
pub fn triangle_quality(triangle: &Triangle) -> f32 {
    let lengths = triangle.edge_lengths();
    let max = lengths.iter().copied().fold(0.0f32, f32::max);
    let min = lengths.iter().copied().fold(f32::INFINITY, f32::min);
    let ratio = if max > 0.0 { min / max } else { 0.0 };

    let angle_quality: f32 = (0..3)
        .map(|i| 1.0 - (interior_angle(triangle, i) - FRAC_PI_3).abs() / FRAC_PI_3)
        .product();

    (ratio + angle_quality) / 2.0
}

pub fn vertex_curvatures(mesh: &TriangleMesh, graph: &TopologyGraph) -> Vec<f32> {
    (0..graph.vertex_count())
        .map(|v| vertex_curvature(mesh, graph, v))
        .collect()
}

pub fn triangle_curvatures(mesh: &TriangleMesh) -> Vec<f32> {
    mesh.triangles().iter().map(triangle_curvature).collect()
}

/// Boundary and manifold statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityAnalysis {
    pub boundary_edges: usize,
    pub non_manifold_edges: usize,
    pub non_manifold_vertices: usize,
    pub isolated_vertices: usize,
    /// Total adjacency entries over `6 * vertex count`
    pub score: f32,
}

impl ConnectivityAnalysis {
    pub fn compute(graph: &TopologyGraph, thresholds: &TopologyThresholds) -> Self {
        let connections: usize = graph.vertices.iter().map(|v| v.adjacent.len()).sum();
        Self {
            boundary_edges: graph.boundary_edges().count(),
            non_manifold_edges: graph.edges.iter().filter(|e| e.is_non_manifold()).count(),
            non_manifold_vertices: graph
                .vertices
                .iter()
                .filter(|v| v.valence() > thresholds.non_manifold_valence)
                .count(),
            isolated_vertices: graph.vertices.iter().filter(|v| v.valence() == 0).count(),
            score: connectivity_score(connections, graph.vertex_count()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.boundary_edges == 0
    }
}

pub(crate) fn connectivity_score(connections: usize, vertices: usize) -> f32 {
    if vertices == 0 {
        return 0.0;
    }
    connections as f32 / (vertices as f32 * 6.0)
}

/// Curvature proxies per vertex and per triangle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurvatureAnalysis {
    pub vertex_curvature: Vec<f32>,
    pub triangle_curvature: Vec<f32>,
    /// Aggregates over `vertex_curvature`
    pub mean: f32,
    pub min: f32,
    pub max: f32,
    pub variance: f32,
    /// Vertices above `mean + stddev`
    pub high_curvature_regions: Vec<usize>,
    /// Vertices below `mean - stddev`
    pub low_curvature_regions: Vec<usize>,
}

impl CurvatureAnalysis {
    pub fn from_arrays(vertex_curvature: Vec<f32>, triangle_curvature: Vec<f32>) -> Self {
        let stats = Stats::of(&vertex_curvature);
        let (high_curvature_regions, low_curvature_regions) = stats.outliers(&vertex_curvature);
        Self {
            mean: stats.mean,
            min: stats.min,
            max: stats.max,
            variance: stats.variance,
            vertex_curvature,
            triangle_curvature,
            high_curvature_regions,
            low_curvature_regions,
        }
    }

    pub fn compute(mesh: &TriangleMesh, graph: &TopologyGraph) -> Self {
        Self::from_arrays(vertex_curvatures(mesh, graph), triangle_curvatures(mesh))
    }
}

/// Sharp edges, corners and flat regions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureAnalysis {
    pub sharp_edges: Vec<usize>,
    /// Vertices whose curvature exceeds the corner angle in radians.
    ///
    /// NOTE: the curvature proxy is unitless and close to 1 on well-formed
    /// meshes, so this compares against ~0.785 and flags most vertices.
    pub corners: Vec<usize>,
    pub flat_triangles: Vec<usize>,
    /// `(sharp edges + corners) / (edges + vertices)`
    pub feature_richness: f32,
}

impl FeatureAnalysis {
    pub fn from_parts(
        graph: &TopologyGraph,
        sharp_edges: Vec<usize>,
        corners: Vec<usize>,
        flat_triangles: Vec<usize>,
    ) -> Self {
        let elements = graph.edge_count() + graph.vertex_count();
        let feature_richness = if elements > 0 {
            (sharp_edges.len() + corners.len()) as f32 / elements as f32
        } else {
            0.0
        };
        Self {
            sharp_edges,
            corners,
            flat_triangles,
            feature_richness,
        }
    }

    pub fn compute(
        graph: &TopologyGraph,
        curvature: &CurvatureAnalysis,
        thresholds: &TopologyThresholds,
    ) -> Self {
        let sharp = deg_to_rad(thresholds.sharp_edge_angle);
        let corner = deg_to_rad(thresholds.corner_angle);
        let flat = deg_to_rad(thresholds.flat_angle);

        let sharp_edges = (0..graph.edge_count())
            .filter(|&e| graph.edges[e].dihedral_angle > sharp)
            .collect();
        let corners = (0..curvature.vertex_curvature.len())
            .filter(|&v| curvature.vertex_curvature[v] > corner)
            .collect();
        let flat_triangles = (0..curvature.triangle_curvature.len())
            .filter(|&t| curvature.triangle_curvature[t] < flat)
            .collect();

        Self::from_parts(graph, sharp_edges, corners, flat_triangles)
    }
}

/// Valence per vertex and inverse area per triangle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityAnalysis {
    pub vertex_density: Vec<f32>,
    pub triangle_density: Vec<f32>,
    /// Aggregates over `vertex_density`
    pub mean: f32,
    pub min: f32,
    pub max: f32,
    pub variance: f32,
    pub high_density_regions: Vec<usize>,
    pub low_density_regions: Vec<usize>,
}

impl DensityAnalysis {
    pub fn from_arrays(vertex_density: Vec<f32>, triangle_density: Vec<f32>) -> Self {
        let stats = Stats::of(&vertex_density);
        let (high_density_regions, low_density_regions) = stats.outliers(&vertex_density);
        Self {
            mean: stats.mean,
            min: stats.min,
            max: stats.max,
            variance: stats.variance,
            vertex_density,
            triangle_density,
            high_density_regions,
            low_density_regions,
        }
    }

    pub fn compute(graph: &TopologyGraph) -> Self {
        Self::from_arrays(
            graph.vertices.iter().map(|v| v.valence() as f32).collect(),
            graph
                .triangles
                .iter()
                .map(|t| triangle_density(t.area))
                .collect(),
        )
    }
}

/// Shape quality per triangle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAnalysis {
    pub triangle_quality: Vec<f32>,
    /// Triangles below the poor-quality cutoff
    pub poor_triangles: Vec<usize>,
    pub mean: f32,
    pub min: f32,
    pub max: f32,
}

impl QualityAnalysis {
    pub fn from_scores(triangle_quality: Vec<f32>, poor_cutoff: f32) -> Self {
        let stats = Stats::of(&triangle_quality);
        let poor_triangles = (0..triangle_quality.len())
            .filter(|&t| triangle_quality[t] < poor_cutoff)
            .collect();
        Self {
            mean: stats.mean,
            min: stats.min,
            max: stats.max,
            triangle_quality,
            poor_triangles,
        }
    }

    pub fn compute(mesh: &TriangleMesh, thresholds: &TopologyThresholds) -> Self {
        Self::from_scores(
            mesh.triangles().iter().map(triangle_quality).collect(),
            thresholds.poor_quality,
        )
    }
}

impl fmt::Display for ConnectivityAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Connectivity:")?;
        writeln!(f, "  boundary edges: {}", self.boundary_edges)?;
        writeln!(f, "  non-manifold edges: {}", self.non_manifold_edges)?;
        writeln!(f, "  non-manifold vertices: {}", self.non_manifold_vertices)?;
        writeln!(f, "  isolated vertices: {}", self.isolated_vertices)?;
        writeln!(f, "  score: {:.3}", self.score)
    }
}

impl fmt::Display for CurvatureAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Curvature:")?;
        writeln!(
            f,
            "  mean {:.4}, min {:.4}, max {:.4}, variance {:.4}",
            self.mean, self.min, self.max, self.variance
        )?;
        writeln!(
            f,
            "  high regions: {}, low regions: {}",
            self.high_curvature_regions.len(),
            self.low_curvature_regions.len()
        )
    }
}

impl fmt::Display for FeatureAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Features:")?;
        writeln!(f, "  sharp edges: {}", self.sharp_edges.len())?;
        writeln!(f, "  corners: {}", self.corners.len())?;
        writeln!(f, "  flat triangles: {}", self.flat_triangles.len())?;
        writeln!(f, "  richness: {:.4}", self.feature_richness)
    }
}

impl fmt::Display for DensityAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Density:")?;
        writeln!(
            f,
            "  mean {:.3}, min {:.3}, max {:.3}, variance {:.3}",
            self.mean, self.min, self.max, self.variance
        )?;
        writeln!(
            f,
            "  high regions: {}, low regions: {}",
            self.high_density_regions.len(),
            self.low_density_regions.len()
        )
    }
}

impl fmt::Display for QualityAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Quality:")?;
        writeln!(
            f,
            "  mean {:.3}, min {:.3}, max {:.3}",
            self.mean, self.min, self.max
        )?;
        writeln!(f, "  poor triangles: {}", self.poor_triangles.len())
    }
}
