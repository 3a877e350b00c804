// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Topology and quality evaluation
//!
//! [`evaluate`] welds the mesh into a [`TopologyGraph`], then fills in the
//! analysis blocks for the requested [`AnalysisKind`]. Vertex and triangle
//! curvature are computed for every kind since feature detection reads them.

mod graph;
mod metrics;
mod recommend;

pub use graph::{weld_vertices, Edge, TopologyGraph, TopologyTriangle, Vertex, VertexWelder};
pub use metrics::{
    triangle_curvature, triangle_density, triangle_quality, vertex_curvature,
    ConnectivityAnalysis, CurvatureAnalysis, DensityAnalysis, FeatureAnalysis, QualityAnalysis,
};
pub use recommend::{SlicingRecommendations, SlicingStrategy};

pub(crate) use metrics::connectivity_score;

use crate::accel::Executor;
use crate::error::{MeshError, Result};
use crate::geometry::TriangleMesh;
use crate::utils::math::clamp01;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Which analysis blocks to compute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnalysisKind {
    Connectivity,
    Curvature,
    Features,
    Density,
    Quality,
    #[default]
    Complete,
}

impl AnalysisKind {
    fn includes(&self, other: AnalysisKind) -> bool {
        *self == AnalysisKind::Complete || *self == other
    }
}

/// Cutoffs used by the analyses; angles are in degrees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyThresholds {
    /// Corners closer than this weld into one vertex
    pub weld_tolerance: f32,
    pub sharp_edge_angle: f32,
    pub corner_angle: f32,
    pub flat_angle: f32,
    pub poor_quality: f32,
    /// Vertices with more incident triangles are flagged non-manifold
    pub non_manifold_valence: usize,
}

impl Default for TopologyThresholds {
    fn default() -> Self {
        Self {
            weld_tolerance: 1e-6,
            sharp_edge_angle: 30.0,
            corner_angle: 45.0,
            flat_angle: 5.0,
            poor_quality: 0.3,
            non_manifold_valence: 6,
        }
    }
}

/// Graph plus the blocks computed for one [`AnalysisKind`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyEvaluation {
    pub kind: AnalysisKind,
    pub graph: TopologyGraph,
    pub connectivity: Option<ConnectivityAnalysis>,
    pub curvature: Option<CurvatureAnalysis>,
    pub features: Option<FeatureAnalysis>,
    pub density: Option<DensityAnalysis>,
    pub quality: Option<QualityAnalysis>,
    /// `clamp01((richness + (1 - mean quality)) / 2)`, missing terms read as 0
    pub complexity: f32,
}

impl TopologyEvaluation {
    pub fn vertex_count(&self) -> usize {
        self.graph.vertex_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn triangle_count(&self) -> usize {
        self.graph.triangle_count()
    }

    pub fn recommendations(&self) -> SlicingRecommendations {
        SlicingRecommendations::from_evaluation(self)
    }
}

/// Evaluate with default thresholds on the sequential path
pub fn evaluate(mesh: &TriangleMesh, kind: AnalysisKind) -> Result<TopologyEvaluation> {
    evaluate_with(mesh, kind, &TopologyThresholds::default(), &Executor::cpu())
}

pub fn evaluate_with(
    mesh: &TriangleMesh,
    kind: AnalysisKind,
    thresholds: &TopologyThresholds,
    executor: &Executor,
) -> Result<TopologyEvaluation> {
    if mesh.is_empty() {
        return Err(MeshError::EmptyMesh);
    }

    let count = mesh.triangle_count();
    debug!(triangles = count, ?kind, "evaluating topology");

    let mut graph = TopologyGraph::build(mesh, thresholds.weld_tolerance)?;
    debug!(
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        degenerate = graph.degenerate_triangles,
        "mesh welded"
    );

    let curvature = executor
        .try_accelerated(count, "curvature", |accel| accel.try_curvature(mesh, &graph))
        .unwrap_or_else(|| CurvatureAnalysis::compute(mesh, &graph));
    for (vertex, &value) in graph.vertices.iter_mut().zip(&curvature.vertex_curvature) {
        vertex.curvature = value;
    }

    let connectivity = kind.includes(AnalysisKind::Connectivity).then(|| {
        executor
            .try_accelerated(count, "connectivity", |accel| {
                accel.try_connectivity(&graph, thresholds)
            })
            .unwrap_or_else(|| ConnectivityAnalysis::compute(&graph, thresholds))
    });

    let features = kind.includes(AnalysisKind::Features).then(|| {
        executor
            .try_accelerated(count, "features", |accel| {
                accel.try_features(&graph, &curvature, thresholds)
            })
            .unwrap_or_else(|| FeatureAnalysis::compute(&graph, &curvature, thresholds))
    });

    let density = kind.includes(AnalysisKind::Density).then(|| {
        executor
            .try_accelerated(count, "density", |accel| accel.try_density(&graph))
            .unwrap_or_else(|| DensityAnalysis::compute(&graph))
    });

    let quality = kind.includes(AnalysisKind::Quality).then(|| {
        executor
            .try_accelerated(count, "quality", |accel| accel.try_quality(mesh, thresholds))
            .unwrap_or_else(|| QualityAnalysis::compute(mesh, thresholds))
    });

    let richness = features.as_ref().map_or(0.0, |f| f.feature_richness);
    let roughness = quality.as_ref().map_or(0.0, |q| 1.0 - q.mean);

    let evaluation = TopologyEvaluation {
        kind,
        curvature: kind.includes(AnalysisKind::Curvature).then_some(curvature),
        connectivity,
        features,
        density,
        quality,
        complexity: clamp01((richness + roughness) / 2.0),
        graph,
    };
    debug!(complexity = evaluation.complexity, "topology evaluated");
    Ok(evaluation)
}

impl fmt::Display for TopologyEvaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Topology evaluation ({:?})", self.kind)?;
        writeln!(
            f,
            "  vertices: {}, edges: {}, triangles: {}",
            self.vertex_count(),
            self.edge_count(),
            self.triangle_count()
        )?;
        if self.graph.degenerate_triangles > 0 || self.graph.zero_length_edges > 0 {
            writeln!(
                f,
                "  degenerate triangles: {}, zero-length edges: {}",
                self.graph.degenerate_triangles, self.graph.zero_length_edges
            )?;
        }
        writeln!(f, "  complexity: {:.3}", self.complexity)?;

        if let Some(block) = &self.connectivity {
            write!(f, "{block}")?;
        }
        if let Some(block) = &self.curvature {
            write!(f, "{block}")?;
        }
        if let Some(block) = &self.features {
            write!(f, "{block}")?;
        }
        if let Some(block) = &self.density {
            write!(f, "{block}")?;
        }
        if let Some(block) = &self.quality {
            write!(f, "{block}")?;
        }
        Ok(())
    }
}
