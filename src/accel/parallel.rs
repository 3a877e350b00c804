// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Multi-core accelerator on a dedicated rayon thread pool

use super::{Accelerator, Unavailable};
use crate::geometry::{plane_triangle_intersection, Segment, TriangleMesh};
use crate::topology::{
    connectivity_score, triangle_curvature, triangle_density, triangle_quality, vertex_curvature,
    ConnectivityAnalysis, CurvatureAnalysis, DensityAnalysis, FeatureAnalysis, QualityAnalysis,
    TopologyGraph, TopologyThresholds,
};
use crate::utils::math::deg_to_rad;
use nalgebra::Point3;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Runs every per-element pass in parallel
pub struct ParallelAccelerator {
    pool: ThreadPool,
}

impl ParallelAccelerator {
    /// Pool sized to the available cores
    pub fn new() -> Result<Self, Unavailable> {
        Self::with_threads(0)
    }

    /// Pool with `threads` workers; 0 lets rayon choose
    pub fn with_threads(threads: usize) -> Result<Self, Unavailable> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("meshprep-worker-{i}"))
            .build()
            .map_err(|err| Unavailable::Failed(err.to_string()))?;
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl Accelerator for ParallelAccelerator {
    fn name(&self) -> &str {
        "rayon"
    }

    fn try_sort_by_axis(
        &self,
        centroids: &[Point3<f32>],
        triangles: &mut [usize],
        axis: usize,
    ) -> Result<(), Unavailable> {
        // par_sort_by is stable, so ties keep their input order
        self.pool.install(|| {
            triangles.par_sort_by(|&a, &b| centroids[a][axis].total_cmp(&centroids[b][axis]))
        });
        Ok(())
    }

    fn try_connectivity(
        &self,
        graph: &TopologyGraph,
        thresholds: &TopologyThresholds,
    ) -> Result<ConnectivityAnalysis, Unavailable> {
        Ok(self.pool.install(|| {
            let edges = &graph.edges;
            let vertices = &graph.vertices;
            ConnectivityAnalysis {
                boundary_edges: edges.par_iter().filter(|e| e.is_boundary()).count(),
                non_manifold_edges: edges.par_iter().filter(|e| e.is_non_manifold()).count(),
                non_manifold_vertices: vertices
                    .par_iter()
                    .filter(|v| v.valence() > thresholds.non_manifold_valence)
                    .count(),
                isolated_vertices: vertices.par_iter().filter(|v| v.valence() == 0).count(),
                score: connectivity_score(
                    vertices.par_iter().map(|v| v.adjacent.len()).sum(),
                    vertices.len(),
                ),
            }
        }))
    }

    fn try_curvature(
        &self,
        mesh: &TriangleMesh,
        graph: &TopologyGraph,
    ) -> Result<CurvatureAnalysis, Unavailable> {
        let (vertex, triangle) = self.pool.install(|| {
            rayon::join(
                || {
                    (0..graph.vertex_count())
                        .into_par_iter()
                        .map(|v| vertex_curvature(mesh, graph, v))
                        .collect()
                },
                || mesh.triangles().par_iter().map(triangle_curvature).collect(),
            )
        });
        Ok(CurvatureAnalysis::from_arrays(vertex, triangle))
    }

    fn try_features(
        &self,
        graph: &TopologyGraph,
        curvature: &CurvatureAnalysis,
        thresholds: &TopologyThresholds,
    ) -> Result<FeatureAnalysis, Unavailable> {
        let sharp = deg_to_rad(thresholds.sharp_edge_angle);
        let corner = deg_to_rad(thresholds.corner_angle);
        let flat = deg_to_rad(thresholds.flat_angle);

        let (sharp_edges, corners, flat_triangles) = self.pool.install(|| {
            let sharp_edges = (0..graph.edge_count())
                .into_par_iter()
                .filter(|&e| graph.edges[e].dihedral_angle > sharp)
                .collect();
            let corners = (0..curvature.vertex_curvature.len())
                .into_par_iter()
                .filter(|&v| curvature.vertex_curvature[v] > corner)
                .collect();
            let flat_triangles = (0..curvature.triangle_curvature.len())
                .into_par_iter()
                .filter(|&t| curvature.triangle_curvature[t] < flat)
                .collect();
            (sharp_edges, corners, flat_triangles)
        });

        Ok(FeatureAnalysis::from_parts(
            graph,
            sharp_edges,
            corners,
            flat_triangles,
        ))
    }

    fn try_density(&self, graph: &TopologyGraph) -> Result<DensityAnalysis, Unavailable> {
        let (vertex, triangle) = self.pool.install(|| {
            rayon::join(
                || graph.vertices.par_iter().map(|v| v.valence() as f32).collect(),
                || {
                    graph
                        .triangles
                        .par_iter()
                        .map(|t| triangle_density(t.area))
                        .collect()
                },
            )
        });
        Ok(DensityAnalysis::from_arrays(vertex, triangle))
    }

    fn try_quality(
        &self,
        mesh: &TriangleMesh,
        thresholds: &TopologyThresholds,
    ) -> Result<QualityAnalysis, Unavailable> {
        let scores = self
            .pool
            .install(|| mesh.triangles().par_iter().map(triangle_quality).collect());
        Ok(QualityAnalysis::from_scores(scores, thresholds.poor_quality))
    }

    fn try_contours(&self, mesh: &TriangleMesh, height: f32) -> Result<Vec<Segment>, Unavailable> {
        Ok(self.pool.install(|| {
            mesh.triangles()
                .par_iter()
                .filter_map(|t| plane_triangle_intersection(t, height))
                .collect()
        }))
    }
}
