// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Optional accelerated execution of per-element passes
//!
//! An [`Accelerator`] exposes one `try_*` method per operation. Each returns
//! [`Unavailable`] when the backend cannot run it, and the [`Executor`] then
//! runs the sequential implementation instead. Accelerated results match the
//! sequential ones up to floating-point summation order.

mod parallel;

pub use parallel::ParallelAccelerator;

use crate::error::{MeshError, Result};
use crate::geometry::{contour_segments, Segment, TriangleMesh};
use crate::topology::{
    ConnectivityAnalysis, CurvatureAnalysis, DensityAnalysis, FeatureAnalysis, QualityAnalysis,
    TopologyGraph, TopologyThresholds,
};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Meshes at or above this many triangles use the accelerator in `Auto` mode
pub const DEFAULT_AUTO_THRESHOLD: usize = 10_000;

/// Why an accelerated operation did not run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unavailable {
    #[error("operation not supported by this backend")]
    Unsupported,
    #[error("backend failure: {0}")]
    Failed(String),
}

/// How the executor chooses between accelerated and sequential passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Never initialise an accelerator
    #[default]
    CpuOnly,
    /// Fail if the accelerator cannot be initialised
    AcceleratedOnly,
    /// Use the accelerator when it initialises, otherwise run sequentially
    AcceleratedPreferred,
    /// Like `AcceleratedPreferred`, but only for large meshes
    Auto,
}

/// Backend able to run a subset of the analysis passes.
///
/// Every method defaults to [`Unavailable::Unsupported`], so a backend only
/// implements what it accelerates.
pub trait Accelerator: Send + Sync {
    fn name(&self) -> &str;

    /// Stable sort of triangle indices by centroid coordinate on `axis`
    fn try_sort_by_axis(
        &self,
        _centroids: &[Point3<f32>],
        _triangles: &mut [usize],
        _axis: usize,
    ) -> std::result::Result<(), Unavailable> {
        Err(Unavailable::Unsupported)
    }

    fn try_connectivity(
        &self,
        _graph: &TopologyGraph,
        _thresholds: &TopologyThresholds,
    ) -> std::result::Result<ConnectivityAnalysis, Unavailable> {
        Err(Unavailable::Unsupported)
    }

    fn try_curvature(
        &self,
        _mesh: &TriangleMesh,
        _graph: &TopologyGraph,
    ) -> std::result::Result<CurvatureAnalysis, Unavailable> {
        Err(Unavailable::Unsupported)
    }

    fn try_features(
        &self,
        _graph: &TopologyGraph,
        _curvature: &CurvatureAnalysis,
        _thresholds: &TopologyThresholds,
    ) -> std::result::Result<FeatureAnalysis, Unavailable> {
        Err(Unavailable::Unsupported)
    }

    fn try_density(
        &self,
        _graph: &TopologyGraph,
    ) -> std::result::Result<DensityAnalysis, Unavailable> {
        Err(Unavailable::Unsupported)
    }

    fn try_quality(
        &self,
        _mesh: &TriangleMesh,
        _thresholds: &TopologyThresholds,
    ) -> std::result::Result<QualityAnalysis, Unavailable> {
        Err(Unavailable::Unsupported)
    }

    /// Contour segments of the plane `z = height`, in triangle order
    fn try_contours(
        &self,
        _mesh: &TriangleMesh,
        _height: f32,
    ) -> std::result::Result<Vec<Segment>, Unavailable> {
        Err(Unavailable::Unsupported)
    }
}

/// Owns the accelerator, if any, and routes each pass to it or to the CPU.
///
/// The accelerator is released once, when the executor is dropped.
pub struct Executor {
    mode: ExecutionMode,
    auto_threshold: usize,
    accelerator: Option<Box<dyn Accelerator>>,
}

impl Executor {
    /// Sequential executor; never builds an accelerator
    pub fn cpu() -> Self {
        Self {
            mode: ExecutionMode::CpuOnly,
            auto_threshold: DEFAULT_AUTO_THRESHOLD,
            accelerator: None,
        }
    }

    /// Initialise with the rayon-backed [`ParallelAccelerator`]
    pub fn init(mode: ExecutionMode) -> Result<Self> {
        Self::init_with(mode, ParallelAccelerator::new)
    }

    /// Initialise with a custom backend constructor
    pub fn init_with<A, F>(mode: ExecutionMode, backend: F) -> Result<Self>
    where
        A: Accelerator + 'static,
        F: FnOnce() -> std::result::Result<A, Unavailable>,
    {
        let accelerator: Option<Box<dyn Accelerator>> = match mode {
            ExecutionMode::CpuOnly => None,
            ExecutionMode::AcceleratedOnly => match backend() {
                Ok(accel) => Some(Box::new(accel)),
                Err(err) => return Err(MeshError::AccelerationUnavailable(err.to_string())),
            },
            ExecutionMode::AcceleratedPreferred | ExecutionMode::Auto => match backend() {
                Ok(accel) => Some(Box::new(accel)),
                Err(err) => {
                    warn!(%err, "accelerator unavailable, running sequentially");
                    None
                }
            },
        };

        if let Some(accel) = &accelerator {
            debug!(backend = accel.name(), ?mode, "accelerator initialised");
        }

        Ok(Self {
            mode,
            auto_threshold: DEFAULT_AUTO_THRESHOLD,
            accelerator,
        })
    }

    pub fn with_auto_threshold(mut self, triangles: usize) -> Self {
        self.auto_threshold = triangles;
        self
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn auto_threshold(&self) -> usize {
        self.auto_threshold
    }

    pub fn is_accelerated(&self) -> bool {
        self.accelerator.is_some()
    }

    pub fn accelerator_name(&self) -> Option<&str> {
        self.accelerator.as_deref().map(|accel| accel.name())
    }

    /// The accelerator to use for a mesh of `triangle_count` triangles
    pub fn accelerator_for(&self, triangle_count: usize) -> Option<&dyn Accelerator> {
        let accel = self.accelerator.as_deref()?;
        match self.mode {
            ExecutionMode::Auto if triangle_count < self.auto_threshold => None,
            _ => Some(accel),
        }
    }

    /// Run `operation` on the accelerator, `None` when the caller must run it
    /// sequentially
    pub fn try_accelerated<T>(
        &self,
        triangle_count: usize,
        operation: &'static str,
        run: impl FnOnce(&dyn Accelerator) -> std::result::Result<T, Unavailable>,
    ) -> Option<T> {
        let accel = self.accelerator_for(triangle_count)?;
        match run(accel) {
            Ok(value) => Some(value),
            Err(Unavailable::Unsupported) => {
                trace!(operation, backend = accel.name(), "not accelerated");
                None
            }
            Err(err) => {
                warn!(operation, backend = accel.name(), %err, "accelerator failed, falling back");
                None
            }
        }
    }

    /// Contour segments of the plane `z = height`
    pub fn contour_segments(&self, mesh: &TriangleMesh, height: f32) -> Vec<Segment> {
        self.try_accelerated(mesh.triangle_count(), "contours", |accel| {
            accel.try_contours(mesh, height)
        })
        .unwrap_or_else(|| contour_segments(mesh, height))
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::cpu()
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        if let Some(accel) = self.accelerator.take() {
            debug!(backend = accel.name(), "releasing accelerator");
        }
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("mode", &self.mode)
            .field("auto_threshold", &self.auto_threshold)
            .field("accelerator", &self.accelerator_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use nalgebra::Vector3;

    struct Broken;

    impl Accelerator for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn try_contours(
            &self,
            _mesh: &TriangleMesh,
            _height: f32,
        ) -> std::result::Result<Vec<Segment>, Unavailable> {
            Err(Unavailable::Failed("device lost".into()))
        }
    }

    fn failing() -> std::result::Result<Broken, Unavailable> {
        Err(Unavailable::Failed("no device".into()))
    }

    #[test]
    fn test_cpu_only_never_builds_backend() {
        let never = || -> std::result::Result<Broken, Unavailable> {
            panic!("backend constructed in CpuOnly mode")
        };
        let executor = Executor::init_with(ExecutionMode::CpuOnly, never).unwrap();
        assert!(!executor.is_accelerated());
    }

    #[test]
    fn test_accelerated_only_fails_hard() {
        let result = Executor::init_with(ExecutionMode::AcceleratedOnly, failing);
        assert!(matches!(result, Err(MeshError::AccelerationUnavailable(_))));
    }

    #[test]
    fn test_preferred_falls_back_silently() {
        let executor = Executor::init_with(ExecutionMode::AcceleratedPreferred, failing).unwrap();
        assert!(!executor.is_accelerated());
        assert!(executor.accelerator_for(1_000_000).is_none());
    }

    #[test]
    fn test_auto_threshold() {
        let executor = Executor::init_with(ExecutionMode::Auto, || Ok(Broken))
            .unwrap()
            .with_auto_threshold(100);

        assert!(executor.accelerator_for(99).is_none());
        assert_eq!(executor.accelerator_for(100).map(|a| a.name()), Some("broken"));
    }

    #[test]
    fn test_failed_operation_falls_back() {
        let executor = Executor::init_with(ExecutionMode::AcceleratedOnly, || Ok(Broken)).unwrap();
        let cube = Primitive::cube(Vector3::new(1.0, 1.0, 1.0), false).to_mesh();

        assert_eq!(
            executor.contour_segments(&cube, 0.5),
            contour_segments(&cube, 0.5)
        );
        let graph = TopologyGraph::build(&cube, 1e-6).unwrap();
        assert!(executor
            .try_accelerated(12, "density", |accel| accel.try_density(&graph))
            .is_none());
    }
}
