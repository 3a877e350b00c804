// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Meshprep
//!
//! Geometric analysis of triangle soups ahead of slicing: a bounding volume
//! hierarchy with a flat band partition, box-hulled convex decomposition, and
//! a topology evaluator producing quality metrics and slicing recommendations.
//!
//! ```no_run
//! use meshprep::{evaluate, AnalysisKind, TriangleMesh};
//!
//! let mut file = std::fs::File::open("part.stl")?;
//! let mesh = TriangleMesh::read_stl(&mut file)?;
//! let evaluation = evaluate(&mesh, AnalysisKind::Complete)?;
//! println!("{}", evaluation.recommendations());
//! # Ok::<(), meshprep::MeshError>(())
//! ```

pub mod accel;
pub mod config;
pub mod decompose;
pub mod error;
pub mod geometry;
pub mod spatial;
pub mod topology;
pub mod utils;

pub use accel::{Accelerator, ExecutionMode, Executor, ParallelAccelerator, Unavailable};
pub use config::AnalysisConfig;
pub use decompose::{
    decompose, ConvexPart, Decomposition, DecompositionParams, DecompositionStrategy,
};
pub use error::{MeshError, Result};
pub use geometry::{BoundingBox, Primitive, Triangle, TriangleMesh};
pub use spatial::{Bvh, BvhNode, SortAxis, SpatialPartition};
pub use topology::{
    evaluate, evaluate_with, AnalysisKind, SlicingRecommendations, SlicingStrategy,
    TopologyEvaluation, TopologyGraph, TopologyThresholds,
};
