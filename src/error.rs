// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error types shared by the spatial index, decomposition and topology passes

use std::collections::TryReserveError;
use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, MeshError>;

/// Failure of a build, decompose or evaluate call.
///
/// Every variant is fatal for the current input. Degenerate geometry
/// (zero-area triangles, zero-length edges) is never reported here; the
/// analyses record it with sentinel values and counters instead.
#[derive(Debug, Error)]
pub enum MeshError {
    /// The mesh has no triangles
    #[error("mesh has no triangles")]
    EmptyMesh,

    /// A sizing or count parameter is out of range
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// An allocation could not be satisfied; partial results were dropped
    #[error("allocation failed: {0}")]
    ResourceExhausted(#[from] TryReserveError),

    /// The accelerator was required but could not be initialised
    #[error("acceleration backend unavailable: {0}")]
    AccelerationUnavailable(String),

    /// Reading mesh input failed
    #[error("failed to read mesh: {0}")]
    Io(#[from] std::io::Error),
}

impl MeshError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Vec constructor that reports allocation failure instead of aborting
pub(crate) fn try_vec<T>(capacity: usize) -> Result<Vec<T>> {
    let mut vec = Vec::new();
    vec.try_reserve_exact(capacity)?;
    Ok(vec)
}
