// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Spatial index and the flat band partition derived from it

mod bvh;
mod partition;

pub use bvh::{Bvh, BvhNode, MAX_DEPTH};
pub use partition::{SortAxis, SpatialPartition, PARTITION_LEAF_SIZE};

#[cfg(test)]
pub(crate) use bvh::sort_by_axis;
