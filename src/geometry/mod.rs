// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - triangle soup representation and primitives

mod bbox;
mod mesh;
mod plane;
mod primitives;

pub use bbox::BoundingBox;
pub use mesh::{Triangle, TriangleMesh};
pub use plane::{contour_segments, plane_triangle_intersection, Segment};
pub use primitives::Primitive;
