// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Bounding box utilities

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl BoundingBox {
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    /// Inverted box that any expansion overwrites
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    /// Box from the `[min_x, min_y, min_z, max_x, max_y, max_z]` layout
    pub fn from_array(bounds: [f32; 6]) -> Self {
        Self {
            min: Point3::new(bounds[0], bounds[1], bounds[2]),
            max: Point3::new(bounds[3], bounds[4], bounds[5]),
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f32>>) -> Self {
        let mut bbox = Self::empty();
        for point in points {
            bbox.expand_to_include(point);
        }
        bbox
    }

    pub fn to_array(&self) -> [f32; 6] {
        [
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z,
        ]
    }

    /// True until at least one point has been included
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn expand_to_include(&mut self, point: &Point3<f32>) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.min.z = self.min.z.min(point.z);

        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
        self.max.z = self.max.z.max(point.z);
    }

    /// Smallest box enclosing both boxes
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            Point3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            Point3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        )
    }

    /// Axis-wise inclusive overlap test; touching boxes intersect
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn contains_point(&self, point: &Point3<f32>) -> bool {
        (0..3).all(|axis| point[axis] >= self.min[axis] && point[axis] <= self.max[axis])
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn volume(&self) -> f32 {
        let size = self.size();
        size.x * size.y * size.z
    }

    pub fn surface_area(&self) -> f32 {
        let size = self.size();
        2.0 * (size.x * size.y + size.x * size.z + size.y * size.z)
    }

    /// Axis with the strictly largest extent, X on ties
    pub fn longest_axis(&self) -> usize {
        let size = self.size();

        if size.y > size.x && size.y > size.z {
            1
        } else if size.z > size.x && size.z > size.y {
            2
        } else {
            0
        }
    }

    /// The eight corners, bottom face first
    pub fn corners(&self) -> [Point3<f32>; 8] {
        let (min, max) = (self.min, self.max);
        [
            Point3::new(min.x, min.y, min.z),
            Point3::new(max.x, min.y, min.z),
            Point3::new(max.x, max.y, min.z),
            Point3::new(min.x, max.y, min.z),
            Point3::new(min.x, min.y, max.z),
            Point3::new(max.x, min.y, max.z),
            Point3::new(max.x, max.y, max.z),
            Point3::new(min.x, max.y, max.z),
        ]
    }

    /// Check if two bounding boxes are approximately equal within tolerance
    pub fn approx_eq(&self, other: &BoundingBox, tolerance: f32) -> bool {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .all(|(a, b)| (a - b).abs() < tolerance)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "X[{:.3}, {:.3}] Y[{:.3}, {:.3}] Z[{:.3}, {:.3}]",
            self.min.x, self.max.x, self.min.y, self.max.y, self.min.z, self.max.z
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box() {
        let mut bbox = BoundingBox::empty();
        assert!(bbox.is_empty());
        bbox.expand_to_include(&Point3::new(1.0, 2.0, 3.0));
        bbox.expand_to_include(&Point3::new(-1.0, -2.0, -3.0));

        assert!(!bbox.is_empty());
        assert_eq!(bbox.min, Point3::new(-1.0, -2.0, -3.0));
        assert_eq!(bbox.max, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(bbox.center(), Point3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_surface_area() {
        let bbox = BoundingBox::from_array([0.0, 0.0, 0.0, 1.0, 2.0, 3.0]);
        assert_eq!(bbox.surface_area(), 22.0);
        assert_eq!(bbox.volume(), 6.0);
    }

    #[test]
    fn test_intersects_is_inclusive() {
        let a = BoundingBox::from_array([0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let touching = BoundingBox::from_array([1.0, 0.0, 0.0, 2.0, 1.0, 1.0]);
        let apart = BoundingBox::from_array([1.5, 0.0, 0.0, 2.0, 1.0, 1.0]);

        assert!(a.intersects(&touching));
        assert!(touching.intersects(&a));
        assert!(!a.intersects(&apart));
    }

    #[test]
    fn test_contains_point_is_closed() {
        let a = BoundingBox::from_array([0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);

        assert!(a.contains_point(&Point3::new(0.5, 0.5, 0.5)));
        assert!(a.contains_point(&Point3::new(1.0, 0.0, 1.0)));
        assert!(!a.contains_point(&Point3::new(1.0, 1.01, 0.5)));
        assert!(!BoundingBox::empty().contains_point(&Point3::origin()));
    }

    #[test]
    fn test_union_and_longest_axis() {
        let a = BoundingBox::from_array([0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let b = BoundingBox::from_array([0.5, -2.0, 0.0, 1.5, 0.5, 1.0]);
        let union = a.union(&b);

        assert_eq!(union.to_array(), [0.0, -2.0, 0.0, 1.5, 1.0, 1.0]);
        assert_eq!(union.longest_axis(), 1);
        assert_eq!(a.longest_axis(), 0);
    }
}
