//! Containment volumes used to select nodes: vertical slabs from an [`Aabb3d`] and parallelepipeds
//! from an [`OrientedBox`].

#[cfg(feature = "bevy_reflect")]
use bevy_reflect::prelude::*;
use glam::{Affine3A, Vec3};

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
pub struct Aabb3d {
    /// The minimum point of the box
    pub min: Vec3,
    /// The maximum point of the box
    pub max: Vec3,
}

impl Aabb3d {
    /// Creates a new AABB from its extrema.
    #[inline]
    pub fn new(min: impl Into<Vec3>, max: impl Into<Vec3>) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
        }
    }

    /// Computes the AABB enclosing all points.
    /// Returns `None` if there are no points.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(prev_min, prev_max), point| {
            (point.min(prev_min), point.max(prev_max))
        });
        Some(Self { min, max })
    }

    /// Whether `point` lies in the infinite vertical slab spanned by this box on the xz-plane,
    /// grown by `margin` on every side. The y-axis is ignored.
    #[inline]
    pub fn contains_xz(&self, point: Vec3, margin: f32) -> bool {
        point.x >= self.min.x - margin
            && point.x <= self.max.x + margin
            && point.z >= self.min.z - margin
            && point.z <= self.max.z + margin
    }
}

/// A box of arbitrary orientation, given by an origin corner and the three corners adjacent to it.
///
/// ```text
///   p5
///   |
///   |   p2
///   |  /
///   | /
///   p1 ------ p4
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
pub struct OrientedBox {
    /// The origin corner
    pub p1: Vec3,
    /// The corner along the first edge
    pub p2: Vec3,
    /// The corner along the second edge
    pub p4: Vec3,
    /// The corner along the third edge
    pub p5: Vec3,
}

impl OrientedBox {
    /// Creates an oriented box from its origin corner and the three adjacent corners.
    pub fn new(p1: Vec3, p2: Vec3, p4: Vec3, p5: Vec3) -> Self {
        Self { p1, p2, p4, p5 }
    }

    /// Computes the corners of a box volume with the given local `center` and `size`,
    /// placed in the world by `transform`.
    pub fn from_box(transform: Affine3A, center: Vec3, size: Vec3) -> Self {
        let corner = |x: f32, y: f32, z: f32| {
            transform.transform_point3(center + Vec3::new(x, y, z) * size * 0.5)
        };
        Self {
            p1: corner(-1.0, -1.0, 1.0),
            p2: corner(-1.0, -1.0, -1.0),
            p4: corner(1.0, -1.0, 1.0),
            p5: corner(-1.0, 1.0, 1.0),
        }
    }

    /// Whether `point` lies inside the parallelepiped spanned by the three edges from `p1`.
    /// Points on the faces count as inside.
    pub fn contains(&self, point: Vec3) -> bool {
        let v = point - self.p1;
        [self.p2, self.p4, self.p5].into_iter().all(|corner| {
            let edge = corner - self.p1;
            let projection = v.dot(edge);
            projection >= 0.0 && projection <= edge.length_squared()
        })
    }
}

/// Everything a region affect needs to know about the current placement of its box volume.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
pub struct AffectorPose {
    /// The world position of the affect's origin
    pub position: Vec3,
    /// The world-space bounds of the box volume
    pub bounds: Aabb3d,
    /// The oriented corners of the box volume
    pub corners: OrientedBox,
}

impl AffectorPose {
    /// Computes the pose of a box volume with local `center` and `size` placed by `transform`.
    pub fn from_box(transform: Affine3A, center: Vec3, size: Vec3) -> Self {
        let half = size * 0.5;
        let world_corners = (0..8).map(|i| {
            let sign = Vec3::new(
                if i & 1 == 0 { -1.0 } else { 1.0 },
                if i & 2 == 0 { -1.0 } else { 1.0 },
                if i & 4 == 0 { -1.0 } else { 1.0 },
            );
            transform.transform_point3(center + sign * half)
        });
        let bounds = Aabb3d::from_points(world_corners).unwrap_or_default();
        Self {
            position: transform.translation.into(),
            bounds,
            corners: OrientedBox::from_box(transform, center, size),
        }
    }
}
