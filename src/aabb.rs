//! Axis-aligned bounding boxes, +y down.

use glam::DVec2;

/// Closed axis-aligned box: both `min` and `max` are inside the box.
///
/// Callers are expected to keep `min < max` on both axes; the world rejects
/// degenerate boxes at insertion.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb {
    pub min: DVec2,
    pub max: DVec2,
}

impl Aabb {
    pub fn new(min: DVec2, max: DVec2) -> Self {
        Self { min, max }
    }

    /// Box from a center point and half extents along each axis.
    pub fn from_center_half_extents(center: DVec2, half: DVec2) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn center(&self) -> DVec2 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> DVec2 {
        self.max - self.min
    }

    pub fn half_extents(&self) -> DVec2 {
        (self.max - self.min) * 0.5
    }

    pub fn area(&self) -> f64 {
        let s = self.size();
        s.x * s.y
    }

    /// Finite bounds with strictly positive extent on both axes.
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min.x < self.max.x && self.min.y < self.max.y
    }

    /// Inclusive overlap test; boxes sharing only an edge still count.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Overlap with positive area; edge contact does not count.
    pub fn overlaps_strictly(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    pub fn contains_point(&self, p: DVec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn translated(&self, by: DVec2) -> Self {
        Self {
            min: self.min + by,
            max: self.max + by,
        }
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Aabb) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Box covering this box swept by `disp`: the union of the start and end
    /// poses. Used to gather broad-phase candidates for a moving body.
    pub fn swept_by(&self, disp: DVec2) -> Self {
        self.union(&self.translated(disp))
    }
}
