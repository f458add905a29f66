//! Collision segments for tile geometry and doors
//!
//! Tiles are reduced to straight segments and quarter-circle arcs. Segments
//! live in one arena owned by the spatial registry; cells only store
//! [`SegmentId`] handles into it.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::collision::{
    time_of_intersection_circle_vs_arc, time_of_intersection_circle_vs_circle,
    time_of_intersection_circle_vs_lineseg,
};

/// Radius of every curved tile arc
pub const ARC_RADIUS: f64 = 24.0;

/// Handle to a segment in the registry's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentId(pub u32);

/// Geometry of a segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Straight segment. When `oriented`, the solid side is to the right of
    /// `a -> b` in screen space (y down) and positions behind it are back facing.
    Linear { a: DVec2, b: DVec2, oriented: bool },
    /// Quarter circle of [`ARC_RADIUS`] around `center`, spanning the quadrant
    /// pointed to by `quadrant` (components are +-1). Convex arcs are solid
    /// inside the circle, concave ones outside.
    Arc {
        center: DVec2,
        quadrant: DVec2,
        convex: bool,
    },
}

/// Closest point query result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPoint {
    pub point: DVec2,
    /// Query position lies on the solid side of the surface
    pub back_facing: bool,
}

/// A piece of collision geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub shape: Shape,
    /// Inactive segments (open doors) are skipped by region queries
    pub active: bool,
}

impl Segment {
    pub fn linear(a: DVec2, b: DVec2) -> Self {
        Self {
            shape: Shape::Linear { a, b, oriented: true },
            active: true,
        }
    }

    /// Two-sided segment, used for door bodies
    pub fn linear_unoriented(a: DVec2, b: DVec2) -> Self {
        Self {
            shape: Shape::Linear { a, b, oriented: false },
            active: true,
        }
    }

    pub fn arc(center: DVec2, quadrant: DVec2, convex: bool) -> Self {
        Self {
            shape: Shape::Arc {
                center,
                quadrant,
                convex,
            },
            active: true,
        }
    }

    /// Closest point of the segment to `pos`
    pub fn closest_point(&self, pos: DVec2) -> ClosestPoint {
        match self.shape {
            Shape::Linear { a, b, oriented } => {
                let p = b - a;
                let d = pos - a;
                let u = (d.dot(p) / p.length_squared()).clamp(0.0, 1.0);
                // Caps are never back facing
                let back_facing = oriented && u > 0.0 && u < 1.0 && d.y * p.x - d.x * p.y < 0.0;
                ClosestPoint {
                    point: a + p * u,
                    back_facing,
                }
            }
            Shape::Arc {
                center,
                quadrant,
                convex,
            } => {
                let d = pos - center;
                if d.x * quadrant.x > 0.0 && d.y * quadrant.y > 0.0 {
                    let dist = d.length();
                    ClosestPoint {
                        point: center + d * (ARC_RADIUS / dist),
                        back_facing: if convex {
                            dist < ARC_RADIUS
                        } else {
                            dist > ARC_RADIUS
                        },
                    }
                } else {
                    let (hor, ver) = self.arc_endpoints();
                    let point = if d.x * quadrant.x > d.y * quadrant.y {
                        hor
                    } else {
                        ver
                    };
                    ClosestPoint {
                        point,
                        back_facing: false,
                    }
                }
            }
        }
    }

    /// Earliest fraction of `vel` at which a circle starting at `pos` touches
    /// this segment, 1.0 if it never does within the step
    pub fn intersect_with_ray(&self, pos: DVec2, vel: DVec2, radius: f64) -> f64 {
        match self.shape {
            Shape::Linear { a, b, .. } => {
                let t1 = time_of_intersection_circle_vs_circle(pos, vel, a, radius);
                let t2 = time_of_intersection_circle_vs_circle(pos, vel, b, radius);
                let t3 = time_of_intersection_circle_vs_lineseg(pos, vel, a, b, radius);
                t1.min(t2).min(t3)
            }
            Shape::Arc {
                center, quadrant, ..
            } => {
                let (hor, ver) = self.arc_endpoints();
                let t1 = time_of_intersection_circle_vs_circle(pos, vel, hor, radius);
                let t2 = time_of_intersection_circle_vs_circle(pos, vel, ver, radius);
                let t3 = time_of_intersection_circle_vs_arc(
                    pos, vel, center, quadrant, ARC_RADIUS, radius,
                );
                t1.min(t2).min(t3)
            }
        }
    }

    /// Arc end points on the horizontal and vertical radii
    fn arc_endpoints(&self) -> (DVec2, DVec2) {
        match self.shape {
            Shape::Arc {
                center, quadrant, ..
            } => (
                center + DVec2::new(ARC_RADIUS * quadrant.x, 0.0),
                center + DVec2::new(0.0, ARC_RADIUS * quadrant.y),
            ),
            Shape::Linear { a, b, .. } => (a, b),
        }
    }
}
