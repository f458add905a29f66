//! Collision primitives and tile queries
//!
//! Overlap tests are exact comparisons with no tolerance: touching counts as
//! overlapping. Swept tests return the fraction of a step at which a moving
//! circle first touches a shape (1.0 = no contact during the step, 0.0 =
//! already touching).

use std::collections::HashMap;

use glam::DVec2;

use super::grid::SpatialRegistry;
use super::segment::{ClosestPoint, Segment, SegmentId};
use crate::clamp_segment_cell;
use crate::consts::CELL_SIZE;

/// Circle vs circle overlap, inclusive of the touching boundary
#[inline]
pub fn overlap_circle_vs_circle(c1: DVec2, r1: f64, c2: DVec2, r2: f64) -> bool {
    c1.distance(c2) <= r1 + r2
}

/// Circle vs segment overlap, inclusive of the touching boundary.
///
/// Straight segments use the point-to-segment distance including the end
/// caps. Arcs only count their own quadrant plus their two end points.
pub fn overlap_circle_vs_segment(center: DVec2, radius: f64, segment: &Segment) -> bool {
    center.distance(segment.closest_point(center).point) <= radius
}

/// Depenetration of a point from an axis aligned square
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penetration {
    /// Unit axis pointing from the square towards the point
    pub normal: DVec2,
    /// Depth along `normal`
    pub depth: f64,
    /// Depth along the other axis
    pub cross_depth: f64,
}

/// Penetration of `point` into a square of half side `semi_side` at `center`,
/// resolved along the axis of least penetration
pub fn penetration_square_vs_point(center: DVec2, point: DVec2, semi_side: f64) -> Option<Penetration> {
    let d = point - center;
    let pen_x = semi_side - d.x.abs();
    let pen_y = semi_side - d.y.abs();
    if pen_x <= 0.0 || pen_y <= 0.0 {
        return None;
    }
    if pen_y <= pen_x {
        let normal = if d.y < 0.0 { DVec2::NEG_Y } else { DVec2::Y };
        Some(Penetration {
            normal,
            depth: pen_y,
            cross_depth: pen_x,
        })
    } else {
        let normal = if d.x < 0.0 { DVec2::NEG_X } else { DVec2::X };
        Some(Penetration {
            normal,
            depth: pen_x,
            cross_depth: pen_y,
        })
    }
}

/// Map an orientation code to a unit direction.
///
/// 0 is +x and each step turns 45 degrees clockwise on screen (y down), so
/// 2 is +y and 6 is -y. Codes wrap modulo 8.
pub fn orientation_to_vector(orientation: u8) -> DVec2 {
    let diag = std::f64::consts::FRAC_1_SQRT_2;
    match orientation % 8 {
        0 => DVec2::new(1.0, 0.0),
        1 => DVec2::new(diag, diag),
        2 => DVec2::new(0.0, 1.0),
        3 => DVec2::new(-diag, diag),
        4 => DVec2::new(-1.0, 0.0),
        5 => DVec2::new(-diag, -diag),
        6 => DVec2::new(0.0, -1.0),
        _ => DVec2::new(diag, -diag),
    }
}

/// Time of impact of a moving circle with a fixed point
pub fn time_of_intersection_circle_vs_circle(pos: DVec2, vel: DVec2, point: DVec2, radius: f64) -> f64 {
    let d = pos - point;
    let dist_sq = d.length_squared();
    let vel_sq = vel.length_squared();
    let dot = d.dot(vel);
    if dist_sq - radius * radius > 0.0 {
        let radicand = dot * dot - vel_sq * (dist_sq - radius * radius);
        if vel_sq > 0.0001 && dot < 0.0 && radicand >= 0.0 {
            return ((-dot - radicand.sqrt()) / vel_sq).min(1.0);
        }
        return 1.0;
    }
    0.0
}

/// Time of impact of a moving circle with the body of a line segment (caps excluded)
pub fn time_of_intersection_circle_vs_lineseg(
    pos: DVec2,
    vel: DVec2,
    a: DVec2,
    b: DVec2,
    radius: f64,
) -> f64 {
    let w = b - a;
    let seg_len = w.length();
    let n = w / seg_len;
    let rel = pos - a;
    let normal_proj = rel.x * n.y - rel.y * n.x;
    let hor_proj = rel.dot(n);
    if normal_proj.abs() >= radius {
        let dir = vel.x * n.y - vel.y * n.x;
        if dir * normal_proj < 0.0 {
            let t = ((normal_proj.abs() - radius) / dir.abs()).min(1.0);
            let hor_proj2 = hor_proj + t * vel.dot(n);
            if (0.0..=seg_len).contains(&hor_proj2) {
                return t;
            }
        }
    } else if (0.0..=seg_len).contains(&hor_proj) {
        return 0.0;
    }
    1.0
}

/// Time of impact of a moving circle with a quarter-circle arc shell
pub fn time_of_intersection_circle_vs_arc(
    pos: DVec2,
    vel: DVec2,
    center: DVec2,
    quadrant: DVec2,
    radius_arc: f64,
    radius_circle: f64,
) -> f64 {
    let d = pos - center;
    let dist_sq = d.length_squared();
    let vel_sq = vel.length_squared();
    let dot = d.dot(vel);
    let in_quadrant = |t: f64| {
        let p = d + vel * t;
        p.x * quadrant.x > 0.0 && p.y * quadrant.y > 0.0
    };
    let outer = radius_arc + radius_circle;
    let inner = radius_arc - radius_circle;

    if dist_sq > outer * outer {
        let radicand = dot * dot - vel_sq * (dist_sq - outer * outer);
        if vel_sq > 0.0001 && dot < 0.0 && radicand >= 0.0 {
            let t = (-dot - radicand.sqrt()) / vel_sq;
            if t <= 1.0 && in_quadrant(t) {
                return t;
            }
        }
        1.0
    } else if dist_sq < inner * inner {
        let radicand = dot * dot - vel_sq * (dist_sq - inner * inner);
        if vel_sq > 0.0001 {
            let t = (-dot + radicand.sqrt()) / vel_sq;
            if t <= 1.0 && in_quadrant(t) {
                return t;
            }
        }
        1.0
    } else if in_quadrant(0.0) {
        0.0
    } else {
        1.0
    }
}

/// Cell rectangle key, inclusive bounds in segment-grid cells
type RegionKey = (usize, usize, usize, usize);

/// Region query cache.
///
/// Maps a clamped cell rectangle to the ids of the segments that were active
/// in it when first queried. The cache is only cleared on a frame cadence
/// (see [`crate::consts::CACHE_CLEAR_INTERVAL`]), never when a door toggles
/// a segment, so a cached region may keep reporting a door's old state for
/// up to that many frames.
#[derive(Debug, Clone, Default)]
pub struct CollisionCache {
    regions: HashMap<RegionKey, Vec<SegmentId>>,
}

impl CollisionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every cached region
    pub fn clear(&mut self) {
        if !self.regions.is_empty() {
            log::debug!("Clearing collision cache ({} regions)", self.regions.len());
        }
        self.regions.clear();
    }

    /// Number of cached regions
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Segments of every cell overlapping the pixel box `min..=max`
    pub fn segments_in_region(&mut self, registry: &SpatialRegistry, min: DVec2, max: DVec2) -> &[SegmentId] {
        let (x1, y1) = clamp_segment_cell(
            (min.x / CELL_SIZE).floor() as i32,
            (min.y / CELL_SIZE).floor() as i32,
        );
        let (x2, y2) = clamp_segment_cell(
            (max.x / CELL_SIZE).floor() as i32,
            (max.y / CELL_SIZE).floor() as i32,
        );
        self.regions
            .entry((x1, y1, x2, y2))
            .or_insert_with(|| registry.segments_in_region(x1, y1, x2, y2))
    }
}

/// Closest surface point within `radius` of `pos`.
///
/// Returns the point and `-1.0` when `pos` is behind that surface, `1.0`
/// otherwise. Front-facing candidates get a small bias so that a surface the
/// circle is resting on wins ties against one it is inside of. A surface the
/// centre has sunk behind is a candidate however deep the centre is.
pub fn get_single_closest_point(
    registry: &SpatialRegistry,
    cache: &mut CollisionCache,
    pos: DVec2,
    radius: f64,
) -> Option<(f64, DVec2)> {
    let ids = cache.segments_in_region(registry, pos - radius, pos + radius);
    let mut shortest = f64::INFINITY;
    let mut best = None;
    for &id in ids {
        let ClosestPoint { point, back_facing } = registry.segment(id).closest_point(pos);
        let mut dist_sq = pos.distance_squared(point);
        if !back_facing && dist_sq > radius * radius {
            continue;
        }
        if !back_facing {
            dist_sq -= 0.1;
        }
        if dist_sq < shortest {
            shortest = dist_sq;
            best = Some((if back_facing { -1.0 } else { 1.0 }, point));
        }
    }
    best
}

/// Fraction of `delta` a circle of `radius` can travel from `old_pos` before
/// touching tile geometry
pub fn sweep_circle_vs_tiles(
    registry: &SpatialRegistry,
    cache: &mut CollisionCache,
    old_pos: DVec2,
    delta: DVec2,
    radius: f64,
) -> f64 {
    let new_pos = old_pos + delta;
    let margin = radius + 1.0;
    let min = old_pos.min(new_pos) - margin;
    let max = old_pos.max(new_pos) + margin;
    cache
        .segments_in_region(registry, min, max)
        .iter()
        .map(|&id| registry.segment(id).intersect_with_ray(old_pos, delta, radius))
        .fold(1.0, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_circle_overlap_includes_boundary() {
        let a = DVec2::new(0.0, 0.0);
        assert!(overlap_circle_vs_circle(a, 2.0, DVec2::new(3.0, 4.0), 3.0));
        assert!(!overlap_circle_vs_circle(a, 2.0, DVec2::new(3.0, 4.0000001), 3.0));
        assert!(overlap_circle_vs_circle(a, 1.0, a, 0.0));
    }

    #[test]
    fn test_cache_keeps_stale_lists_until_cleared() {
        let mut registry = SpatialRegistry::new();
        let id = registry.add_segment((2, 2), Segment::linear(DVec2::new(72.0, 60.0), DVec2::new(48.0, 60.0)));
        let mut cache = CollisionCache::new();
        let (min, max) = (DVec2::new(50.0, 50.0), DVec2::new(70.0, 70.0));
        assert_eq!(cache.segments_in_region(&registry, min, max), &[id]);
        assert_eq!(cache.len(), 1);

        // Deactivated after caching: still reported
        registry.segment_mut(id).active = false;
        assert_eq!(cache.segments_in_region(&registry, min, max), &[id]);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.segments_in_region(&registry, min, max).is_empty());
    }

    #[test]
    fn test_circle_vs_segment_caps() {
        let seg = Segment::linear(DVec2::new(24.0, 0.0), DVec2::new(0.0, 0.0));
        // Beyond the end cap, exactly at distance 5
        assert!(overlap_circle_vs_segment(DVec2::new(27.0, -4.0), 5.0, &seg));
        assert!(!overlap_circle_vs_segment(DVec2::new(27.0, -4.5), 5.0, &seg));
        // Distance alone decides, on either side of the surface
        assert!(!overlap_circle_vs_segment(DVec2::new(12.0, 200.0), 5.0, &seg));
        assert!(!overlap_circle_vs_segment(DVec2::new(12.0, 20.0), 5.0, &seg));
        assert!(overlap_circle_vs_segment(DVec2::new(12.0, 5.0), 5.0, &seg));
    }

    #[test]
    fn test_closest_point_reaches_sunk_centre() {
        let mut registry = SpatialRegistry::new();
        registry.add_segment((0, 0), Segment::linear(DVec2::new(24.0, 0.0), DVec2::new(0.0, 0.0)));
        let mut cache = CollisionCache::new();
        // Behind the surface, further than the radius: still resolved
        let hit = get_single_closest_point(&registry, &mut cache, DVec2::new(12.0, 20.0), 10.0);
        assert_eq!(hit, Some((-1.0, DVec2::new(12.0, 0.0))));
        // Same distance in front: out of reach
        let miss = get_single_closest_point(&registry, &mut cache, DVec2::new(12.0, -20.0), 10.0);
        assert_eq!(miss, None);
    }

    #[test]
    fn test_circle_vs_arc_quadrant() {
        let moon = Segment::arc(DVec2::ZERO, DVec2::new(1.0, 1.0), true);
        // Outside the quarter circle, within reach of the arc
        assert!(overlap_circle_vs_segment(DVec2::new(20.0, 20.0), 5.0, &moon));
        // Far outside
        assert!(!overlap_circle_vs_segment(DVec2::new(40.0, 40.0), 5.0, &moon));
        // Opposite quadrant only reaches the end points
        assert!(!overlap_circle_vs_segment(DVec2::new(-10.0, -10.0), 5.0, &moon));

        let pipe = Segment::arc(DVec2::ZERO, DVec2::new(1.0, 1.0), false);
        // Concave: inside the circle is free space
        assert!(!overlap_circle_vs_segment(DVec2::new(5.0, 5.0), 5.0, &pipe));
        assert!(overlap_circle_vs_segment(DVec2::new(20.0, 20.0), 5.0, &pipe));
        assert!(!overlap_circle_vs_segment(DVec2::new(40.0, 40.0), 5.0, &pipe));
        // The two arcs disagree on which side is solid
        assert!(moon.closest_point(DVec2::new(10.0, 10.0)).back_facing);
        assert!(!pipe.closest_point(DVec2::new(10.0, 10.0)).back_facing);
    }

    #[test]
    fn test_orientation_vectors() {
        assert_eq!(orientation_to_vector(0), DVec2::X);
        assert_eq!(orientation_to_vector(2), DVec2::Y);
        assert_eq!(orientation_to_vector(4), DVec2::NEG_X);
        assert_eq!(orientation_to_vector(6), DVec2::NEG_Y);
        assert_eq!(orientation_to_vector(8), DVec2::X);
        for o in 0..8 {
            assert!((orientation_to_vector(o).length() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_square_penetration_picks_shallow_axis() {
        let pen = penetration_square_vs_point(DVec2::ZERO, DVec2::new(2.0, -15.0), 19.0).unwrap();
        assert_eq!(pen.normal, DVec2::NEG_Y);
        assert_eq!(pen.depth, 4.0);
        assert_eq!(pen.cross_depth, 17.0);
        assert!(penetration_square_vs_point(DVec2::ZERO, DVec2::new(19.0, 0.0), 19.0).is_none());
    }

    #[test]
    fn test_circle_time_of_intersection() {
        let t = time_of_intersection_circle_vs_circle(
            DVec2::new(-10.0, 0.0),
            DVec2::new(10.0, 0.0),
            DVec2::ZERO,
            5.0,
        );
        assert!((t - 0.5).abs() < 1e-12);
        // Already touching
        assert_eq!(
            time_of_intersection_circle_vs_circle(DVec2::new(1.0, 0.0), DVec2::X, DVec2::ZERO, 5.0),
            0.0
        );
        // Moving away
        assert_eq!(
            time_of_intersection_circle_vs_circle(DVec2::new(-10.0, 0.0), DVec2::NEG_X, DVec2::ZERO, 5.0),
            1.0
        );
    }

    #[test]
    fn test_arc_time_of_intersection_from_outside() {
        // Moving diagonally towards a quarter moon centred at the origin
        let t = time_of_intersection_circle_vs_arc(
            DVec2::new(40.0, 40.0),
            DVec2::new(-20.0, -20.0),
            DVec2::ZERO,
            DVec2::new(1.0, 1.0),
            24.0,
            5.0,
        );
        let expected = (40.0 * std::f64::consts::SQRT_2 - 29.0) / (20.0 * std::f64::consts::SQRT_2);
        assert!((t - expected).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn overlap_is_symmetric(
            x1 in -100.0f64..100.0, y1 in -100.0f64..100.0, r1 in 0.0f64..20.0,
            x2 in -100.0f64..100.0, y2 in -100.0f64..100.0, r2 in 0.0f64..20.0,
        ) {
            let a = DVec2::new(x1, y1);
            let b = DVec2::new(x2, y2);
            prop_assert_eq!(
                overlap_circle_vs_circle(a, r1, b, r2),
                overlap_circle_vs_circle(b, r2, a, r1)
            );
        }

        #[test]
        fn swept_time_is_a_fraction(
            x in -50.0f64..50.0, y in -50.0f64..50.0,
            vx in -10.0f64..10.0, vy in -10.0f64..10.0,
        ) {
            let seg = Segment::linear(DVec2::new(24.0, 0.0), DVec2::new(0.0, 0.0));
            let t = seg.intersect_with_ray(DVec2::new(x, y), DVec2::new(vx, vy), 5.0);
            prop_assert!((0.0..=1.0).contains(&t));
        }
    }
}
