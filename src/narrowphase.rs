use glam::DVec2;

use crate::aabb::Aabb;
use crate::api::NarrowphaseApi;
use crate::types::*;

/// Narrowphase primitive tests. Stateless; the world drives these per axis.
pub struct Narrowphase;

impl NarrowphaseApi for Narrowphase {
    fn clip_dx(mover: &Aabb, dx: f64, blocker: &Aabb, eps: f64) -> Option<f64> {
        if dx == 0.0 {
            return None;
        }
        // Y bands must genuinely overlap; flush stacking does not block X.
        if mover.min.y >= blocker.max.y - eps || mover.max.y <= blocker.min.y + eps {
            return None;
        }
        if dx > 0.0 {
            // Approaching the blocker's left face. A mover already past it
            // is never pushed back out.
            if mover.max.x > blocker.min.x + eps {
                return None;
            }
            let gap = blocker.min.x - mover.max.x;
            if dx > gap { Some(gap.max(0.0)) } else { None }
        } else {
            if mover.min.x < blocker.max.x - eps {
                return None;
            }
            let gap = blocker.max.x - mover.min.x; // <= 0
            if dx < gap { Some(gap.min(0.0)) } else { None }
        }
    }

    fn clip_dy(mover: &Aabb, dy: f64, blocker: &Aabb, eps: f64) -> Option<f64> {
        if dy == 0.0 {
            return None;
        }
        // X bands must genuinely overlap; sliding flush along a wall does
        // not block vertical motion.
        if mover.min.x >= blocker.max.x - eps || mover.max.x <= blocker.min.x + eps {
            return None;
        }
        if dy > 0.0 {
            // Falling onto the blocker's top face.
            if mover.max.y > blocker.min.y + eps {
                return None;
            }
            let gap = blocker.min.y - mover.max.y;
            if dy > gap { Some(gap.max(0.0)) } else { None }
        } else {
            // Rising into the blocker's bottom face.
            if mover.min.y < blocker.max.y - eps {
                return None;
            }
            let gap = blocker.max.y - mover.min.y; // <= 0
            if dy < gap { Some(gap.min(0.0)) } else { None }
        }
    }

    fn ramp_surface_y(ramp: &Aabb, kind: RampKind, x0: f64, x1: f64) -> Option<f64> {
        let lo = x0.max(ramp.min.x);
        let hi = x1.min(ramp.max.x);
        if lo > hi {
            return None;
        }
        let w = ramp.max.x - ramp.min.x;
        let h = ramp.max.y - ramp.min.y;
        if w <= 0.0 {
            return None;
        }
        // Sample at the supported edge of the overlap: the end nearest the
        // ramp's top, so a footprint always rests on its highest support.
        let t = match kind {
            RampKind::RisingRight => (hi - ramp.min.x) / w,
            RampKind::RisingLeft => (ramp.max.x - lo) / w,
        };
        Some(ramp.max.y - t * h)
    }

    fn ramp_normal(ramp: &Aabb, kind: RampKind) -> DVec2 {
        let w = ramp.max.x - ramp.min.x;
        let h = ramp.max.y - ramp.min.y;
        let n = match kind {
            RampKind::RisingRight => DVec2::new(-h, -w),
            RampKind::RisingLeft => DVec2::new(h, -w),
        };
        n.normalize_or_zero()
    }

    fn one_way_blocks(bottom_before: f64, dy: f64, surface_top: f64, tolerance: f64) -> bool {
        dy >= 0.0 && bottom_before <= surface_top + tolerance
    }

    fn overlap_aabb_aabb(a: &Aabb, b: &Aabb) -> Option<Overlap> {
        let ca = a.center();
        let cb = b.center();
        let ha = a.half_extents();
        let hb = b.half_extents();
        let d = cb - ca;
        let ox = (ha.x + hb.x) - d.x.abs();
        let oy = (ha.y + hb.y) - d.y.abs();
        if ox < 0.0 || oy < 0.0 {
            return None;
        }
        // Separate along the axis of least penetration; normal from b into a.
        let (depth, normal, reach) = if ox <= oy {
            let nx = if d.x >= 0.0 { -1.0 } else { 1.0 };
            (ox, DVec2::new(nx, 0.0), ha.x)
        } else {
            let ny = if d.y >= 0.0 { -1.0 } else { 1.0 };
            (oy, DVec2::new(0.0, ny), ha.y)
        };
        let clamped = DVec2::new(ca.x.clamp(b.min.x, b.max.x), ca.y.clamp(b.min.y, b.max.y));
        Some(Overlap {
            normal,
            depth,
            contact: clamped - normal * reach,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn boxx(x0: f64, y0: f64, x1: f64, y1: f64) -> Aabb {
        Aabb::new(DVec2::new(x0, y0), DVec2::new(x1, y1))
    }

    // --- Axis clipping -----------------------------------------------------

    #[test]
    fn test_clip_dx_stops_at_the_face() {
        let mover = boxx(0.0, 0.0, 16.0, 16.0);
        let wall = boxx(20.0, 0.0, 36.0, 16.0);
        let allowed = Narrowphase::clip_dx(&mover, 10.0, &wall, EPS);
        assert_eq!(allowed, Some(4.0));
        // Short of the wall: no restriction.
        assert_eq!(Narrowphase::clip_dx(&mover, 3.0, &wall, EPS), None);
    }

    #[test]
    fn test_clip_dx_flush_start_blocks_at_zero() {
        let mover = boxx(0.0, 0.0, 20.0, 16.0);
        let wall = boxx(20.0, 0.0, 36.0, 16.0);
        assert_eq!(Narrowphase::clip_dx(&mover, 5.0, &wall, EPS), Some(0.0));
    }

    #[test]
    fn test_clip_dx_moving_left_mirrors() {
        let mover = boxx(40.0, 0.0, 56.0, 16.0);
        let wall = boxx(20.0, 0.0, 36.0, 16.0);
        let allowed = Narrowphase::clip_dx(&mover, -10.0, &wall, EPS);
        assert_eq!(allowed, Some(-4.0));
    }

    #[test]
    fn test_clip_dx_never_pushes_a_penetrating_mover() {
        let mover = boxx(0.0, 0.0, 25.0, 16.0);
        let wall = boxx(20.0, 0.0, 36.0, 16.0);
        assert_eq!(Narrowphase::clip_dx(&mover, 10.0, &wall, EPS), None);
    }

    #[test]
    fn test_clip_dx_ignores_flush_y_stacking() {
        // Mover standing exactly on top of the blocker: no X restriction.
        let mover = boxx(10.0, -16.0, 26.0, 0.0);
        let tile = boxx(20.0, 0.0, 36.0, 16.0);
        assert_eq!(Narrowphase::clip_dx(&mover, 10.0, &tile, EPS), None);
    }

    #[test]
    fn test_clip_dy_lands_on_top_face() {
        let mover = boxx(0.0, 0.0, 16.0, 16.0);
        let floor = boxx(0.0, 20.0, 16.0, 36.0);
        assert_eq!(Narrowphase::clip_dy(&mover, 10.0, &floor, EPS), Some(4.0));
        assert_eq!(Narrowphase::clip_dy(&mover, 3.9, &floor, EPS), None);
    }

    #[test]
    fn test_clip_dy_rising_hits_underside() {
        let mover = boxx(0.0, 0.0, 16.0, 16.0);
        let ceiling = boxx(0.0, -20.0, 16.0, -4.0);
        assert_eq!(Narrowphase::clip_dy(&mover, -10.0, &ceiling, EPS), Some(-4.0));
    }

    #[test]
    fn test_clip_dy_ignores_flush_wall_slide() {
        // Mover flush against the blocker's left face, falling past it.
        let mover = boxx(4.0, 0.0, 20.0, 16.0);
        let wall = boxx(20.0, -50.0, 36.0, 50.0);
        assert_eq!(Narrowphase::clip_dy(&mover, 30.0, &wall, EPS), None);
    }

    // --- Ramps -------------------------------------------------------------

    #[test]
    fn test_ramp_surface_rising_right_samples_leading_edge() {
        let ramp = boxx(0.0, 68.0, 32.0, 100.0);
        let k = RampKind::RisingRight;
        let at = |x0, x1| Narrowphase::ramp_surface_y(&ramp, k, x0, x1);
        assert_eq!(at(-10.0, 0.0), Some(100.0));
        assert_eq!(at(0.0, 16.0), Some(84.0));
        assert_eq!(at(24.0, 40.0), Some(68.0));
        assert_eq!(at(40.0, 50.0), None);
    }

    #[test]
    fn test_ramp_surface_rising_left_mirrors() {
        let ramp = boxx(0.0, 68.0, 32.0, 100.0);
        let k = RampKind::RisingLeft;
        assert_eq!(Narrowphase::ramp_surface_y(&ramp, k, 0.0, 16.0), Some(68.0));
        assert_eq!(Narrowphase::ramp_surface_y(&ramp, k, 16.0, 40.0), Some(84.0));
        assert_eq!(Narrowphase::ramp_surface_y(&ramp, k, 32.0, 40.0), Some(100.0));
    }

    #[test]
    fn test_ramp_normal_is_unit_and_points_up() {
        let ramp = boxx(0.0, 68.0, 32.0, 100.0);
        let inv = 1.0 / 2.0_f64.sqrt();
        let nr = Narrowphase::ramp_normal(&ramp, RampKind::RisingRight);
        assert!((nr.x - -inv).abs() < 1e-9 && (nr.y - -inv).abs() < 1e-9);
        let nl = Narrowphase::ramp_normal(&ramp, RampKind::RisingLeft);
        assert!((nl.x - inv).abs() < 1e-9 && (nl.y - -inv).abs() < 1e-9);
        // Shallow ramp leans the normal toward vertical.
        let shallow = boxx(0.0, 84.0, 64.0, 100.0);
        let ns = Narrowphase::ramp_normal(&shallow, RampKind::RisingRight);
        assert!(ns.y < -0.9 && (ns.length() - 1.0).abs() < 1e-9);
    }

    // --- One-way gate ------------------------------------------------------

    #[test]
    fn test_one_way_gate() {
        // Feet above the face, moving down: blocks.
        assert!(Narrowphase::one_way_blocks(99.0, 5.0, 100.0, EPS));
        // Riding flush counts as down.
        assert!(Narrowphase::one_way_blocks(100.0, 0.0, 100.0, EPS));
        // Moving up never blocks.
        assert!(!Narrowphase::one_way_blocks(99.0, -5.0, 100.0, EPS));
        // Feet already below the face: passes through.
        assert!(!Narrowphase::one_way_blocks(103.0, 5.0, 100.0, EPS));
        // A wider tolerance forgives a shallow miss.
        assert!(Narrowphase::one_way_blocks(101.5, 5.0, 100.0, 2.0));
    }

    // --- Overlaps ----------------------------------------------------------

    #[test]
    fn test_overlap_picks_least_penetration_axis() {
        let a = boxx(0.0, 0.0, 4.0, 4.0);
        let b = boxx(3.0, 0.0, 7.0, 4.0);
        let o = Narrowphase::overlap_aabb_aabb(&a, &b).unwrap();
        assert_eq!(o.normal, DVec2::new(-1.0, 0.0));
        assert!((o.depth - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_overlap_edge_contact_reports_zero_depth() {
        let a = boxx(0.0, 0.0, 4.0, 4.0);
        let b = boxx(4.0, 0.0, 8.0, 4.0);
        let o = Narrowphase::overlap_aabb_aabb(&a, &b).unwrap();
        assert_eq!(o.depth, 0.0);
    }

    #[test]
    fn test_overlap_separated_is_none() {
        let a = boxx(0.0, 0.0, 4.0, 4.0);
        let b = boxx(10.0, 10.0, 14.0, 14.0);
        assert!(Narrowphase::overlap_aabb_aabb(&a, &b).is_none());
    }

    #[test]
    fn test_overlap_vertical_axis_normal() {
        let a = boxx(0.0, 0.0, 10.0, 4.0);
        let b = boxx(0.0, 3.0, 10.0, 7.0);
        let o = Narrowphase::overlap_aabb_aabb(&a, &b).unwrap();
        // b below a: push a up (-y).
        assert_eq!(o.normal, DVec2::new(0.0, -1.0));
        assert!((o.depth - 1.0).abs() < 1e-9);
    }
}
