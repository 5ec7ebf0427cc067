use glam::DVec2;
use thiserror::Error;

use crate::aabb::Aabb;

/// User-defined opaque key carried on entities and triggers (e.g., pack your
/// entity id or a ladder/zone code).
pub type Tag = u64;

/// Stable collider handle. Issued by the world, never reused after removal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColliderId(pub u64);

/// Role of a collider during resolution.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColliderKind {
    /// Level geometry; blocks on both axes.
    StaticTile,
    /// Sloped level geometry; supports from above, never clips X.
    StaticRamp,
    /// Kinematic surface that carries riders; blocks like a tile.
    MovingPlatform,
    /// Game entity; queryable, never blocks.
    DynamicEntity,
    /// Overlap-only volume (ladders, zones); never blocks.
    Trigger,
}

/// Geometry of a collider.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColliderShape {
    Aabb,
    Ramp(RampKind),
}

/// Which way a ramp's walkable surface rises.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RampKind {
    /// Surface climbs toward +x: ground level at `min.x`, top at `max.x`.
    RisingRight,
    /// Surface climbs toward -x.
    RisingLeft,
}

/// Surface properties attached to a collider. Pure data: the integrator only
/// reads `conveyor` and `one_way`; the rest is surfaced to controllers and
/// game code through contacts. Immutable once inserted.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Material {
    /// 0 = frictionless, 1 = full grip. Scales ground acceleration.
    pub friction: f64,
    /// Bounce energy retained, >= 0. Never applied by the integrator.
    pub restitution: f64,
    /// Wall-cling strength in [0, 1], for game-side use.
    pub stickiness: f64,
    /// Surface velocity dragged onto riders standing on this collider.
    pub conveyor: Option<DVec2>,
    /// Climbable while overlapped; meaningful on triggers.
    pub ladder: bool,
    /// Blocks only downward motion across its top face.
    pub one_way: bool,
    /// Hanging from the underside is allowed while the grab input is held.
    pub ceiling_grab: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self::solid()
    }
}

impl Material {
    pub fn solid() -> Self {
        Self {
            friction: 1.0,
            restitution: 0.0,
            stickiness: 0.0,
            conveyor: None,
            ladder: false,
            one_way: false,
            ceiling_grab: false,
        }
    }

    pub fn one_way() -> Self {
        Self {
            one_way: true,
            ..Self::solid()
        }
    }

    pub fn ladder() -> Self {
        Self {
            ladder: true,
            ..Self::solid()
        }
    }

    pub fn conveyor(velocity: DVec2) -> Self {
        Self {
            conveyor: Some(velocity),
            ..Self::solid()
        }
    }

    pub fn ice() -> Self {
        Self {
            friction: 0.05,
            ..Self::solid()
        }
    }

    /// Clamp scalar fields into their documented ranges. The world applies
    /// this at insertion, so stored materials are always sane.
    pub fn sanitized(mut self) -> Self {
        let unit = |v: f64, fallback: f64| {
            if v.is_finite() { v.clamp(0.0, 1.0) } else { fallback }
        };
        self.friction = unit(self.friction, 1.0);
        self.stickiness = unit(self.stickiness, 0.0);
        self.restitution = if self.restitution.is_finite() {
            self.restitution.max(0.0)
        } else {
            0.0
        };
        if let Some(v) = self.conveyor {
            if !v.is_finite() {
                self.conveyor = None;
            }
        }
        self
    }
}

/// A collider as stored by the world.
#[derive(Copy, Clone, Debug)]
pub struct Collider {
    pub id: ColliderId,
    pub aabb: Aabb,
    pub shape: ColliderShape,
    pub kind: ColliderKind,
    pub material: Material,
    /// Opaque game-side key; 0 for plain level geometry.
    pub tag: Tag,
}

/// One blocking contact produced by `integrate`. Valid for the tick that
/// produced it.
#[derive(Copy, Clone, Debug)]
pub struct Contact {
    pub other: ColliderId,
    /// Unit normal pointing from the obstacle into the body.
    pub normal: DVec2,
    /// Displacement removed along the blocked axis, >= 0.
    pub depth: f64,
    /// Representative point on the touched face.
    pub point: DVec2,
}

/// Static penetration result for overlap queries. `normal` points from `b`
/// into `a` along the axis of least penetration.
#[derive(Copy, Clone, Debug)]
pub struct Overlap {
    pub normal: DVec2,
    pub depth: f64,
    pub contact: DVec2,
}

/// Per-tick contact classification. Rebuild every tick: `reset`, then
/// `absorb` each contact in order.
#[derive(Clone, Debug, Default)]
pub struct CollisionState {
    pub grounded: bool,
    pub ceiling: bool,
    /// Touching a wall on the body's left side (obstacle normal +x).
    pub wall_left: bool,
    /// Touching a wall on the body's right side (obstacle normal -x).
    pub wall_right: bool,
    /// First ground contact this tick, if any.
    pub ground_id: Option<ColliderId>,
    /// First ground contact that was a moving platform.
    pub platform_id: Option<ColliderId>,
    /// First ceiling contact this tick, if any.
    pub ceiling_id: Option<ColliderId>,
    /// Material under the first ground contact.
    pub ground_material: Option<Material>,
}

impl CollisionState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Bucket one contact by its dominant normal axis. Steep ramp normals
    /// (|y| <= 0.5) land in the wall buckets.
    pub fn absorb(&mut self, contact: &Contact, collider: &Collider) {
        let n = contact.normal;
        if n.y < -0.5 {
            self.grounded = true;
            if self.ground_id.is_none() {
                self.ground_id = Some(collider.id);
                self.ground_material = Some(collider.material);
            }
            if self.platform_id.is_none() && collider.kind == ColliderKind::MovingPlatform {
                self.platform_id = Some(collider.id);
            }
        } else if n.y > 0.5 {
            self.ceiling = true;
            if self.ceiling_id.is_none() {
                self.ceiling_id = Some(collider.id);
            }
        } else if n.x > 0.5 {
            self.wall_left = true;
        } else if n.x < -0.5 {
            self.wall_right = true;
        }
    }

    pub fn on_wall(&self) -> bool {
        self.wall_left || self.wall_right
    }

    pub fn on_platform(&self) -> bool {
        self.platform_id.is_some()
    }
}

/// A controller-owned kinematic body: center position plus half extents.
/// The world never stores bodies; it resolves the motion you hand it.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Body {
    pub position: DVec2,
    pub velocity: DVec2,
    pub half_extent: DVec2,
}

impl Body {
    pub fn new(position: DVec2, half_extent: DVec2) -> Self {
        Self {
            position,
            velocity: DVec2::ZERO,
            half_extent,
        }
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_center_half_extents(self.position, self.half_extent)
    }

    /// Feet edge; +y down, so this is `max.y`.
    pub fn bottom(&self) -> f64 {
        self.position.y + self.half_extent.y
    }

    pub fn top(&self) -> f64 {
        self.position.y - self.half_extent.y
    }

    pub fn left(&self) -> f64 {
        self.position.x - self.half_extent.x
    }

    pub fn right(&self) -> f64 {
        self.position.x + self.half_extent.x
    }
}

/// World-level tuning.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldConfig {
    /// Grid cell size in world units; one tile (32-64 px) works well. Small
    /// cells make queries selective but large colliders span many buckets.
    pub cell_size: f64,
    /// Added to body velocity each tick before displacement; +y down.
    pub gravity: DVec2,
    /// Tolerance for flush and one-way comparisons.
    pub contact_eps: f64,
    /// Max vertical snap onto a support (ramp surfaces, slow-descending
    /// platforms) per tick.
    pub ramp_snap: f64,
    /// Pre-reservation hint for the collider registry.
    pub collider_capacity: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            cell_size: 32.0,
            gravity: DVec2::new(0.0, 1800.0),
            contact_eps: 1e-6,
            ramp_snap: 2.0,
            collider_capacity: 256,
        }
    }
}

/// Per-call knobs for `integrate`.
#[derive(Copy, Clone, Debug)]
pub struct IntegrateOptions {
    /// Extra displacement applied this tick on top of `velocity * dt`
    /// (knockback, external pushes). Resolved against geometry like any
    /// other motion.
    pub extra_displacement: DVec2,
    /// When false, one-way surfaces are ignored entirely (drop-through).
    pub allow_one_way: bool,
    /// Scales gravity for this call: 0 while climbing, <1 for gliders.
    pub gravity_scale: f64,
}

impl Default for IntegrateOptions {
    fn default() -> Self {
        Self {
            extra_displacement: DVec2::ZERO,
            allow_one_way: true,
            gravity_scale: 1.0,
        }
    }
}

/// Debug snapshot of registry and grid occupancy.
#[derive(Copy, Clone, Debug, Default)]
pub struct WorldStats {
    pub colliders: usize,
    pub occupied_cells: usize,
    pub largest_bucket: usize,
}

/// Errors surfaced by world construction and mutation calls.
#[derive(Debug, Error, PartialEq)]
pub enum WorldError {
    /// Inserted box had non-positive extent or non-finite bounds.
    #[error("degenerate aabb (min {min:?}, max {max:?})")]
    DegenerateAabb { min: DVec2, max: DVec2 },
}
