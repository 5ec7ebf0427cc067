use glam::DVec2;

use crate::aabb::Aabb;
use crate::types::*;

/// Public API contract for the kinematic platformer world.
pub trait WorldApi {
    /// Construct a new world with the given configuration.
    fn new(cfg: WorldConfig) -> Self
    where
        Self: Sized;

    // --- Construction ------------------------------------------------------

    /// Insert level geometry that blocks on both axes.
    fn add_static_tile(&mut self, aabb: Aabb, material: Material) -> Result<ColliderId, WorldError>;

    /// Insert a sloped surface. The walkable diagonal spans the box; ramps
    /// support bodies from above and never clip horizontal motion.
    fn add_static_ramp(
        &mut self,
        aabb: Aabb,
        kind: RampKind,
        material: Material,
    ) -> Result<ColliderId, WorldError>;

    /// Insert a rider-carrying surface. The caller moves it each tick with
    /// `update_collider_aabb` and mirrors its velocity with
    /// `set_platform_velocity` so riders can be dragged along.
    fn add_moving_platform(
        &mut self,
        aabb: Aabb,
        material: Material,
        velocity: DVec2,
    ) -> Result<ColliderId, WorldError>;

    /// Insert a queryable game entity. Never blocks anything.
    fn add_dynamic_entity(
        &mut self,
        aabb: Aabb,
        material: Material,
        tag: Tag,
    ) -> Result<ColliderId, WorldError>;

    /// Insert an overlap-only volume (ladder, damage zone, checkpoint).
    fn add_trigger(
        &mut self,
        aabb: Aabb,
        material: Material,
        tag: Tag,
    ) -> Result<ColliderId, WorldError>;

    // --- Mutation ----------------------------------------------------------

    /// Remove a collider and return it. Unknown ids warn and return `None`.
    fn remove_collider(&mut self, id: ColliderId) -> Option<Collider>;

    /// Move or resize a collider, re-indexing the grid only when its covered
    /// cell range changed. Unknown ids and degenerate boxes warn and return
    /// false.
    fn update_collider_aabb(&mut self, id: ColliderId, aabb: Aabb) -> bool;

    /// Record the velocity riders of this platform are carried at.
    fn set_platform_velocity(&mut self, id: ColliderId, velocity: DVec2) -> bool;

    // --- Queries -----------------------------------------------------------

    fn collider(&self, id: ColliderId) -> Option<&Collider>;

    /// Carry velocity of a platform; zero for unknown or non-platform ids.
    fn platform_velocity(&self, id: ColliderId) -> DVec2;

    /// Ids of colliders indexed in any grid cell the region touches, sorted
    /// ascending. A superset: exact overlap filtering is the caller's job.
    fn query_region(&self, region: &Aabb) -> Vec<ColliderId>;

    /// Trigger colliders genuinely intersecting the region (positive area).
    fn overlapping_triggers(&self, region: &Aabb) -> Vec<ColliderId>;

    // --- Debug -------------------------------------------------------------

    /// Snapshot of every collider, sorted by id. Render/debug surface; the
    /// simulation never reads it.
    fn debug_all_colliders(&self) -> Vec<Collider>;

    /// Registry and grid occupancy counters.
    fn debug_stats(&self) -> WorldStats;

    // --- Integration -------------------------------------------------------

    /// Advance one body by one tick: apply gravity, resolve the displacement
    /// axis by axis against blocking geometry, apply platform carry and
    /// conveyor drag, and return every blocking contact.
    ///
    /// `id` is the body's registered collider, if it has one; its stored
    /// AABB is kept in sync with the resolved position. Zero, negative, or
    /// non-finite `dt` is a no-op.
    fn integrate(
        &mut self,
        id: Option<ColliderId>,
        body: &mut Body,
        dt: f64,
        opts: IntegrateOptions,
    ) -> Vec<Contact>;
}

/// Pure geometry helpers used by the integrator, exposed for game code and
/// tests. All functions are stateless.
pub trait NarrowphaseApi {
    // Axis clipping ---------------------------------------------------------

    /// Clip a horizontal displacement against one blocker. `None` when the
    /// blocker cannot restrict this motion (no real Y-band overlap, wrong
    /// side, already overlapping, or out of reach). `Some(allowed)` keeps
    /// the sign of `dx` and never exceeds it in magnitude.
    fn clip_dx(mover: &Aabb, dx: f64, blocker: &Aabb, eps: f64) -> Option<f64>;

    /// Vertical counterpart of `clip_dx`.
    fn clip_dy(mover: &Aabb, dy: f64, blocker: &Aabb, eps: f64) -> Option<f64>;

    // Ramps -----------------------------------------------------------------

    /// World y of the ramp surface under the footprint `[x0, x1]`, sampled
    /// at the supported (higher) edge of the overlap. `None` without
    /// horizontal overlap.
    fn ramp_surface_y(ramp: &Aabb, kind: RampKind, x0: f64, x1: f64) -> Option<f64>;

    /// Unit normal of the walkable surface, pointing up and away.
    fn ramp_normal(ramp: &Aabb, kind: RampKind) -> DVec2;

    // One-way gate ----------------------------------------------------------

    /// Whether a one-way top face participates as a blocker: the body must
    /// be moving down (or riding flush) and its pre-step feet must have been
    /// at or above the face, within `tolerance`.
    fn one_way_blocks(bottom_before: f64, dy: f64, surface_top: f64, tolerance: f64) -> bool;

    // Overlaps --------------------------------------------------------------

    /// Static penetration along the axis of least overlap; normal points
    /// from `b` into `a`. Edge contact reports depth 0.
    fn overlap_aabb_aabb(a: &Aabb, b: &Aabb) -> Option<Overlap>;
}
