use glam::DVec2;
use log::warn;
use rustc_hash::FxHashMap;

use crate::aabb::Aabb;
use crate::api::{NarrowphaseApi, WorldApi};
use crate::grid::SpatialGrid;
use crate::narrowphase::Narrowphase;
use crate::types::*;

/// Collider registry, spatial hash broad phase, and the kinematic
/// move-and-clamp integrator. Deterministic: candidate colliders are always
/// visited in ascending id order and ties clamp to the lowest id, so no hash
/// iteration order ever reaches resolution.
pub struct World {
    pub cfg: WorldConfig,

    // Registry and index
    colliders: FxHashMap<ColliderId, Collider>,
    grid: SpatialGrid,
    platform_vel: FxHashMap<ColliderId, DVec2>,
    next_id: u64,

    // Reused candidate buffer for integrate's broad-phase sweeps
    scratch: Vec<ColliderId>,
}

impl WorldApi for World {
    fn new(cfg: WorldConfig) -> Self {
        let cfg = sanitize_config(cfg);
        let mut colliders = FxHashMap::default();
        colliders.reserve(cfg.collider_capacity);
        Self {
            grid: SpatialGrid::new(cfg.cell_size),
            cfg,
            colliders,
            platform_vel: FxHashMap::default(),
            next_id: 0,
            scratch: Vec::new(),
        }
    }

    fn add_static_tile(&mut self, aabb: Aabb, material: Material) -> Result<ColliderId, WorldError> {
        self.insert(aabb, ColliderShape::Aabb, ColliderKind::StaticTile, material, 0)
    }

    fn add_static_ramp(
        &mut self,
        aabb: Aabb,
        kind: RampKind,
        material: Material,
    ) -> Result<ColliderId, WorldError> {
        self.insert(aabb, ColliderShape::Ramp(kind), ColliderKind::StaticRamp, material, 0)
    }

    fn add_moving_platform(
        &mut self,
        aabb: Aabb,
        material: Material,
        velocity: DVec2,
    ) -> Result<ColliderId, WorldError> {
        let id = self.insert(aabb, ColliderShape::Aabb, ColliderKind::MovingPlatform, material, 0)?;
        let v = if velocity.is_finite() { velocity } else { DVec2::ZERO };
        self.platform_vel.insert(id, v);
        Ok(id)
    }

    fn add_dynamic_entity(
        &mut self,
        aabb: Aabb,
        material: Material,
        tag: Tag,
    ) -> Result<ColliderId, WorldError> {
        self.insert(aabb, ColliderShape::Aabb, ColliderKind::DynamicEntity, material, tag)
    }

    fn add_trigger(
        &mut self,
        aabb: Aabb,
        material: Material,
        tag: Tag,
    ) -> Result<ColliderId, WorldError> {
        self.insert(aabb, ColliderShape::Aabb, ColliderKind::Trigger, material, tag)
    }

    fn remove_collider(&mut self, id: ColliderId) -> Option<Collider> {
        match self.colliders.remove(&id) {
            Some(col) => {
                self.grid.remove(id, &col.aabb);
                self.platform_vel.remove(&id);
                Some(col)
            }
            None => {
                warn!("remove_collider: unknown id {:?}", id);
                None
            }
        }
    }

    fn update_collider_aabb(&mut self, id: ColliderId, aabb: Aabb) -> bool {
        if !aabb.is_valid() {
            warn!("update_collider_aabb: rejecting degenerate aabb for {:?}", id);
            return false;
        }
        let Some(col) = self.colliders.get(&id) else {
            warn!("update_collider_aabb: unknown id {:?}", id);
            return false;
        };
        let old = col.aabb;
        self.grid.update(id, &old, &aabb);
        if let Some(col) = self.colliders.get_mut(&id) {
            col.aabb = aabb;
        }
        true
    }

    fn set_platform_velocity(&mut self, id: ColliderId, velocity: DVec2) -> bool {
        if !self.colliders.contains_key(&id) {
            warn!("set_platform_velocity: unknown id {:?}", id);
            return false;
        }
        let v = if velocity.is_finite() { velocity } else { DVec2::ZERO };
        self.platform_vel.insert(id, v);
        true
    }

    fn collider(&self, id: ColliderId) -> Option<&Collider> {
        self.colliders.get(&id)
    }

    fn platform_velocity(&self, id: ColliderId) -> DVec2 {
        self.platform_vel.get(&id).copied().unwrap_or(DVec2::ZERO)
    }

    fn query_region(&self, region: &Aabb) -> Vec<ColliderId> {
        self.grid.query_region(region)
    }

    fn overlapping_triggers(&self, region: &Aabb) -> Vec<ColliderId> {
        self.grid
            .query_region(region)
            .into_iter()
            .filter(|id| {
                self.colliders
                    .get(id)
                    .map(|c| c.kind == ColliderKind::Trigger && c.aabb.overlaps_strictly(region))
                    .unwrap_or(false)
            })
            .collect()
    }

    fn integrate(
        &mut self,
        id: Option<ColliderId>,
        body: &mut Body,
        dt: f64,
        opts: IntegrateOptions,
    ) -> Vec<Contact> {
        let mut contacts = Vec::new();
        if !dt.is_finite() || dt <= 0.0 {
            return contacts;
        }

        let gravity_scale = if opts.gravity_scale.is_finite() {
            opts.gravity_scale
        } else {
            1.0
        };
        body.velocity += self.cfg.gravity * gravity_scale * dt;

        let extra = if opts.extra_displacement.is_finite() {
            opts.extra_displacement
        } else {
            DVec2::ZERO
        };
        let disp = body.velocity * dt + extra;

        // The one-way gate compares against the feet before any motion.
        let pre_bottom = body.bottom();

        self.resolve_axis_x(id, body, disp.x, &mut contacts);
        self.resolve_axis_y(id, body, disp.y, pre_bottom, opts.allow_one_way, &mut contacts);

        // Riding: carried by the first platform underfoot, dragged by the
        // first conveyor underfoot. Positional adds, not velocity changes.
        let mut carry: Option<DVec2> = None;
        let mut belt: Option<DVec2> = None;
        for c in contacts.iter().filter(|c| c.normal.y < -0.5) {
            let Some(col) = self.colliders.get(&c.other) else {
                continue;
            };
            if carry.is_none() && col.kind == ColliderKind::MovingPlatform {
                carry = Some(self.platform_vel.get(&col.id).copied().unwrap_or(DVec2::ZERO));
            }
            if belt.is_none() {
                belt = col.material.conveyor;
            }
        }
        let ride = carry.unwrap_or(DVec2::ZERO) + belt.unwrap_or(DVec2::ZERO);
        if ride != DVec2::ZERO {
            body.position += ride * dt;
        }

        // Keep the registry in sync for registered bodies.
        if let Some(id) = id {
            if let Some(col) = self.colliders.get(&id) {
                let old = col.aabb;
                let new = body.aabb();
                if old != new {
                    self.grid.update(id, &old, &new);
                    if let Some(col) = self.colliders.get_mut(&id) {
                        col.aabb = new;
                    }
                }
            }
        }

        contacts
    }

    fn debug_all_colliders(&self) -> Vec<Collider> {
        let mut out: Vec<Collider> = self.colliders.values().copied().collect();
        out.sort_unstable_by_key(|c| c.id);
        out
    }

    fn debug_stats(&self) -> WorldStats {
        WorldStats {
            colliders: self.colliders.len(),
            occupied_cells: self.grid.occupied_cells(),
            largest_bucket: self.grid.largest_bucket(),
        }
    }
}

impl World {
    fn insert(
        &mut self,
        aabb: Aabb,
        shape: ColliderShape,
        kind: ColliderKind,
        material: Material,
        tag: Tag,
    ) -> Result<ColliderId, WorldError> {
        if !aabb.is_valid() {
            return Err(WorldError::DegenerateAabb {
                min: aabb.min,
                max: aabb.max,
            });
        }
        let id = ColliderId(self.next_id);
        self.next_id += 1;
        self.grid.insert(id, &aabb);
        self.colliders.insert(
            id,
            Collider {
                id,
                aabb,
                shape,
                kind,
                material: material.sanitized(),
                tag,
            },
        );
        Ok(id)
    }

    /// Whether `col` blocks horizontal motion. One-way surfaces never do.
    fn clip_x_against(col: &Collider, start: &Aabb, dx: f64, eps: f64) -> Option<f64> {
        if !matches!(col.kind, ColliderKind::StaticTile | ColliderKind::MovingPlatform) {
            return None;
        }
        if col.material.one_way {
            return None;
        }
        Narrowphase::clip_dx(start, dx, &col.aabb, eps)
    }

    /// Clip upward motion against undersides. One-way surfaces and ramps
    /// never block from below.
    fn ceiling_clip(col: &Collider, start: &Aabb, dy: f64, eps: f64) -> Option<f64> {
        if !matches!(col.kind, ColliderKind::StaticTile | ColliderKind::MovingPlatform) {
            return None;
        }
        if matches!(col.shape, ColliderShape::Ramp(_)) {
            return None;
        }
        if col.material.one_way {
            return None;
        }
        Narrowphase::clip_dy(start, dy, &col.aabb, eps)
    }

    /// Signed displacement that would rest the feet on this top face, if the
    /// face supports the body this tick. Beyond the natural reach `dy`, a
    /// face within `snap` still supports (slow-descending platforms, shallow
    /// steps), and shallow penetration up to `snap` pops back out, which is
    /// what keeps riders attached to platforms moving upward.
    fn landing_gap(
        col: &Collider,
        start: &Aabb,
        dy: f64,
        pre_bottom: f64,
        allow_one_way: bool,
        eps: f64,
        snap: f64,
    ) -> Option<f64> {
        if !matches!(col.kind, ColliderKind::StaticTile | ColliderKind::MovingPlatform) {
            return None;
        }
        if matches!(col.shape, ColliderShape::Ramp(_)) {
            return None;
        }
        if col.material.one_way
            && !(allow_one_way
                && Narrowphase::one_way_blocks(pre_bottom, dy, col.aabb.min.y, snap + eps))
        {
            return None;
        }
        if let Some(clip) = Narrowphase::clip_dy(start, dy, &col.aabb, eps) {
            return Some(clip);
        }
        // Out of natural reach: the glue window.
        if start.min.x >= col.aabb.max.x - eps || start.max.x <= col.aabb.min.x + eps {
            return None;
        }
        let gap = col.aabb.min.y - start.max.y;
        if gap.abs() <= snap { Some(gap) } else { None }
    }

    fn resolve_axis_x(
        &mut self,
        skip: Option<ColliderId>,
        body: &mut Body,
        dx: f64,
        contacts: &mut Vec<Contact>,
    ) {
        if !dx.is_finite() {
            body.velocity.x = 0.0;
            return;
        }
        if dx == 0.0 {
            return;
        }
        let start = body.aabb();
        let swept = start.swept_by(DVec2::new(dx, 0.0));
        let mut candidates = std::mem::take(&mut self.scratch);
        self.grid.query_region_into(&swept, &mut candidates);
        let eps = self.cfg.contact_eps;

        let mut allowed = dx;
        let mut blocked = false;
        for &cid in &candidates {
            if Some(cid) == skip {
                continue;
            }
            let Some(col) = self.colliders.get(&cid) else {
                continue;
            };
            if let Some(clip) = Self::clip_x_against(col, &start, dx, eps) {
                blocked = true;
                if clip.abs() < allowed.abs() {
                    allowed = clip;
                }
            }
        }
        if !blocked {
            body.position.x += dx;
            self.scratch = candidates;
            return;
        }

        // Every collider flush with the final clamp gets a contact; the
        // first face seen (lowest id) re-anchors the position exactly.
        let normal = DVec2::new(if dx > 0.0 { -1.0 } else { 1.0 }, 0.0);
        let mut snap_face: Option<f64> = None;
        for &cid in &candidates {
            if Some(cid) == skip {
                continue;
            }
            let Some(col) = self.colliders.get(&cid) else {
                continue;
            };
            if let Some(clip) = Self::clip_x_against(col, &start, dx, eps) {
                if (clip - allowed).abs() > eps {
                    continue;
                }
                let face = if dx > 0.0 { col.aabb.min.x } else { col.aabb.max.x };
                let y0 = start.min.y.max(col.aabb.min.y);
                let y1 = start.max.y.min(col.aabb.max.y);
                contacts.push(Contact {
                    other: cid,
                    normal,
                    depth: (dx - clip).abs(),
                    point: DVec2::new(face, (y0 + y1) * 0.5),
                });
                if snap_face.is_none() {
                    snap_face = Some(face);
                }
            }
        }
        if let Some(face) = snap_face {
            body.position.x = if dx > 0.0 {
                face - body.half_extent.x
            } else {
                face + body.half_extent.x
            };
        } else {
            body.position.x += allowed;
        }
        body.velocity.x = 0.0;
        self.scratch = candidates;
    }

    fn resolve_axis_y(
        &mut self,
        skip: Option<ColliderId>,
        body: &mut Body,
        dy: f64,
        pre_bottom: f64,
        allow_one_way: bool,
        contacts: &mut Vec<Contact>,
    ) {
        if !dy.is_finite() {
            body.velocity.y = 0.0;
            return;
        }
        if dy == 0.0 {
            return;
        }
        let start = body.aabb();
        // Descents sweep at least the snap distance so glue-range supports
        // show up as candidates.
        let sweep_dy = if dy >= 0.0 { dy.max(self.cfg.ramp_snap) } else { dy };
        let swept = start.swept_by(DVec2::new(0.0, sweep_dy));
        let mut candidates = std::mem::take(&mut self.scratch);
        self.grid.query_region_into(&swept, &mut candidates);
        let eps = self.cfg.contact_eps;
        let snap = self.cfg.ramp_snap;

        if dy < 0.0 {
            // Rising: clip against undersides only.
            let mut allowed = dy;
            let mut blocked = false;
            for &cid in &candidates {
                if Some(cid) == skip {
                    continue;
                }
                let Some(col) = self.colliders.get(&cid) else {
                    continue;
                };
                if let Some(clip) = Self::ceiling_clip(col, &start, dy, eps) {
                    blocked = true;
                    if clip.abs() < allowed.abs() {
                        allowed = clip;
                    }
                }
            }
            if !blocked {
                body.position.y += dy;
                self.scratch = candidates;
                return;
            }
            let mut snap_face: Option<f64> = None;
            for &cid in &candidates {
                if Some(cid) == skip {
                    continue;
                }
                let Some(col) = self.colliders.get(&cid) else {
                    continue;
                };
                if let Some(clip) = Self::ceiling_clip(col, &start, dy, eps) {
                    if (clip - allowed).abs() > eps {
                        continue;
                    }
                    let x0 = start.min.x.max(col.aabb.min.x);
                    let x1 = start.max.x.min(col.aabb.max.x);
                    contacts.push(Contact {
                        other: cid,
                        normal: DVec2::new(0.0, 1.0),
                        depth: (dy - clip).abs(),
                        point: DVec2::new((x0 + x1) * 0.5, col.aabb.max.y),
                    });
                    if snap_face.is_none() {
                        snap_face = Some(col.aabb.max.y);
                    }
                }
            }
            if let Some(face) = snap_face {
                body.position.y = face + body.half_extent.y;
            } else {
                body.position.y += allowed;
            }
            body.velocity.y = 0.0;
            self.scratch = candidates;
            return;
        }

        // Descending (or riding flush): land on box tops and ramp surfaces.
        let bottom = start.max.y;
        let mut allowed = dy;
        let mut landed = false;
        for &cid in &candidates {
            if Some(cid) == skip {
                continue;
            }
            let Some(col) = self.colliders.get(&cid) else {
                continue;
            };
            if let Some(gap) =
                Self::landing_gap(col, &start, dy, pre_bottom, allow_one_way, eps, snap)
            {
                // The first support replaces the free fall outright so glue
                // beyond dy can extend the step; after that, highest wins.
                if !landed || gap < allowed {
                    allowed = gap;
                }
                landed = true;
            }
        }

        let mut support: Option<(ColliderId, f64)> = None;
        for &cid in &candidates {
            if Some(cid) == skip {
                continue;
            }
            let Some(col) = self.colliders.get(&cid) else {
                continue;
            };
            let ColliderShape::Ramp(kind) = col.shape else {
                continue;
            };
            let Some(surface) =
                Narrowphase::ramp_surface_y(&col.aabb, kind, start.min.x, start.max.x)
            else {
                continue;
            };
            let to_surface = surface - bottom;
            let within_snap = to_surface.abs() <= snap;
            let crossing = bottom <= surface + eps && bottom + dy >= surface - eps;
            if !(within_snap || crossing) {
                continue;
            }
            match support {
                Some((_, s)) if s <= surface => {}
                _ => support = Some((cid, surface)),
            }
        }
        if let Some((_, surface)) = support {
            let rdy = surface - bottom;
            if rdy <= allowed + eps || !landed {
                allowed = rdy;
            } else {
                // Resting on a box above the ramp surface.
                support = None;
            }
        }

        if !landed && support.is_none() {
            body.position.y += dy;
            self.scratch = candidates;
            return;
        }

        let mut snap_face: Option<f64> = None;
        for &cid in &candidates {
            if Some(cid) == skip {
                continue;
            }
            let Some(col) = self.colliders.get(&cid) else {
                continue;
            };
            if let Some(gap) =
                Self::landing_gap(col, &start, dy, pre_bottom, allow_one_way, eps, snap)
            {
                if (gap - allowed).abs() > eps {
                    continue;
                }
                let x0 = start.min.x.max(col.aabb.min.x);
                let x1 = start.max.x.min(col.aabb.max.x);
                contacts.push(Contact {
                    other: cid,
                    normal: DVec2::new(0.0, -1.0),
                    depth: (dy - gap).abs(),
                    point: DVec2::new((x0 + x1) * 0.5, col.aabb.min.y),
                });
                if snap_face.is_none() {
                    snap_face = Some(col.aabb.min.y);
                }
            }
        }
        if let Some((rid, surface)) = support {
            if let Some(col) = self.colliders.get(&rid) {
                if let ColliderShape::Ramp(kind) = col.shape {
                    contacts.push(Contact {
                        other: rid,
                        normal: Narrowphase::ramp_normal(&col.aabb, kind),
                        depth: (dy - allowed).abs(),
                        point: DVec2::new(
                            body.position.x.clamp(col.aabb.min.x, col.aabb.max.x),
                            surface,
                        ),
                    });
                }
            }
            body.position.y = surface - body.half_extent.y;
        } else if let Some(face) = snap_face {
            body.position.y = face - body.half_extent.y;
        } else {
            body.position.y += allowed;
        }
        body.velocity.y = 0.0;
        self.scratch = candidates;
    }
}

fn sanitize_config(mut cfg: WorldConfig) -> WorldConfig {
    cfg.cell_size = if cfg.cell_size.is_finite() {
        cfg.cell_size.max(1e-3)
    } else {
        32.0
    };
    cfg.contact_eps = if cfg.contact_eps.is_finite() {
        cfg.contact_eps.abs()
    } else {
        1e-6
    };
    cfg.ramp_snap = if cfg.ramp_snap.is_finite() {
        cfg.ramp_snap.max(0.0)
    } else {
        2.0
    };
    if !cfg.gravity.is_finite() {
        cfg.gravity = DVec2::new(0.0, 1800.0);
    }
    cfg
}
