use glam::DVec2;
use log::debug;

use crate::api::WorldApi;
use crate::types::{Body, ColliderId, CollisionState, IntegrateOptions};
use crate::world::World;

/// Tuning for the platformer character. Speeds are world units per second,
/// accelerations are exponential blend rates per second.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CharacterConfig {
    pub move_speed: f64,
    /// Horizontal blend rate while grounded, scaled by ground friction.
    pub ground_accel: f64,
    /// Horizontal blend rate while airborne.
    pub air_accel: f64,
    pub jump_impulse: f64,
    /// Mid-air jumps available after the ground jump is spent.
    pub extra_jumps: u32,
    /// Grace period after walking off a ledge during which a ground jump
    /// still registers.
    pub coyote_time: f64,
    /// Descent cap while pressing into a wall.
    pub wall_slide_speed: f64,
    /// Wall jump impulse; x is applied away from the wall, y upward.
    pub wall_jump_impulse: DVec2,
    pub climb_speed: f64,
    pub max_fall_speed: f64,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            move_speed: 160.0,
            ground_accel: 18.0,
            air_accel: 6.0,
            jump_impulse: 560.0,
            extra_jumps: 0,
            coyote_time: 0.1,
            wall_slide_speed: 70.0,
            wall_jump_impulse: DVec2::new(240.0, 520.0),
            climb_speed: 110.0,
            max_fall_speed: 900.0,
        }
    }
}

impl CharacterConfig {
    /// Replaces non-finite or negative tuning values with defaults.
    pub fn sanitized(self) -> Self {
        let d = Self::default();
        let nn = |v: f64, fallback: f64| if v.is_finite() && v >= 0.0 { v } else { fallback };
        Self {
            move_speed: nn(self.move_speed, d.move_speed),
            ground_accel: nn(self.ground_accel, d.ground_accel),
            air_accel: nn(self.air_accel, d.air_accel),
            jump_impulse: nn(self.jump_impulse, d.jump_impulse),
            extra_jumps: self.extra_jumps,
            coyote_time: nn(self.coyote_time, d.coyote_time),
            wall_slide_speed: nn(self.wall_slide_speed, d.wall_slide_speed),
            wall_jump_impulse: DVec2::new(
                nn(self.wall_jump_impulse.x, d.wall_jump_impulse.x),
                nn(self.wall_jump_impulse.y, d.wall_jump_impulse.y),
            ),
            climb_speed: nn(self.climb_speed, d.climb_speed),
            max_fall_speed: nn(self.max_fall_speed, d.max_fall_speed),
        }
    }
}

/// One tick of already edge-detected input.
#[derive(Copy, Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InputSample {
    /// Horizontal intent in [-1, 1]. Out-of-range and non-finite values
    /// are clamped.
    pub move_axis: f64,
    /// True only on the tick the jump was pressed.
    pub jump_pressed: bool,
    pub grab_held: bool,
    pub climb_held: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CharacterState {
    Grounded,
    Airborne,
    WallSliding,
    Climbing,
}

/// Player-facing movement state machine on top of the kinematic integrator.
/// Owns its `Body`; holds the world collider (if registered) by id only.
pub struct CharacterController {
    pub cfg: CharacterConfig,
    pub body: Body,
    pub collider: Option<ColliderId>,
    pub state: CharacterState,
    pub collision: CollisionState,
    coyote_left: f64,
    jumps_left: u32,
}

impl CharacterController {
    pub fn new(cfg: CharacterConfig, body: Body) -> Self {
        Self {
            cfg: cfg.sanitized(),
            body,
            collider: None,
            state: CharacterState::Airborne,
            collision: CollisionState::default(),
            coyote_left: 0.0,
            jumps_left: 0,
        }
    }

    /// Ties the controller to a registered collider so the broad phase
    /// follows the body.
    pub fn with_collider(mut self, id: ColliderId) -> Self {
        self.collider = Some(id);
        self
    }

    pub fn update(&mut self, world: &mut World, input: InputSample, dt: f64) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        let axis = sanitize_axis(input.move_axis);
        let on_ladder = input.climb_held && self.touching_ladder(world);
        let grabbing = !on_ladder && input.grab_held && self.ceiling_grab_available(world);

        // Leaving the ladder drops from rest rather than at climb speed.
        if !on_ladder && self.state == CharacterState::Climbing {
            self.body.velocity.y = 0.0;
        }

        let mut gravity_scale = 1.0;
        if on_ladder {
            gravity_scale = 0.0;
            self.body.velocity.x = axis * self.cfg.climb_speed;
            self.body.velocity.y = -self.cfg.climb_speed;
        } else if grabbing {
            gravity_scale = 0.0;
            self.blend_horizontal(axis, dt);
            // Slight upward bias so the flush ceiling contact re-registers
            // every tick while hanging.
            self.body.velocity.y = -1.0;
        } else {
            self.blend_horizontal(axis, dt);
            if input.jump_pressed {
                self.try_jump();
            }
        }

        let opts = IntegrateOptions {
            gravity_scale,
            ..Default::default()
        };
        let contacts = world.integrate(self.collider, &mut self.body, dt, opts);

        if self.body.velocity.y > self.cfg.max_fall_speed {
            self.body.velocity.y = self.cfg.max_fall_speed;
        }

        self.collision.reset();
        for contact in &contacts {
            // A vanished collider counts as no contact at all.
            if let Some(col) = world.collider(contact.other) {
                self.collision.absorb(contact, col);
            }
        }

        let into_wall = (self.collision.wall_left && axis < 0.0)
            || (self.collision.wall_right && axis > 0.0);
        if !self.collision.grounded
            && into_wall
            && self.body.velocity.y > self.cfg.wall_slide_speed
        {
            self.body.velocity.y = self.cfg.wall_slide_speed;
        }

        if self.collision.grounded {
            self.coyote_left = self.cfg.coyote_time;
            self.jumps_left = self.cfg.extra_jumps;
        } else {
            self.coyote_left = (self.coyote_left - dt).max(0.0);
        }

        let next = if on_ladder {
            CharacterState::Climbing
        } else if self.collision.grounded {
            CharacterState::Grounded
        } else if into_wall && self.body.velocity.y >= 0.0 {
            CharacterState::WallSliding
        } else {
            CharacterState::Airborne
        };
        if next != self.state {
            debug!("character {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    fn try_jump(&mut self) {
        if self.collision.grounded || self.coyote_left > 0.0 {
            self.body.velocity.y = -self.cfg.jump_impulse;
            // Spent: a coyote jump must not be repeatable mid-air.
            self.coyote_left = 0.0;
        } else if self.state == CharacterState::WallSliding {
            let away = if self.collision.wall_left { 1.0 } else { -1.0 };
            self.body.velocity.x = away * self.cfg.wall_jump_impulse.x;
            self.body.velocity.y = -self.cfg.wall_jump_impulse.y;
        } else if self.jumps_left > 0 {
            self.jumps_left -= 1;
            self.body.velocity.y = -self.cfg.jump_impulse;
        }
    }

    fn blend_horizontal(&mut self, axis: f64, dt: f64) {
        let target = axis * self.cfg.move_speed;
        let rate = if self.collision.grounded {
            let friction = self
                .collision
                .ground_material
                .map(|m| m.friction)
                .unwrap_or(1.0);
            self.cfg.ground_accel * friction.max(0.05)
        } else {
            self.cfg.air_accel
        };
        let blend = 1.0 - (-rate * dt).exp();
        self.body.velocity.x += (target - self.body.velocity.x) * blend;
    }

    fn touching_ladder(&self, world: &World) -> bool {
        world
            .overlapping_triggers(&self.body.aabb())
            .into_iter()
            .filter_map(|id| world.collider(id))
            .any(|c| c.material.ladder)
    }

    fn ceiling_grab_available(&self, world: &World) -> bool {
        self.collision.ceiling
            && self
                .collision
                .ceiling_id
                .and_then(|id| world.collider(id))
                .map(|c| c.material.ceiling_grab)
                .unwrap_or(false)
    }
}

fn sanitize_axis(axis: f64) -> f64 {
    if axis.is_finite() {
        axis.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aabb::Aabb;
    use crate::types::{Material, WorldConfig};

    const DT: f64 = 1.0 / 64.0;

    fn boxx(x0: f64, y0: f64, x1: f64, y1: f64) -> Aabb {
        Aabb::new(DVec2::new(x0, y0), DVec2::new(x1, y1))
    }

    fn world_with_floor() -> (World, ColliderId) {
        let mut w = World::new(WorldConfig::default());
        let floor = w
            .add_static_tile(boxx(-200.0, 100.0, 400.0, 132.0), Material::solid())
            .unwrap();
        (w, floor)
    }

    fn standing_character() -> CharacterController {
        CharacterController::new(
            CharacterConfig::default(),
            Body::new(DVec2::new(100.0, 92.0), DVec2::new(8.0, 8.0)),
        )
    }

    fn run(c: &mut CharacterController, w: &mut World, input: InputSample, n: usize) {
        for _ in 0..n {
            c.update(w, input, DT);
        }
    }

    #[test]
    fn test_axis_is_clamped_and_nan_ignored() {
        let (mut w, _) = world_with_floor();
        let mut c = standing_character();
        run(&mut c, &mut w, InputSample::default(), 5);
        let x0 = c.body.position.x;

        let nan = InputSample { move_axis: f64::NAN, ..Default::default() };
        run(&mut c, &mut w, nan, 10);
        assert_eq!(c.body.position.x, x0);
        assert_eq!(c.body.velocity.x, 0.0);

        let wild = InputSample { move_axis: 7.0, ..Default::default() };
        run(&mut c, &mut w, wild, 30);
        assert!(c.body.velocity.x > 0.0);
        assert!(c.body.velocity.x <= c.cfg.move_speed);
    }

    #[test]
    fn test_run_approaches_move_speed() {
        let (mut w, _) = world_with_floor();
        let mut c = standing_character();
        run(&mut c, &mut w, InputSample::default(), 5);

        let right = InputSample { move_axis: 1.0, ..Default::default() };
        run(&mut c, &mut w, right, 90);
        assert_eq!(c.state, CharacterState::Grounded);
        assert!(c.body.velocity.x > 150.0);
        assert!(c.body.velocity.x <= c.cfg.move_speed);
    }

    #[test]
    fn test_ice_accelerates_slower_than_stone() {
        let right = InputSample { move_axis: 1.0, ..Default::default() };

        let (mut stone_world, _) = world_with_floor();
        let mut on_stone = standing_character();
        run(&mut on_stone, &mut stone_world, InputSample::default(), 5);
        run(&mut on_stone, &mut stone_world, right, 40);

        let mut ice_world = World::new(WorldConfig::default());
        ice_world
            .add_static_tile(boxx(-200.0, 100.0, 400.0, 132.0), Material::ice())
            .unwrap();
        let mut on_ice = standing_character();
        run(&mut on_ice, &mut ice_world, InputSample::default(), 5);
        run(&mut on_ice, &mut ice_world, right, 40);

        assert!(on_stone.body.velocity.x > 150.0);
        assert!(on_ice.body.velocity.x < 100.0);
        assert!(on_ice.body.velocity.x > 20.0);
    }

    #[test]
    fn test_jump_rises_and_lands_flush() {
        let (mut w, _) = world_with_floor();
        let mut c = standing_character();
        run(&mut c, &mut w, InputSample::default(), 5);
        assert_eq!(c.state, CharacterState::Grounded);

        let jump = InputSample { jump_pressed: true, ..Default::default() };
        c.update(&mut w, jump, DT);
        assert!(c.body.velocity.y < 0.0);
        assert_eq!(c.state, CharacterState::Airborne);

        run(&mut c, &mut w, InputSample::default(), 180);
        assert_eq!(c.state, CharacterState::Grounded);
        assert_eq!(c.body.bottom(), 100.0);
        assert_eq!(c.body.velocity.y, 0.0);
    }

    #[test]
    fn test_coyote_jump_within_window() {
        let (mut w, floor) = world_with_floor();
        let mut c = standing_character();
        c.cfg.coyote_time = 3.0 * DT;
        run(&mut c, &mut w, InputSample::default(), 5);

        w.remove_collider(floor);
        run(&mut c, &mut w, InputSample::default(), 2);
        assert_eq!(c.state, CharacterState::Airborne);

        let jump = InputSample { jump_pressed: true, ..Default::default() };
        c.update(&mut w, jump, DT);
        assert!(c.body.velocity.y < 0.0, "third airborne tick is still in the window");
    }

    #[test]
    fn test_coyote_expires_after_window() {
        let (mut w, floor) = world_with_floor();
        let mut c = standing_character();
        c.cfg.coyote_time = 3.0 * DT;
        run(&mut c, &mut w, InputSample::default(), 5);

        w.remove_collider(floor);
        run(&mut c, &mut w, InputSample::default(), 3);

        let jump = InputSample { jump_pressed: true, ..Default::default() };
        c.update(&mut w, jump, DT);
        assert!(c.body.velocity.y > 0.0, "window lapsed one tick earlier");
    }

    #[test]
    fn test_double_jump_consumes_credit() {
        let (mut w, _) = world_with_floor();
        let mut c = standing_character();
        c.cfg.extra_jumps = 1;
        run(&mut c, &mut w, InputSample::default(), 5);

        let jump = InputSample { jump_pressed: true, ..Default::default() };
        c.update(&mut w, jump, DT);
        assert!(c.body.velocity.y < 0.0);

        run(&mut c, &mut w, InputSample::default(), 10);
        c.update(&mut w, jump, DT);
        assert!(c.body.velocity.y < 0.0);
        assert_eq!(c.jumps_left, 0);

        // Fall past the apex, then confirm the third press does nothing.
        for _ in 0..60 {
            c.update(&mut w, InputSample::default(), DT);
            if c.body.velocity.y > 0.0 {
                break;
            }
        }
        assert!(c.body.velocity.y > 0.0);
        c.update(&mut w, jump, DT);
        assert!(c.body.velocity.y > 0.0);
    }

    #[test]
    fn test_wall_slide_caps_descent() {
        let mut w = World::new(WorldConfig::default());
        w.add_static_tile(boxx(100.0, -400.0, 132.0, 400.0), Material::solid())
            .unwrap();
        let mut c = CharacterController::new(
            CharacterConfig::default(),
            Body::new(DVec2::new(80.0, 0.0), DVec2::new(8.0, 8.0)),
        );

        let into_wall = InputSample { move_axis: 1.0, ..Default::default() };
        run(&mut c, &mut w, into_wall, 40);
        assert_eq!(c.state, CharacterState::WallSliding);
        assert_eq!(c.body.velocity.y, c.cfg.wall_slide_speed);
        assert_eq!(c.body.right(), 100.0);
    }

    #[test]
    fn test_wall_jump_pushes_away() {
        let mut w = World::new(WorldConfig::default());
        w.add_static_tile(boxx(100.0, -400.0, 132.0, 400.0), Material::solid())
            .unwrap();
        let mut c = CharacterController::new(
            CharacterConfig::default(),
            Body::new(DVec2::new(80.0, 0.0), DVec2::new(8.0, 8.0)),
        );

        let into_wall = InputSample { move_axis: 1.0, ..Default::default() };
        run(&mut c, &mut w, into_wall, 40);
        assert_eq!(c.state, CharacterState::WallSliding);

        let jump = InputSample {
            move_axis: 1.0,
            jump_pressed: true,
            ..Default::default()
        };
        c.update(&mut w, jump, DT);
        assert_eq!(c.body.velocity.x, -c.cfg.wall_jump_impulse.x);
        assert!(c.body.velocity.y < 0.0);
        assert_eq!(c.state, CharacterState::Airborne);
    }

    #[test]
    fn test_ladder_climb_and_release() {
        let mut w = World::new(WorldConfig::default());
        w.add_trigger(boxx(90.0, -100.0, 122.0, 200.0), Material::ladder(), 0)
            .unwrap();
        let mut c = CharacterController::new(
            CharacterConfig::default(),
            Body::new(DVec2::new(106.0, 150.0), DVec2::new(8.0, 8.0)),
        );

        let climb = InputSample { climb_held: true, ..Default::default() };
        c.update(&mut w, climb, DT);
        assert_eq!(c.state, CharacterState::Climbing);
        assert_eq!(c.body.velocity.y, -c.cfg.climb_speed);

        let y0 = c.body.position.y;
        run(&mut c, &mut w, climb, 10);
        assert_eq!(c.body.position.y, y0 - 10.0 * c.cfg.climb_speed * DT);

        c.update(&mut w, InputSample::default(), DT);
        assert_eq!(c.state, CharacterState::Airborne);
        // Exactly one gravity tick from rest, no leftover climb impulse.
        assert_eq!(c.body.velocity.y, WorldConfig::default().gravity.y * DT);
    }

    #[test]
    fn test_jump_off_ladder_rises() {
        let (mut w, _) = world_with_floor();
        w.add_trigger(boxx(90.0, 0.0, 122.0, 132.0), Material::ladder(), 0)
            .unwrap();
        let mut c = standing_character();
        c.cfg.extra_jumps = 1;
        run(&mut c, &mut w, InputSample::default(), 5);
        assert_eq!(c.state, CharacterState::Grounded);

        let climb = InputSample { climb_held: true, ..Default::default() };
        run(&mut c, &mut w, climb, 10);
        assert_eq!(c.state, CharacterState::Climbing);

        // Releasing and jumping on the same tick spends the air credit
        // instead of falling from rest.
        let jump = InputSample { jump_pressed: true, ..Default::default() };
        c.update(&mut w, jump, DT);
        assert!(c.body.velocity.y < 0.0);
        assert_eq!(c.state, CharacterState::Airborne);
        assert_eq!(c.jumps_left, 0);
    }

    #[test]
    fn test_ceiling_grab_holds_position() {
        let mut w = World::new(WorldConfig::default());
        let grabbable = Material {
            ceiling_grab: true,
            ..Material::solid()
        };
        w.add_static_tile(boxx(40.0, 40.0, 180.0, 72.0), grabbable).unwrap();
        let mut c = CharacterController::new(
            CharacterConfig::default(),
            Body::new(DVec2::new(100.0, 120.0), DVec2::new(8.0, 8.0)),
        );
        c.body.velocity.y = -500.0;

        let grab = InputSample { grab_held: true, ..Default::default() };
        run(&mut c, &mut w, grab, 30);
        assert!(c.collision.ceiling);
        assert_eq!(c.body.position.y, 80.0);

        for _ in 0..30 {
            c.update(&mut w, grab, DT);
            assert!(c.collision.ceiling);
            assert_eq!(c.body.position.y, 80.0);
        }

        c.update(&mut w, InputSample::default(), DT);
        assert!(c.body.velocity.y > 0.0);
        assert!(c.body.position.y > 80.0);
    }

    #[test]
    fn test_ground_vanishing_is_not_an_error() {
        let (mut w, floor) = world_with_floor();
        let mut c = standing_character();
        run(&mut c, &mut w, InputSample::default(), 5);
        assert_eq!(c.state, CharacterState::Grounded);

        let y0 = c.body.position.y;
        w.remove_collider(floor);
        run(&mut c, &mut w, InputSample::default(), 5);
        assert_eq!(c.state, CharacterState::Airborne);
        assert!(!c.collision.grounded);
        assert!(c.body.position.y > y0);
    }
}
