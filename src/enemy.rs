use glam::DVec2;
use log::debug;

use crate::api::WorldApi;
use crate::types::{Body, ColliderId, CollisionState, IntegrateOptions, Tag};
use crate::world::World;

/// Engagement band for strafing, relative to the preferred maximum range.
const STRAFE_ENGAGE_FACTOR: f64 = 1.25;
const STRAFE_LOSE_FACTOR: f64 = 1.75;

/// Autonomous movement when no behavior is steering. Patrols are anchored
/// at the spawn position.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MovePattern {
    Idle,
    PatrolHorizontal { amplitude: f64, speed: f64 },
    PatrolVertical { amplitude: f64, speed: f64 },
    /// Walk the edge of a `width` x `height` rectangle whose top-left
    /// corner is the spawn position.
    PerimeterCrawl {
        width: f64,
        height: f64,
        speed: f64,
        clockwise: bool,
    },
    /// Visit the points in order, then retrace them backwards.
    Waypoints { points: Vec<DVec2>, speed: f64 },
    /// Move at a constant velocity, reflecting the blocked component on
    /// wall/floor/ceiling contact.
    WallBounce { velocity: DVec2 },
}

/// Target-driven steering. Overrides the movement pattern while engaged.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Behavior {
    Passive,
    Chase {
        sight_range: f64,
        lose_interest_range: f64,
        speed: f64,
        /// Maximum |target.y - enemy.y| at which the target registers.
        vertical_tolerance: f64,
    },
    Flee {
        sight_range: f64,
        safe_distance: f64,
        speed: f64,
    },
    /// Hold a distance band around the target, sweeping sideways and
    /// flipping sweep direction every `strafe_period` seconds.
    StrafeShoot {
        preferred_min: f64,
        preferred_max: f64,
        speed: f64,
        strafe_period: f64,
    },
}

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttackKind {
    Projectile { speed: f64, range: f64, cooldown: f64 },
    Sword { range: f64, cooldown: f64 },
    Punch { range: f64, cooldown: f64 },
}

impl AttackKind {
    pub fn range(&self) -> f64 {
        match self {
            AttackKind::Projectile { range, .. }
            | AttackKind::Sword { range, .. }
            | AttackKind::Punch { range, .. } => *range,
        }
    }

    pub fn cooldown(&self) -> f64 {
        match self {
            AttackKind::Projectile { cooldown, .. }
            | AttackKind::Sword { cooldown, .. }
            | AttackKind::Punch { cooldown, .. } => *cooldown,
        }
    }
}

/// Emitted when an attack fires. Damage and projectile spawning are the
/// caller's concern.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AttackEvent {
    pub kind: AttackKind,
    pub source: Tag,
    pub origin: DVec2,
    /// Unit vector toward the target at fire time.
    pub direction: DVec2,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AiState {
    Idle,
    Patrolling,
    Chasing,
    Fleeing,
    Strafing,
}

#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnemyConfig {
    pub max_speed: f64,
    /// Exponential blend rate toward the desired velocity, per second.
    pub accel: f64,
    /// 0 makes a flyer: no gravity, full-vector steering.
    pub gravity_scale: f64,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            max_speed: 120.0,
            accel: 10.0,
            gravity_scale: 1.0,
        }
    }
}

impl EnemyConfig {
    pub fn flyer() -> Self {
        Self {
            gravity_scale: 0.0,
            ..Self::default()
        }
    }

    pub fn sanitized(self) -> Self {
        let d = Self::default();
        let nn = |v: f64, fallback: f64| if v.is_finite() && v >= 0.0 { v } else { fallback };
        Self {
            max_speed: nn(self.max_speed, d.max_speed),
            accel: nn(self.accel, d.accel),
            gravity_scale: nn(self.gravity_scale, d.gravity_scale),
        }
    }
}

/// One enemy actor: a movement pattern, a behavior profile, and an optional
/// attack, all layered over the kinematic integrator. Drives its own `Body`.
pub struct EnemyController {
    pub cfg: EnemyConfig,
    pub body: Body,
    pub collider: Option<ColliderId>,
    pub tag: Tag,
    pub pattern: MovePattern,
    pub behavior: Behavior,
    pub attack: Option<AttackKind>,
    pub state: AiState,
    pub collision: CollisionState,
    spawn: DVec2,
    clock: f64,
    engaged: bool,
    waypoint_index: usize,
    waypoint_forward: bool,
    bounce_vel: DVec2,
    strafe_sign: f64,
    cooldown_left: f64,
    events: Vec<AttackEvent>,
}

impl EnemyController {
    pub fn new(cfg: EnemyConfig, body: Body, tag: Tag, pattern: MovePattern, behavior: Behavior) -> Self {
        let bounce_vel = match &pattern {
            MovePattern::WallBounce { velocity } => *velocity,
            _ => DVec2::ZERO,
        };
        Self {
            cfg: cfg.sanitized(),
            spawn: body.position,
            body,
            collider: None,
            tag,
            pattern,
            behavior,
            attack: None,
            state: AiState::Idle,
            collision: CollisionState::default(),
            clock: 0.0,
            engaged: false,
            waypoint_index: 0,
            waypoint_forward: true,
            bounce_vel,
            strafe_sign: 1.0,
            cooldown_left: 0.0,
            events: Vec::new(),
        }
    }

    pub fn with_attack(mut self, kind: AttackKind) -> Self {
        self.attack = Some(kind);
        self
    }

    pub fn with_collider(mut self, id: ColliderId) -> Self {
        self.collider = Some(id);
        self
    }

    /// Takes the attack events accumulated since the last call.
    pub fn drain_events(&mut self) -> Vec<AttackEvent> {
        std::mem::take(&mut self.events)
    }

    /// Advances the actor one tick. `target` is the position the behavior
    /// reacts to, usually the player; `None` or a non-finite value means
    /// no target is visible.
    pub fn update(&mut self, world: &mut World, target: Option<DVec2>, dt: f64) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.clock += dt;
        self.cooldown_left = (self.cooldown_left - dt).max(0.0);

        let target = target.filter(|t| t.is_finite());
        let focus = self.update_engagement(target);

        let (desired, next_state, cap) = match focus {
            Some(tp) => {
                let (v, state) = self.behavior_velocity(tp);
                // Behaviors may steer faster than the pattern cruise cap.
                (v, state, self.cfg.max_speed.max(v.length()))
            }
            None => {
                let (v, state) = self.pattern_velocity(dt);
                (v, state, self.cfg.max_speed)
            }
        };

        let blend = 1.0 - (-self.cfg.accel * dt).exp();
        if self.cfg.gravity_scale == 0.0 {
            let v = self.body.velocity + (desired - self.body.velocity) * blend;
            self.body.velocity = v.clamp_length_max(cap);
        } else {
            // Gravity owns the vertical axis for walkers.
            self.body.velocity.x += (desired.x - self.body.velocity.x) * blend;
            self.body.velocity.x = self.body.velocity.x.clamp(-cap, cap);
        }

        let opts = IntegrateOptions {
            gravity_scale: self.cfg.gravity_scale,
            ..Default::default()
        };
        let contacts = world.integrate(self.collider, &mut self.body, dt, opts);
        self.collision.reset();
        for contact in &contacts {
            if let Some(col) = world.collider(contact.other) {
                self.collision.absorb(contact, col);
            }
        }

        if next_state != self.state {
            debug!("enemy tag {} {:?} -> {:?}", self.tag, self.state, next_state);
            self.state = next_state;
        }

        if let Some(tp) = target {
            self.try_attack(tp);
        }
    }

    /// Applies the behavior's enter/exit thresholds. Returns the target
    /// point while engaged.
    fn update_engagement(&mut self, target: Option<DVec2>) -> Option<DVec2> {
        let Some(tp) = target else {
            self.engaged = false;
            return None;
        };
        let delta = tp - self.body.position;
        let dist = delta.length();
        match self.behavior {
            Behavior::Passive => self.engaged = false,
            Behavior::Chase {
                sight_range,
                lose_interest_range,
                vertical_tolerance,
                ..
            } => {
                let vert_ok = delta.y.abs() <= vertical_tolerance;
                if self.engaged {
                    if dist >= lose_interest_range || !vert_ok {
                        self.engaged = false;
                    }
                } else if dist <= sight_range && vert_ok {
                    self.engaged = true;
                }
            }
            Behavior::Flee {
                sight_range,
                safe_distance,
                ..
            } => {
                if self.engaged {
                    if dist >= safe_distance {
                        self.engaged = false;
                    }
                } else if dist <= sight_range {
                    self.engaged = true;
                }
            }
            Behavior::StrafeShoot { preferred_max, .. } => {
                if self.engaged {
                    if dist >= preferred_max * STRAFE_LOSE_FACTOR {
                        self.engaged = false;
                    }
                } else if dist <= preferred_max * STRAFE_ENGAGE_FACTOR {
                    self.engaged = true;
                }
            }
        }
        self.engaged.then_some(tp)
    }

    fn behavior_velocity(&mut self, tp: DVec2) -> (DVec2, AiState) {
        let delta = tp - self.body.position;
        let dir = delta.normalize_or_zero();
        match self.behavior {
            Behavior::Passive => (DVec2::ZERO, AiState::Idle),
            Behavior::Chase { speed, .. } => (dir * speed, AiState::Chasing),
            Behavior::Flee { speed, .. } => (-dir * speed, AiState::Fleeing),
            Behavior::StrafeShoot {
                preferred_min,
                preferred_max,
                speed,
                strafe_period,
            } => {
                let period = strafe_period.max(1e-3);
                self.strafe_sign = if (self.clock / period) as i64 % 2 == 0 {
                    1.0
                } else {
                    -1.0
                };
                let tangent = DVec2::new(-dir.y, dir.x) * self.strafe_sign;
                let dist = delta.length();
                let radial = if dist < preferred_min {
                    -dir
                } else if dist > preferred_max {
                    dir
                } else {
                    DVec2::ZERO
                };
                ((tangent + radial).normalize_or_zero() * speed, AiState::Strafing)
            }
        }
    }

    /// Velocity that tracks the pattern's target point for this tick.
    /// Degenerate parameters (zero speed, empty waypoint list) idle instead
    /// of erroring.
    fn pattern_velocity(&mut self, dt: f64) -> (DVec2, AiState) {
        let p = self.body.position;
        match &self.pattern {
            MovePattern::Idle => (DVec2::ZERO, AiState::Idle),
            MovePattern::PatrolHorizontal { amplitude, speed } => {
                if *speed <= 0.0 || *amplitude <= 0.0 {
                    return (DVec2::ZERO, AiState::Idle);
                }
                let offset = triangle_wave(self.clock * speed, *amplitude);
                let target = DVec2::new(self.spawn.x + offset, p.y);
                (((target - p) / dt).clamp_length_max(*speed), AiState::Patrolling)
            }
            MovePattern::PatrolVertical { amplitude, speed } => {
                if *speed <= 0.0 || *amplitude <= 0.0 {
                    return (DVec2::ZERO, AiState::Idle);
                }
                let offset = triangle_wave(self.clock * speed, *amplitude);
                let target = DVec2::new(p.x, self.spawn.y + offset);
                (((target - p) / dt).clamp_length_max(*speed), AiState::Patrolling)
            }
            MovePattern::PerimeterCrawl {
                width,
                height,
                speed,
                clockwise,
            } => {
                let w = width.max(0.0);
                let h = height.max(0.0);
                let perimeter = 2.0 * (w + h);
                if *speed <= 0.0 || perimeter <= 0.0 {
                    return (DVec2::ZERO, AiState::Idle);
                }
                let mut s = (self.clock * speed).rem_euclid(perimeter);
                if !clockwise {
                    s = perimeter - s;
                }
                let target = self.spawn + perimeter_point(w, h, s);
                (((target - p) / dt).clamp_length_max(*speed), AiState::Patrolling)
            }
            MovePattern::Waypoints { points, speed } => {
                if points.is_empty() || *speed <= 0.0 {
                    return (DVec2::ZERO, AiState::Idle);
                }
                let i = self.waypoint_index.min(points.len() - 1);
                let arrive = (speed * dt).max(1e-3);
                if (points[i] - p).length() <= arrive && points.len() > 1 {
                    if self.waypoint_forward {
                        if i + 1 == points.len() {
                            self.waypoint_forward = false;
                            self.waypoint_index = i - 1;
                        } else {
                            self.waypoint_index = i + 1;
                        }
                    } else if i == 0 {
                        self.waypoint_forward = true;
                        self.waypoint_index = 1;
                    } else {
                        self.waypoint_index = i - 1;
                    }
                }
                let goal = points[self.waypoint_index.min(points.len() - 1)];
                (((goal - p) / dt).clamp_length_max(*speed), AiState::Patrolling)
            }
            MovePattern::WallBounce { .. } => {
                if self.bounce_vel == DVec2::ZERO {
                    return (DVec2::ZERO, AiState::Idle);
                }
                // Reflect off last tick's contacts.
                if (self.collision.wall_left && self.bounce_vel.x < 0.0)
                    || (self.collision.wall_right && self.bounce_vel.x > 0.0)
                {
                    self.bounce_vel.x = -self.bounce_vel.x;
                }
                if (self.collision.ceiling && self.bounce_vel.y < 0.0)
                    || (self.collision.grounded && self.bounce_vel.y > 0.0)
                {
                    self.bounce_vel.y = -self.bounce_vel.y;
                }
                (self.bounce_vel, AiState::Patrolling)
            }
        }
    }

    fn try_attack(&mut self, target: DVec2) {
        let Some(kind) = self.attack else {
            return;
        };
        if self.cooldown_left > 0.0 {
            return;
        }
        let delta = target - self.body.position;
        if delta.length() > kind.range() {
            return;
        }
        let direction = delta.normalize_or_zero();
        if direction == DVec2::ZERO {
            // Exactly overlapping the target leaves no aim direction.
            return;
        }
        self.events.push(AttackEvent {
            kind,
            source: self.tag,
            origin: self.body.position,
            direction,
        });
        self.cooldown_left = kind.cooldown();
        debug!("enemy tag {} fired {:?}", self.tag, kind);
    }
}

/// 0 -> +amplitude -> -amplitude -> 0 over a period of 4 * amplitude in
/// arc length.
fn triangle_wave(s: f64, amplitude: f64) -> f64 {
    let phase = s.rem_euclid(4.0 * amplitude);
    if phase < amplitude {
        phase
    } else if phase < 3.0 * amplitude {
        2.0 * amplitude - phase
    } else {
        phase - 4.0 * amplitude
    }
}

/// Point at arc length `s` along the rectangle perimeter, clockwise from
/// the top-left corner in screen coordinates.
fn perimeter_point(w: f64, h: f64, s: f64) -> DVec2 {
    if s < w {
        DVec2::new(s, 0.0)
    } else if s < w + h {
        DVec2::new(w, s - w)
    } else if s < 2.0 * w + h {
        DVec2::new(2.0 * w + h - s, h)
    } else {
        DVec2::new(0.0, 2.0 * (w + h) - s)
    }
}
