//! clamber: fixed-timestep kinematic physics for 2D platformers
//! (tile worlds, one-way platforms, ramps, moving platforms, and the
//! character/enemy controllers that consume the contacts).
//!
//! Coordinates are +y down. All state advances in fixed ticks; feed wall
//! clock time through [`FixedTimestep`] and step everything with the same
//! `dt` for bit-identical replays.

pub mod aabb;
pub mod types;
pub mod api;
pub mod grid;
pub mod narrowphase;
pub mod world;
pub mod tilemap;
pub mod character;
pub mod enemy;
pub mod stepper;

pub use crate::aabb::Aabb;
pub use crate::api::*;
pub use crate::character::{CharacterConfig, CharacterController, CharacterState, InputSample};
pub use crate::enemy::{
    AiState, AttackEvent, AttackKind, Behavior, EnemyConfig, EnemyController, MovePattern,
};
pub use crate::grid::SpatialGrid;
pub use crate::narrowphase::Narrowphase;
pub use crate::stepper::FixedTimestep;
pub use crate::tilemap::{Tile, TileMap, TilePalette};
pub use crate::types::*;
pub use crate::world::World;
