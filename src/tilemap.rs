use glam::DVec2;

use crate::aabb::Aabb;
use crate::api::WorldApi;
use crate::types::{ColliderId, Material, RampKind, WorldError};
use crate::world::World;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Tile {
    Empty,
    Solid,
    OneWay,
    /// Surface rises left to right.
    RampRight,
    /// Surface rises right to left.
    RampLeft,
}

/// Materials stamped onto emitted colliders.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TilePalette {
    pub solid: Material,
    pub one_way: Material,
    pub ramp: Material,
}

impl Default for TilePalette {
    fn default() -> Self {
        Self {
            solid: Material::solid(),
            one_way: Material::one_way(),
            ramp: Material::solid(),
        }
    }
}

/// Authoring-side tile grid. Row 0 is the top row; `build_into` merges
/// horizontal runs of identical tiles into single colliders.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileMap {
    width: usize,
    height: usize,
    tile_size: f64,
    origin: DVec2,
    tiles: Vec<Tile>,
}

impl TileMap {
    pub fn new(width: usize, height: usize, tile_size: f64, origin: DVec2) -> Self {
        let tile_size = if tile_size.is_finite() {
            tile_size.max(1e-3)
        } else {
            32.0
        };
        let origin = if origin.is_finite() { origin } else { DVec2::ZERO };
        Self {
            width,
            height,
            tile_size,
            origin,
            tiles: vec![Tile::Empty; width * height],
        }
    }

    /// Builds a map from marker strings: `#` solid, `-` one-way, `/` and
    /// `\` ramps, anything else empty. Width is the longest row.
    pub fn from_rows(rows: &[&str], tile_size: f64, origin: DVec2) -> Self {
        let height = rows.len();
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        let mut map = Self::new(width, height, tile_size, origin);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let tile = match ch {
                    '#' => Tile::Solid,
                    '-' => Tile::OneWay,
                    '/' => Tile::RampRight,
                    '\\' => Tile::RampLeft,
                    _ => Tile::Empty,
                };
                map.set(x, y, tile);
            }
        }
        map
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn tile_size(&self) -> f64 {
        self.tile_size
    }

    pub fn origin(&self) -> DVec2 {
        self.origin
    }

    /// Out-of-bounds reads are empty.
    pub fn get(&self, x: usize, y: usize) -> Tile {
        if x >= self.width || y >= self.height {
            return Tile::Empty;
        }
        self.tiles[y * self.width + x]
    }

    /// Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: usize, y: usize, tile: Tile) {
        if x < self.width && y < self.height {
            self.tiles[y * self.width + x] = tile;
        }
    }

    fn tile_aabb(&self, x: usize, y: usize, run: usize) -> Aabb {
        let ts = self.tile_size;
        let min = self.origin + DVec2::new(x as f64 * ts, y as f64 * ts);
        let max = min + DVec2::new(run as f64 * ts, ts);
        Aabb::new(min, max)
    }

    /// Emits merged colliders into the world: horizontal runs of solid and
    /// one-way tiles become single boxes, ramps are emitted per tile. The
    /// union of emitted areas equals the union of occupied tile areas.
    /// Returns the new ids in creation order.
    pub fn build_into(
        &self,
        world: &mut World,
        palette: &TilePalette,
    ) -> Result<Vec<ColliderId>, WorldError> {
        let mut ids = Vec::new();
        for y in 0..self.height {
            let mut x = 0;
            while x < self.width {
                let tile = self.get(x, y);
                match tile {
                    Tile::Empty => x += 1,
                    Tile::Solid | Tile::OneWay => {
                        let mut run = 1;
                        while x + run < self.width && self.get(x + run, y) == tile {
                            run += 1;
                        }
                        let aabb = self.tile_aabb(x, y, run);
                        let id = if tile == Tile::Solid {
                            world.add_static_tile(aabb, palette.solid)?
                        } else {
                            let material = Material {
                                one_way: true,
                                ..palette.one_way
                            };
                            world.add_static_tile(aabb, material)?
                        };
                        ids.push(id);
                        x += run;
                    }
                    Tile::RampRight => {
                        let aabb = self.tile_aabb(x, y, 1);
                        ids.push(world.add_static_ramp(aabb, RampKind::RisingRight, palette.ramp)?);
                        x += 1;
                    }
                    Tile::RampLeft => {
                        let aabb = self.tile_aabb(x, y, 1);
                        ids.push(world.add_static_ramp(aabb, RampKind::RisingLeft, palette.ramp)?);
                        x += 1;
                    }
                }
            }
        }
        Ok(ids)
    }
}
