use clamber::*;
use glam::DVec2;
use std::time::Instant;

fn lcg(seed: &mut u32) -> u32 {
    *seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
    *seed
}

fn frand(seed: &mut u32) -> f64 {
    lcg(seed) as f64 / u32::MAX as f64
}

fn main() {
    let mut world = World::new(WorldConfig {
        cell_size: 32.0,
        collider_capacity: 8192,
        ..Default::default()
    });

    let cols = 512usize;
    let rows = 64usize;
    let scatter = 3000usize; // random tiles thrown into the map
    let n_bodies = 2000usize;
    let ticks = 600u32;
    let mut seed = 1u32;

    // Level: a full floor plus randomly scattered solid/one-way/ramp tiles.
    let t0 = Instant::now();
    let mut map = TileMap::new(cols, rows, 32.0, DVec2::ZERO);
    for x in 0..cols {
        map.set(x, rows - 1, Tile::Solid);
    }
    for _ in 0..scatter {
        let x = lcg(&mut seed) as usize % cols;
        let y = 8 + lcg(&mut seed) as usize % (rows - 10);
        let tile = match lcg(&mut seed) % 6 {
            0 => Tile::OneWay,
            1 => Tile::RampRight,
            2 => Tile::RampLeft,
            _ => Tile::Solid,
        };
        map.set(x, y, tile);
    }
    let merged = map
        .build_into(&mut world, &TilePalette::default())
        .expect("level build");
    let build_ms = t0.elapsed().as_secs_f64() * 1000.0;

    // Bodies rain down with random horizontal drift.
    let mut bodies = Vec::with_capacity(n_bodies);
    for _ in 0..n_bodies {
        let x = frand(&mut seed) * cols as f64 * 32.0;
        let y = frand(&mut seed) * 8.0 * 32.0;
        let mut body = Body::new(DVec2::new(x, y), DVec2::new(8.0, 8.0));
        body.velocity = DVec2::new(frand(&mut seed) * 240.0 - 120.0, 0.0);
        bodies.push(body);
    }

    let dt = 1.0 / 60.0;
    let mut n_contacts = 0usize;
    let t1 = Instant::now();
    for _ in 0..ticks {
        for body in &mut bodies {
            n_contacts += world
                .integrate(None, body, dt, IntegrateOptions::default())
                .len();
        }
    }
    let sim_ms = t1.elapsed().as_secs_f64() * 1000.0;

    let n_integrations = n_bodies as u32 * ticks;
    let stats = world.debug_stats();
    println!(
        "scatter={} merged={} bodies={} ticks={} build={:.3}ms sim={:.3}ms ({:.1} integrations/us) contacts={}",
        scatter,
        merged.len(),
        n_bodies,
        ticks,
        build_ms,
        sim_ms,
        n_integrations as f64 / (sim_ms * 1000.0),
        n_contacts
    );
    println!(
        "stats: colliders={} occupied_cells={} largest_bucket={}",
        stats.colliders, stats.occupied_cells, stats.largest_bucket
    );
}
