use clamber::*;
use glam::DVec2;

const PLAYER_TAG: Tag = 1;
const PATROLLER_TAG: Tag = 2;
const CHASER_TAG: Tag = 3;
const LADDER_TAG: Tag = 20;

/// Canned input: run right onto the ledge, jump up through the one-way
/// shelf, walk back left to the wall, then climb the ladder and let go.
fn script(tick: u32) -> InputSample {
    let mut input = InputSample::default();
    match tick {
        0..=149 => input.move_axis = 1.0,
        200 => input.jump_pressed = true,
        360..=539 => input.move_axis = -1.0,
        540..=599 => input.climb_held = true,
        _ => {}
    }
    input
}

fn main() {
    let mut world = World::new(WorldConfig::default());

    // 640x256 course: walled box, floor, a ramp up to a ledge, and a
    // one-way shelf above the ledge. The ladder hugs the left wall.
    let rows = [
        "....................",
        "#..................#",
        "#..................#",
        "#..................#",
        "#...........----...#",
        "#..................#",
        "#........../#####..#",
        "####################",
    ];
    let map = TileMap::from_rows(&rows, 32.0, DVec2::ZERO);
    let level = map
        .build_into(&mut world, &TilePalette::default())
        .expect("level build");
    let ladder = world
        .add_trigger(
            Aabb::new(DVec2::new(32.0, 64.0), DVec2::new(64.0, 224.0)),
            Material::ladder(),
            LADDER_TAG,
        )
        .expect("ladder");
    let platform = world
        .add_moving_platform(
            Aabb::new(DVec2::new(96.0, 120.0), DVec2::new(160.0, 128.0)),
            Material::solid(),
            DVec2::new(60.0, 0.0),
        )
        .expect("platform");
    println!(
        "level: {} merged colliders, ladder={:?} platform={:?}",
        level.len(),
        ladder,
        platform
    );

    let player_body = Body::new(DVec2::new(100.0, 216.0), DVec2::new(8.0, 8.0));
    let player_col = world
        .add_dynamic_entity(player_body.aabb(), Material::solid(), PLAYER_TAG)
        .expect("player collider");
    let mut player =
        CharacterController::new(CharacterConfig::default(), player_body).with_collider(player_col);

    let mut patroller = EnemyController::new(
        EnemyConfig::default(),
        Body::new(DVec2::new(250.0, 216.0), DVec2::new(8.0, 8.0)),
        PATROLLER_TAG,
        MovePattern::PatrolHorizontal {
            amplitude: 80.0,
            speed: 45.0,
        },
        Behavior::Passive,
    );
    let mut chaser = EnemyController::new(
        EnemyConfig::flyer(),
        Body::new(DVec2::new(500.0, 80.0), DVec2::new(8.0, 8.0)),
        CHASER_TAG,
        MovePattern::Idle,
        Behavior::Chase {
            sight_range: 340.0,
            lose_interest_range: 476.0,
            speed: 120.0,
            vertical_tolerance: 10_000.0,
        },
    )
    .with_attack(AttackKind::Punch {
        range: 40.0,
        cooldown: 1.2,
    });

    let mut stepper = FixedTimestep::new(1.0 / 60.0);
    let dt = stepper.step_size();
    let mut plat_vel = DVec2::new(60.0, 0.0);
    let mut last_state = player.state;
    let mut tick = 0u32;

    // 11 seconds of perfect 60 Hz frames. Per step: platforms move first,
    // then the player, then enemies in list order.
    for _ in 0..660 {
        let steps = stepper.advance(1.0 / 60.0);
        for _ in 0..steps {
            let mut aabb = world.collider(platform).expect("platform alive").aabb;
            if aabb.min.x <= 96.0 {
                plat_vel.x = plat_vel.x.abs();
            } else if aabb.min.x >= 256.0 {
                plat_vel.x = -plat_vel.x.abs();
            }
            aabb = aabb.translated(plat_vel * dt);
            world.update_collider_aabb(platform, aabb);
            world.set_platform_velocity(platform, plat_vel);

            player.update(&mut world, script(tick), dt);
            patroller.update(&mut world, None, dt);
            chaser.update(&mut world, Some(player.body.position), dt);

            if player.state != last_state {
                println!(
                    "tick {:3}: player {:?} -> {:?} at ({:.0},{:.0})",
                    tick, last_state, player.state, player.body.position.x, player.body.position.y
                );
                last_state = player.state;
            }
            for ev in chaser.drain_events() {
                println!(
                    "tick {:3}: enemy {} attacks toward ({:.2},{:.2})",
                    tick, ev.source, ev.direction.x, ev.direction.y
                );
            }
            if tick % 60 == 0 {
                println!(
                    "tick {:3}: player=({:.0},{:.0}) {:?} platform.x={:.0} patroller.x={:.0} chaser=({:.0},{:.0}) {:?}",
                    tick,
                    player.body.position.x,
                    player.body.position.y,
                    player.state,
                    aabb.min.x,
                    patroller.body.position.x,
                    chaser.body.position.x,
                    chaser.body.position.y,
                    chaser.state
                );
            }
            tick += 1;
        }
    }

    let stats = world.debug_stats();
    println!(
        "done: player=({:.0},{:.0}) {:?} colliders={} occupied_cells={} largest_bucket={}",
        player.body.position.x,
        player.body.position.y,
        player.state,
        stats.colliders,
        stats.occupied_cells,
        stats.largest_bucket
    );
}
