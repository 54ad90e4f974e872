//! Flythrough - scripted descent onto a quadsphere body that logs LOD activity

mod config;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use engine_core::{gather_local_observers, integrate_velocities, Observer, Time, Transform, Velocity};
use glam::{Quat, Vec3, Vec4};
use hecs::World;
use quadsphere::modifiers::{AltitudeColor, CylindricalUv, NoiseDisplacer, ScatterSpawner};
use quadsphere::{PassReport, Terrain, TerrainVertex};

use config::FlythroughConfig;

/// Build the body with the stock modifiers.
fn build_terrain(config: &FlythroughConfig) -> Result<Terrain> {
    let mut terrain = Terrain::new(config.terrain.clone()).context("creating terrain")?;

    let mut noise = NoiseDisplacer::new(config.terrain.seed);
    noise.strength = config.noise_strength;
    terrain.add_displacer(Box::new(noise));

    let top = config.terrain.radius + config.terrain.height;
    terrain.add_vertex_modifier(Box::new(AltitudeColor {
        color: Vec4::new(0.9, 0.9, 0.95, 1.0),
        height: top,
        height_allowance: config.terrain.height * 0.5,
        ..Default::default()
    }));
    terrain.add_vertex_modifier(Box::new(CylindricalUv));
    terrain.add_populator(Box::new(ScatterSpawner::new(config.scatter_depth, 4, config.terrain.seed)));

    Ok(terrain)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = std::env::args().nth(1).map(PathBuf::from);
    let config = FlythroughConfig::load(path.as_deref());
    if config.realtime {
        log::info!("Starting flythrough: {} wall-clock frames", config.frames);
    } else {
        log::info!("Starting flythrough: {} frames at {:.4}s", config.frames, config.frame_seconds);
    }

    let mut terrain = build_terrain(&config)?;
    terrain.update().context("building root patches")?;

    let body = Transform::from_position_rotation_scale(Vec3::ZERO, Quat::from_rotation_y(0.3), config.body_scale);
    let surface_point = terrain.surface().position_world(&body, Vec3::Z, config.start_altitude);

    let mut world = World::new();
    let observer = world.spawn((Transform::from_position(surface_point), Velocity::default(), Observer));

    let mut time = Time::new();
    let step = Duration::from_secs_f32(config.frame_seconds.max(0.0));
    let mut observers = Vec::new();
    let mut totals = PassReport::default();

    for frame in 0..config.frames {
        if config.realtime {
            time.update();
        } else {
            time.advance(step);
        }
        let dt = time.delta_seconds();

        // Descend along the surface direction, slowing as the ground approaches.
        {
            let mut query = world.query_one::<(&Transform, &mut Velocity)>(observer)?;
            if let Some((transform, velocity)) = query.get() {
                let altitude = transform.position.distance(body.position)
                    - terrain.surface().height_world(&body, transform.position);
                let down = (body.position - transform.position).normalize_or_zero();
                velocity.linear = if altitude > config.min_altitude {
                    down * altitude * config.descent_rate
                } else {
                    Vec3::ZERO
                };
            }
        }
        integrate_velocities(&mut world, dt);
        gather_local_observers(&world, &body, &mut observers);

        terrain.update()?;
        let report = terrain.late_update(dt, &observers)?;
        totals.collected += report.collected;
        totals.evaluated += report.evaluated;
        totals.stale += report.stale;
        totals.splits += report.splits;
        totals.merges += report.merges;

        if config.log_interval > 0 && frame % config.log_interval == 0 {
            let stats = terrain.stats();
            log::info!(
                "frame {:>5} t={:.2}s patches={} leaves={} depth={} colliders={} vertices={}",
                frame,
                time.elapsed_seconds(),
                stats.patches,
                stats.leaves,
                stats.max_depth,
                stats.colliders,
                stats.vertices,
            );
        }
    }

    let upload: usize = terrain
        .visible_patches()
        .map(|(_, patch)| bytemuck::cast_slice::<TerrainVertex, u8>(&patch.mesh.interleaved()).len())
        .sum();
    let props = terrain
        .populator::<ScatterSpawner>()
        .map(ScatterSpawner::prop_count)
        .unwrap_or(0);

    log::info!(
        "Done after {} frames: {} collected, {} evaluated, {} stale, {} splits, {} merges",
        time.frame_count(),
        totals.collected,
        totals.evaluated,
        totals.stale,
        totals.splits,
        totals.merges,
    );
    log::info!(
        "Final tree: {:?}, {} props, {} KiB of vertex data",
        terrain.stats(),
        props,
        upload / 1024
    );

    Ok(())
}
