//! Progressive BDPT render of a Cornell box.
//!
//! Usage: `cargo run --release --example cornell -- [seconds] [output.ppm] [config.json]`
//!
//! Renders for the given time, then writes the current image as PPM.

use anyhow::{Context, Result};
use lux_math::Vec3;
use lux_render::{DisplayImage, IntegratorConfig, ProgressiveRenderer, RendererConfig};
use lux_tracer::{
    BdptParams, Entity, HomogeneousMedium, IdealDiffuse, IdealMirror, InvisibleSurface,
    Medium, MediumInterface, PerspectiveCamera, Quad, Scene, SceneBuilder, Spectrum, Sphere,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let seconds: f64 = match args.next() {
        Some(s) => s.parse().with_context(|| format!("invalid duration {s:?}"))?,
        None => 5.0,
    };
    let filename = args.next().unwrap_or_else(|| "cornell.ppm".to_string());
    let config = match args.next() {
        Some(path) => {
            let json = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            RendererConfig::from_json(&json)?
        }
        None => RendererConfig {
            width: 256,
            height: 256,
            integrator: IntegratorConfig::Bdpt(BdptParams::default()),
            ..RendererConfig::default()
        },
    };

    let start = Instant::now();
    let scene = Arc::new(build_scene(config.width, config.height)?);
    log::info!("Scene built in {:?}", start.elapsed());

    let mut renderer = ProgressiveRenderer::start(scene, config)?;
    std::thread::sleep(Duration::from_secs_f64(seconds));
    renderer.stop();

    let image = renderer.image();
    save_ppm(&image, &filename).with_context(|| format!("writing {filename}"))?;
    log::info!("Saved to {}", filename);
    Ok(())
}

fn build_scene(width: u32, height: u32) -> Result<Scene> {
    let white = Arc::new(IdealDiffuse::new(Spectrum::splat(0.73)));
    let red = Arc::new(IdealDiffuse::new(Spectrum::new(0.65, 0.05, 0.05)));
    let green = Arc::new(IdealDiffuse::new(Spectrum::new(0.12, 0.45, 0.15)));

    let floor = Quad::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::Z * 2.0, Vec3::X * 2.0)?;
    let ceiling = Quad::new(Vec3::new(-1.0, 2.0, -1.0), Vec3::X * 2.0, Vec3::Z * 2.0)?;
    let back = Quad::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::X * 2.0, Vec3::Y * 2.0)?;
    let left = Quad::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::Y * 2.0, Vec3::Z * 2.0)?;
    let right = Quad::new(Vec3::new(1.0, 0.0, -1.0), Vec3::Z * 2.0, Vec3::Y * 2.0)?;
    let lamp = Quad::new(Vec3::new(-0.25, 1.99, -0.25), Vec3::X * 0.5, Vec3::Z * 0.5)?;

    let fog: Arc<dyn Medium> =
        Arc::new(HomogeneousMedium::new(Spectrum::splat(0.05), Spectrum::splat(0.8), 0.3)?);
    let fog_ball = Entity::new(Sphere::new(Vec3::new(0.45, 0.4, 0.2), 0.4)?, Arc::new(InvisibleSurface))
        .with_media(MediumInterface::new(Some(fog), None));
    let mirror_ball = Entity::new(
        Sphere::new(Vec3::new(-0.4, 0.45, -0.35), 0.45)?,
        Arc::new(IdealMirror::new(Spectrum::splat(0.9))),
    );

    let camera = PerspectiveCamera::new()
        .with_resolution(width, height)
        .with_position(Vec3::new(0.0, 1.0, 3.8), Vec3::new(0.0, 1.0, 0.0), Vec3::Y)
        .with_fov(38.0);

    let scene = SceneBuilder::new()
        .with_camera(camera)
        .add_entity(Entity::new(floor, white.clone()))
        .add_entity(Entity::new(ceiling, white.clone()))
        .add_entity(Entity::new(back, white.clone()))
        .add_entity(Entity::new(left, red))
        .add_entity(Entity::new(right, green))
        .add_entity(Entity::new(lamp, white).with_emission(Spectrum::splat(15.0))?)
        .add_entity(mirror_ball)
        .add_entity(fog_ball)
        .build()?;
    Ok(scene)
}

fn save_ppm(image: &DisplayImage, filename: &str) -> std::io::Result<()> {
    let file = File::create(filename)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "P3")?;
    writeln!(writer, "{} {}", image.width, image.height)?;
    writeln!(writer, "255")?;

    for rgba in &image.pixels {
        writeln!(writer, "{} {} {}", rgba[0], rgba[1], rgba[2])?;
    }
    writer.flush()
}
