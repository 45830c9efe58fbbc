//! Rendering of individual tasks on a worker thread.

use crate::config::IntegratorConfig;
use crate::task::{Splat, Task};
use bumpalo::Bump;
use lux_math::{UVec2, Vec2};
use lux_tracer::{
    spectrum, trace_albedo_ao, trace_ao, trace_bdpt, trace_gbuffer, trace_nomis, trace_std,
    GBufferChannel, Pixel, Sampler, Scene, Spectrum,
};
use std::sync::atomic::{AtomicBool, Ordering};

/// Per-thread state reused across tasks.
pub struct WorkerContext {
    pub sampler: Sampler,
    /// Scratch memory for one sample, reset after every sample
    pub arena: Bump,
}

impl WorkerContext {
    pub fn new(seed: u64) -> Self {
        Self {
            sampler: Sampler::new(seed),
            arena: Bump::new(),
        }
    }
}

/// Run the configured integrator for one film point.
///
/// Light-tracing contributions are reported through `splat`.
pub fn render_sample(
    integrator: &IntegratorConfig,
    scene: &Scene,
    film: Vec2,
    ctx: &mut WorkerContext,
    splat: impl FnMut(Vec2, Spectrum),
) -> Pixel {
    let ray = scene.camera().generate_ray(film);
    let sampler = &mut ctx.sampler;
    let arena = &ctx.arena;
    match integrator {
        IntegratorConfig::PathTracing(params) if params.use_mis => {
            trace_std(scene, ray, sampler, arena, params)
        }
        IntegratorConfig::PathTracing(params) => trace_nomis(scene, ray, sampler, arena, params),
        IntegratorConfig::Bdpt(params) => trace_bdpt(scene, ray, sampler, arena, params, splat),
        IntegratorConfig::AmbientOcclusion(params) => trace_ao(scene, ray, sampler, params),
        IntegratorConfig::AlbedoAo(params) => trace_albedo_ao(scene, ray, sampler, arena, params),
        IntegratorConfig::Albedo => trace_gbuffer(scene, ray, arena, GBufferChannel::Albedo),
        IntegratorConfig::Normal => {
            let mut pixel = trace_gbuffer(scene, ray, arena, GBufferChannel::Normal);
            // Show [-1, 1] normals as colors
            if pixel.normal != Spectrum::ZERO {
                pixel.value = 0.5 * (pixel.value + Spectrum::ONE);
            }
            pixel
        }
    }
}

/// Final pixel containing a film point.
fn film_to_pixel(film: Vec2, resolution: UVec2) -> UVec2 {
    let p = film * resolution.as_vec2();
    UVec2::new(
        (p.x as u32).min(resolution.x - 1),
        (p.y as u32).min(resolution.y - 1),
    )
}

/// Render every coarse pixel of `task` with `task.spp` samples each.
///
/// Returns `false` when `stop` was raised before the task finished; the
/// partial results must then be discarded.
pub fn render_task(
    task: &mut Task,
    integrator: &IntegratorConfig,
    scene: &Scene,
    resolution: UVec2,
    ctx: &mut WorkerContext,
    stop: &AtomicBool,
) -> bool {
    let scale = task.pixel_size as f32 / resolution.as_vec2();
    let traces_light_paths = matches!(integrator, IntegratorConfig::Bdpt(_));
    let pixels: Vec<(u32, u32)> = task.coarse_pixels().collect();

    for (cx, cy) in pixels {
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        for _ in 0..task.spp {
            let u = ctx.sampler.sample2();
            let film = ((Vec2::new(cx as f32, cy as f32) + u) * scale).min(Vec2::splat(0.999_999));

            let splats = &mut task.splats;
            let pixel = render_sample(integrator, scene, film, ctx, |film, value| {
                splats.push(Splat {
                    pixel: film_to_pixel(film, resolution),
                    value,
                });
            });
            ctx.arena.reset();

            if traces_light_paths {
                task.light_path_count += 1;
            }
            let value = if spectrum::is_finite(pixel.value) {
                pixel.value
            } else {
                Spectrum::ZERO
            };
            task.add_sample(cx, cy, value);
        }
    }
    true
}
