//! Progressive render scheduler.
//!
//! Spawns a pool of worker threads that repeatedly pull tasks from the
//! framebuffer, render them, and merge the results back. Rendering runs
//! until [`ProgressiveRenderer::stop`] is called or the renderer is dropped.

use crate::config::{IntegratorConfig, RendererConfig};
use crate::framebuffer::{DisplayImage, Framebuffer};
use crate::worker::{render_task, WorkerContext};
use crate::RenderError;
use lux_math::UVec2;
use lux_tracer::Scene;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Most tasks a worker pulls from the queue at a time.
const TASK_BATCH_SIZE: usize = 4;

/// Golden-ratio increment separating per-worker sample streams.
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Tasks to pull given the queue length, leaving a share for every worker
/// when the queue runs short.
fn batch_size(queued: usize, worker_count: usize) -> usize {
    (queued / worker_count.max(1)).clamp(1, TASK_BATCH_SIZE)
}

struct Worker {
    scene: Arc<Scene>,
    framebuffer: Arc<Framebuffer>,
    integrator: IntegratorConfig,
    stop: Arc<AtomicBool>,
    ctx: WorkerContext,
    worker_count: usize,
}

impl Worker {
    fn run(mut self) {
        let resolution = self.framebuffer.get_resolution();
        let mut rendered = 0usize;

        while !self.stop.load(Ordering::Relaxed) {
            let batch = batch_size(self.framebuffer.queued_tasks(), self.worker_count);
            let mut tasks = self.framebuffer.get_tasks(batch);
            if tasks.is_empty() {
                // Every task is in flight on another worker
                thread::yield_now();
                continue;
            }

            for task in &mut tasks {
                let finished = render_task(
                    task,
                    &self.integrator,
                    &self.scene,
                    resolution,
                    &mut self.ctx,
                    &self.stop,
                );
                if !finished {
                    log::debug!("Worker stopping after {} tasks, discarding its batch", rendered);
                    return;
                }
            }
            rendered += tasks.len();
            self.framebuffer.merge_tasks(tasks);
        }
        log::debug!("Worker rendered {} tasks", rendered);
    }
}

/// Owns the worker pool for one progressive render.
pub struct ProgressiveRenderer {
    framebuffer: Arc<Framebuffer>,
    stop: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
    started: Instant,
}

impl ProgressiveRenderer {
    /// Validate `config` against `scene` and start rendering.
    pub fn start(scene: Arc<Scene>, config: RendererConfig) -> Result<Self, RenderError> {
        config.validate()?;

        let camera = scene.camera();
        if camera.image_width != config.width || camera.image_height != config.height {
            return Err(RenderError::ResolutionMismatch {
                camera_width: camera.image_width,
                camera_height: camera.image_height,
                width: config.width,
                height: config.height,
            });
        }

        let framebuffer = Arc::new(Framebuffer::new(
            config.width,
            config.height,
            config.task_grid_size,
            config.seed,
        )?);
        let worker_count = config.resolved_worker_count();

        let mut renderer = Self {
            framebuffer,
            stop: Arc::new(AtomicBool::new(false)),
            workers: Vec::with_capacity(worker_count),
            started: Instant::now(),
        };

        for i in 0..worker_count {
            let seed = config.seed.wrapping_add((i as u64).wrapping_mul(SEED_STRIDE));
            let worker = Worker {
                scene: Arc::clone(&scene),
                framebuffer: Arc::clone(&renderer.framebuffer),
                integrator: config.integrator,
                stop: Arc::clone(&renderer.stop),
                ctx: WorkerContext::new(seed),
                worker_count,
            };
            // On failure the already running workers are stopped by Drop.
            let handle = thread::Builder::new()
                .name(format!("lux-worker-{i}"))
                .spawn(move || worker.run())?;
            renderer.workers.push(handle);
        }

        log::info!(
            "Rendering {}x{} with {} using {} threads",
            config.width,
            config.height,
            config.integrator.name(),
            worker_count
        );
        Ok(renderer)
    }

    /// Signal every worker and wait for them to exit. Work in flight is
    /// discarded. Calling this more than once is harmless.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        let joined = self.workers.len();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::error!("Render worker panicked");
            }
        }
        if joined > 0 {
            log::info!(
                "Render stopped after {:.2}s at generation {}",
                self.started.elapsed().as_secs_f64(),
                self.framebuffer.generation()
            );
        }
    }

    pub fn is_running(&self) -> bool {
        !self.workers.is_empty()
    }

    /// Latest display image.
    pub fn image(&self) -> Arc<DisplayImage> {
        self.framebuffer.get_image()
    }

    pub fn resolution(&self) -> UVec2 {
        self.framebuffer.get_resolution()
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }
}

impl Drop for ProgressiveRenderer {
    fn drop(&mut self) {
        self.stop();
    }
}
